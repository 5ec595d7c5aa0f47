//! Lazy geladene JSON-Definitionen für Spurweiten und Schienenprofile.
//!
//! Layout unter dem Wurzelverzeichnis:
//! `gauge/<name>.json` und `rail_profile/<name>.json`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use super::gauge::{Gauge, RawGauge};
use super::rail_profile::RailProfile;
use crate::core::TrackSpec;

pub const GAUGE_DIR: &str = "gauge";
pub const RAIL_PROFILE_DIR: &str = "rail_profile";

/// Cache aller bereits geladenen Definitionen.
#[derive(Debug, Clone, Default)]
pub struct DataStore {
    root: PathBuf,
    gauges: HashMap<String, Arc<Gauge>>,
    profiles: HashMap<String, Arc<RailProfile>>,
}

impl DataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            gauges: HashMap::new(),
            profiles: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, dir: &str, name: &str) -> PathBuf {
        self.root.join(dir).join(format!("{name}.json"))
    }

    /// Liefert ein Schienenprofil, lädt es beim ersten Zugriff.
    pub fn rail_profile(&mut self, name: &str) -> Result<Arc<RailProfile>> {
        if let Some(profile) = self.profiles.get(name) {
            return Ok(Arc::clone(profile));
        }
        let path = self.file_path(RAIL_PROFILE_DIR, name);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Schienenprofil nicht lesbar: {}", path.display()))?;
        let profile = Arc::new(
            RailProfile::from_json(&content)
                .with_context(|| format!("Fehler in {}", path.display()))?,
        );
        log::info!("Schienenprofil '{}' geladen aus {}", name, path.display());
        self.profiles.insert(name.to_string(), Arc::clone(&profile));
        Ok(profile)
    }

    /// Liefert eine Spurweite inklusive der referenzierten Profile.
    pub fn gauge(&mut self, name: &str) -> Result<Arc<Gauge>> {
        if let Some(gauge) = self.gauges.get(name) {
            return Ok(Arc::clone(gauge));
        }
        let path = self.file_path(GAUGE_DIR, name);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Spurweite nicht lesbar: {}", path.display()))?;
        let raw: RawGauge = serde_json::from_str(&content)
            .with_context(|| format!("Spurweite ist kein gültiges JSON: {}", path.display()))?;

        let mut gauge = Gauge::new(raw.name, raw.gauge);
        for rail in raw.rails {
            let profile = self
                .rail_profile(&rail.profile)
                .with_context(|| format!("Spurweite '{name}': Profil '{}'", rail.profile))?;
            if profile.reference(&rail.reference).is_none() {
                log::warn!(
                    "Spurweite '{}': Bezugspunkt '{}' fehlt in Profil '{}'",
                    name,
                    rail.reference,
                    rail.profile
                );
            }
            gauge.add_rail(profile, &rail.reference, rail.x);
        }

        log::info!("Spurweite '{}' geladen ({} Schienen)", name, gauge.rails.len());
        let gauge = Arc::new(gauge);
        self.gauges.insert(name.to_string(), Arc::clone(&gauge));
        Ok(gauge)
    }

    /// Spurweite, auf die eine TrackSpec verweist.
    pub fn gauge_for(&mut self, spec: &TrackSpec) -> Result<Option<Arc<Gauge>>> {
        spec.gauge
            .as_deref()
            .map(|name| self.gauge(name))
            .transpose()
    }

    /// Registriert eine Spurweite ohne Datei (z.B. für Tests).
    pub fn insert_gauge(&mut self, gauge: Gauge) -> Arc<Gauge> {
        let gauge = Arc::new(gauge);
        self.gauges.insert(gauge.name.clone(), Arc::clone(&gauge));
        gauge
    }
}
