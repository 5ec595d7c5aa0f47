//! Zentrale Konfiguration der Gleisgeometrie-Engine.
//!
//! `RailwayOptions` enthält alle zur Laufzeit änderbaren Werte.
//! Die `const`-Werte bleiben als Fallback/Default erhalten.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::track_section::MIN_SAMPLE_STEP;
use crate::core::{SolverOptions, TrackSpec};

// ── Node-Suche ──────────────────────────────────────────────────────

/// Fangradius (Welteinheiten) für `Railway::find_closest_node`.
pub const SNAP_RADIUS: f32 = 3.0;

// ── Abtastung ───────────────────────────────────────────────────────

/// Punktabstand beim Abtasten eines Gleises als Polylinie.
pub const SAMPLE_STEP: f32 = 1.0;

// ── Dateien ─────────────────────────────────────────────────────────

/// Dateiname der Optionen neben der Binary.
pub const OPTIONS_FILE_NAME: &str = "railway_track_engine.toml";

// ── Laufzeit-Optionen (serialisierbar) ─────────────────────────────

/// Alle zur Laufzeit änderbaren Optionen.
/// Wird als `railway_track_engine.toml` neben der Binary gespeichert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RailwayOptions {
    // ── Editor ──────────────────────────────────────────────────
    /// Fangradius für die Node-Suche
    pub snap_radius: f32,
    /// Punktabstand für Polylinien
    pub sample_step: f32,
    /// Wurzelverzeichnis der Spurweiten- und Profil-Definitionen
    pub data_dir: Option<PathBuf>,

    // ── Trassierung (TOML-Tabellen nach den Einzelwerten) ───────
    /// Parameter des Abschnitt-Solvers
    pub solver: SolverOptions,
    /// Vorgaben für neu angelegte Nodes
    pub track_spec: TrackSpec,
}

impl Default for RailwayOptions {
    fn default() -> Self {
        Self {
            snap_radius: SNAP_RADIUS,
            sample_step: SAMPLE_STEP,
            data_dir: None,
            solver: SolverOptions::default(),
            track_spec: TrackSpec::default(),
        }
    }
}

impl RailwayOptions {
    /// Lädt Optionen aus einer TOML-Datei. Bei Fehler: Standardwerte.
    pub fn load_from_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(opts) => {
                    log::info!("Optionen geladen aus: {}", path.display());
                    Self::sanitized(opts)
                }
                Err(e) => {
                    log::warn!("Optionen-Datei fehlerhaft, verwende Standardwerte: {}", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Keine Optionen-Datei gefunden, verwende Standardwerte");
                Self::default()
            }
        }
    }

    /// Korrigiert Werte, mit denen Suche, Abtastung oder Solver entarten.
    pub fn sanitized(mut self) -> Self {
        if !(self.snap_radius.is_finite() && self.snap_radius >= 0.0) {
            log::warn!("snap_radius = {} ungültig, verwende {}", self.snap_radius, SNAP_RADIUS);
            self.snap_radius = SNAP_RADIUS;
        }
        if !(self.sample_step.is_finite() && self.sample_step >= MIN_SAMPLE_STEP) {
            log::warn!(
                "sample_step = {} ungültig (Minimum {}), verwende {}",
                self.sample_step,
                MIN_SAMPLE_STEP,
                SAMPLE_STEP
            );
            self.sample_step = SAMPLE_STEP;
        }
        self.solver = self.solver.sanitized();
        self
    }

    /// Speichert Optionen als TOML-Datei.
    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self).context("Optionen nicht serialisierbar")?;
        std::fs::write(path, content)
            .with_context(|| format!("Optionen nicht schreibbar: {}", path.display()))?;
        log::info!("Optionen gespeichert nach: {}", path.display());
        Ok(())
    }

    /// Ermittelt den Pfad zur Optionen-Datei neben der Binary.
    pub fn config_path() -> PathBuf {
        std::env::current_exe()
            .unwrap_or_else(|_| PathBuf::from("railway-track-demo"))
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(OPTIONS_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn save_and_load_preserve_values() {
        let dir = tempfile::tempdir().expect("Temp-Verzeichnis");
        let path = dir.path().join(OPTIONS_FILE_NAME);

        let mut options = RailwayOptions::default();
        options.solver.arc_curvature = 1.0 / 45.0;
        options.solver.unloop_end = false;
        options.track_spec.track_spacing = 4.5;
        options.data_dir = Some(PathBuf::from("data"));
        options.save_to_file(&path).expect("Speichern");

        let loaded = RailwayOptions::load_from_file(&path);
        assert_eq!(loaded, options);
    }

    #[test]
    fn partial_file_falls_back_per_field() {
        let dir = tempfile::tempdir().expect("Temp-Verzeichnis");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "snap_radius = 7.5\n\n[solver]\nnewton_max_iterations = 8\n")
            .expect("Schreiben");

        let loaded = RailwayOptions::load_from_file(&path);
        assert_relative_eq!(loaded.snap_radius, 7.5);
        assert_eq!(loaded.solver.newton_max_iterations, 8);
        assert_relative_eq!(
            loaded.solver.arc_curvature,
            SolverOptions::default().arc_curvature
        );
        assert_eq!(loaded.track_spec, TrackSpec::default());
    }

    #[test]
    fn broken_or_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("Temp-Verzeichnis");
        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "solver = [").expect("Schreiben");

        assert_eq!(RailwayOptions::load_from_file(&broken), RailwayOptions::default());
        assert_eq!(
            RailwayOptions::load_from_file(&dir.path().join("fehlt.toml")),
            RailwayOptions::default()
        );
    }

    #[test]
    fn degenerate_values_are_replaced_on_load() {
        let dir = tempfile::tempdir().expect("Temp-Verzeichnis");
        let path = dir.path().join("degenerate.toml");
        std::fs::write(
            &path,
            "sample_step = 0.0\n\n[solver]\narc_curvature = 0.0\ntransition_curvature_rate = -1.0\nunloop_start = false\n",
        )
        .expect("Schreiben");

        let loaded = RailwayOptions::load_from_file(&path);
        assert_relative_eq!(loaded.sample_step, SAMPLE_STEP);
        assert_relative_eq!(loaded.solver.arc_curvature, SolverOptions::default().arc_curvature);
        assert_relative_eq!(
            loaded.solver.transition_curvature_rate,
            SolverOptions::default().transition_curvature_rate
        );
        assert!(!loaded.solver.unloop_start);
    }

    #[test]
    fn config_path_uses_options_file_name() {
        let path = RailwayOptions::config_path();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some(OPTIONS_FILE_NAME)
        );
    }
}
