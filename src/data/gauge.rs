//! Spurweite mit der Lage der einzelnen Schienen im Gleisquerschnitt.

use std::sync::Arc;

use glam::{Vec2, Vec3};
use serde::Deserialize;

use super::rail_profile::RailProfile;
use crate::core::scalar::left_normal;
use crate::core::TrackSection;

/// Eine Schiene im Querschnitt. `position.x` liegt rechts positiv, `y` oben.
#[derive(Debug, Clone)]
pub struct RailPlacement {
    pub profile: Arc<RailProfile>,
    pub position: Vec2,
}

#[derive(Debug, Clone)]
pub struct Gauge {
    pub name: String,
    /// Nennspurweite (m)
    pub gauge: f32,
    pub rails: Vec<RailPlacement>,
}

/// JSON-Eintrag einer Schiene: Profilname, Bezugspunkt und Seitenversatz.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawRail {
    pub profile: String,
    #[serde(default)]
    pub reference: String,
    pub x: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawGauge {
    pub name: String,
    pub gauge: f32,
    #[serde(default)]
    pub rails: Vec<RawRail>,
}

impl Gauge {
    pub fn new(name: impl Into<String>, gauge: f32) -> Self {
        Self {
            name: name.into(),
            gauge,
            rails: Vec::new(),
        }
    }

    /// Platziert eine Schiene so, dass ihr Bezugspunkt `reference` bei `x` liegt.
    ///
    /// Fehlt der Bezugspunkt im Profil, liegt der Profilursprung bei `x`.
    pub fn add_rail(&mut self, profile: Arc<RailProfile>, reference: &str, x: f32) {
        let anchor = profile.reference(reference).unwrap_or(Vec2::ZERO);
        self.rails.push(RailPlacement {
            profile,
            position: anchor + Vec2::new(x, 0.0),
        });
    }

    /// Seitliche Lage aller Schienen.
    pub fn rail_offsets(&self) -> Vec<f32> {
        self.rails.iter().map(|rail| rail.position.x).collect()
    }

    /// Weltpositionen aller Schienen eines Abschnittsgleises an `distance`.
    pub fn rail_points(&self, section: &TrackSection, track: u32, distance: f32) -> Vec<Vec3> {
        let (Some(center), Some(direction)) = (
            section.position(track, distance),
            section.direction(track, distance),
        ) else {
            return Vec::new();
        };
        let right = -left_normal::<f32>(direction);
        self.rails
            .iter()
            .map(|rail| {
                center
                    + Vec3::new(right.x, right.y, 0.0) * rail.position.x
                    + Vec3::Z * rail.position.y
            })
            .collect()
    }
}
