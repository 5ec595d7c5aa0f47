//! Trassierungsvorgaben eines Gleises (Spurweite, Gleisabstand, Krümmungsgrenzen).

use serde::{Deserialize, Serialize};

/// Standard-Gleisabstand zwischen parallelen Gleisen.
pub const DEFAULT_TRACK_SPACING: f32 = 1.0;
/// Absolute Maximalkrümmung (rad/m).
pub const DEFAULT_MAX_CURVATURE: f32 = 1.0 / 10.0;
/// Bevorzugte Krümmung bei voller Geschwindigkeit (rad/m).
pub const DEFAULT_MIN_CURVATURE: f32 = 1.0 / 50.0;
/// Maximale Krümmungsrate (rad/m²).
pub const DEFAULT_MAX_CURVATURE_RATE: f32 = 1.0 / 10.0 / 10.0;
/// Bevorzugte Krümmungsrate (rad/m²).
pub const DEFAULT_MIN_CURVATURE_RATE: f32 = 1.0 / 50.0 / 50.0;

/// Vorgaben für Gleise eines Nodes.
///
/// Aus Sicht der Geometrie-Engine unveränderlich; Nodes teilen sich eine
/// Instanz über `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackSpec {
    /// Anzeigename
    pub name: String,
    /// Name der Spurweiten-Definition (siehe `data::DataStore`)
    pub gauge: Option<String>,
    /// Seitlicher Abstand benachbarter Gleise
    pub track_spacing: f32,
    pub max_curvature: f32,
    pub min_curvature: f32,
    pub max_curvature_rate: f32,
    pub min_curvature_rate: f32,
}

impl Default for TrackSpec {
    fn default() -> Self {
        Self {
            name: String::from("standard"),
            gauge: None,
            track_spacing: DEFAULT_TRACK_SPACING,
            max_curvature: DEFAULT_MAX_CURVATURE,
            min_curvature: DEFAULT_MIN_CURVATURE,
            max_curvature_rate: DEFAULT_MAX_CURVATURE_RATE,
            min_curvature_rate: DEFAULT_MIN_CURVATURE_RATE,
        }
    }
}

impl TrackSpec {
    /// Kleinster zulässiger Kurvenradius.
    pub fn min_radius(&self) -> f32 {
        1.0 / self.max_curvature
    }

    /// Prüft, ob eine Krümmung innerhalb der absoluten Grenze liegt.
    pub fn allows_curvature(&self, curvature: f32) -> bool {
        curvature.abs() <= self.max_curvature
    }
}
