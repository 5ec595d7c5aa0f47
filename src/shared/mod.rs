//! Geteilte Konfiguration, unabhängig von `core` und `data` ladbar.

pub mod options;

pub use options::RailwayOptions;
pub use options::{SAMPLE_STEP, SNAP_RADIUS};
