//! Spurweiten- und Schienenprofil-Definitionen aus JSON-Dateien.

pub mod gauge;
pub mod rail_profile;
pub mod store;

pub use gauge::{Gauge, RailPlacement};
pub use rail_profile::{RailBlocks, RailProfile, RailShape};
pub use store::DataStore;
