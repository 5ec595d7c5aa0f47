//! Railway Track Engine Library.
//! Gleisgeometrie, Abschnitts-Interpolation und Traversierung als Library.

pub mod core;
pub mod data;
pub mod shared;

pub use core::{
    Clothoid, ClothoidChain, NodeId, NodeRef, Railway, SectionId, SolverOptions, TrackNode,
    TrackPosition, TrackSection, TrackSpec,
};
pub use core::{Lookahead, NextSection, SpatialIndex, SpatialMatch};
pub use data::{DataStore, Gauge, RailProfile};
pub use shared::RailwayOptions;
