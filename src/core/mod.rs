//! Core-Domänentypen: Klothoiden, Gleisknoten, Abschnitte, Railway, Traversierung.

pub mod clothoid;
pub mod clothoid_chain;
pub mod fresnel;
/// Gleisnetz-Container
///
/// Besitzt Nodes und Abschnitte, verbindet sie und hält die Geometrie
/// bei jeder Node-Änderung aktuell.
pub mod railway;
pub mod scalar;
pub mod spatial;
pub mod track_node;
pub mod track_position;
pub mod track_section;
pub mod track_spec;

pub use clothoid::Clothoid;
pub use clothoid_chain::ClothoidChain;
pub use railway::{NextSection, Railway};
pub use scalar::Real;
pub use spatial::{SpatialIndex, SpatialMatch};
pub use track_node::{NodeId, NodeRef, SectionLink, TrackDirectionInfo, TrackNode, MAX_DIVERGENCE};
pub use track_position::{Lookahead, TrackPosition};
pub use track_section::interpolation::{SectionParams, SectionSolution, SolutionKind, SolverOptions};
pub use track_section::{SectionId, TrackSection};
pub use track_spec::TrackSpec;
