//! Gleisabschnitt: Kante zwischen zwei Node-Referenzen mit Klothoidenkette.
//!
//! Abschnittsgleis `i` beginnt auf lokalem Gleis `i` der Startreferenz und
//! endet auf lokalem Gleis `i` der umgedrehten Endreferenz. Die Kette
//! beschreibt Gleis 0, weitere Gleise sind Parallelkurven dazu.

pub mod interpolation;

use std::fmt;

use glam::{Vec2, Vec3};

use super::clothoid::Clothoid;
use super::clothoid_chain::ClothoidChain;
use super::track_node::{NodeId, NodeRef, TrackNode};
use interpolation::{build_chain, solve_section, EndpointPose, SolutionKind, SolverOptions};

/// Kleinster Punktabstand beim Abtasten (m).
pub const MIN_SAMPLE_STEP: f32 = 0.01;

/// Stabile ID eines Abschnitts in der [`Railway`](super::Railway).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId(pub u64);

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// Gleisabschnitt zwischen zwei Nodes.
#[derive(Debug, Clone)]
pub struct TrackSection {
    pub id: SectionId,
    start: NodeRef,
    /// Endreferenz, blickt vom End-Node in den Abschnitt
    end: NodeRef,
    chain: ClothoidChain<f32>,
    /// Seitlicher Versatz jedes Abschnittsgleises relativ zu Gleis 0
    track_offsets: Vec<f32>,
    start_height: f32,
    end_height: f32,
}

impl TrackSection {
    /// Erstellt einen Abschnitt mit leerer Kette. Gleisanzahl aus der Startreferenz.
    pub fn new(id: SectionId, start: NodeRef, end: NodeRef) -> Self {
        Self {
            id,
            start,
            end,
            chain: ClothoidChain::new(),
            track_offsets: vec![0.0; start.num_tracks as usize],
            start_height: 0.0,
            end_height: 0.0,
        }
    }

    pub fn start(&self) -> &NodeRef {
        &self.start
    }

    pub fn end(&self) -> &NodeRef {
        &self.end
    }

    pub fn start_node(&self) -> NodeId {
        self.start.node
    }

    pub fn end_node(&self) -> NodeId {
        self.end.node
    }

    /// Endreferenz in Fahrtrichtung des Abschnitts.
    pub fn end_outward(&self) -> NodeRef {
        self.end.reversed()
    }

    pub fn num_tracks(&self) -> u32 {
        self.start.num_tracks
    }

    /// Referenz am Node `node`, die in den Abschnitt blickt.
    pub fn reference_at(&self, node: NodeId, at_start: bool) -> Option<&NodeRef> {
        let reference = if at_start { &self.start } else { &self.end };
        (reference.node == node).then_some(reference)
    }

    /// Abschnittsgleis zu einem Elterngleis am Start- bzw. Endnode.
    pub fn section_track_at(&self, at_start: bool, parent_track: u32) -> Option<u32> {
        if at_start {
            self.start.local_track_index(parent_track)
        } else {
            self.end_outward().local_track_index(parent_track)
        }
    }

    /// Elterngleis am Start- bzw. Endnode zu einem Abschnittsgleis.
    pub fn parent_track_at(&self, at_start: bool, section_track: u32) -> Option<u32> {
        if at_start {
            self.start.parent_track_index(section_track)
        } else {
            self.end_outward().parent_track_index(section_track)
        }
    }

    // ── Interpolation ───────────────────────────────────────────────

    /// Startpose von Gleis 0.
    fn start_pose(&self, node: &TrackNode) -> Option<EndpointPose> {
        let position = self.start.position(node, 0)?;
        Some(EndpointPose::new(
            position.truncate(),
            self.start.direction(node),
            self.start.curvature(node, 0)?,
        ))
    }

    /// Endpose von Gleis 0, in den Abschnitt blickend.
    fn end_pose(&self, node: &TrackNode) -> Option<EndpointPose> {
        let parent = self.end_outward().parent_track_index(0)?;
        let local = self.end.local_track_index(parent)?;
        let position = self.end.position(node, local)?;
        Some(EndpointPose::new(
            position.truncate(),
            self.end.direction(node),
            self.end.curvature(node, local)?,
        ))
    }

    /// Berechnet die Kette neu aus den aktuellen Node-Posen.
    ///
    /// Gibt `false` zurück, wenn keine gültige Trasse existiert; die bisherige
    /// Kette bleibt dann unverändert.
    pub fn interpolate(&mut self, start_node: &TrackNode, end_node: &TrackNode, options: &SolverOptions) -> bool {
        let (Some(start), Some(end)) = (self.start_pose(start_node), self.end_pose(end_node)) else {
            log::warn!("Abschnitt {}: Gleisfenster passt nicht zu den Nodes", self.id);
            return false;
        };

        let Some(solution) = solve_section(&start, &end, options) else {
            log::warn!(
                "Abschnitt {}: keine gültige Trasse zwischen {} und {}, Kette unverändert",
                self.id,
                self.start.node,
                self.end.node
            );
            return false;
        };

        match solution.kind {
            SolutionKind::Straight => log::debug!(
                "Abschnitt {}: Gerade, Länge {:.3}",
                self.id,
                solution.length()
            ),
            SolutionKind::Template {
                direction1,
                direction2,
            } => log::debug!(
                "Abschnitt {}: Bögen ({}, {}), Länge {:.3}",
                self.id,
                direction1,
                direction2,
                solution.length()
            ),
        }

        build_chain(&start, &solution.params, &mut self.chain);

        let base = self.start.track_offset(start_node, 0).unwrap_or(0.0);
        self.track_offsets = (0..self.num_tracks())
            .map(|track| self.start.track_offset(start_node, track).unwrap_or(base) - base)
            .collect();
        self.start_height = self.start.midpoint(start_node).z;
        self.end_height = self.end.midpoint(end_node).z;
        true
    }

    // ── Abfragen ────────────────────────────────────────────────────

    pub fn chain(&self) -> &ClothoidChain<f32> {
        &self.chain
    }

    /// Alle Segmente zum Zeichnen.
    pub fn clothoids(&self) -> &[Clothoid<f32>] {
        self.chain.clothoids()
    }

    /// Seitlicher Versatz eines Abschnittsgleises relativ zu Gleis 0.
    pub fn track_offset(&self, track: u32) -> Option<f32> {
        self.track_offsets.get(track as usize).copied()
    }

    /// `false`, solange noch keine Trasse gefunden wurde.
    pub fn is_solved(&self) -> bool {
        !self.chain.is_empty()
    }

    /// Länge eines Abschnittsgleises, `None` ohne Trasse.
    pub fn length(&self, track: u32) -> Option<f32> {
        if !self.is_solved() {
            return None;
        }
        self.track_offset(track)
            .map(|offset| self.chain.parallel_length(offset))
    }

    fn height_at(&self, distance: f32, length: f32) -> f32 {
        if length <= 0.0 {
            return self.start_height;
        }
        let t = (distance / length).clamp(0.0, 1.0);
        self.start_height + (self.end_height - self.start_height) * t
    }

    /// 3D-Position auf einem Abschnittsgleis; Höhe linear zwischen den Nodes.
    pub fn position(&self, track: u32, distance: f32) -> Option<Vec3> {
        let offset = self.track_offset(track)?;
        let planar: Vec2 = self
            .chain
            .parallel_position_at_parallel_length(distance, offset)?;
        let length = self.chain.parallel_length(offset);
        Some(planar.extend(self.height_at(distance, length)))
    }

    /// Richtung in Abschnittsrichtung.
    pub fn direction(&self, track: u32, distance: f32) -> Option<f32> {
        let offset = self.track_offset(track)?;
        self.chain
            .parallel_direction_at_parallel_length(distance, offset)
    }

    pub fn curvature(&self, track: u32, distance: f32) -> Option<f32> {
        let offset = self.track_offset(track)?;
        self.chain
            .parallel_curvature_at_parallel_length(distance, offset)
    }

    /// Polylinie eines Gleises mit Punktabstand `step` (inklusive Endpunkt).
    pub fn sample(&self, track: u32, step: f32) -> Vec<Vec3> {
        let Some(length) = self.length(track) else {
            return Vec::new();
        };
        if step.is_nan() || step <= 0.0 || !length.is_finite() {
            return Vec::new();
        }
        let step = step.max(MIN_SAMPLE_STEP);
        let count = (length / step).ceil().max(1.0) as usize;
        (0..=count)
            .filter_map(|i| self.position(track, (i as f32 * step).min(length)))
            .collect()
    }
}
