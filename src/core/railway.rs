//! Gleisnetz: besitzt Nodes und Abschnitte und hält deren Geometrie aktuell.
//!
//! Nodes und Abschnitte liegen in zwei Arenen mit stabilen IDs. Abschnitte
//! kennen ihre Nodes über [`NodeRef`], Nodes ihre Abschnitte über
//! [`SectionLink`]. Jede Pose-Änderung an einem Node interpoliert sofort alle
//! angeschlossenen Abschnitte neu.

use std::collections::HashMap;
use std::sync::Arc;

use glam::{Vec2, Vec3};

use super::spatial::{SpatialIndex, SpatialMatch};
use super::track_node::{NodeId, NodeRef, SectionLink, TrackNode};
use super::track_section::interpolation::SolverOptions;
use super::track_section::{SectionId, TrackSection};
use super::track_spec::TrackSpec;

/// Abschnitt, der von einem Gleis eines Nodes aus befahren wird.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextSection {
    pub section: SectionId,
    /// Abschnittsgleis
    pub track: u32,
    /// `true`, wenn der Abschnitt an diesem Node beginnt
    pub forward: bool,
}

/// Container für das gesamte Gleisnetz.
#[derive(Debug, Clone)]
pub struct Railway {
    nodes: HashMap<NodeId, TrackNode>,
    sections: HashMap<SectionId, TrackSection>,
    next_node_id: u64,
    next_section_id: u64,
    options: SolverOptions,
    /// Vorgaben für neue Nodes
    default_spec: Arc<TrackSpec>,
    spatial_index: SpatialIndex,
}

impl Default for Railway {
    fn default() -> Self {
        Self::new(SolverOptions::default(), TrackSpec::default())
    }
}

impl Railway {
    pub fn new(options: SolverOptions, default_spec: TrackSpec) -> Self {
        Self {
            nodes: HashMap::new(),
            sections: HashMap::new(),
            next_node_id: 1,
            next_section_id: 1,
            options,
            default_spec: Arc::new(default_spec),
            spatial_index: SpatialIndex::empty(),
        }
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Ersetzt die Solver-Optionen und interpoliert alle Abschnitte neu.
    pub fn set_options(&mut self, options: SolverOptions) {
        self.options = options;
        let mut ids: Vec<SectionId> = self.sections.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            self.interpolate_section(id);
        }
    }

    pub fn default_spec(&self) -> Arc<TrackSpec> {
        Arc::clone(&self.default_spec)
    }

    // ── Zugriff ─────────────────────────────────────────────────────

    pub fn node(&self, id: NodeId) -> Option<&TrackNode> {
        self.nodes.get(&id)
    }

    pub fn section(&self, id: SectionId) -> Option<&TrackSection> {
        self.sections.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TrackNode> {
        self.nodes.values()
    }

    pub fn sections(&self) -> impl Iterator<Item = &TrackSection> {
        self.sections.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    // ── Nodes ───────────────────────────────────────────────────────

    /// Legt einen Node mit den Standard-Vorgaben an.
    pub fn add_node(&mut self, position: Vec3, direction: f32, curvature: f32, num_tracks: u32) -> NodeId {
        let spec = self.default_spec();
        self.add_node_with_spec(spec, position, direction, curvature, num_tracks)
    }

    pub fn add_node_with_spec(
        &mut self,
        spec: Arc<TrackSpec>,
        position: Vec3,
        direction: f32,
        curvature: f32,
        num_tracks: u32,
    ) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        let node = TrackNode::new(id, spec)
            .with_num_tracks(num_tracks)
            .with_pose(position, direction, curvature);
        self.nodes.insert(id, node);
        self.rebuild_spatial_index();
        id
    }

    /// Entfernt einen Node samt aller angeschlossenen Abschnitte.
    pub fn remove_node(&mut self, id: NodeId) -> Option<TrackNode> {
        let attached: Vec<SectionId> = self.nodes.get(&id)?.attached_sections().collect();
        for section in attached {
            self.remove_section(section);
        }
        let removed = self.nodes.remove(&id);
        self.rebuild_spatial_index();
        removed
    }

    pub fn set_node_position(&mut self, id: NodeId, position: Vec3) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        node.set_position(position);
        self.rebuild_spatial_index();
        self.notify_sections(id);
        true
    }

    pub fn set_node_direction(&mut self, id: NodeId, direction: f32) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        node.set_direction(direction);
        self.notify_sections(id);
        true
    }

    pub fn set_node_curvature(&mut self, id: NodeId, curvature: f32) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        node.set_curvature(curvature);
        self.notify_sections(id);
        true
    }

    /// Setzt die komplette Pose mit einer einzigen Neuberechnung.
    pub fn set_node_pose(&mut self, id: NodeId, position: Vec3, direction: f32, curvature: f32) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        node.set_position(position);
        node.set_direction(direction);
        node.set_curvature(curvature);
        self.rebuild_spatial_index();
        self.notify_sections(id);
        true
    }

    /// Verschiebt den Node so, dass die Mitte aller Gleise auf `midpoint` liegt.
    pub fn set_node_midpoint(&mut self, id: NodeId, midpoint: Vec3) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        node.set_midpoint(midpoint);
        self.rebuild_spatial_index();
        self.notify_sections(id);
        true
    }

    /// Ändert die Gleisanzahl; scheitert, wenn wegfallende Gleise belegt sind.
    pub fn set_node_num_tracks(&mut self, id: NodeId, num_tracks: u32) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        if !node.set_num_tracks(num_tracks) {
            log::debug!("Node {id}: Gleisanzahl {num_tracks} abgelehnt, Gleise belegt");
            return false;
        }
        self.notify_sections(id);
        true
    }

    /// Stellt die Weiche an (Gleis, Blickrichtung) um.
    pub fn switch_points(&mut self, id: NodeId, track: u32, forward: bool) -> bool {
        self.nodes
            .get_mut(&id)
            .is_some_and(|node| node.switch_points(track, forward))
    }

    // ── Abschnitte ──────────────────────────────────────────────────

    /// Verbindet zwei Node-Referenzen mit einem neuen Abschnitt.
    ///
    /// `end` blickt vom End-Node in den Abschnitt. Beide Referenzen müssen
    /// gleich viele Gleise umfassen. Hat einer der Nodes keinen Platz, wird
    /// nichts eingetragen. Eine nicht lösbare Trasse verhindert das Anlegen
    /// nicht, die Kette bleibt dann leer.
    pub fn add_section(&mut self, start: NodeRef, end: NodeRef) -> Option<SectionId> {
        if start.num_tracks != end.num_tracks {
            log::debug!(
                "Abschnitt {} -> {}: Gleisanzahl {} passt nicht zu {}",
                start.node,
                end.node,
                start.num_tracks,
                end.num_tracks
            );
            return None;
        }
        self.validated(&start)?;
        self.validated(&end)?;

        let id = SectionId(self.next_section_id);
        let start_link = SectionLink {
            section: id,
            forward: true,
        };
        let end_link = SectionLink {
            section: id,
            forward: false,
        };

        if !self.attach(&start, start_link) {
            return None;
        }
        if !self.attach(&end, end_link) {
            if let Some(node) = self.nodes.get_mut(&start.node) {
                node.remove_track_section(id);
            }
            return None;
        }

        self.next_section_id += 1;
        self.sections.insert(id, TrackSection::new(id, start, end));
        self.interpolate_section(id);
        Some(id)
    }

    /// Entfernt einen Abschnitt und löst ihn von beiden Nodes.
    pub fn remove_section(&mut self, id: SectionId) -> Option<TrackSection> {
        let section = self.sections.remove(&id)?;
        for node_id in [section.start_node(), section.end_node()] {
            if let Some(node) = self.nodes.get_mut(&node_id) {
                node.remove_track_section(id);
            }
        }
        Some(section)
    }

    fn validated(&self, reference: &NodeRef) -> Option<()> {
        let node = self.nodes.get(&reference.node)?;
        NodeRef::new(
            node,
            reference.forward,
            reference.first_track,
            reference.num_tracks,
        )
        .map(|_| ())
    }

    fn attach(&mut self, reference: &NodeRef, link: SectionLink) -> bool {
        self.nodes.get_mut(&reference.node).is_some_and(|node| {
            node.add_track_section(
                reference.forward,
                reference.lowest_parent_track(),
                reference.num_tracks,
                link,
            )
        })
    }

    /// Interpoliert einen Abschnitt aus den aktuellen Node-Posen.
    pub fn interpolate_section(&mut self, id: SectionId) -> bool {
        let Some(section) = self.sections.get_mut(&id) else {
            return false;
        };
        let (Some(start), Some(end)) = (
            self.nodes.get(&section.start_node()),
            self.nodes.get(&section.end_node()),
        ) else {
            return false;
        };
        section.interpolate(start, end, &self.options)
    }

    /// Interpoliert alle Abschnitte eines Nodes in Anschlussreihenfolge.
    fn notify_sections(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let attached: Vec<SectionId> = node.attached_sections().collect();
        for section in attached {
            self.interpolate_section(section);
        }
    }

    // ── Topologie ───────────────────────────────────────────────────

    /// Aktiver Abschnitt, der von Elterngleis `parent_track` in Blickrichtung
    /// `forward` abgeht.
    pub fn next_section_from(&self, node: &TrackNode, parent_track: u32, forward: bool) -> Option<NextSection> {
        let link = node.default_section(parent_track, forward)?;
        let section = self.sections.get(&link.section)?;
        let track = section.section_track_at(link.forward, parent_track)?;
        Some(NextSection {
            section: link.section,
            track,
            forward: link.forward,
        })
    }

    /// Aktiver Abschnitt am lokalen Gleis `local` einer Referenz.
    pub fn next_section(&self, reference: &NodeRef, local: u32) -> Option<NextSection> {
        let node = self.nodes.get(&reference.node)?;
        let parent = reference.parent_track_index(local)?;
        self.next_section_from(node, parent, reference.forward)
    }

    // ── Räumliche Suche ─────────────────────────────────────────────

    fn rebuild_spatial_index(&mut self) {
        self.spatial_index = SpatialIndex::from_nodes(&self.nodes);
    }

    /// Nächster Node innerhalb von `range` (Ebene, Höhe ignoriert).
    pub fn find_closest_node(&self, point: Vec2, range: f32) -> Option<NodeId> {
        self.spatial_index
            .nearest(point)
            .filter(|hit| hit.distance <= range)
            .map(|hit| hit.node)
    }

    pub fn nodes_within(&self, point: Vec2, radius: f32) -> Vec<SpatialMatch> {
        self.spatial_index.within_radius(point, radius)
    }
}
