//! Gleisknoten: Ankerpunkt mit parallelen Gleisen und Weichenstellungen.
//!
//! Ein Node trägt Position/Richtung/Krümmung von Gleis 0. Weitere Gleise liegen
//! im Abstand `track_spacing` rechts davon. Pro (Gleis, Blickrichtung) können
//! bis zu [`MAX_DIVERGENCE`] Abschnitte anschließen; mehr als einer ergibt eine
//! Weiche, deren aktive Stellung über `default_index` gewählt wird.

use std::fmt;
use std::sync::Arc;

use glam::{Vec2, Vec3};
use indexmap::IndexSet;

use super::clothoid::parallel_curvature;
use super::scalar::left_normal;
use super::track_section::SectionId;
use super::track_spec::TrackSpec;

/// Maximale Anzahl Abschnitte, die von einem Gleis in eine Richtung abgehen.
pub const MAX_DIVERGENCE: usize = 2;

/// Stabile ID eines Nodes in der [`Railway`](super::Railway).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// Verweis auf ein Abschnittsende an einem Node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionLink {
    pub section: SectionId,
    /// `true`: der Abschnitt beginnt an diesem Node, `false`: er endet hier
    pub forward: bool,
}

/// Abgehende Abschnitte eines Gleises in einer Blickrichtung.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackDirectionInfo {
    sections: Vec<SectionLink>,
    default_index: usize,
}

impl TrackDirectionInfo {
    /// Platz für `section`: freier Slot oder bereits eingetragen.
    pub fn has_space_for(&self, section: SectionId) -> bool {
        self.sections.len() < MAX_DIVERGENCE || self.contains(section)
    }

    pub fn contains(&self, section: SectionId) -> bool {
        self.sections.iter().any(|link| link.section == section)
    }

    /// Trägt den Abschnitt ein. Bereits vorhandene Einträge zählen als Erfolg.
    fn add(&mut self, link: SectionLink) -> bool {
        if self.contains(link.section) {
            return true;
        }
        if self.sections.len() < MAX_DIVERGENCE {
            self.sections.push(link);
            return true;
        }
        false
    }

    fn remove(&mut self, section: SectionId) -> bool {
        let Some(index) = self.sections.iter().position(|l| l.section == section) else {
            return false;
        };
        self.sections.remove(index);
        if self.default_index > index || self.default_index >= self.sections.len() {
            self.default_index = self.default_index.saturating_sub(1);
        }
        true
    }

    pub fn sections(&self) -> &[SectionLink] {
        &self.sections
    }

    pub fn default_index(&self) -> usize {
        self.default_index
    }

    /// Aktuell gestellter Abschnitt.
    pub fn default_section(&self) -> Option<SectionLink> {
        self.sections.get(self.default_index).copied()
    }

    pub fn has_points(&self) -> bool {
        self.sections.len() > 1
    }

    /// Stellt die Weiche zyklisch auf den nächsten Abschnitt um.
    fn switch_points(&mut self) {
        let next = self.default_index + 1;
        self.default_index = if next >= self.sections.len() { 0 } else { next };
    }
}

/// Weichen-Slots eines Gleises, Index 0 = rückwärts, 1 = vorwärts.
#[derive(Debug, Clone, Default, PartialEq)]
struct TrackInfo {
    directions: [TrackDirectionInfo; 2],
}

fn direction_slot(forward: bool) -> usize {
    usize::from(forward)
}

/// Gleisknoten.
#[derive(Debug, Clone)]
pub struct TrackNode {
    pub id: NodeId,
    /// Position von Gleis 0
    position: Vec3,
    /// Richtung aller Gleise (rad CCW ab Osten)
    direction: f32,
    /// Krümmung von Gleis 0
    curvature: f32,
    spec: Arc<TrackSpec>,
    tracks: Vec<TrackInfo>,
    /// Alle angeschlossenen Abschnitte in Anschlussreihenfolge
    sections: IndexSet<SectionId>,
}

impl TrackNode {
    /// Erstellt einen Node mit einem Gleis im Ursprung.
    pub fn new(id: NodeId, spec: Arc<TrackSpec>) -> Self {
        Self {
            id,
            position: Vec3::ZERO,
            direction: 0.0,
            curvature: 0.0,
            spec,
            tracks: vec![TrackInfo::default()],
            sections: IndexSet::new(),
        }
    }

    /// Builder: setzt die Pose.
    pub fn with_pose(mut self, position: Vec3, direction: f32, curvature: f32) -> Self {
        self.position = position;
        self.direction = direction;
        self.curvature = curvature;
        self
    }

    /// Builder: setzt die Gleisanzahl (mindestens 1).
    pub fn with_num_tracks(mut self, num_tracks: u32) -> Self {
        self.tracks
            .resize_with(num_tracks.max(1) as usize, TrackInfo::default);
        self
    }

    // ── Referenzen ──────────────────────────────────────────────────

    /// Vorwärts blickende Referenz über alle Gleise.
    pub fn forward(&self) -> NodeRef {
        NodeRef::whole(self, true)
    }

    /// Rückwärts blickende Referenz über alle Gleise.
    pub fn backward(&self) -> NodeRef {
        NodeRef::whole(self, false)
    }

    /// Vorwärts-Referenz über `count` Gleise ab Elterngleis `first`.
    pub fn forward_range(&self, first: u32, count: u32) -> Option<NodeRef> {
        NodeRef::new(self, true, first, count)
    }

    /// Rückwärts-Referenz über `count` Gleise ab Elterngleis `first` (absteigend).
    pub fn backward_range(&self, first: u32, count: u32) -> Option<NodeRef> {
        NodeRef::new(self, false, first, count)
    }

    // ── Getter ──────────────────────────────────────────────────────

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn direction(&self) -> f32 {
        self.direction
    }

    /// Krümmung von Gleis 0.
    pub fn curvature(&self) -> f32 {
        self.curvature
    }

    pub fn num_tracks(&self) -> u32 {
        self.tracks.len() as u32
    }

    pub fn spec(&self) -> &TrackSpec {
        &self.spec
    }

    pub fn has_track(&self, track: u32) -> bool {
        (track as usize) < self.tracks.len()
    }

    // ── Mehrgleis-Geometrie ─────────────────────────────────────────

    /// Seitlicher Versatz eines Gleises relativ zu Gleis 0 (links positiv).
    pub fn track_offset(&self, track: u32) -> f32 {
        -(track as f32) * self.spec.track_spacing
    }

    /// Versatz der Mitte von `count` Gleisen ab `first`.
    pub fn midpoint_offset_of(&self, first: u32, count: u32) -> f32 {
        if count == 0 {
            return self.track_offset(first);
        }
        let last = first + count - 1;
        (self.track_offset(first) + self.track_offset(last)) * 0.5
    }

    /// Versatz der Mitte aller Gleise.
    pub fn midpoint_offset(&self) -> f32 {
        self.midpoint_offset_of(0, self.num_tracks())
    }

    fn lateral(&self, offset: f32) -> Vec3 {
        let normal: Vec2 = left_normal(self.direction);
        Vec3::new(normal.x * offset, normal.y * offset, 0.0)
    }

    /// Position eines Gleises.
    pub fn position_of_track(&self, track: u32) -> Vec3 {
        self.position + self.lateral(self.track_offset(track))
    }

    /// Krümmung eines Gleises als Parallelkurve zu Gleis 0.
    pub fn curvature_of_track(&self, track: u32) -> f32 {
        parallel_curvature(self.curvature, self.track_offset(track))
    }

    /// Mittelpunkt von `count` Gleisen ab `first`.
    pub fn midpoint_of(&self, first: u32, count: u32) -> Vec3 {
        self.position + self.lateral(self.midpoint_offset_of(first, count))
    }

    /// Mittelpunkt aller Gleise.
    pub fn midpoint(&self) -> Vec3 {
        self.midpoint_of(0, self.num_tracks())
    }

    // ── Setter (Benachrichtigung übernimmt die Railway) ────────────

    pub(crate) fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub(crate) fn set_direction(&mut self, direction: f32) {
        self.direction = direction;
    }

    pub(crate) fn set_curvature(&mut self, curvature: f32) {
        self.curvature = curvature;
    }

    /// Verschiebt den Node so, dass die Gleismitte auf `midpoint` liegt.
    pub(crate) fn set_midpoint(&mut self, midpoint: Vec3) {
        self.position = midpoint - self.lateral(self.midpoint_offset());
    }

    /// Ändert die Gleisanzahl. Entfernte Gleise dürfen keine Abschnitte tragen.
    pub(crate) fn set_num_tracks(&mut self, num_tracks: u32) -> bool {
        let num_tracks = num_tracks.max(1) as usize;
        let occupied = self.tracks.iter().skip(num_tracks).any(|info| {
            info.directions
                .iter()
                .any(|direction| !direction.sections.is_empty())
        });
        if occupied {
            return false;
        }
        self.tracks.resize_with(num_tracks, TrackInfo::default);
        true
    }

    // ── Abschnitte und Weichen ──────────────────────────────────────

    /// Schließt einen Abschnitt an die Elterngleise `[first, first + count)` an.
    ///
    /// Alles-oder-nichts: nur wenn jedes Gleis Platz hat oder den Abschnitt
    /// bereits kennt, wird überall eingetragen.
    pub(crate) fn add_track_section(
        &mut self,
        forward: bool,
        first: u32,
        count: u32,
        link: SectionLink,
    ) -> bool {
        let start = first as usize;
        let end = start + count as usize;
        if count == 0 || end > self.tracks.len() {
            return false;
        }
        let slot = direction_slot(forward);
        let fits = self.tracks[start..end]
            .iter()
            .all(|info| info.directions[slot].has_space_for(link.section));
        if !fits {
            log::debug!(
                "Node {}: kein Platz für Abschnitt {} auf Gleisen {}..{}",
                self.id,
                link.section,
                start,
                end
            );
            return false;
        }
        for info in &mut self.tracks[start..end] {
            info.directions[slot].add(link);
        }
        self.sections.insert(link.section);
        true
    }

    /// Entfernt einen Abschnitt aus allen Slots.
    pub(crate) fn remove_track_section(&mut self, section: SectionId) -> bool {
        let mut removed = false;
        for info in &mut self.tracks {
            for direction in &mut info.directions {
                removed |= direction.remove(section);
            }
        }
        self.sections.shift_remove(&section);
        removed
    }

    /// Slot-Info für (Gleis, Blickrichtung).
    pub fn direction_info(&self, track: u32, forward: bool) -> Option<&TrackDirectionInfo> {
        self.tracks
            .get(track as usize)
            .map(|info| &info.directions[direction_slot(forward)])
    }

    /// `true`, wenn mehr als ein Abschnitt abgeht (Weiche).
    pub fn has_points(&self, track: u32, forward: bool) -> bool {
        self.direction_info(track, forward)
            .is_some_and(TrackDirectionInfo::has_points)
    }

    /// Stellt die Weiche um. Gibt `false` zurück, wenn das Gleis nicht existiert.
    pub(crate) fn switch_points(&mut self, track: u32, forward: bool) -> bool {
        match self.tracks.get_mut(track as usize) {
            Some(info) => {
                info.directions[direction_slot(forward)].switch_points();
                true
            }
            None => false,
        }
    }

    /// Aktiver Abschnitt eines Gleises in Blickrichtung.
    pub fn default_section(&self, track: u32, forward: bool) -> Option<SectionLink> {
        self.direction_info(track, forward)
            .and_then(TrackDirectionInfo::default_section)
    }

    /// Alle angeschlossenen Abschnitte (jeder genau einmal).
    pub fn attached_sections(&self) -> impl Iterator<Item = SectionId> + '_ {
        self.sections.iter().copied()
    }

    pub fn is_attached(&self, section: SectionId) -> bool {
        self.sections.contains(&section)
    }
}

/// Blickrichtungsabhängige Sicht auf ein Gleisfenster eines Nodes.
///
/// Lokales Gleis 0 ist `first_track`; vorwärts zählen die lokalen Indizes
/// aufwärts, rückwärts abwärts. Rückwärts blickend dreht sich die Richtung
/// um π und Krümmung/Versatz wechseln das Vorzeichen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRef {
    pub node: NodeId,
    pub forward: bool,
    pub first_track: u32,
    pub num_tracks: u32,
}

impl NodeRef {
    /// Validierter Konstruktor, `None` wenn das Fenster nicht in den Node passt.
    pub fn new(node: &TrackNode, forward: bool, first_track: u32, num_tracks: u32) -> Option<Self> {
        if num_tracks == 0 || !node.has_track(first_track) {
            return None;
        }
        let span = num_tracks - 1;
        let last = if forward {
            first_track.checked_add(span)?
        } else {
            first_track.checked_sub(span)?
        };
        if !node.has_track(last) {
            return None;
        }
        Some(Self {
            node: node.id,
            forward,
            first_track,
            num_tracks,
        })
    }

    fn whole(node: &TrackNode, forward: bool) -> Self {
        let num_tracks = node.num_tracks();
        Self {
            node: node.id,
            forward,
            first_track: if forward { 0 } else { num_tracks - 1 },
            num_tracks,
        }
    }

    /// Teilfenster über `count` lokale Gleise ab lokalem Gleis `first`.
    pub fn subset(&self, first: u32, count: u32) -> Option<Self> {
        if count == 0 || first.checked_add(count)? > self.num_tracks {
            return None;
        }
        Some(Self {
            node: self.node,
            forward: self.forward,
            first_track: self.parent_track_index(first)?,
            num_tracks: count,
        })
    }

    /// Dieselben Gleise in entgegengesetzter Blickrichtung.
    pub fn reversed(&self) -> Self {
        let span = self.num_tracks.saturating_sub(1);
        Self {
            node: self.node,
            forward: !self.forward,
            first_track: if self.forward {
                self.first_track.saturating_add(span)
            } else {
                self.first_track.saturating_sub(span)
            },
            num_tracks: self.num_tracks,
        }
    }

    /// Elterngleis zu einem lokalen Gleis.
    pub fn parent_track_index(&self, local: u32) -> Option<u32> {
        if local >= self.num_tracks {
            return None;
        }
        if self.forward {
            self.first_track.checked_add(local)
        } else {
            self.first_track.checked_sub(local)
        }
    }

    /// Lokales Gleis zu einem Elterngleis.
    pub fn local_track_index(&self, parent: u32) -> Option<u32> {
        let local = if self.forward {
            parent.checked_sub(self.first_track)?
        } else {
            self.first_track.checked_sub(parent)?
        };
        (local < self.num_tracks).then_some(local)
    }

    /// Niedrigstes Elterngleis des Fensters.
    pub fn lowest_parent_track(&self) -> u32 {
        if self.forward {
            self.first_track
        } else {
            self.first_track
                .saturating_sub(self.num_tracks.saturating_sub(1))
        }
    }

    // ── Pose ────────────────────────────────────────────────────────

    pub fn direction(&self, node: &TrackNode) -> f32 {
        if self.forward {
            node.direction()
        } else {
            node.direction() + std::f32::consts::PI
        }
    }

    pub fn position(&self, node: &TrackNode, local: u32) -> Option<Vec3> {
        self.parent_track_index(local)
            .map(|parent| node.position_of_track(parent))
    }

    pub fn curvature(&self, node: &TrackNode, local: u32) -> Option<f32> {
        let curvature = node.curvature_of_track(self.parent_track_index(local)?);
        Some(if self.forward { curvature } else { -curvature })
    }

    pub fn track_offset(&self, node: &TrackNode, local: u32) -> Option<f32> {
        let offset = node.track_offset(self.parent_track_index(local)?);
        Some(if self.forward { offset } else { -offset })
    }

    /// Versatz der Fenstermitte in Blickrichtung.
    pub fn midpoint_offset(&self, node: &TrackNode) -> f32 {
        let offset = node.midpoint_offset_of(self.lowest_parent_track(), self.num_tracks);
        if self.forward {
            offset
        } else {
            -offset
        }
    }

    pub fn midpoint(&self, node: &TrackNode) -> Vec3 {
        node.midpoint_of(self.lowest_parent_track(), self.num_tracks)
    }

    /// Aktiver abgehender Abschnitt eines lokalen Gleises.
    pub fn default_link(&self, node: &TrackNode, local: u32) -> Option<SectionLink> {
        node.default_section(self.parent_track_index(local)?, self.forward)
    }

    pub fn has_points(&self, node: &TrackNode, local: u32) -> bool {
        self.parent_track_index(local)
            .is_some_and(|parent| node.has_points(parent, self.forward))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn node(num_tracks: u32) -> TrackNode {
        TrackNode::new(NodeId(1), Arc::new(TrackSpec::default())).with_num_tracks(num_tracks)
    }

    fn link(id: u64) -> SectionLink {
        SectionLink {
            section: SectionId(id),
            forward: true,
        }
    }

    #[test]
    fn capacity_is_all_or_nothing() {
        let mut n = node(2);
        assert!(n.add_track_section(true, 0, 1, link(1)));
        assert!(n.add_track_section(true, 0, 1, link(2)));
        // Gleis 1 frei, Gleis 0 voll: nichts darf eingetragen werden
        assert!(!n.add_track_section(true, 0, 2, link(3)));
        assert!(n.direction_info(1, true).expect("Gleis 1").sections().is_empty());
        assert!(!n.is_attached(SectionId(3)));

        let slot = n.direction_info(0, true).expect("Gleis 0");
        assert_eq!(slot.sections(), &[link(1), link(2)]);
    }

    #[test]
    fn re_adding_same_section_succeeds() {
        let mut n = node(1);
        assert!(n.add_track_section(false, 0, 1, link(1)));
        assert!(n.add_track_section(false, 0, 1, link(2)));
        assert!(n.add_track_section(false, 0, 1, link(2)));
        assert_eq!(n.direction_info(0, false).expect("Slot").sections().len(), 2);
    }

    #[test]
    fn switch_points_cycles() {
        let mut n = node(1);
        n.add_track_section(true, 0, 1, link(1));
        assert!(!n.has_points(0, true));
        n.add_track_section(true, 0, 1, link(2));
        assert!(n.has_points(0, true));
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(n.direction_info(0, true).expect("Slot").default_index());
            n.switch_points(0, true);
        }
        assert_eq!(seen, vec![0, 1, 0, 1]);
    }

    #[test]
    fn remove_section_keeps_default_valid() {
        let mut n = node(1);
        n.add_track_section(true, 0, 1, link(1));
        n.add_track_section(true, 0, 1, link(2));
        n.switch_points(0, true);
        assert!(n.remove_track_section(SectionId(2)));
        assert_eq!(n.default_section(0, true), Some(link(1)));
        assert!(!n.is_attached(SectionId(2)));
    }

    #[test]
    fn tracks_lie_to_the_right() {
        let n = node(3).with_pose(Vec3::new(10.0, 0.0, 2.0), 0.0, 0.0);
        let p = n.position_of_track(2);
        assert_abs_diff_eq!(p.x, 10.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.y, -2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.z, 2.0);
        assert_abs_diff_eq!(n.midpoint().y, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn outer_track_curvature_is_parallel() {
        let n = node(2).with_pose(Vec3::ZERO, 0.0, 0.1);
        // Gleis 1 liegt 1 m rechts, also außen in der Linkskurve
        assert_abs_diff_eq!(n.curvature_of_track(1), 1.0 / 11.0, epsilon = 1e-6);
    }

    #[test]
    fn set_midpoint_moves_track_zero() {
        let mut n = node(3).with_pose(Vec3::ZERO, std::f32::consts::FRAC_PI_2, 0.0);
        n.set_midpoint(Vec3::new(5.0, 5.0, 0.0));
        let mid = n.midpoint();
        assert_abs_diff_eq!(mid.x, 5.0, epsilon = 1e-5);
        assert_abs_diff_eq!(mid.y, 5.0, epsilon = 1e-5);
        // Blick nach Norden: rechts ist Osten, Gleis 0 liegt westlich der Mitte
        assert_abs_diff_eq!(n.position().x, 4.0, epsilon = 1e-5);
    }

    #[test]
    fn backward_reference_mirrors_pose() {
        let n = node(2).with_pose(Vec3::ZERO, 0.5, 0.02);
        let back = n.backward();
        assert_eq!(back.first_track, 1);
        assert_eq!(back.parent_track_index(0), Some(1));
        assert_eq!(back.parent_track_index(1), Some(0));
        assert_eq!(back.parent_track_index(2), None);
        assert_abs_diff_eq!(back.direction(&n), 0.5 + std::f32::consts::PI);
        assert_abs_diff_eq!(
            back.curvature(&n, 1).expect("Krümmung"),
            -0.02,
            epsilon = 1e-7
        );
        assert_abs_diff_eq!(back.track_offset(&n, 0).expect("Versatz"), 1.0);
    }

    #[test]
    fn reversed_reference_covers_same_tracks() {
        let n = node(4);
        let r = n.forward_range(1, 2).expect("Fenster");
        let rev = r.reversed();
        assert!(!rev.forward);
        assert_eq!(rev.first_track, 2);
        assert_eq!(rev.lowest_parent_track(), 1);
        assert_eq!(rev.reversed(), r);
        assert_eq!(rev.local_track_index(1), Some(1));
        assert_eq!(rev.local_track_index(3), None);
    }

    #[test]
    fn malformed_window_saturates_instead_of_underflowing() {
        let n = node(1);
        let malformed = NodeRef {
            node: n.id,
            forward: false,
            first_track: 0,
            num_tracks: 2,
        };
        assert_eq!(malformed.lowest_parent_track(), 0);
        assert_eq!(malformed.reversed().first_track, 0);
        assert_eq!(malformed.parent_track_index(1), None);
        assert!(NodeRef::new(&n, false, 0, 2).is_none());

        let far = NodeRef {
            first_track: u32::MAX,
            forward: true,
            ..malformed
        };
        assert_eq!(far.reversed().first_track, u32::MAX);
        assert_eq!(far.parent_track_index(1), None);
    }

    #[test]
    fn subset_and_range_validation() {
        let n = node(3);
        assert!(n.forward_range(2, 2).is_none());
        assert!(n.backward_range(0, 2).is_none());
        let back = n.backward();
        let sub = back.subset(1, 2).expect("Teilfenster");
        assert_eq!(sub.first_track, 1);
        assert_eq!(sub.parent_track_index(1), Some(0));
        assert!(back.subset(2, 2).is_none());
    }

    #[test]
    fn shrinking_occupied_tracks_is_refused() {
        let mut n = node(3);
        n.add_track_section(true, 2, 1, link(1));
        assert!(!n.set_num_tracks(2));
        assert_eq!(n.num_tracks(), 3);
        n.remove_track_section(SectionId(1));
        assert!(n.set_num_tracks(2));
        assert_eq!(n.num_tracks(), 2);
    }
}
