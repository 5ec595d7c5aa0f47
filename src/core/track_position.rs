//! Position auf dem Gleisnetz, die sich über Abschnittsgrenzen bewegen lässt.
//!
//! Ein `TrackPosition` ist ein reiner Wert (Abschnitt, Blickrichtung, Gleis,
//! Distanz) und hält keine Referenz auf die [`Railway`]. Alle Operationen, die
//! das Netz brauchen, bekommen es als Parameter. Kann eine Bewegung nicht
//! fortgesetzt werden, bleibt die Position am letzten gültigen Punkt stehen.

use std::collections::HashSet;

use glam::Vec3;

use super::railway::Railway;
use super::scalar::wrap_positive;
use super::track_node::NodeId;
use super::track_section::SectionId;

/// Ergebnis einer Vorausschau entlang der Gleise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lookahead {
    /// Zurückgelegte Strecke bis zum Halt
    pub distance: f32,
    /// Node, an dem die Suche hielt; `None` bei erreichter Maximaldistanz
    pub node: Option<NodeId>,
}

/// Abschnittsgrenze in einer Bewegungsrichtung.
#[derive(Debug, Clone, Copy)]
struct Boundary {
    node: NodeId,
    parent_track: u32,
    /// Blickrichtung des Slots, der in den aktuellen Abschnitt zeigt
    inward: bool,
}

/// Länge eines befahrbaren Abschnittsgleises; ungelöste oder leere Abschnitte
/// sind Hindernisse.
fn passable_length(railway: &Railway, section: SectionId, track: u32) -> Option<f32> {
    railway
        .section(section)?
        .length(track)
        .filter(|length| *length > 0.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPosition {
    section: Option<SectionId>,
    /// Blickrichtung relativ zur Abschnittsrichtung
    forward: bool,
    /// Abschnittsgleis
    track: u32,
    /// Distanz ab Abschnittsanfang entlang des Gleises
    distance: f32,
}

impl Default for TrackPosition {
    fn default() -> Self {
        Self::null()
    }
}

impl TrackPosition {
    /// Ungültige Position ohne Abschnitt.
    pub fn null() -> Self {
        Self {
            section: None,
            forward: true,
            track: 0,
            distance: 0.0,
        }
    }

    pub fn on_section(section: SectionId, forward: bool, track: u32, distance: f32) -> Self {
        Self {
            section: Some(section),
            forward,
            track,
            distance,
        }
    }

    /// Position am Node `node` auf Elterngleis `track`, siehe [`Self::set_node`].
    pub fn at_node(railway: &Railway, node: NodeId, forward: bool, track: u32) -> Self {
        let mut position = Self::null();
        position.set_node(railway, node, forward, track);
        position
    }

    /// Setzt die Position auf den aktiven Abschnitt, der vom Node abgeht.
    ///
    /// Gibt es in Blickrichtung keinen Abschnitt, wird der in Gegenrichtung
    /// genommen und die Blickrichtung bleibt trotzdem `forward`. Ohne
    /// Abschnitt wird die Position ungültig.
    pub fn set_node(&mut self, railway: &Railway, node: NodeId, forward: bool, track: u32) {
        *self = Self::null();
        let Some(track_node) = railway.node(node) else {
            return;
        };

        let (next, flip) = match railway.next_section_from(track_node, track, forward) {
            Some(next) => (next, false),
            None => match railway.next_section_from(track_node, track, !forward) {
                Some(next) => (next, true),
                None => return,
            },
        };
        let Some(length) = passable_length(railway, next.section, next.track) else {
            return;
        };

        self.section = Some(next.section);
        self.track = next.track;
        self.distance = if next.forward { 0.0 } else { length };
        self.forward = next.forward != flip;
    }

    pub fn set_section(&mut self, section: SectionId, forward: bool, track: u32, distance: f32) {
        *self = Self::on_section(section, forward, track, distance);
    }

    pub fn is_valid(&self) -> bool {
        self.section.is_some()
    }

    pub fn section(&self) -> Option<SectionId> {
        self.section
    }

    pub fn is_forward(&self) -> bool {
        self.forward
    }

    pub fn track(&self) -> u32 {
        self.track
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn turn_around(&mut self) {
        self.forward = !self.forward;
    }

    // ── Geometrie ───────────────────────────────────────────────────

    pub fn position(&self, railway: &Railway) -> Option<Vec3> {
        railway
            .section(self.section?)?
            .position(self.track, self.distance)
    }

    /// Blickrichtung in Weltkoordinaten, in `[0, 2π)`.
    pub fn direction(&self, railway: &Railway) -> Option<f32> {
        let direction = railway
            .section(self.section?)?
            .direction(self.track, self.distance)?;
        Some(if self.forward {
            wrap_positive(direction)
        } else {
            wrap_positive(direction + std::f32::consts::PI)
        })
    }

    // ── Bewegung ────────────────────────────────────────────────────

    /// Restdistanz bis zur Abschnittsgrenze in Blick- oder Gegenrichtung.
    pub fn distance_to_section(&self, railway: &Railway, look_forward: bool) -> f32 {
        let Some(section) = self.section.and_then(|id| railway.section(id)) else {
            return 0.0;
        };
        if look_forward == self.forward {
            section.length(self.track).unwrap_or(0.0) - self.distance
        } else {
            self.distance
        }
    }

    fn boundary(&self, railway: &Railway, look_forward: bool) -> Option<Boundary> {
        let section = railway.section(self.section?)?;
        if look_forward == self.forward {
            Some(Boundary {
                node: section.end_node(),
                parent_track: section.parent_track_at(false, self.track)?,
                inward: section.end().forward,
            })
        } else {
            Some(Boundary {
                node: section.start_node(),
                parent_track: section.parent_track_at(true, self.track)?,
                inward: section.start().forward,
            })
        }
    }

    /// `true`, wenn die Weiche an der Grenze auf den aktuellen Abschnitt steht.
    fn points_set_here(&self, railway: &Railway, boundary: &Boundary) -> bool {
        railway
            .node(boundary.node)
            .and_then(|node| node.default_section(boundary.parent_track, boundary.inward))
            .is_some_and(|link| Some(link.section) == self.section)
    }

    /// Wechselt auf den nächsten Abschnitt. Bei falsch gestellter Weiche oder
    /// Gleisende bleibt die Position unverändert und es wird `false` geliefert.
    pub fn advance_next_section(&mut self, railway: &Railway, look_forward: bool) -> bool {
        let Some(boundary) = self.boundary(railway, look_forward) else {
            return false;
        };
        if !self.points_set_here(railway, &boundary) {
            return false;
        }
        let Some(node) = railway.node(boundary.node) else {
            return false;
        };
        let Some(next) = railway.next_section_from(node, boundary.parent_track, !boundary.inward)
        else {
            return false;
        };
        let Some(length) = passable_length(railway, next.section, next.track) else {
            return false;
        };

        self.section = Some(next.section);
        self.track = next.track;
        self.forward = next.forward == look_forward;
        self.distance = if next.forward { 0.0 } else { length };
        true
    }

    /// Position nach einer Bewegung um `distance` (negativ = rückwärts).
    ///
    /// Blockiert eine Grenze, endet die Bewegung dort; der Rest verfällt.
    pub fn moved(&self, railway: &Railway, distance: f32) -> Self {
        let mut result = *self;
        if distance == 0.0 || !distance.is_finite() || !self.is_valid() {
            return result;
        }

        let look_forward = distance > 0.0;
        let mut remaining = distance.abs();
        while remaining > 0.0 {
            let to_next = result.distance_to_section(railway, look_forward);
            if remaining < to_next {
                if result.forward == look_forward {
                    result.distance += remaining;
                } else {
                    result.distance -= remaining;
                }
                break;
            }
            result.snap_to_boundary(railway, look_forward);
            if !result.advance_next_section(railway, look_forward) {
                return result;
            }
            remaining -= to_next;
        }
        result
    }

    /// Setzt die Distanz exakt auf die Abschnittsgrenze in Bewegungsrichtung.
    fn snap_to_boundary(&mut self, railway: &Railway, look_forward: bool) {
        self.distance = if look_forward == self.forward {
            self.section
                .and_then(|id| railway.section(id))
                .and_then(|section| section.length(self.track))
                .unwrap_or(self.distance)
        } else {
            0.0
        };
    }

    /// Bewegt die Position in place, siehe [`Self::moved`].
    pub fn advance(&mut self, railway: &Railway, distance: f32) {
        *self = self.moved(railway, distance);
    }

    /// `true` an einer Grenze, hinter der es nicht weitergeht.
    pub fn at_end(&self, railway: &Railway, look_forward: bool) -> bool {
        if self.distance_to_section(railway, look_forward) > 0.0 {
            return false;
        }
        let mut probe = *self;
        !probe.advance_next_section(railway, look_forward)
    }

    // ── Vorausschau ─────────────────────────────────────────────────

    /// Distanz bis zur nächsten Weiche (spitz oder stumpf befahren) oder zum Ende.
    pub fn distance_to_points(&self, railway: &Railway, look_forward: bool, max_distance: Option<f32>) -> Lookahead {
        self.walk(railway, look_forward, max_distance, true)
    }

    /// Distanz bis zum Gleisende oder einer falsch gestellten Weiche.
    pub fn distance_to_end(&self, railway: &Railway, look_forward: bool, max_distance: Option<f32>) -> Lookahead {
        self.walk(railway, look_forward, max_distance, false)
    }

    fn walk(&self, railway: &Railway, look_forward: bool, max_distance: Option<f32>, stop_at_points: bool) -> Lookahead {
        if !self.is_valid() {
            return Lookahead {
                distance: 0.0,
                node: None,
            };
        }

        let mut cursor = *self;
        let mut travelled = 0.0;
        let mut visited = HashSet::new();
        loop {
            travelled += cursor.distance_to_section(railway, look_forward);
            if let Some(max) = max_distance {
                if travelled >= max {
                    return Lookahead {
                        distance: max,
                        node: None,
                    };
                }
            }
            let Some(boundary) = cursor.boundary(railway, look_forward) else {
                return Lookahead {
                    distance: travelled,
                    node: None,
                };
            };
            let stop_here = stop_at_points
                && railway.node(boundary.node).is_some_and(|node| {
                    node.has_points(boundary.parent_track, boundary.inward)
                        || node.has_points(boundary.parent_track, !boundary.inward)
                });
            if stop_here || !cursor.advance_next_section(railway, look_forward) {
                return Lookahead {
                    distance: travelled,
                    node: Some(boundary.node),
                };
            }
            // Geschlossene Schleife ohne Halt
            if !visited.insert((cursor.section, cursor.track, cursor.forward)) {
                return Lookahead {
                    distance: f32::INFINITY,
                    node: None,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::track_node::NodeRef;
    use approx::assert_abs_diff_eq;

    /// Drei Nodes in einer Reihe: A --100-- B --50-- C, alle nach Osten.
    fn line() -> (Railway, [NodeId; 3], [SectionId; 2]) {
        let mut railway = Railway::default();
        let a = railway.add_node(Vec3::ZERO, 0.0, 0.0, 1);
        let b = railway.add_node(Vec3::new(100.0, 0.0, 0.0), 0.0, 0.0, 1);
        let c = railway.add_node(Vec3::new(150.0, 0.0, 10.0), 0.0, 0.0, 1);
        let ab = connect(&mut railway, a, true, b, false);
        let bc = connect(&mut railway, b, true, c, false);
        (railway, [a, b, c], [ab, bc])
    }

    fn reference(railway: &Railway, node: NodeId, forward: bool) -> NodeRef {
        let node = railway.node(node).expect("Node erwartet");
        if forward {
            node.forward()
        } else {
            node.backward()
        }
    }

    fn connect(railway: &mut Railway, from: NodeId, from_forward: bool, to: NodeId, to_forward: bool) -> SectionId {
        let start = reference(railway, from, from_forward);
        let end = reference(railway, to, to_forward);
        railway.add_section(start, end).expect("Abschnitt erwartet")
    }

    #[test]
    fn null_position_is_invalid() {
        let (railway, _, _) = line();
        let position = TrackPosition::default();
        assert!(!position.is_valid());
        assert_eq!(position.position(&railway), None);
        assert_eq!(position.moved(&railway, 10.0), position);
        assert_eq!(position.distance_to_section(&railway, true), 0.0);
    }

    #[test]
    fn set_node_uses_default_section() {
        let (railway, [a, b, _], [ab, bc]) = line();

        let at_a = TrackPosition::at_node(&railway, a, true, 0);
        assert_eq!(at_a.section(), Some(ab));
        assert!(at_a.is_forward());
        assert_eq!(at_a.distance(), 0.0);

        let at_b = TrackPosition::at_node(&railway, b, false, 0);
        assert_eq!(at_b.section(), Some(ab));
        assert!(!at_b.is_forward());
        assert_abs_diff_eq!(at_b.distance(), 100.0, epsilon = 1e-3);

        let b_forward = TrackPosition::at_node(&railway, b, true, 0);
        assert_eq!(b_forward.section(), Some(bc));
    }

    #[test]
    fn set_node_falls_back_to_opposite_direction() {
        let (railway, [a, _, c], [ab, bc]) = line();

        // Nach Westen gibt es an A nichts, also der Abschnitt nach Osten
        let at_a = TrackPosition::at_node(&railway, a, false, 0);
        assert_eq!(at_a.section(), Some(ab));
        assert!(!at_a.is_forward());
        assert_eq!(at_a.distance(), 0.0);

        let at_c = TrackPosition::at_node(&railway, c, true, 0);
        assert_eq!(at_c.section(), Some(bc));
        assert!(at_c.is_forward());
        assert!(at_c.at_end(&railway, true));

        assert!(!TrackPosition::at_node(&railway, NodeId(77), true, 0).is_valid());
        assert!(!TrackPosition::at_node(&railway, a, true, 5).is_valid());
    }

    #[test]
    fn moving_crosses_sections() {
        let (railway, [a, _, _], [_, bc]) = line();
        let start = TrackPosition::at_node(&railway, a, true, 0);

        let moved = start.moved(&railway, 120.0);
        assert_eq!(moved.section(), Some(bc));
        assert_abs_diff_eq!(moved.distance(), 20.0, epsilon = 1e-3);
        let p = moved.position(&railway).expect("Position");
        assert_abs_diff_eq!(p.x, 120.0, epsilon = 1e-3);
        assert_abs_diff_eq!(p.z, 4.0, epsilon = 1e-4);

        let back = moved.moved(&railway, -120.0);
        assert_abs_diff_eq!(back.distance(), 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(
            back.position(&railway).expect("Position").x,
            0.0,
            epsilon = 1e-3
        );
    }

    #[test]
    fn round_trip_inside_section() {
        let (railway, [a, _, _], _) = line();
        let inside = TrackPosition::at_node(&railway, a, true, 0).moved(&railway, 40.0);
        for d in [-39.0, -5.5, 0.25, 30.0, 59.0] {
            let there = inside.moved(&railway, d);
            let back = there.moved(&railway, -d);
            assert_eq!(back.section(), inside.section());
            assert_abs_diff_eq!(back.distance(), inside.distance(), epsilon = 1e-4);
        }
    }

    #[test]
    fn move_stops_at_dead_end() {
        let (railway, [a, _, _], [_, bc]) = line();
        let start = TrackPosition::at_node(&railway, a, true, 0);

        let end = start.moved(&railway, 1000.0);
        assert!(end.is_valid());
        assert_eq!(end.section(), Some(bc));
        assert_abs_diff_eq!(end.distance(), 50.0, epsilon = 1e-3);
        assert!(end.at_end(&railway, true));
        assert!(!end.at_end(&railway, false));

        let behind = start.moved(&railway, -10.0);
        assert_eq!(behind, start);
    }

    #[test]
    fn backward_facing_position_moves_against_section() {
        let (railway, [_, b, _], [ab, _]) = line();
        let mut position = TrackPosition::at_node(&railway, b, false, 0);
        position.advance(&railway, 30.0);
        assert_eq!(position.section(), Some(ab));
        assert_abs_diff_eq!(position.distance(), 70.0, epsilon = 1e-3);
        let direction = position.direction(&railway).expect("Richtung");
        assert_abs_diff_eq!(direction, std::f32::consts::PI, epsilon = 1e-4);

        position.turn_around();
        position.advance(&railway, 40.0);
        assert_abs_diff_eq!(position.distance(), 10.0, epsilon = 1e-3);
        assert_eq!(position.section().map(|s| s.0), Some(2));
    }

    #[test]
    fn points_block_trailing_move() {
        let mut railway = Railway::default();
        let a = railway.add_node(Vec3::ZERO, 0.0, 0.0, 1);
        let b = railway.add_node(Vec3::new(100.0, 0.0, 0.0), 0.0, 0.0, 1);
        let c = railway.add_node(Vec3::new(200.0, 0.0, 0.0), 0.0, 0.0, 1);
        let d = railway.add_node(Vec3::new(200.0, -30.0, 0.0), -0.4, 0.0, 1);
        let ab = connect(&mut railway, a, true, b, false);
        let bc = connect(&mut railway, b, true, c, false);
        let bd = connect(&mut railway, b, true, d, false);

        // Von D kommend über die Weiche in B, die auf C steht
        let from_d = TrackPosition::at_node(&railway, d, false, 0);
        assert_eq!(from_d.section(), Some(bd));
        let before = from_d.moved(&railway, 1.0);
        let mut probe = before;
        assert!(!probe.advance_next_section(&railway, true));
        assert_eq!(probe, before);

        let blocked = before.moved(&railway, 1000.0);
        assert_eq!(blocked.section(), Some(bd));
        assert!(blocked.at_end(&railway, true));

        railway.switch_points(b, 0, true);
        let through = before.moved(&railway, 1000.0);
        assert_eq!(through.section(), Some(ab));
        assert!(through.at_end(&railway, true));
        assert_ne!(through.section(), Some(bc));
    }

    #[test]
    fn lookahead_finds_points_and_end() {
        let mut railway = Railway::default();
        let a = railway.add_node(Vec3::ZERO, 0.0, 0.0, 1);
        let b = railway.add_node(Vec3::new(100.0, 0.0, 0.0), 0.0, 0.0, 1);
        let c = railway.add_node(Vec3::new(200.0, 0.0, 0.0), 0.0, 0.0, 1);
        let d = railway.add_node(Vec3::new(200.0, -30.0, 0.0), -0.4, 0.0, 1);
        connect(&mut railway, a, true, b, false);
        connect(&mut railway, b, true, c, false);
        connect(&mut railway, b, true, d, false);

        let start = TrackPosition::at_node(&railway, a, true, 0).moved(&railway, 10.0);
        let points = start.distance_to_points(&railway, true, None);
        assert_eq!(points.node, Some(b));
        assert_abs_diff_eq!(points.distance, 90.0, epsilon = 1e-3);

        let end = start.distance_to_end(&railway, true, None);
        assert_eq!(end.node, Some(c));
        assert_abs_diff_eq!(end.distance, 190.0, epsilon = 1e-2);

        let capped = start.distance_to_end(&railway, true, Some(50.0));
        assert_eq!(capped.node, None);
        assert_eq!(capped.distance, 50.0);

        let behind = start.distance_to_end(&railway, false, None);
        assert_eq!(behind.node, Some(a));
        assert_abs_diff_eq!(behind.distance, 10.0, epsilon = 1e-3);
    }
}
