//! KD-Tree über die Node-Positionen (xy) für Näherungssuchen.

use std::collections::HashMap;

use glam::Vec2;
use kiddo::{KdTree, SquaredEuclidean};

use super::track_node::{NodeId, TrackNode};

/// Treffer einer Distanzabfrage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialMatch {
    pub node: NodeId,
    /// Euklidische Distanz in der Ebene
    pub distance: f32,
}

/// Read-only Index; wird nach jeder Node-Änderung neu aufgebaut.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    tree: KdTree<f64, 2>,
    node_ids: Vec<NodeId>,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::empty()
    }
}

impl SpatialIndex {
    pub fn empty() -> Self {
        Self {
            tree: (&Vec::<[f64; 2]>::new()).into(),
            node_ids: Vec::new(),
        }
    }

    /// Baut den Index aus allen Nodes; Reihenfolge nach ID für stabile Treffer.
    pub fn from_nodes(nodes: &HashMap<NodeId, TrackNode>) -> Self {
        let mut node_ids: Vec<NodeId> = nodes.keys().copied().collect();
        node_ids.sort_unstable();

        let entries: Vec<[f64; 2]> = node_ids
            .iter()
            .filter_map(|id| nodes.get(id))
            .map(|node| {
                let p = node.position();
                [f64::from(p.x), f64::from(p.y)]
            })
            .collect();

        Self {
            tree: (&entries).into(),
            node_ids,
        }
    }

    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    pub fn nearest(&self, query: Vec2) -> Option<SpatialMatch> {
        if self.is_empty() {
            return None;
        }
        let result = self
            .tree
            .nearest_one::<SquaredEuclidean>(&[f64::from(query.x), f64::from(query.y)]);
        let node = *self.node_ids.get(result.item as usize)?;
        Some(SpatialMatch {
            node,
            distance: (result.distance as f32).sqrt(),
        })
    }

    /// Alle Nodes im Radius, aufsteigend nach Distanz.
    pub fn within_radius(&self, query: Vec2, radius: f32) -> Vec<SpatialMatch> {
        if self.is_empty() || radius.is_sign_negative() {
            return Vec::new();
        }
        let radius_sq = f64::from(radius) * f64::from(radius);
        let mut matches: Vec<SpatialMatch> = self
            .tree
            .within::<SquaredEuclidean>(&[f64::from(query.x), f64::from(query.y)], radius_sq)
            .into_iter()
            .filter_map(|entry| {
                Some(SpatialMatch {
                    node: *self.node_ids.get(entry.item as usize)?,
                    distance: (entry.distance as f32).sqrt(),
                })
            })
            .collect();
        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::track_spec::TrackSpec;
    use glam::Vec3;
    use std::sync::Arc;

    fn sample_nodes() -> HashMap<NodeId, TrackNode> {
        let spec = Arc::new(TrackSpec::default());
        [(1, 0.0, 0.0), (2, 10.0, 0.0), (3, 4.0, 3.0)]
            .into_iter()
            .map(|(id, x, y)| {
                let node = TrackNode::new(NodeId(id), Arc::clone(&spec))
                    .with_pose(Vec3::new(x, y, 5.0), 0.0, 0.0);
                (NodeId(id), node)
            })
            .collect()
    }

    #[test]
    fn nearest_ignores_height() {
        let index = SpatialIndex::from_nodes(&sample_nodes());
        let hit = index.nearest(Vec2::new(3.9, 2.9)).expect("Treffer erwartet");
        assert_eq!(hit.node, NodeId(3));
        assert!(hit.distance < 0.2);
    }

    #[test]
    fn radius_query_is_sorted_by_distance() {
        let index = SpatialIndex::from_nodes(&sample_nodes());
        let ids: Vec<NodeId> = index
            .within_radius(Vec2::new(1.0, 1.0), 6.0)
            .into_iter()
            .map(|m| m.node)
            .collect();
        assert_eq!(ids, vec![NodeId(1), NodeId(3)]);
        assert!(index.within_radius(Vec2::ZERO, -1.0).is_empty());
    }

    #[test]
    fn empty_index_has_no_entries() {
        let index = SpatialIndex::empty();
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
        assert!(index.nearest(Vec2::ZERO).is_none());
    }
}
