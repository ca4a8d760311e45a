use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use rstar::RTree;
use rstar::primitives::GeomWithData;
use tracing::debug;

use crate::types::{Coordinate, NodeKey, RoadSegment};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentEdge {
    pub segment_id: u64,
    /// `distance + risk * risk_multiplier`
    pub weight: f64,
    pub distance: f64,
    pub risk: f64,
}

type SnapPoint = GeomWithData<[f64; 2], NodeIndex>;

/// Routing graph rebuilt from the segment set on every request.
pub struct NavigationGraph {
    pub graph: DiGraph<NodeKey, SegmentEdge>,
    index: HashMap<NodeKey, NodeIndex>,
    snap_tree: RTree<SnapPoint>,
}

impl NavigationGraph {
    pub fn build(segments: &[RoadSegment], risk_multiplier: f64) -> Self {
        let mut graph = DiGraph::new();
        let mut index: HashMap<NodeKey, NodeIndex> = HashMap::new();

        for seg in segments {
            let weight = seg.base_distance + seg.risk_score * risk_multiplier;
            let edge = SegmentEdge {
                segment_id: seg.id,
                weight,
                distance: seg.base_distance,
                risk: seg.risk_score,
            };

            let start_key = seg.start.key();
            let end_key = seg.end.key();
            let idx_a = *index
                .entry(start_key)
                .or_insert_with(|| graph.add_node(start_key));
            let idx_b = *index
                .entry(end_key)
                .or_insert_with(|| graph.add_node(end_key));

            graph.add_edge(idx_a, idx_b, edge);
            graph.add_edge(idx_b, idx_a, edge);
        }

        let snap_tree = RTree::bulk_load(
            graph
                .node_indices()
                .map(|idx| SnapPoint::new(graph[idx].to_pair(), idx))
                .collect(),
        );

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            risk_multiplier,
            "Navigation graph built"
        );

        Self {
            graph,
            index,
            snap_tree,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, key: NodeKey) -> Option<NodeIndex> {
        self.index.get(&key).copied()
    }

    pub fn key(&self, idx: NodeIndex) -> NodeKey {
        self.graph[idx]
    }

    /// Exact key when present, otherwise the nearest node by squared planar
    /// difference in degrees. With no nodes at all the key comes back
    /// unchanged.
    ///
    /// Planar degrees are only a fair proxy for distance over a small area;
    /// wide-area networks would need a geodesic metric here.
    pub fn nearest_key(&self, key: NodeKey) -> NodeKey {
        if self.index.contains_key(&key) {
            return key;
        }
        match self.snap_tree.nearest_neighbor(&key.to_pair()) {
            Some(hit) => self.graph[hit.data],
            None => key,
        }
    }

    pub fn resolve(&self, coord: Coordinate) -> Option<NodeIndex> {
        self.node(self.nearest_key(coord.key()))
    }
}
