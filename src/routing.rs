//! Risk-weighted evacuation routing.
//!
//! Edge cost is `base_distance + risk_score * risk_multiplier`. A larger
//! multiplier makes the router accept longer detours to avoid risky roads.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::RouteError;
use crate::graph::NavigationGraph;
use crate::types::{Coordinate, EvacuationCenter, NodeKey, RoadSegment};

pub const DEFAULT_RISK_MULTIPLIER: f64 = 500.0;
pub const DEFAULT_ROUTE_COUNT: usize = 3;

/// Accumulated risk below this is Green.
pub const GREEN_CEILING: f64 = 0.3;
/// Accumulated risk below this (and at least [`GREEN_CEILING`]) is Yellow.
pub const YELLOW_CEILING: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Green,
    Yellow,
    Red,
}

impl RiskLevel {
    pub fn classify(total_risk: f64) -> Self {
        if total_risk < GREEN_CEILING {
            RiskLevel::Green
        } else if total_risk < YELLOW_CEILING {
            RiskLevel::Yellow
        } else {
            RiskLevel::Red
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Green => "Green",
            RiskLevel::Yellow => "Yellow",
            RiskLevel::Red => "Red",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteCandidate {
    pub path_keys: Vec<NodeKey>,
    /// `[lat, lng]` per node.
    pub path: Vec<[f64; 2]>,
    pub total_distance: f64,
    pub total_risk: f64,
    pub weight: f64,
    pub risk_level: RiskLevel,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub alternative: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvacuationPlan {
    pub evacuation_center_id: u64,
    pub evacuation_center_name: String,
    pub routes: Vec<RouteCandidate>,
}

impl EvacuationPlan {
    /// Log entry for the route a resident would follow, the first one.
    pub fn route_log(&self) -> Option<RouteLog> {
        self.routes.first().map(|route| RouteLog {
            evacuation_center_id: self.evacuation_center_id,
            selected_route_risk: route.total_risk,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteLog {
    pub evacuation_center_id: u64,
    pub selected_route_risk: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Label {
    weight: f64,
    distance: f64,
    risk: f64,
}

/// Frontier entry. Lowest weight pops first; equal weights pop in ascending
/// node key order.
#[derive(Debug, Clone, Copy)]
struct MinScored {
    weight: f64,
    key: NodeKey,
    node: NodeIndex,
}

impl PartialEq for MinScored {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MinScored {}

impl PartialOrd for MinScored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MinScored {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .weight
            .total_cmp(&self.weight)
            .then_with(|| other.key.cmp(&self.key))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RouteEngine {
    risk_multiplier: f64,
}

impl Default for RouteEngine {
    fn default() -> Self {
        Self {
            risk_multiplier: DEFAULT_RISK_MULTIPLIER,
        }
    }
}

impl RouteEngine {
    /// The multiplier must be finite and non-negative. A negative one gives
    /// negative-weight cycles on the bidirectional graph.
    pub fn new(risk_multiplier: f64) -> Result<Self, RouteError> {
        if !risk_multiplier.is_finite() || risk_multiplier < 0.0 {
            return Err(RouteError::InvalidRiskMultiplier(risk_multiplier));
        }
        Ok(Self { risk_multiplier })
    }

    pub fn risk_multiplier(&self) -> f64 {
        self.risk_multiplier
    }

    pub fn build_graph(&self, segments: &[RoadSegment]) -> NavigationGraph {
        NavigationGraph::build(segments, self.risk_multiplier)
    }

    /// Up to `k` candidate routes from `start` to `destination`.
    ///
    /// Only the first entry is a searched path. The remaining `k - 1` entries
    /// repeat it with `alternative` set; genuine alternate paths are not
    /// computed yet.
    pub fn safest_routes(
        &self,
        segments: &[RoadSegment],
        start: Coordinate,
        destination: Coordinate,
        k: usize,
    ) -> Vec<RouteCandidate> {
        if k == 0 {
            return Vec::new();
        }
        match self.best_route(segments, start, destination) {
            Ok(best) => with_alternatives(best, k),
            Err(err) => {
                debug!(error = %err, "No route found");
                Vec::new()
            }
        }
    }

    /// The minimum-weight route after snapping both endpoints to the graph.
    pub fn best_route(
        &self,
        segments: &[RoadSegment],
        start: Coordinate,
        destination: Coordinate,
    ) -> Result<RouteCandidate, RouteError> {
        let graph = self.build_graph(segments);
        if graph.is_empty() {
            return Err(RouteError::EmptyNetwork);
        }
        let start_key = graph.nearest_key(start.key());
        let goal_key = graph.nearest_key(destination.key());
        self.shortest_path(&graph, start_key, goal_key)
    }

    /// Dijkstra from `start` that stops as soon as `goal` is settled.
    pub fn shortest_path(
        &self,
        graph: &NavigationGraph,
        start: NodeKey,
        goal: NodeKey,
    ) -> Result<RouteCandidate, RouteError> {
        let start_idx = graph.node(start).ok_or(RouteError::UnknownNode(start))?;
        let goal_idx = graph.node(goal).ok_or(RouteError::UnknownNode(goal))?;

        let mut labels: HashMap<NodeIndex, Label> = HashMap::new();
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut frontier = BinaryHeap::new();

        labels.insert(start_idx, Label::default());
        frontier.push(MinScored {
            weight: 0.0,
            key: start,
            node: start_idx,
        });

        while let Some(MinScored { weight, node, .. }) = frontier.pop() {
            let label = labels[&node];
            if weight > label.weight {
                continue;
            }

            if node == goal_idx {
                let mut nodes = vec![node];
                let mut cur = node;
                while let Some(&prev) = parent.get(&cur) {
                    nodes.push(prev);
                    cur = prev;
                }
                nodes.reverse();

                let path_keys: Vec<NodeKey> = nodes.iter().map(|&n| graph.key(n)).collect();
                return Ok(RouteCandidate {
                    path: path_keys.iter().map(NodeKey::to_pair).collect(),
                    path_keys,
                    total_distance: label.distance,
                    total_risk: label.risk,
                    weight: label.weight,
                    risk_level: RiskLevel::classify(label.risk),
                    alternative: false,
                });
            }

            for edge in graph.graph.edges(node) {
                let next = edge.target();
                let e = edge.weight();
                // Negative or NaN weights would loop forever on the two-way edges.
                if e.weight.is_nan() || e.weight < 0.0 {
                    continue;
                }
                let candidate = label.weight + e.weight;
                let improves = labels.get(&next).is_none_or(|l| candidate < l.weight);
                if improves {
                    labels.insert(
                        next,
                        Label {
                            weight: candidate,
                            distance: label.distance + e.distance,
                            risk: label.risk + e.risk,
                        },
                    );
                    parent.insert(next, node);
                    frontier.push(MinScored {
                        weight: candidate,
                        key: graph.key(next),
                        node: next,
                    });
                }
            }
        }

        Err(RouteError::NoPath {
            start,
            destination: goal,
        })
    }

    /// Routes from `start` to the evacuation center with id `center_id`.
    pub fn plan_evacuation(
        &self,
        segments: &[RoadSegment],
        start: Coordinate,
        centers: &[EvacuationCenter],
        center_id: u64,
        k: usize,
    ) -> Result<EvacuationPlan, RouteError> {
        let center = centers
            .iter()
            .find(|c| c.id == center_id)
            .ok_or(RouteError::UnknownDestination(center_id))?;

        let routes = self.safest_routes(segments, start, center.location, k);
        info!(
            center = center.id,
            segments = segments.len(),
            routes = routes.len(),
            "Evacuation routes computed"
        );

        Ok(EvacuationPlan {
            evacuation_center_id: center.id,
            evacuation_center_name: center.name.clone(),
            routes,
        })
    }
}

fn with_alternatives(best: RouteCandidate, k: usize) -> Vec<RouteCandidate> {
    let mut routes = Vec::with_capacity(k);
    for _ in 1..k {
        routes.push(RouteCandidate {
            alternative: true,
            ..best.clone()
        });
    }
    routes.insert(0, best);
    routes
}
