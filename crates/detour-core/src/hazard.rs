//! Hazard cost modulation.
//!
//! Active hazard reports never touch persisted edges. Each request builds an
//! [`EdgeCostMap`] from the loaded subgraph, then [`apply_hazards`] scales the
//! entries of edges near each report. The map is dropped with the request.

use std::collections::{HashMap, HashSet};
use std::future::Future;

use crate::models::{BoundingBox, EdgeId, GraphEdge, GraphNode, Hazard, NodeId};
use crate::spatial::{bbox_around, distance_to_segment_m, haversine_distance};

/// Radius around a report within which road segments are penalized.
pub const DEFAULT_HAZARD_RADIUS_M: f64 = 50.0;

/// Source of unresolved hazard reports.
pub trait HazardSource: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reports that are not resolved and have coordinates inside `bbox`.
    fn list_active_hazards_near(
        &self,
        bbox: &BoundingBox,
    ) -> impl Future<Output = Result<Vec<Hazard>, Self::Error>> + Send;
}

/// Cost multiplier contributed by a single report: `1 + severity * 2`.
///
/// Missing or non-positive severities count as 1.
pub fn severity_multiplier(severity: Option<i64>) -> f64 {
    let severity = severity.filter(|value| *value > 0).unwrap_or(1);
    1.0 + severity as f64 * 2.0
}

/// Request-scoped effective penalty per edge.
#[derive(Debug, Clone, Default)]
pub struct EdgeCostMap {
    penalties: HashMap<EdgeId, f64>,
}

impl EdgeCostMap {
    /// Seed the map with each edge's persisted penalty.
    ///
    /// A zero, negative or non-finite stored penalty is read as 1.0.
    pub fn from_edges(edges: &[GraphEdge]) -> Self {
        let penalties = edges
            .iter()
            .map(|edge| {
                let penalty = if edge.penalty.is_finite() && edge.penalty > 0.0 {
                    edge.penalty
                } else {
                    1.0
                };
                (edge.id, penalty)
            })
            .collect();
        Self { penalties }
    }

    /// Effective penalty of an edge; unknown edges are neutral.
    pub fn penalty(&self, edge_id: EdgeId) -> f64 {
        self.penalties.get(&edge_id).copied().unwrap_or(1.0)
    }

    pub fn scale(&mut self, edge_id: EdgeId, factor: f64) {
        let entry = self.penalties.entry(edge_id).or_insert(1.0);
        *entry *= factor;
    }

    /// Smallest effective penalty in the map, 1.0 when empty.
    pub fn min_penalty(&self) -> f64 {
        self.penalties
            .values()
            .copied()
            .fold(None, |acc: Option<f64>, value| {
                Some(acc.map_or(value, |current| current.min(value)))
            })
            .unwrap_or(1.0)
    }

    pub fn len(&self) -> usize {
        self.penalties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.penalties.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HazardImpact {
    pub hazards_applied: usize,
    /// Distinct edges whose penalty was scaled at least once.
    pub edges_penalized: usize,
}

/// Scale the penalty of every edge near each hazard.
///
/// An edge is near a hazard when its start or end node lies within
/// `radius_m`, or when the segment itself passes within `radius_m` (long
/// segments whose endpoints are both far from a mid-block report). Each
/// hazard scales an edge at most once; overlapping hazards compound.
pub fn apply_hazards(
    nodes: &[GraphNode],
    edges: &[GraphEdge],
    hazards: &[Hazard],
    radius_m: f64,
    costs: &mut EdgeCostMap,
) -> HazardImpact {
    let positions: HashMap<NodeId, &GraphNode> = nodes.iter().map(|node| (node.id, node)).collect();
    let mut penalized: HashSet<EdgeId> = HashSet::new();
    let mut impact = HazardImpact::default();

    for hazard in hazards {
        if !hazard.lat.is_finite() || !hazard.lng.is_finite() {
            continue;
        }
        let window = bbox_around(hazard.lat, hazard.lng, radius_m);
        let nearby: HashSet<NodeId> = nodes
            .iter()
            .filter(|node| window.contains(node.lat, node.lng))
            .filter(|node| haversine_distance(hazard.lat, hazard.lng, node.lat, node.lng) <= radius_m)
            .map(|node| node.id)
            .collect();

        let multiplier = severity_multiplier(hazard.severity);
        let mut touched_any = false;

        for edge in edges {
            let touches_node =
                nearby.contains(&edge.start_node_id) || nearby.contains(&edge.end_node_id);
            let touches = touches_node
                || segment_near(&positions, edge, hazard, &window, radius_m);
            if touches {
                costs.scale(edge.id, multiplier);
                penalized.insert(edge.id);
                touched_any = true;
            }
        }

        if touched_any {
            impact.hazards_applied += 1;
        }
    }

    impact.edges_penalized = penalized.len();
    impact
}

fn segment_near(
    positions: &HashMap<NodeId, &GraphNode>,
    edge: &GraphEdge,
    hazard: &Hazard,
    window: &BoundingBox,
    radius_m: f64,
) -> bool {
    let (Some(start), Some(end)) = (
        positions.get(&edge.start_node_id),
        positions.get(&edge.end_node_id),
    ) else {
        return false;
    };

    // Segment envelope must overlap the hazard window.
    if start.lat.max(end.lat) < window.min_lat
        || start.lat.min(end.lat) > window.max_lat
        || start.lng.max(end.lng) < window.min_lng
        || start.lng.min(end.lng) > window.max_lng
    {
        return false;
    }

    distance_to_segment_m(hazard.lat, hazard.lng, start.lat, start.lng, end.lat, end.lng)
        <= radius_m
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: NodeId, lat: f64, lng: f64) -> GraphNode {
        GraphNode {
            id,
            osm_id: id * 100,
            lat,
            lng,
        }
    }

    fn edge(id: EdgeId, start: NodeId, end: NodeId, penalty: f64) -> GraphEdge {
        GraphEdge {
            id,
            start_node_id: start,
            end_node_id: end,
            distance: 111.0,
            base_cost: 111.0,
            penalty,
        }
    }

    fn square() -> (Vec<GraphNode>, Vec<GraphEdge>) {
        let nodes = vec![
            node(1, 0.0, 0.0),
            node(2, 0.0, 0.001),
            node(3, 0.001, 0.001),
            node(4, 0.001, 0.0),
        ];
        let edges = vec![
            edge(10, 1, 2, 1.0),
            edge(11, 2, 1, 1.0),
            edge(12, 2, 3, 1.0),
            edge(13, 3, 2, 1.0),
            edge(14, 3, 4, 1.0),
            edge(15, 4, 3, 1.0),
            edge(16, 4, 1, 1.0),
            edge(17, 1, 4, 1.0),
        ];
        (nodes, edges)
    }

    #[test]
    fn severity_defaults_to_one() {
        assert_eq!(severity_multiplier(None), 3.0);
        assert_eq!(severity_multiplier(Some(0)), 3.0);
        assert_eq!(severity_multiplier(Some(3)), 7.0);
        assert_eq!(severity_multiplier(Some(5)), 11.0);
    }

    #[test]
    fn zero_persisted_penalty_reads_as_neutral() {
        let costs = EdgeCostMap::from_edges(&[edge(1, 1, 2, 0.0), edge(2, 2, 1, 0.8)]);
        assert_eq!(costs.penalty(1), 1.0);
        assert_eq!(costs.penalty(2), 0.8);
        assert_eq!(costs.penalty(99), 1.0);
        assert_eq!(costs.min_penalty(), 0.8);
    }

    #[test]
    fn midpoint_hazard_penalizes_adjacent_side_only() {
        let (nodes, edges) = square();
        let mut costs = EdgeCostMap::from_edges(&edges);
        let hazards = vec![Hazard {
            lat: 0.0,
            lng: 0.0005,
            severity: Some(3),
        }];

        let impact = apply_hazards(&nodes, &edges, &hazards, DEFAULT_HAZARD_RADIUS_M, &mut costs);

        assert_eq!(impact.hazards_applied, 1);
        assert_eq!(impact.edges_penalized, 2);
        assert_eq!(costs.penalty(10), 7.0);
        assert_eq!(costs.penalty(11), 7.0);
        for untouched in [12, 13, 14, 15, 16, 17] {
            assert_eq!(costs.penalty(untouched), 1.0);
        }
    }

    #[test]
    fn hazard_near_node_penalizes_all_incident_edges() {
        let (nodes, edges) = square();
        let mut costs = EdgeCostMap::from_edges(&edges);
        let hazards = vec![Hazard {
            lat: 0.0001,
            lng: 0.0001,
            severity: None,
        }];

        apply_hazards(&nodes, &edges, &hazards, DEFAULT_HAZARD_RADIUS_M, &mut costs);

        for incident in [10, 11, 16, 17] {
            assert_eq!(costs.penalty(incident), 3.0, "edge {incident}");
        }
        for other in [12, 13, 14, 15] {
            assert_eq!(costs.penalty(other), 1.0, "edge {other}");
        }
    }

    #[test]
    fn higher_severity_strictly_increases_penalty() {
        let (nodes, edges) = square();
        let mut previous = 1.0;
        for severity in 1..=5 {
            let mut costs = EdgeCostMap::from_edges(&edges);
            let hazards = vec![Hazard {
                lat: 0.0,
                lng: 0.0005,
                severity: Some(severity),
            }];
            apply_hazards(&nodes, &edges, &hazards, DEFAULT_HAZARD_RADIUS_M, &mut costs);
            let penalty = costs.penalty(10);
            assert!(penalty > previous, "severity {severity}: {penalty} <= {previous}");
            previous = penalty;
        }
    }

    #[test]
    fn overlapping_hazards_compound() {
        let (nodes, edges) = square();
        let single = Hazard {
            lat: 0.0,
            lng: 0.0005,
            severity: Some(2),
        };
        let second = Hazard {
            lat: 0.0,
            lng: 0.0004,
            severity: Some(1),
        };

        let mut one = EdgeCostMap::from_edges(&edges);
        apply_hazards(&nodes, &edges, &[single.clone()], DEFAULT_HAZARD_RADIUS_M, &mut one);
        let mut two = EdgeCostMap::from_edges(&edges);
        apply_hazards(&nodes, &edges, &[single, second], DEFAULT_HAZARD_RADIUS_M, &mut two);

        assert_eq!(one.penalty(10), 5.0);
        assert_eq!(two.penalty(10), 15.0);
    }

    #[test]
    fn hazard_scales_road_class_penalty() {
        let (nodes, mut edges) = square();
        edges[0].penalty = 1.2;
        let mut costs = EdgeCostMap::from_edges(&edges);
        let hazards = vec![Hazard {
            lat: 0.0,
            lng: 0.0005,
            severity: Some(1),
        }];
        apply_hazards(&nodes, &edges, &hazards, DEFAULT_HAZARD_RADIUS_M, &mut costs);
        assert!((costs.penalty(10) - 3.6).abs() < 1e-12);
        // Persisted value untouched.
        assert_eq!(edges[0].penalty, 1.2);
    }

    #[test]
    fn distant_hazard_changes_nothing() {
        let (nodes, edges) = square();
        let mut costs = EdgeCostMap::from_edges(&edges);
        let hazards = vec![Hazard {
            lat: 0.01,
            lng: 0.01,
            severity: Some(5),
        }];
        let impact = apply_hazards(&nodes, &edges, &hazards, DEFAULT_HAZARD_RADIUS_M, &mut costs);
        assert_eq!(impact, HazardImpact::default());
        assert_eq!(costs.min_penalty(), 1.0);
    }
}
