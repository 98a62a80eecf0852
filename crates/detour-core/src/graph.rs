//! In-memory road subgraph used by a single search.
//!
//! Nodes live in an arena indexed by position; edges are stored as links in
//! both a forward and a reverse adjacency list. Costs are resolved once at
//! build time from the request's [`EdgeCostMap`], so the persisted edges are
//! never modified.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

use tracing::debug;

use crate::hazard::EdgeCostMap;
use crate::models::{EdgeId, GraphEdge, GraphNode, NodeId};

/// One traversable direction of an edge, seen from its owning node.
///
/// In the forward list `to` is the edge target; in the reverse list it is the
/// edge source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub to: usize,
    pub edge_id: EdgeId,
    /// `distance × effective penalty`.
    pub cost: f64,
    pub distance: f64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FloatOrd(pub f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RoadGraph {
    nodes: Vec<GraphNode>,
    index: HashMap<NodeId, usize>,
    forward: Vec<Vec<Link>>,
    backward: Vec<Vec<Link>>,
    min_penalty: f64,
    duplicates_dropped: usize,
}

impl RoadGraph {
    /// Build the arena and both adjacency lists.
    ///
    /// Edges whose endpoints are not among `nodes`, or whose distance or
    /// penalty is not a positive finite number, are skipped. Parallel edges
    /// between the same ordered pair (left behind by repeated ingestion)
    /// collapse to the cheapest one.
    pub fn build(nodes: Vec<GraphNode>, edges: &[GraphEdge], costs: &EdgeCostMap) -> Self {
        let index: HashMap<NodeId, usize> = nodes
            .iter()
            .enumerate()
            .map(|(position, node)| (node.id, position))
            .collect();

        let mut forward: Vec<Vec<Link>> = vec![Vec::new(); nodes.len()];
        let mut slots: HashMap<(usize, usize), usize> = HashMap::new();
        let mut duplicates_dropped = 0usize;
        let mut skipped = 0usize;
        let mut min_penalty = f64::INFINITY;

        for edge in edges {
            let (Some(&from), Some(&to)) = (
                index.get(&edge.start_node_id),
                index.get(&edge.end_node_id),
            ) else {
                skipped += 1;
                continue;
            };
            let penalty = costs.penalty(edge.id);
            if !(edge.distance.is_finite() && edge.distance > 0.0)
                || !(penalty.is_finite() && penalty > 0.0)
            {
                skipped += 1;
                continue;
            }

            let link = Link {
                to,
                edge_id: edge.id,
                cost: edge.distance * penalty,
                distance: edge.distance,
            };
            min_penalty = min_penalty.min(penalty);

            match slots.get(&(from, to)) {
                Some(&slot) => {
                    duplicates_dropped += 1;
                    if link.cost < forward[from][slot].cost {
                        forward[from][slot] = link;
                    }
                }
                None => {
                    slots.insert((from, to), forward[from].len());
                    forward[from].push(link);
                }
            }
        }

        let mut backward: Vec<Vec<Link>> = vec![Vec::new(); nodes.len()];
        for (from, links) in forward.iter().enumerate() {
            for link in links {
                backward[link.to].push(Link { to: from, ..*link });
            }
        }

        if skipped > 0 || duplicates_dropped > 0 {
            debug!(skipped, duplicates_dropped, "road graph built with dropped edges");
        }

        Self {
            nodes,
            index,
            forward,
            backward,
            min_penalty: if min_penalty.is_finite() { min_penalty } else { 1.0 },
            duplicates_dropped,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct directed links after de-duplication.
    pub fn link_count(&self) -> usize {
        self.forward.iter().map(Vec::len).sum()
    }

    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn node(&self, position: usize) -> &GraphNode {
        &self.nodes[position]
    }

    pub fn outgoing(&self, position: usize) -> &[Link] {
        &self.forward[position]
    }

    /// Links entering `position`, each pointing back at its source node.
    pub fn incoming(&self, position: usize) -> &[Link] {
        &self.backward[position]
    }

    /// Smallest effective penalty over all links; 1.0 for an edgeless graph.
    pub fn min_penalty(&self) -> f64 {
        self.min_penalty
    }

    /// Plain Dijkstra cost between two nodes, `None` when unreachable.
    pub fn shortest_path_cost(&self, from: NodeId, to: NodeId) -> Option<f64> {
        let source = self.index_of(from)?;
        let target = self.index_of(to)?;

        let mut best = vec![f64::INFINITY; self.nodes.len()];
        let mut heap: BinaryHeap<Reverse<(FloatOrd, usize)>> = BinaryHeap::new();
        best[source] = 0.0;
        heap.push(Reverse((FloatOrd(0.0), source)));

        while let Some(Reverse((FloatOrd(cost), current))) = heap.pop() {
            if current == target {
                return Some(cost);
            }
            if cost > best[current] {
                continue;
            }
            for link in &self.forward[current] {
                let next = cost + link.cost;
                if next < best[link.to] {
                    best[link.to] = next;
                    heap.push(Reverse((FloatOrd(next), link.to)));
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: NodeId, lat: f64, lng: f64) -> GraphNode {
        GraphNode {
            id,
            osm_id: id,
            lat,
            lng,
        }
    }

    fn edge(id: EdgeId, start: NodeId, end: NodeId, distance: f64, penalty: f64) -> GraphEdge {
        GraphEdge {
            id,
            start_node_id: start,
            end_node_id: end,
            distance,
            base_cost: distance,
            penalty,
        }
    }

    fn abc() -> (Vec<GraphNode>, Vec<GraphEdge>) {
        let nodes = vec![node(1, 0.0, 0.0), node(2, 0.0, 0.001), node(3, 0.0, 0.002)];
        let edges = vec![
            edge(1, 1, 2, 100.0, 1.0),
            edge(2, 2, 3, 150.0, 1.5),
            edge(3, 1, 3, 200.0, 2.0),
        ];
        (nodes, edges)
    }

    #[test]
    fn cost_is_distance_times_penalty() {
        let (nodes, edges) = abc();
        let costs = EdgeCostMap::from_edges(&edges);
        let graph = RoadGraph::build(nodes, &edges, &costs);

        let b = graph.index_of(2).unwrap();
        let link = graph.outgoing(b)[0];
        assert_eq!(link.cost, 150.0 * 1.5);
        assert_eq!(link.distance, 150.0);

        let a = graph.index_of(1).unwrap();
        let direct = graph
            .outgoing(a)
            .iter()
            .find(|link| link.edge_id == 3)
            .unwrap();
        assert_eq!(direct.cost, 400.0);
        assert_eq!(direct.distance, 200.0);
    }

    #[test]
    fn reverse_adjacency_mirrors_forward() {
        let (nodes, edges) = abc();
        let costs = EdgeCostMap::from_edges(&edges);
        let graph = RoadGraph::build(nodes, &edges, &costs);

        let c = graph.index_of(3).unwrap();
        let mut sources: Vec<NodeId> = graph
            .incoming(c)
            .iter()
            .map(|link| graph.node(link.to).id)
            .collect();
        sources.sort();
        assert_eq!(sources, vec![1, 2]);
        assert!(graph.incoming(graph.index_of(1).unwrap()).is_empty());
    }

    #[test]
    fn empty_edge_list_builds_isolated_nodes() {
        let (nodes, _) = abc();
        let graph = RoadGraph::build(nodes, &[], &EdgeCostMap::default());
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.link_count(), 0);
        assert_eq!(graph.min_penalty(), 1.0);
        assert_eq!(graph.shortest_path_cost(1, 3), None);
    }

    #[test]
    fn parallel_edges_keep_cheapest() {
        let (nodes, mut edges) = abc();
        edges.push(edge(4, 1, 2, 100.0, 1.2));
        edges.push(edge(5, 1, 2, 100.0, 0.9));
        let costs = EdgeCostMap::from_edges(&edges);
        let graph = RoadGraph::build(nodes, &edges, &costs);

        assert_eq!(graph.duplicates_dropped(), 2);
        assert_eq!(graph.link_count(), 3);
        let a = graph.index_of(1).unwrap();
        let to_b: Vec<&Link> = graph
            .outgoing(a)
            .iter()
            .filter(|link| graph.node(link.to).id == 2)
            .collect();
        assert_eq!(to_b.len(), 1);
        assert_eq!(to_b[0].edge_id, 5);
        assert_eq!(graph.min_penalty(), 0.9);
    }

    #[test]
    fn edges_with_unknown_endpoints_or_zero_length_are_skipped() {
        let (nodes, mut edges) = abc();
        edges.push(edge(6, 1, 99, 10.0, 1.0));
        edges.push(edge(7, 2, 1, 0.0, 1.0));
        let costs = EdgeCostMap::from_edges(&edges);
        let graph = RoadGraph::build(nodes, &edges, &costs);
        assert_eq!(graph.link_count(), 3);
    }

    #[test]
    fn dijkstra_prefers_cheaper_two_hop_route() {
        let (nodes, edges) = abc();
        let costs = EdgeCostMap::from_edges(&edges);
        let graph = RoadGraph::build(nodes, &edges, &costs);
        // 100*1.0 + 150*1.5 = 325 < 200*2.0 = 400
        assert_eq!(graph.shortest_path_cost(1, 3), Some(325.0));
        assert_eq!(graph.shortest_path_cost(3, 1), None);
        assert_eq!(graph.shortest_path_cost(2, 2), Some(0.0));
    }
}
