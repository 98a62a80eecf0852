//! Bidirectional A* over a [`RoadGraph`] and assembly of the found route.
//!
//! A forward frontier grows from the origin over outgoing links and a
//! backward frontier grows from the destination over incoming links. Both use
//! a great-circle heuristic toward the opposite endpoint, scaled down by the
//! cheapest penalty in the graph so it never overestimates a remaining cost.
//!
//! The search keeps the best known origin-to-destination cost through any node
//! labelled by both sides. It stops as soon as the smallest key popped from
//! either queue can no longer beat that cost, or when a queue runs dry.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::graph::{FloatOrd, Link, RoadGraph};
use crate::models::{LatLng, NodeId, PathResult};
use crate::spatial::haversine_distance;

pub const DEFAULT_AVERAGE_SPEED_KMH: f64 = 30.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RouteSearchConfig {
    /// Speed used to turn route length into an ETA.
    pub average_speed_kmh: f64,
}

impl Default for RouteSearchConfig {
    fn default() -> Self {
        Self {
            average_speed_kmh: DEFAULT_AVERAGE_SPEED_KMH,
        }
    }
}

impl RouteSearchConfig {
    /// Minutes needed to cover `distance_m` at the configured speed.
    pub fn eta_minutes(&self, distance_m: f64) -> f64 {
        if self.average_speed_kmh <= 0.0 || !self.average_speed_kmh.is_finite() {
            return 0.0;
        }
        distance_m / 1000.0 / self.average_speed_kmh * 60.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    pub forward_expanded: usize,
    pub backward_expanded: usize,
    /// Store id of the node where the two frontiers were joined.
    pub meeting_node: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    node: usize,
    g_score: FloatOrd,
    f_score: FloatOrd,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node && self.g_score == other.g_score && self.f_score == other.f_score
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_score
            .cmp(&other.f_score)
            .then_with(|| self.g_score.cmp(&other.g_score))
            .then_with(|| self.node.cmp(&other.node))
    }
}

/// Labels owned by one direction of the search.
#[derive(Debug)]
struct Frontier {
    /// Heuristic target: the opposite side's start node.
    target: usize,
    open: BinaryHeap<Reverse<OpenEntry>>,
    best: Vec<f64>,
    distance: Vec<f64>,
    predecessor: Vec<Option<usize>>,
    visited: Vec<bool>,
    expanded: usize,
}

impl Frontier {
    fn new(node_count: usize, start: usize, target: usize) -> Self {
        let mut frontier = Self {
            target,
            open: BinaryHeap::new(),
            best: vec![f64::INFINITY; node_count],
            distance: vec![0.0; node_count],
            predecessor: vec![None; node_count],
            visited: vec![false; node_count],
            expanded: 0,
        };
        frontier.best[start] = 0.0;
        frontier.open.push(Reverse(OpenEntry {
            node: start,
            g_score: FloatOrd(0.0),
            f_score: FloatOrd(0.0),
        }));
        frontier
    }

    /// Next entry whose node has not been expanded yet. Entries left behind by
    /// a later improvement are discarded here.
    fn pop_live(&mut self) -> Option<OpenEntry> {
        while let Some(Reverse(entry)) = self.open.pop() {
            if !self.visited[entry.node] {
                return Some(entry);
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy)]
struct Meeting {
    node: usize,
    cost: f64,
}

fn offer(meeting: &mut Option<Meeting>, node: usize, cost: f64) {
    if !cost.is_finite() {
        return;
    }
    match meeting {
        Some(current) if current.cost <= cost => {}
        _ => *meeting = Some(Meeting { node, cost }),
    }
}

/// Result of a search: the meeting node (if any) plus both sides' labels,
/// from which [`assemble_path`] rebuilds the route.
#[derive(Debug)]
pub struct SearchOutcome {
    meeting: Option<Meeting>,
    forward: Option<Frontier>,
    backward: Option<Frontier>,
    pub stats: SearchStats,
}

impl SearchOutcome {
    fn unreachable() -> Self {
        Self {
            meeting: None,
            forward: None,
            backward: None,
            stats: SearchStats::default(),
        }
    }

    pub fn found(&self) -> bool {
        self.meeting.is_some()
    }

    /// Cost of the joined route, `None` when the endpoints are not connected.
    pub fn cost(&self) -> Option<f64> {
        self.meeting.map(|meeting| meeting.cost)
    }
}

/// Run the bidirectional search between two store node ids.
///
/// Unknown ids yield an outcome with no route. Each node is expanded at most
/// once per side, and the side with fewer queued entries is expanded next.
pub fn bidirectional_search(graph: &RoadGraph, origin: NodeId, destination: NodeId) -> SearchOutcome {
    let (Some(source), Some(target)) = (graph.index_of(origin), graph.index_of(destination)) else {
        return SearchOutcome::unreachable();
    };

    let scale = graph.min_penalty().clamp(0.0, 1.0);
    let node_count = graph.node_count();
    let mut forward = Frontier::new(node_count, source, target);
    let mut backward = Frontier::new(node_count, target, source);
    let mut meeting: Option<Meeting> = None;

    if source == target {
        offer(&mut meeting, source, 0.0);
    }

    while !forward.open.is_empty() && !backward.open.is_empty() {
        let side = if forward.open.len() <= backward.open.len() {
            Side::Forward
        } else {
            Side::Backward
        };
        let (this, other) = match side {
            Side::Forward => (&mut forward, &backward),
            Side::Backward => (&mut backward, &forward),
        };

        let Some(entry) = this.pop_live() else {
            continue;
        };
        if let Some(best) = meeting {
            if entry.f_score.0 >= best.cost {
                break;
            }
        }

        let current = entry.node;
        this.visited[current] = true;
        this.expanded += 1;
        let g_current = this.best[current];
        if other.visited[current] {
            offer(&mut meeting, current, g_current + other.best[current]);
        }

        let links: &[Link] = match side {
            Side::Forward => graph.outgoing(current),
            Side::Backward => graph.incoming(current),
        };
        let goal = graph.node(this.target);

        for link in links {
            if this.visited[link.to] {
                continue;
            }
            let tentative = g_current + link.cost;
            if tentative >= this.best[link.to] {
                continue;
            }

            this.best[link.to] = tentative;
            this.distance[link.to] = this.distance[current] + link.distance;
            this.predecessor[link.to] = Some(current);

            let next = graph.node(link.to);
            let h = scale * haversine_distance(next.lat, next.lng, goal.lat, goal.lng);
            this.open.push(Reverse(OpenEntry {
                node: link.to,
                g_score: FloatOrd(tentative),
                f_score: FloatOrd(tentative + h),
            }));

            offer(&mut meeting, link.to, tentative + other.best[link.to]);
        }
    }

    let stats = SearchStats {
        forward_expanded: forward.expanded,
        backward_expanded: backward.expanded,
        meeting_node: meeting.map(|found| graph.node(found.node).id),
    };
    debug!(
        origin,
        destination,
        forward_expanded = stats.forward_expanded,
        backward_expanded = stats.backward_expanded,
        found = meeting.is_some(),
        "bidirectional search finished"
    );

    SearchOutcome {
        meeting,
        forward: Some(forward),
        backward: Some(backward),
        stats,
    }
}

/// Rebuild the waypoint sequence through the meeting node.
///
/// The forward predecessor chain supplies origin..=meeting; the backward chain
/// supplies the rest up to the destination. Distance and cost are the sums of
/// both sides' labels at the meeting node.
pub fn assemble_path(
    graph: &RoadGraph,
    outcome: &SearchOutcome,
    config: &RouteSearchConfig,
) -> Option<PathResult> {
    let meeting = outcome.meeting?;
    let forward = outcome.forward.as_ref()?;
    let backward = outcome.backward.as_ref()?;

    let mut head = vec![meeting.node];
    let mut cursor = meeting.node;
    while let Some(previous) = forward.predecessor[cursor] {
        head.push(previous);
        cursor = previous;
    }
    head.reverse();

    let mut cursor = meeting.node;
    while let Some(next) = backward.predecessor[cursor] {
        head.push(next);
        cursor = next;
    }

    let path: Vec<LatLng> = head
        .into_iter()
        .map(|position| graph.node(position).position())
        .collect();
    let total_distance = forward.distance[meeting.node] + backward.distance[meeting.node];

    Some(PathResult {
        path,
        total_distance,
        total_cost: meeting.cost,
        estimated_time: config.eta_minutes(total_distance),
    })
}

/// Search and assemble in one step.
pub fn find_route(
    graph: &RoadGraph,
    origin: NodeId,
    destination: NodeId,
    config: &RouteSearchConfig,
) -> (Option<PathResult>, SearchStats) {
    let outcome = bidirectional_search(graph, origin, destination);
    let path = assemble_path(graph, &outcome, config);
    (path, outcome.stats)
}
