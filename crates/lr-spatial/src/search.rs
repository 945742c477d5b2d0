//! Shortest-path search over a [`RoadGraph`].
//!
//! Both algorithms share one best-first loop; [`dijkstra`] is the special
//! case with a zero heuristic.  Costs are `f64` seconds or metres depending
//! on [`Weight`].
//!
//! Failures are returned as [`SearchError`] values rather than panics so the
//! caller can decide whether to retry with the other algorithm.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use thiserror::Error;

use lr_core::{GeoPoint, NodeId, Weight};

use crate::graph::{GraphEdge, RoadGraph};

// ── Result types ──────────────────────────────────────────────────────────────

/// A found path: node sequence from source to target, both included.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    pub nodes: Vec<NodeId>,
    /// Sum of edge costs under the searched [`Weight`].
    pub cost:  f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum SearchError {
    /// Every node reachable from the source was expanded without reaching
    /// the target.
    #[error("no path between the endpoints in the loaded graph")]
    NoPath,

    #[error("node {0} is not in the graph")]
    UnknownNode(NodeId),

    /// The search expanded more nodes than allowed.  The target is either
    /// very far away or unreachable.
    #[error("step limit exceeded")]
    StepLimitExceeded,
}

// ── Public entry points ───────────────────────────────────────────────────────

/// Plain uniform-cost search.
pub fn dijkstra(
    graph: &RoadGraph,
    from: NodeId,
    to: NodeId,
    weight: Weight,
    step_limit: Option<usize>,
) -> Result<Path, SearchError> {
    best_first(graph, from, to, weight, step_limit, |_| 0.0)
}

/// A* with a great-circle heuristic.
///
/// For [`Weight::Time`] the remaining straight-line distance is divided by
/// the larger of `max_speed_kmh` and the fastest edge loaded into `graph`,
/// so the estimate never exceeds the true remaining cost and the result is
/// optimal.  For [`Weight::Distance`] the heuristic is the straight-line
/// distance itself.  Placeholder nodes (no position yet) estimate zero.
pub fn astar(
    graph: &RoadGraph,
    from: NodeId,
    to: NodeId,
    weight: Weight,
    step_limit: Option<usize>,
    max_speed_kmh: f64,
) -> Result<Path, SearchError> {
    let Some(target) = graph.position(to) else {
        return best_first(graph, from, to, weight, step_limit, |_| 0.0);
    };
    let per_metre = match weight {
        Weight::Time => 3.6 / max_speed_kmh.max(graph.fastest_edge_kmh()),
        Weight::Distance => 1.0,
    };
    best_first(graph, from, to, weight, step_limit, |n| remaining(graph, n, target) * per_metre)
}

// ── Pluggable search ──────────────────────────────────────────────────────────

/// A shortest-path algorithm the engine can run over the loaded graph.
///
/// The engine runs its guided search through this trait, so callers can
/// swap in their own (a contraction hierarchy, a bidirectional search).
/// Implementations must be `Send + Sync`; the engine is shared across
/// request threads.
pub trait PathSearch: Send + Sync {
    fn search(
        &self,
        graph: &RoadGraph,
        from: NodeId,
        to: NodeId,
        weight: Weight,
        step_limit: Option<usize>,
    ) -> Result<Path, SearchError>;
}

/// [`dijkstra`] behind [`PathSearch`].
#[derive(Copy, Clone, Debug, Default)]
pub struct PlainSearch;

impl PathSearch for PlainSearch {
    fn search(
        &self,
        graph: &RoadGraph,
        from: NodeId,
        to: NodeId,
        weight: Weight,
        step_limit: Option<usize>,
    ) -> Result<Path, SearchError> {
        dijkstra(graph, from, to, weight, step_limit)
    }
}

/// [`astar`] behind [`PathSearch`].
#[derive(Copy, Clone, Debug)]
pub struct GuidedSearch {
    /// Lower bound for the heuristic speed, km/h.
    pub max_speed_kmh: f64,
}

impl PathSearch for GuidedSearch {
    fn search(
        &self,
        graph: &RoadGraph,
        from: NodeId,
        to: NodeId,
        weight: Weight,
        step_limit: Option<usize>,
    ) -> Result<Path, SearchError> {
        astar(graph, from, to, weight, step_limit, self.max_speed_kmh)
    }
}

#[inline]
fn remaining(graph: &RoadGraph, node: NodeId, target: GeoPoint) -> f64 {
    graph.position(node).map_or(0.0, |p| p.distance_m(target))
}

#[inline]
fn edge_cost(edge: &GraphEdge, weight: Weight) -> f64 {
    match weight {
        Weight::Time => edge.travel_s,
        Weight::Distance => edge.length_m,
    }
}

// ── Core loop ─────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug)]
struct QueueItem {
    node:  NodeId,
    cost:  f64,
    score: f64,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap and the lowest score must pop
        // first.  Node id breaks ties so expansion order is deterministic.
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| other.node.cmp(&self.node))
    }
}

fn best_first(
    graph: &RoadGraph,
    from: NodeId,
    to: NodeId,
    weight: Weight,
    step_limit: Option<usize>,
    heuristic: impl Fn(NodeId) -> f64,
) -> Result<Path, SearchError> {
    let n = graph.node_count();
    for id in [from, to] {
        if id.index() >= n {
            return Err(SearchError::UnknownNode(id));
        }
    }
    if from == to {
        return Ok(Path { nodes: vec![from], cost: 0.0 });
    }

    let mut best = vec![f64::INFINITY; n];
    let mut prev = vec![NodeId::INVALID; n];
    let mut queue = BinaryHeap::new();
    let mut steps: usize = 0;

    best[from.index()] = 0.0;
    queue.push(QueueItem { node: from, cost: 0.0, score: heuristic(from) });

    while let Some(item) = queue.pop() {
        if item.node == to {
            return Ok(Path { nodes: reconstruct(&prev, to), cost: item.cost });
        }
        // Stale entry: a cheaper route to this node was found after it was queued.
        if item.cost > best[item.node.index()] {
            continue;
        }

        steps += 1;
        if step_limit.is_some_and(|limit| steps > limit) {
            return Err(SearchError::StepLimitExceeded);
        }

        for edge in graph.out_edges(item.node) {
            let cost = item.cost + edge_cost(edge, weight);
            if cost < best[edge.to.index()] {
                best[edge.to.index()] = cost;
                prev[edge.to.index()] = item.node;
                queue.push(QueueItem { node: edge.to, cost, score: cost + heuristic(edge.to) });
            }
        }
    }

    Err(SearchError::NoPath)
}

fn reconstruct(prev: &[NodeId], to: NodeId) -> Vec<NodeId> {
    let mut nodes = vec![to];
    let mut cur = to;
    while prev[cur.index()] != NodeId::INVALID {
        cur = prev[cur.index()];
        nodes.push(cur);
    }
    nodes.reverse();
    nodes
}
