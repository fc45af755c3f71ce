//! Path search trait and default A* implementation.
//!
//! # Pluggability
//!
//! Agents request paths through the [`Router`] trait, so applications can
//! swap in hierarchical search, cached corridors, or anything else that
//! yields a [`RoutedPath`] without touching the agent core.
//!
//! # Cost units
//!
//! Costs are integer **millimetres** (u32) inside the search so heap order
//! is total and tie-breaking is deterministic.  [`RoutedPath::length`]
//! reports metres.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use glam::Vec3;
use tracing::trace;

use nav_core::{LinkId, NodeId};

use crate::graph::{NavGraph, TraversalConstraints};
use crate::{GraphError, GraphResult};

// ── RoutedPath ────────────────────────────────────────────────────────────────

/// One step of a routed path.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathStep {
    /// Walk across this node.
    Node(NodeId),
    /// Cross this off-mesh link, end to start when `reverse`.
    Link { link: LinkId, reverse: bool },
}

/// Result of a path search: an alternating sequence of node runs and link
/// crossings, plus the snapped endpoints.
///
/// `steps` starts and ends with a `Node`, and every `Link` sits between its
/// entry node and its exit node.
#[derive(Clone, Debug, PartialEq)]
pub struct RoutedPath {
    pub steps:       Vec<PathStep>,
    pub start_point: Vec3,
    pub end_point:   Vec3,
    /// Estimated walking length in metres.
    pub length:      f32,
    /// `true` when the target was unreachable and the path stops at the
    /// closest reachable node instead.
    pub partial:     bool,
}

impl RoutedPath {
    /// Path across a plain node corridor with no links.
    pub fn from_nodes(nodes: &[NodeId], start_point: Vec3, end_point: Vec3) -> Self {
        Self {
            steps: nodes.iter().copied().map(PathStep::Node).collect(),
            start_point,
            end_point,
            length: start_point.distance(end_point),
            partial: false,
        }
    }

    /// All nodes in order, links skipped.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.steps.iter().filter_map(|s| match s {
            PathStep::Node(n) => Some(*n),
            PathStep::Link { .. } => None,
        })
    }

    pub fn link_count(&self) -> usize {
        self.steps.iter().filter(|s| matches!(s, PathStep::Link { .. })).count()
    }

    pub fn first_node(&self) -> Option<NodeId> {
        self.nodes().next()
    }

    pub fn last_node(&self) -> Option<NodeId> {
        self.nodes().last()
    }
}

// ── Router trait ──────────────────────────────────────────────────────────────

/// Pluggable path search.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync` so one router can serve every
/// agent while the simulation runs its parallel phases.
pub trait Router: Send + Sync {
    /// Search from `start` to `end`.  Both points are snapped to the nearest
    /// node allowed by `constraints`.
    fn route(
        &self,
        graph:       &NavGraph,
        start:       Vec3,
        end:         Vec3,
        constraints: &TraversalConstraints,
    ) -> GraphResult<RoutedPath>;
}

// ── AStarRouter ───────────────────────────────────────────────────────────────

/// A* over triangle centroids, with off-mesh links as extra edges.
///
/// The heuristic is straight-line distance from a node's centroid to the
/// end point.
#[derive(Copy, Clone, Debug, Default)]
pub struct AStarRouter;

impl Router for AStarRouter {
    fn route(
        &self,
        graph:       &NavGraph,
        start:       Vec3,
        end:         Vec3,
        constraints: &TraversalConstraints,
    ) -> GraphResult<RoutedPath> {
        astar(graph, start, end, constraints)
    }
}

// ── A* internals ──────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq)]
enum Prev {
    None,
    Node(NodeId),
    Link(LinkId, bool),
}

#[inline]
fn mm(metres: f32) -> u32 {
    (metres * 1000.0).round().clamp(0.0, u32::MAX as f32) as u32
}

fn astar(
    graph:       &NavGraph,
    start:       Vec3,
    end:         Vec3,
    constraints: &TraversalConstraints,
) -> GraphResult<RoutedPath> {
    let from = graph.nearest_node(start, constraints).ok_or(GraphError::NoNearbyNode(start))?;
    let to   = graph.nearest_node(end, constraints).ok_or(GraphError::NoNearbyNode(end))?;

    if from.node == to.node {
        return Ok(RoutedPath {
            steps:       vec![PathStep::Node(from.node)],
            start_point: from.point,
            end_point:   to.point,
            length:      from.point.distance(to.point),
            partial:     false,
        });
    }

    let n = graph.node_count();
    let heuristic = |node: NodeId| mm(graph.node_center[node.index()].distance(to.point));

    let mut g_cost = vec![u32::MAX; n];
    let mut prev   = vec![Prev::None; n];
    let mut closed = vec![false; n];

    g_cost[from.node.index()] = 0;
    // Min-heap on (f, node); NodeId as secondary key keeps ties deterministic.
    let mut heap: BinaryHeap<Reverse<(u32, NodeId)>> = BinaryHeap::new();
    heap.push(Reverse((heuristic(from.node), from.node)));

    // Closest node to the target seen so far, for partial results.
    let mut best = (heuristic(from.node), from.node);

    while let Some(Reverse((_, node))) = heap.pop() {
        if node == to.node {
            let steps = reconstruct(graph, &prev, to.node);
            trace!(from = %from.node, to = %to.node, steps = steps.len(), "route found");
            return Ok(RoutedPath {
                steps,
                start_point: from.point,
                end_point:   to.point,
                length:      g_cost[to.node.index()] as f32 / 1000.0,
                partial:     false,
            });
        }
        if closed[node.index()] {
            continue;
        }
        closed[node.index()] = true;

        let h = heuristic(node);
        if (h, node) < best {
            best = (h, node);
        }

        let here = graph.node_center[node.index()];
        let cost = g_cost[node.index()];

        for (next, _) in graph.neighbours(node) {
            if !graph.node_allowed(next, constraints) {
                continue;
            }
            let step = mm(here.distance(graph.node_center[next.index()]));
            relax(&mut g_cost, &mut prev, &mut heap, &heuristic, next, cost.saturating_add(step), Prev::Node(node));
        }

        for (link_id, reverse) in graph.links_from(node) {
            let Some(link) = graph.link(link_id) else { continue };
            let (entry, exit)  = link.endpoints(reverse);
            let (_, exit_node) = link.nodes(reverse);
            if !graph.node_allowed(exit_node, constraints) {
                continue;
            }
            let step = mm(
                here.distance(entry)
                    + link.length() * link.cost_factor
                    + exit.distance(graph.node_center[exit_node.index()]),
            );
            relax(
                &mut g_cost,
                &mut prev,
                &mut heap,
                &heuristic,
                exit_node,
                cost.saturating_add(step),
                Prev::Link(link_id, reverse),
            );
        }
    }

    if constraints.allow_partial && best.1 != from.node {
        let steps = reconstruct(graph, &prev, best.1);
        let end_point = graph.clamp_to_node(best.1, to.point);
        trace!(from = %from.node, to = %to.node, reached = %best.1, "partial route");
        return Ok(RoutedPath {
            steps,
            start_point: from.point,
            end_point,
            length: g_cost[best.1.index()] as f32 / 1000.0,
            partial: true,
        });
    }
    if constraints.allow_partial {
        return Ok(RoutedPath {
            steps:       vec![PathStep::Node(from.node)],
            start_point: from.point,
            end_point:   graph.clamp_to_node(from.node, to.point),
            length:      0.0,
            partial:     true,
        });
    }

    Err(GraphError::NoRoute { from: from.node, to: to.node })
}

fn relax(
    g_cost:    &mut [u32],
    prev:      &mut [Prev],
    heap:      &mut BinaryHeap<Reverse<(u32, NodeId)>>,
    heuristic: &impl Fn(NodeId) -> u32,
    node:      NodeId,
    cost:      u32,
    via:       Prev,
) {
    if cost < g_cost[node.index()] {
        g_cost[node.index()] = cost;
        prev[node.index()] = via;
        heap.push(Reverse((cost.saturating_add(heuristic(node)), node)));
    }
}

fn reconstruct(graph: &NavGraph, prev: &[Prev], to: NodeId) -> Vec<PathStep> {
    let mut steps = Vec::new();
    let mut cur = to;
    loop {
        steps.push(PathStep::Node(cur));
        match prev[cur.index()] {
            Prev::None => break,
            Prev::Node(p) => cur = p,
            Prev::Link(link, reverse) => {
                steps.push(PathStep::Link { link, reverse });
                match graph.link(link) {
                    Some(l) => cur = l.nodes(reverse).0,
                    None => break,
                }
            }
        }
    }
    steps.reverse();
    steps
}
