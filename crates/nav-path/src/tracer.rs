//! The `PathTracer`: one agent's route from "here" to "there".
//!
//! # Representation
//!
//! All nodes of the route live in one `Vec<NodeId>`; parts index into it.
//! Nodes before the first part's `start` (already walked past) and after the
//! last part's `end` (cut off by a destination change) are dead weight and
//! get dropped whenever the vector is rewritten anyway.
//!
//! # Version discipline
//!
//! `version` is bumped exactly when the part sequence changes: a new path,
//! a spliced repair, popped parts, or a clear.  Sliding the start or end
//! within its current part only refines the point and leaves `version`
//! alone.

use glam::Vec3;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use nav_core::NodeId;
use nav_graph::geometry::polyline_length;
use nav_graph::{NavGraph, PathStep, RoutedPath, TraversalConstraints};

use crate::funnel::{same_spot, string_pull};
use crate::{CornerBoundary, PathError, PathPart, PathResult, RepairLimits, RepairOutcome, RepairQuality};

/// Which end of the path a repair works on.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum End {
    Start,
    Finish,
}

/// Incrementally repairable path.
#[derive(Clone, Debug)]
pub struct PathTracer {
    nodes:       Vec<NodeId>,
    parts:       Vec<PathPart>,
    start_point: Vec3,
    end_point:   Vec3,
    version:     u64,
    has_path:    bool,

    // Staleness is tracked per cause so a later successful repair at one
    // end does not hide a failure at the other.
    start_failed: bool,
    end_failed:   bool,
    broken:       bool,
    invalidated:  bool,

    /// Graph revision the path was last checked against.
    graph_revision: u64,

    /// Which nodes repair searches may walk over.
    pub constraints: TraversalConstraints,
    pub limits:      RepairLimits,
}

impl Default for PathTracer {
    fn default() -> Self {
        Self::new(TraversalConstraints::default(), RepairLimits::default())
    }
}

impl PathTracer {
    pub fn new(constraints: TraversalConstraints, limits: RepairLimits) -> Self {
        Self {
            nodes:          Vec::new(),
            parts:          Vec::new(),
            start_point:    Vec3::ZERO,
            end_point:      Vec3::ZERO,
            version:        0,
            has_path:       false,
            start_failed:   false,
            end_failed:     false,
            broken:         false,
            invalidated:    false,
            graph_revision: 0,
            constraints,
            limits,
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn has_path(&self) -> bool {
        self.has_path
    }

    /// `true` when there is no path, a repair failed, a node or link of the
    /// path has been destroyed, or the owner invalidated it.
    #[inline]
    pub fn is_stale(&self) -> bool {
        !self.has_path || self.start_failed || self.end_failed || self.broken || self.invalidated
    }

    /// The path crosses a node or link destroyed since it was installed.
    #[inline]
    pub fn is_broken(&self) -> bool {
        self.has_path && self.broken
    }

    /// Mark the path stale without touching its topology.  Cleared by the
    /// next assignment.
    pub fn invalidate(&mut self) {
        if self.has_path && !self.invalidated {
            debug!(version = self.version, "path invalidated");
        }
        self.invalidated = true;
    }

    #[inline]
    pub fn start_point(&self) -> Vec3 {
        self.start_point
    }

    #[inline]
    pub fn end_point(&self) -> Vec3 {
        self.end_point
    }

    #[inline]
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn part(&self, index: usize) -> Option<&PathPart> {
        self.parts.get(index)
    }

    pub fn parts(&self) -> &[PathPart] {
        &self.parts
    }

    /// Nodes covered by `part`; empty for links.
    pub fn part_nodes(&self, part: &PathPart) -> &[NodeId] {
        match *part {
            PathPart::Nodes { start, end } => &self.nodes[start..=end],
            PathPart::Link { .. } => &[],
        }
    }

    pub fn first_node(&self) -> Option<NodeId> {
        match self.parts.first()? {
            PathPart::Nodes { start, .. } => Some(self.nodes[*start]),
            PathPart::Link { .. } => None,
        }
    }

    pub fn last_node(&self) -> Option<NodeId> {
        match self.parts.last()? {
            PathPart::Nodes { end, .. } => Some(self.nodes[*end]),
            PathPart::Link { .. } => None,
        }
    }

    // ── Assignment ────────────────────────────────────────────────────────

    /// Drop the path.
    pub fn clear(&mut self) {
        if self.has_path || !self.parts.is_empty() {
            self.version += 1;
        }
        self.nodes.clear();
        self.parts.clear();
        self.has_path = false;
        self.reset_flags();
    }

    /// Trivial path standing on `node` at `point` (moved onto the node).
    pub fn set_from_single_node(&mut self, graph: &NavGraph, node: NodeId, point: Vec3) -> PathResult<()> {
        if !graph.is_node_alive(node) {
            return Err(PathError::DeadNode(node));
        }
        let p = graph.clamp_to_node(node, point);
        self.nodes.clear();
        self.nodes.push(node);
        self.parts.clear();
        self.parts.push(PathPart::Nodes { start: 0, end: 0 });
        self.start_point = p;
        self.end_point   = p;
        self.install(graph);
        Ok(())
    }

    /// Seed a trivial path at the node nearest `point`, within the repair
    /// snap distance.  Clears the path and returns `false` if there is none.
    pub fn seed(&mut self, graph: &NavGraph, point: Vec3) -> bool {
        match graph.nearest_node(point, &self.snap_constraints()) {
            Some(hit) => self.set_from_single_node(graph, hit.node, hit.point).is_ok(),
            None => {
                debug!(?point, "no walkable node near seed point");
                self.clear();
                false
            }
        }
    }

    /// Replace the path with a routed one.  On error the current path is
    /// kept as is.
    pub fn set_path(&mut self, graph: &NavGraph, path: &RoutedPath) -> PathResult<()> {
        validate(graph, &path.steps)?;

        self.nodes.clear();
        self.parts.clear();
        let mut run_start = 0;
        for step in &path.steps {
            match *step {
                PathStep::Node(n) => self.nodes.push(n),
                PathStep::Link { link, reverse } => {
                    self.parts.push(PathPart::Nodes { start: run_start, end: self.nodes.len() - 1 });
                    // Validated above: the link is alive.
                    if let Some(l) = graph.link(link) {
                        let (start, end) = l.endpoints(reverse);
                        self.parts.push(PathPart::Link { link, start, end, reverse });
                    }
                    run_start = self.nodes.len();
                }
            }
        }
        self.parts.push(PathPart::Nodes { start: run_start, end: self.nodes.len() - 1 });
        self.start_point = path.start_point;
        self.end_point   = path.end_point;
        self.install(graph);
        trace!(parts = self.parts.len(), version = self.version, "path assigned");
        Ok(())
    }

    fn install(&mut self, graph: &NavGraph) {
        self.has_path       = true;
        self.graph_revision = graph.revision();
        self.version       += 1;
        self.reset_flags();
    }

    fn reset_flags(&mut self) {
        self.start_failed = false;
        self.end_failed   = false;
        self.broken       = false;
        self.invalidated  = false;
    }

    /// Discard the first `n` parts.  Popping a link moves the start point to
    /// the link's exit.  Popping everything leaves no path.
    pub fn pop_parts(&mut self, n: usize) {
        let n = n.min(self.parts.len());
        if n == 0 {
            return;
        }
        let last_popped = self.parts[n - 1];
        self.parts.drain(..n);
        self.version += 1;

        if self.parts.is_empty() {
            self.nodes.clear();
            self.has_path = false;
            return;
        }
        if let PathPart::Link { end, .. } = last_popped {
            self.start_point = end;
        }
        let first_start = self.parts.iter().find_map(|p| match p {
            PathPart::Nodes { start, .. } => Some(*start),
            PathPart::Link { .. } => None,
        });
        if let Some(first_start) = first_start {
            self.nodes.drain(..first_start);
            for p in &mut self.parts {
                p.shift(-(first_start as isize));
            }
        }
        // A failure at the start referred to a part that is gone now.
        self.start_failed = false;
    }

    /// Re-check every node and link against a newer graph revision.
    /// Returns `true` if the path is stale afterwards.
    pub fn refresh(&mut self, graph: &NavGraph) -> bool {
        if self.has_path && graph.revision() != self.graph_revision {
            self.graph_revision = graph.revision();
            let was_broken = self.broken;
            self.broken = self.parts.iter().any(|p| match *p {
                PathPart::Nodes { start, end } => {
                    self.nodes[start..=end].iter().any(|n| !graph.is_node_alive(*n))
                }
                PathPart::Link { link, .. } => !graph.is_link_alive(link),
            });
            if self.broken && !was_broken {
                debug!(revision = self.graph_revision, "path crosses destroyed graph elements");
            }
        }
        self.is_stale()
    }

    // ── Repair ────────────────────────────────────────────────────────────

    /// Move the start of the path to `new_start`.
    pub fn update_start(&mut self, graph: &NavGraph, new_start: Vec3, quality: RepairQuality) -> RepairOutcome {
        self.repair(graph, End::Start, new_start, quality)
    }

    /// Move the end of the path to `new_end`.
    pub fn update_end(&mut self, graph: &NavGraph, new_end: Vec3, quality: RepairQuality) -> RepairOutcome {
        self.repair(graph, End::Finish, new_end, quality)
    }

    fn repair(&mut self, graph: &NavGraph, end: End, point: Vec3, quality: RepairQuality) -> RepairOutcome {
        if !self.has_path {
            return RepairOutcome::NoPath;
        }
        self.refresh(graph);

        let part_index = match end {
            End::Start  => 0,
            End::Finish => self.parts.len() - 1,
        };
        let PathPart::Nodes { start, end: last } = self.parts[part_index] else {
            return RepairOutcome::NoPath;
        };

        // Slide: the point stands on a node the end part already covers.
        let on_part = |k: usize| graph.project_onto_node(self.nodes[k], point).map(|p| (k, p));
        let slid = match end {
            End::Start  => (start..=last).find_map(on_part),
            End::Finish => (start..=last).rev().find_map(on_part),
        };
        if let Some((k, p)) = slid {
            self.slide(end, part_index, k, p);
            return RepairOutcome::Slid;
        }

        let Some(hit) = graph.nearest_node(point, &self.snap_constraints()) else {
            return self.fail(end, point, "no walkable node nearby");
        };
        if let Some(k) = (start..=last).find(|&k| self.nodes[k] == hit.node) {
            self.slide(end, part_index, k, hit.point);
            return RepairOutcome::Slid;
        }

        let Some((chain, k)) = self.search(graph, hit.node, start, last, end, quality) else {
            return self.fail(end, point, "no chain back to the path within bounds");
        };

        // chain = [hit.node, …, nodes[k]]
        let fresh = &chain[..chain.len() - 1];
        match end {
            End::Start => {
                let delta = fresh.len() as isize - k as isize;
                self.nodes.splice(0..k, fresh.iter().copied());
                for p in &mut self.parts[1..] {
                    p.shift(delta);
                }
                self.parts[0] = PathPart::Nodes { start: 0, end: last.wrapping_add_signed(delta) };
                self.start_point  = hit.point;
                self.start_failed = false;
            }
            End::Finish => {
                self.nodes.truncate(k + 1);
                self.nodes.extend(fresh.iter().rev().copied());
                self.parts[part_index] = PathPart::Nodes { start, end: self.nodes.len() - 1 };
                self.end_point  = hit.point;
                self.end_failed = false;
            }
        }
        self.version += 1;
        trace!(?end, spliced = fresh.len(), version = self.version, "path repaired");
        RepairOutcome::Repaired
    }

    fn slide(&mut self, end: End, part_index: usize, k: usize, point: Vec3) {
        match end {
            End::Start => {
                if let PathPart::Nodes { start, .. } = &mut self.parts[part_index] {
                    *start = k;
                }
                self.start_point  = point;
                self.start_failed = false;
            }
            End::Finish => {
                if let PathPart::Nodes { end, .. } = &mut self.parts[part_index] {
                    *end = k;
                }
                self.nodes.truncate(k + 1);
                self.end_point  = point;
                self.end_failed = false;
            }
        }
    }

    fn fail(&mut self, end: End, point: Vec3, reason: &'static str) -> RepairOutcome {
        match end {
            End::Start  => self.start_failed = true,
            End::Finish => self.end_failed   = true,
        }
        debug!(?end, ?point, reason, "path repair failed");
        RepairOutcome::Failed
    }

    /// Breadth-first search from `from` for any node of `nodes[lo..=hi]`,
    /// one depth level at a time.  Among targets first reached on the same
    /// level, the start end prefers the one furthest along the path and the
    /// finish end the one earliest.
    fn search(
        &self,
        graph:   &NavGraph,
        from:    NodeId,
        lo:      usize,
        hi:      usize,
        end:     End,
        quality: RepairQuality,
    ) -> Option<(Vec<NodeId>, usize)> {
        let mut targets: FxHashMap<NodeId, usize> = FxHashMap::default();
        for k in lo..=hi {
            let node = self.nodes[k];
            match end {
                End::Start  => { targets.insert(node, k); }
                End::Finish => { targets.entry(node).or_insert(k); }
            }
        }

        let max_depth   = self.limits.depth(quality);
        let max_visited = self.limits.max_visited(quality);

        let mut parent: FxHashMap<NodeId, NodeId> = FxHashMap::default();
        parent.insert(from, from);
        let mut frontier = vec![from];

        for _ in 0..max_depth {
            let mut next = Vec::new();
            let mut best: Option<(usize, NodeId)> = None;
            for &n in &frontier {
                for (m, _) in graph.neighbours(n) {
                    if parent.contains_key(&m) || !graph.node_allowed(m, &self.constraints) {
                        continue;
                    }
                    parent.insert(m, n);
                    match targets.get(&m) {
                        Some(&k) => {
                            let better = match (best, end) {
                                (None, _) => true,
                                (Some((b, _)), End::Start)  => k > b,
                                (Some((b, _)), End::Finish) => k < b,
                            };
                            if better {
                                best = Some((k, m));
                            }
                        }
                        None => next.push(m),
                    }
                }
            }
            if let Some((k, m)) = best {
                let mut chain = vec![m];
                let mut cur = m;
                while cur != from {
                    cur = parent[&cur];
                    chain.push(cur);
                }
                chain.reverse();
                return Some((chain, k));
            }
            if next.is_empty() || parent.len() > max_visited {
                return None;
            }
            frontier = next;
        }
        None
    }

    fn snap_constraints(&self) -> TraversalConstraints {
        TraversalConstraints {
            max_snap_distance: self.limits.snap_distance,
            ..self.constraints.clone()
        }
    }

    // ── Steering output ───────────────────────────────────────────────────

    /// Up to `max_count` corners to steer along, starting after the start
    /// point and stopping at the next link or the end of the path.
    /// Recomputed from scratch on every call.
    pub fn next_corners(&self, graph: &NavGraph, max_count: usize, out: &mut Vec<Vec3>) -> CornerBoundary {
        out.clear();
        if !self.has_path || max_count == 0 {
            return CornerBoundary::NoPath;
        }
        match self.parts[0] {
            PathPart::Link { start, .. } => {
                out.push(start);
                CornerBoundary::OffMeshLink(0)
            }
            PathPart::Nodes { start, end } => {
                let (to, boundary) = match self.parts.get(1) {
                    Some(PathPart::Link { start, .. }) => (*start, CornerBoundary::OffMeshLink(1)),
                    _ => (self.end_point, CornerBoundary::EndOfPath),
                };
                let nodes = &self.nodes[start..=end];
                if string_pull(graph, nodes, self.start_point, to, max_count, out) {
                    boundary
                } else {
                    CornerBoundary::Truncated
                }
            }
        }
    }

    /// The whole remaining route as a polyline, links included, starting at
    /// the start point.  `parts` receives a copy of the part list.  Returns
    /// whether the path is stale.
    pub fn remaining_path(
        &self,
        graph:  &NavGraph,
        points: &mut Vec<Vec3>,
        parts:  Option<&mut Vec<PathPart>>,
    ) -> bool {
        points.clear();
        if let Some(parts) = parts {
            parts.clear();
            parts.extend_from_slice(&self.parts);
        }
        if !self.has_path {
            return true;
        }

        points.push(self.start_point);
        let mut cursor = self.start_point;
        for (i, part) in self.parts.iter().enumerate() {
            match *part {
                PathPart::Nodes { start, end } => {
                    let to = match self.parts.get(i + 1) {
                        Some(PathPart::Link { start, .. }) => *start,
                        _ => self.end_point,
                    };
                    string_pull(graph, &self.nodes[start..=end], cursor, to, usize::MAX, points);
                    cursor = to;
                }
                PathPart::Link { start, end, .. } => {
                    if i == 0 && !same_spot(graph, start, self.start_point) {
                        points.push(start);
                    }
                    points.push(end);
                    cursor = end;
                }
            }
        }
        self.is_stale()
    }

    /// Length of [`remaining_path`](Self::remaining_path), or infinity when
    /// the path is missing or stale.  `scratch` is overwritten.
    pub fn remaining_distance(&self, graph: &NavGraph, scratch: &mut Vec<Vec3>) -> f32 {
        if self.is_stale() {
            return f32::INFINITY;
        }
        self.remaining_path(graph, scratch, None);
        polyline_length(scratch.iter().copied())
    }
}

/// Structural and liveness checks on a routed path.
fn validate(graph: &NavGraph, steps: &[PathStep]) -> PathResult<()> {
    match (steps.first(), steps.last()) {
        (None, _) | (_, None) => return Err(PathError::Empty),
        (Some(PathStep::Node(_)), Some(PathStep::Node(_))) => {}
        _ => return Err(PathError::DanglingLink),
    }
    for (i, step) in steps.iter().enumerate() {
        match *step {
            PathStep::Node(n) => {
                if !graph.is_node_alive(n) {
                    return Err(PathError::DeadNode(n));
                }
            }
            PathStep::Link { link, reverse } => {
                let l = graph
                    .link(link)
                    .filter(|l| l.alive)
                    .ok_or(PathError::DeadLink(link))?;
                let (entry, exit) = l.nodes(reverse);
                let before = steps[i - 1];
                let after  = steps[i + 1];
                if before != PathStep::Node(entry) || after != PathStep::Node(exit) {
                    return Err(PathError::LinkOutOfPlace(link));
                }
            }
        }
    }
    Ok(())
}
