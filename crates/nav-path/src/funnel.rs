//! Funnel ("string pulling") over a corridor of adjacent nodes.
//!
//! Works in plane space: every portal endpoint is projected onto the
//! movement plane, the funnel is tightened there, and the world-space
//! portal vertices are emitted as corners.  A side is "left" when it lies
//! counter-clockwise of the walking direction.

use glam::{Vec2, Vec3};

use nav_core::NodeId;
use nav_graph::NavGraph;

const SAME_POINT_EPS_2: f32 = 1e-10;

#[inline]
fn cross(a: Vec2, b: Vec2) -> f32 {
    a.perp_dot(b)
}

#[inline]
fn same(a: Vec2, b: Vec2) -> bool {
    a.distance_squared(b) < SAME_POINT_EPS_2
}

/// Whether `a` and `b` fall on the same spot of the movement plane.
pub(crate) fn same_spot(graph: &NavGraph, a: Vec3, b: Vec3) -> bool {
    same(graph.plane.to_plane(a), graph.plane.to_plane(b))
}

/// Portals between consecutive nodes as `(left, right)`, bracketed by the
/// degenerate portals `(from, from)` and `(to, to)`.
pub fn portals(graph: &NavGraph, nodes: &[NodeId], from: Vec3, to: Vec3) -> Vec<(Vec3, Vec3)> {
    let mut out = Vec::with_capacity(nodes.len() + 1);
    out.push((from, from));
    for pair in nodes.windows(2) {
        match graph.portal(pair[0], pair[1]) {
            Some(portal) => out.push(portal),
            None => {
                // Not adjacent: pass through the far node's centre.
                let c = graph.node_center[pair[1].index()];
                out.push((c, c));
            }
        }
    }
    out.push((to, to));
    out
}

/// Append the corners of the shortest path from `from` to `to` through
/// `nodes` to `out`, not including `from`.  Stops after `max_count` corners
/// in total.  Returns `true` when `to` was reached.
pub fn string_pull(
    graph:     &NavGraph,
    nodes:     &[NodeId],
    from:      Vec3,
    to:        Vec3,
    max_count: usize,
    out:       &mut Vec<Vec3>,
) -> bool {
    let plane   = &graph.plane;
    let portals = portals(graph, nodes, from, to);
    let flat    = |v: Vec3| plane.to_plane(v);

    let push = |out: &mut Vec<Vec3>, p: Vec3| -> bool {
        if out.last().is_none_or(|last| !same(flat(*last), flat(p))) {
            out.push(p);
        }
        out.len() < max_count
    };

    if max_count == 0 || out.len() >= max_count {
        return false;
    }

    let mut apex    = from;
    let mut left    = from;
    let mut right   = from;
    let mut left_i  = 0;
    let mut right_i = 0;

    let mut i = 1;
    while i < portals.len() {
        let (l, r) = portals[i];
        let a = flat(apex);

        // Tighten the right side.
        if cross(flat(right) - a, flat(r) - a) >= 0.0 {
            if same(a, flat(right)) || cross(flat(left) - a, flat(r) - a) < 0.0 {
                right   = r;
                right_i = i;
            } else {
                // Right crossed over left: left is a corner.
                if !push(out, left) {
                    return false;
                }
                apex    = left;
                right   = apex;
                right_i = left_i;
                i = left_i + 1;
                continue;
            }
        }

        // Tighten the left side.
        if cross(flat(left) - a, flat(l) - a) <= 0.0 {
            if same(a, flat(left)) || cross(flat(right) - a, flat(l) - a) > 0.0 {
                left   = l;
                left_i = i;
            } else {
                if !push(out, right) {
                    return false;
                }
                apex   = right;
                left   = apex;
                left_i = right_i;
                i = right_i + 1;
                continue;
            }
        }

        i += 1;
    }

    if out.last().is_none_or(|last| !same(flat(*last), flat(to))) {
        out.push(to);
    }
    true
}
