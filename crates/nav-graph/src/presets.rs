//! Ready-made meshes for prototyping and tests.

use glam::Vec2;

use nav_core::MovementPlane;

use crate::NavGraphBuilder;

/// A `cols × rows` grid of square cells, each split into two triangles,
/// lying flat in `plane` with its origin corner at the plane origin.
pub fn grid(plane: MovementPlane, cols: u32, rows: u32, cell: f32) -> NavGraphBuilder {
    grid_with(plane, cols, rows, cell, |_, _| true)
}

/// Like [`grid`], but only cells for which `walkable(col, row)` holds get
/// triangles.
pub fn grid_with(
    plane:    MovementPlane,
    cols:     u32,
    rows:     u32,
    cell:     f32,
    walkable: impl Fn(u32, u32) -> bool,
) -> NavGraphBuilder {
    let mut b = NavGraphBuilder::new(plane);
    let stride = cols + 1;
    for r in 0..=rows {
        for c in 0..=cols {
            b.add_vertex(plane.to_world(Vec2::new(c as f32 * cell, r as f32 * cell), 0.0));
        }
    }
    for r in 0..rows {
        for c in 0..cols {
            if !walkable(c, r) {
                continue;
            }
            let v = |dc: u32, dr: u32| (r + dr) * stride + c + dc;
            b.add_quad(v(0, 0), v(1, 0), v(1, 1), v(0, 1));
        }
    }
    b
}

/// A straight corridor one cell wide along the plane's first axis.
pub fn corridor(plane: MovementPlane, length_cells: u32, cell: f32) -> NavGraphBuilder {
    grid(plane, length_cells, 1, cell)
}
