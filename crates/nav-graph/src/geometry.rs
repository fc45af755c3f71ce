//! Triangle helpers used by the graph, the tracer, and the funnel.

use glam::{Vec2, Vec3};

use nav_core::MovementPlane;

/// Twice the signed area of triangle `abc` in plane space.  Positive when
/// `c` lies counter-clockwise of the ray `a → b`.
#[inline]
pub fn tri_area_2d(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a)
}

/// Barycentric weights of `p` in triangle `abc`, or `None` for a degenerate
/// triangle.
pub fn barycentric_2d(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> Option<Vec3> {
    let area = tri_area_2d(a, b, c);
    if area.abs() < 1e-12 {
        return None;
    }
    let wa = tri_area_2d(b, c, p) / area;
    let wb = tri_area_2d(c, a, p) / area;
    Some(Vec3::new(wa, wb, 1.0 - wa - wb))
}

/// Point on triangle `corners` directly above or below `p` along the plane
/// normal, if `p` lies inside the triangle's ground footprint (with `eps`
/// slack on the barycentric weights).
pub fn project_onto_triangle(
    p:       Vec3,
    corners: [Vec3; 3],
    plane:   &MovementPlane,
    eps:     f32,
) -> Option<Vec3> {
    let [a, b, c] = corners;
    let w = barycentric_2d(
        plane.to_plane(p),
        plane.to_plane(a),
        plane.to_plane(b),
        plane.to_plane(c),
    )?;
    if w.x < -eps || w.y < -eps || w.z < -eps {
        return None;
    }
    let elevation = w.x * plane.elevation(a) + w.y * plane.elevation(b) + w.z * plane.elevation(c);
    Some(plane.to_world(plane.to_plane(p), elevation))
}

/// Closest point to `p` on the (solid) triangle `abc`, in 3D.
///
/// Voronoi-region walk from Ericson, *Real-Time Collision Detection* §5.1.5.
pub fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

/// Length of a polyline.
pub fn polyline_length(points: impl IntoIterator<Item = Vec3>) -> f32 {
    let mut total = 0.0;
    let mut prev: Option<Vec3> = None;
    for p in points {
        if let Some(q) = prev {
            total += q.distance(p);
        }
        prev = Some(p);
    }
    total
}
