//! Navigation mesh representation and builder.
//!
//! # Data layout
//!
//! Nodes are triangles.  Node-to-node adjacency uses **Compressed Sparse
//! Row (CSR)** format: the neighbours of `NodeId n` occupy
//!
//! ```text
//! adj_to[ node_adj_start[n] .. node_adj_start[n+1] ]
//! ```
//!
//! with the shared edge (the *portal*) at the same index in `adj_portal`.
//! Iterating a node's neighbours is a contiguous memory scan, which is what
//! both the A* inner loop and the tracer's local repair search do most.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) over triangle bounding boxes answers "nearest
//! walkable node to this point" with the exact point-to-triangle distance.
//!
//! # Mutation
//!
//! Nodes and links can be destroyed after build (doors closing, bridges
//! collapsing).  Destruction only flips a liveness flag, so ids stay valid
//! indices, and bumps [`NavGraph::revision`].

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use rustc_hash::FxHashMap;
use tracing::debug;

use glam::Vec3;
use nav_core::{LinkId, MovementPlane, NavError, NodeId};

use crate::geometry::{closest_point_on_triangle, project_onto_triangle};
use crate::{GraphError, GraphResult, OffMeshLink};

/// Barycentric slack when deciding whether a point lies inside a triangle.
const CONTAINS_EPS: f32 = 1e-4;

// ── R-tree node entry ─────────────────────────────────────────────────────────

/// Entry stored in the R-tree: one triangle with its `NodeId`.
#[derive(Clone)]
struct NodeEntry {
    corners: [Vec3; 3],
    id:      NodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f32; 3]>;
    fn envelope(&self) -> Self::Envelope {
        let [a, b, c] = self.corners;
        AABB::from_corners(a.min(b).min(c).to_array(), a.max(b).max(c).to_array())
    }
}

impl PointDistance for NodeEntry {
    /// Exact squared distance from the point to the solid triangle.
    fn distance_2(&self, point: &[f32; 3]) -> f32 {
        let p = Vec3::from_array(*point);
        let [a, b, c] = self.corners;
        closest_point_on_triangle(p, a, b, c).distance_squared(p)
    }
}

// ── Constraints ───────────────────────────────────────────────────────────────

/// Which nodes a query may use.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TraversalConstraints {
    /// Bit `t` set ⇒ nodes tagged `t` are walkable.
    pub tag_mask: u32,

    /// Points farther than this from every walkable node have no node.
    pub max_snap_distance: f32,

    /// Return a path to the closest reachable node when the target node
    /// cannot be reached, instead of failing.
    pub allow_partial: bool,
}

impl TraversalConstraints {
    #[inline]
    pub fn allows_tag(&self, tag: u8) -> bool {
        tag < 32 && self.tag_mask & (1 << tag) != 0
    }
}

impl Default for TraversalConstraints {
    fn default() -> Self {
        Self {
            tag_mask:          u32::MAX,
            max_snap_distance: 2.0,
            allow_partial:     false,
        }
    }
}

/// Result of a nearest-node query.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NodeHit {
    pub node:  NodeId,
    /// The query point moved onto the node's surface.
    pub point: Vec3,
}

// ── NavGraph ──────────────────────────────────────────────────────────────────

/// Triangle navigation mesh with off-mesh links and a spatial index.
///
/// Geometry fields are `pub` for direct indexed access on hot paths.  Do not
/// construct directly; use [`NavGraphBuilder`].
pub struct NavGraph {
    /// Up direction shared by every node.
    pub plane: MovementPlane,

    // ── Geometry ──────────────────────────────────────────────────────────
    pub vertices: Vec<Vec3>,

    /// Vertex indices of each triangle.  Indexed by `NodeId`.
    pub node_corners: Vec<[u32; 3]>,

    /// Centroid of each triangle.
    pub node_center: Vec<Vec3>,

    /// Area tag of each triangle, filtered by [`TraversalConstraints::tag_mask`].
    pub node_tag: Vec<u8>,

    node_alive: Vec<bool>,

    // ── CSR adjacency ─────────────────────────────────────────────────────
    /// CSR row pointer.  Length = `node_count + 1`.
    pub node_adj_start: Vec<u32>,

    /// Neighbouring node across each shared edge.
    pub adj_to: Vec<NodeId>,

    /// Vertex indices of each shared edge.
    pub adj_portal: Vec<[u32; 2]>,

    // ── Links ─────────────────────────────────────────────────────────────
    links:      Vec<OffMeshLink>,
    /// Links that can be *entered* from each node, with their direction.
    node_links: Vec<Vec<(LinkId, bool)>>,

    /// Bumped on every destruction.
    revision: u64,

    /// How far above or below a triangle a point may be and still count as
    /// standing on it.
    vertical_tolerance: f32,

    spatial_idx: RTree<NodeEntry>,
}

impl NavGraph {
    // ── Dimensions ────────────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_corners.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_corners.is_empty()
    }

    /// Counter bumped whenever a node or link is destroyed.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ── Liveness ──────────────────────────────────────────────────────────

    /// `false` for destroyed or out-of-range nodes.
    #[inline]
    pub fn is_node_alive(&self, node: NodeId) -> bool {
        self.node_alive.get(node.index()).copied().unwrap_or(false)
    }

    /// `false` for destroyed or out-of-range links.
    #[inline]
    pub fn is_link_alive(&self, link: LinkId) -> bool {
        self.links.get(link.index()).is_some_and(|l| l.alive)
    }

    /// Alive and allowed by `constraints`.
    #[inline]
    pub fn node_allowed(&self, node: NodeId, constraints: &TraversalConstraints) -> bool {
        self.is_node_alive(node) && constraints.allows_tag(self.node_tag[node.index()])
    }

    pub fn link(&self, link: LinkId) -> Option<&OffMeshLink> {
        self.links.get(link.index())
    }

    // ── Traversal ─────────────────────────────────────────────────────────

    /// Live neighbours of `node` with the shared-edge vertex indices.
    pub fn neighbours(&self, node: NodeId) -> impl Iterator<Item = (NodeId, [u32; 2])> + '_ {
        let start = self.node_adj_start[node.index()] as usize;
        let end   = self.node_adj_start[node.index() + 1] as usize;
        (start..end)
            .map(|i| (self.adj_to[i], self.adj_portal[i]))
            .filter(|(n, _)| self.is_node_alive(*n))
    }

    /// Live links that can be entered from `node`, as `(link, reverse)`.
    pub fn links_from(&self, node: NodeId) -> impl Iterator<Item = (LinkId, bool)> + '_ {
        self.node_links[node.index()]
            .iter()
            .copied()
            .filter(|(l, _)| self.is_link_alive(*l))
    }

    /// `true` if `a` and `b` share an edge.
    pub fn are_adjacent(&self, a: NodeId, b: NodeId) -> bool {
        self.neighbours(a).any(|(n, _)| n == b)
    }

    /// World-space corners of `node`.
    #[inline]
    pub fn corners(&self, node: NodeId) -> [Vec3; 3] {
        let [a, b, c] = self.node_corners[node.index()];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    /// Shared edge between adjacent nodes as `(left, right)` when walking
    /// from `from` into `to`.  "Left" is counter-clockwise of the walking
    /// direction in plane space.
    pub fn portal(&self, from: NodeId, to: NodeId) -> Option<(Vec3, Vec3)> {
        let [v0, v1] = self.neighbours(from).find(|(n, _)| *n == to)?.1;
        let a = self.vertices[v0 as usize];
        let b = self.vertices[v1 as usize];

        // The corner of `from` that is not on the shared edge lies behind it.
        let behind = self.node_corners[from.index()]
            .iter()
            .copied()
            .find(|&v| v != v0 && v != v1)
            .map(|v| self.vertices[v as usize])
            .unwrap_or(self.node_center[from.index()]);

        let p = &self.plane;
        let forward = p.to_plane((a + b) * 0.5) - p.to_plane(behind);
        let to_a    = p.to_plane(a) - p.to_plane(behind);
        if forward.perp_dot(to_a) > 0.0 { Some((a, b)) } else { Some((b, a)) }
    }

    // ── Point queries ─────────────────────────────────────────────────────

    /// The point on `node` vertically above or below `p`, if `p` stands on it.
    pub fn project_onto_node(&self, node: NodeId, p: Vec3) -> Option<Vec3> {
        let on = project_onto_triangle(p, self.corners(node), &self.plane, CONTAINS_EPS)?;
        let dh = (self.plane.elevation(p) - self.plane.elevation(on)).abs();
        (dh <= self.vertical_tolerance).then_some(on)
    }

    /// `p` moved onto `node`: straight down if it stands on it, otherwise to
    /// the closest point of the triangle.
    pub fn clamp_to_node(&self, node: NodeId, p: Vec3) -> Vec3 {
        self.project_onto_node(node, p).unwrap_or_else(|| {
            let [a, b, c] = self.corners(node);
            closest_point_on_triangle(p, a, b, c)
        })
    }

    /// Nearest walkable node to `p` within `constraints.max_snap_distance`.
    ///
    /// Cost is one R-tree descent plus a skip over destroyed or disallowed
    /// nodes; never proportional to the mesh size.
    pub fn nearest_node(&self, p: Vec3, constraints: &TraversalConstraints) -> Option<NodeHit> {
        let max_2 = constraints.max_snap_distance * constraints.max_snap_distance;
        self.spatial_idx
            .nearest_neighbor_iter_with_distance_2(&p.to_array())
            .take_while(|(_, d2)| *d2 <= max_2)
            .find(|(e, _)| self.node_allowed(e.id, constraints))
            .map(|(e, _)| NodeHit { node: e.id, point: self.clamp_to_node(e.id, p) })
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Destroy a node.  Links touching it die with it.
    pub fn destroy_node(&mut self, node: NodeId) -> GraphResult<()> {
        if node.index() >= self.node_count() {
            return Err(NavError::NodeNotFound(node).into());
        }
        if !self.node_alive[node.index()] {
            return Ok(());
        }
        self.node_alive[node.index()] = false;
        for link in self.links.iter_mut() {
            if link.start_node == node || link.end_node == node {
                link.alive = false;
            }
        }
        self.revision += 1;
        debug!(%node, revision = self.revision, "navigation node destroyed");
        Ok(())
    }

    /// Destroy an off-mesh link.
    pub fn destroy_link(&mut self, link: LinkId) -> GraphResult<()> {
        let entry = self
            .links
            .get_mut(link.index())
            .ok_or(NavError::LinkNotFound(link))?;
        if entry.alive {
            entry.alive = false;
            self.revision += 1;
            debug!(%link, revision = self.revision, "off-mesh link destroyed");
        }
        Ok(())
    }
}

// ── NavGraphBuilder ───────────────────────────────────────────────────────────

/// Construct a [`NavGraph`] incrementally, then call [`build`](Self::build).
///
/// `build()` discovers shared edges, constructs the CSR arrays, bulk-loads
/// the R-tree and snaps link endpoints onto the mesh.
///
/// # Example
///
/// ```
/// use glam::Vec3;
/// use nav_core::MovementPlane;
/// use nav_graph::NavGraphBuilder;
///
/// let mut b = NavGraphBuilder::new(MovementPlane::XZ);
/// let v0 = b.add_vertex(Vec3::new(0.0, 0.0, 0.0));
/// let v1 = b.add_vertex(Vec3::new(1.0, 0.0, 0.0));
/// let v2 = b.add_vertex(Vec3::new(1.0, 0.0, 1.0));
/// let v3 = b.add_vertex(Vec3::new(0.0, 0.0, 1.0));
/// b.add_quad(v0, v1, v2, v3);
/// let graph = b.build().unwrap();
/// assert_eq!(graph.node_count(), 2);
/// assert_eq!(graph.adj_to.len(), 2); // one shared edge, both directions
/// ```
pub struct NavGraphBuilder {
    plane:              MovementPlane,
    vertices:           Vec<Vec3>,
    triangles:          Vec<([u32; 3], u8)>,
    raw_links:          Vec<RawLink>,
    vertical_tolerance: f32,
}

struct RawLink {
    start:         Vec3,
    end:           Vec3,
    bidirectional: bool,
    cost_factor:   f32,
}

impl NavGraphBuilder {
    pub fn new(plane: MovementPlane) -> Self {
        Self {
            plane,
            vertices:           Vec::new(),
            triangles:          Vec::new(),
            raw_links:          Vec::new(),
            vertical_tolerance: 1.0,
        }
    }

    /// Points within this distance above or below a triangle stand on it.
    pub fn vertical_tolerance(mut self, tolerance: f32) -> Self {
        self.vertical_tolerance = tolerance;
        self
    }

    /// Add a vertex and return its index (sequential from 0).
    pub fn add_vertex(&mut self, pos: Vec3) -> u32 {
        self.vertices.push(pos);
        (self.vertices.len() - 1) as u32
    }

    /// Add a triangle with area tag 0.
    pub fn add_triangle(&mut self, a: u32, b: u32, c: u32) -> NodeId {
        self.add_tagged_triangle(a, b, c, 0)
    }

    pub fn add_tagged_triangle(&mut self, a: u32, b: u32, c: u32, tag: u8) -> NodeId {
        self.triangles.push(([a, b, c], tag));
        NodeId((self.triangles.len() - 1) as u32)
    }

    /// Convenience: split the quad `abcd` along `ac` into two triangles.
    pub fn add_quad(&mut self, a: u32, b: u32, c: u32, d: u32) -> [NodeId; 2] {
        [self.add_triangle(a, b, c), self.add_triangle(a, c, d)]
    }

    /// Add an off-mesh link priced at its straight-line length.
    pub fn add_link(&mut self, start: Vec3, end: Vec3, bidirectional: bool) -> LinkId {
        self.add_link_with_cost(start, end, bidirectional, 1.0)
    }

    pub fn add_link_with_cost(
        &mut self,
        start:         Vec3,
        end:           Vec3,
        bidirectional: bool,
        cost_factor:   f32,
    ) -> LinkId {
        self.raw_links.push(RawLink { start, end, bidirectional, cost_factor });
        LinkId((self.raw_links.len() - 1) as u32)
    }

    pub fn node_count(&self) -> usize { self.triangles.len() }
    pub fn vertex_count(&self) -> usize { self.vertices.len() }

    /// Consume the builder and produce a [`NavGraph`].
    ///
    /// Time complexity: O(T) for edge discovery + O(A log A) for the CSR
    /// sort + O(T log T) for the R-tree bulk load, where T = triangles and
    /// A = adjacency entries.
    pub fn build(self) -> GraphResult<NavGraph> {
        let node_count = self.triangles.len();

        for (tri, _) in &self.triangles {
            if let Some(&bad) = tri.iter().find(|&&v| v as usize >= self.vertices.len()) {
                return Err(GraphError::BadVertex(bad));
            }
        }

        // Discover shared edges: sorted vertex pair → triangles using it.
        let mut edge_owners: FxHashMap<(u32, u32), Vec<NodeId>> = FxHashMap::default();
        for (i, (tri, _)) in self.triangles.iter().enumerate() {
            for k in 0..3 {
                let (a, b) = (tri[k], tri[(k + 1) % 3]);
                let key = if a < b { (a, b) } else { (b, a) };
                edge_owners.entry(key).or_default().push(NodeId(i as u32));
            }
        }

        let mut raw_adj: Vec<(NodeId, NodeId, [u32; 2])> = Vec::new();
        for (&(a, b), owners) in &edge_owners {
            for &from in owners {
                for &to in owners {
                    if from != to {
                        raw_adj.push((from, to, [a, b]));
                    }
                }
            }
        }
        // Sort by (from, to) so neighbour order never depends on hash order.
        raw_adj.sort_unstable_by_key(|(from, to, _)| (from.0, to.0));

        let adj_to:     Vec<NodeId>   = raw_adj.iter().map(|(_, to, _)| *to).collect();
        let adj_portal: Vec<[u32; 2]> = raw_adj.iter().map(|(_, _, p)| *p).collect();

        let mut node_adj_start = vec![0u32; node_count + 1];
        for (from, _, _) in &raw_adj {
            node_adj_start[from.index() + 1] += 1;
        }
        for i in 1..=node_count {
            node_adj_start[i] += node_adj_start[i - 1];
        }
        debug_assert_eq!(node_adj_start[node_count] as usize, adj_to.len());

        let corners_of = |tri: &[u32; 3]| tri.map(|v| self.vertices[v as usize]);
        let node_center: Vec<Vec3> = self
            .triangles
            .iter()
            .map(|(tri, _)| {
                let [a, b, c] = corners_of(tri);
                (a + b + c) / 3.0
            })
            .collect();

        let entries: Vec<NodeEntry> = self
            .triangles
            .iter()
            .enumerate()
            .map(|(i, (tri, _))| NodeEntry { corners: corners_of(tri), id: NodeId(i as u32) })
            .collect();

        let mut graph = NavGraph {
            plane:              self.plane,
            node_corners:       self.triangles.iter().map(|(t, _)| *t).collect(),
            node_tag:           self.triangles.iter().map(|(_, tag)| *tag).collect(),
            vertices:           self.vertices,
            node_center,
            node_alive:         vec![true; node_count],
            node_adj_start,
            adj_to,
            adj_portal,
            links:              Vec::with_capacity(self.raw_links.len()),
            node_links:         vec![Vec::new(); node_count],
            revision:           0,
            vertical_tolerance: self.vertical_tolerance,
            spatial_idx:        RTree::bulk_load(entries),
        };

        // Snap link endpoints now that the spatial index exists.
        let snap = TraversalConstraints {
            max_snap_distance: f32::INFINITY,
            ..TraversalConstraints::default()
        };
        for (i, raw) in self.raw_links.into_iter().enumerate() {
            let id = LinkId(i as u32);
            let start = graph.nearest_node(raw.start, &snap).ok_or(GraphError::UnsnappedLink(id))?;
            let end   = graph.nearest_node(raw.end, &snap).ok_or(GraphError::UnsnappedLink(id))?;
            graph.node_links[start.node.index()].push((id, false));
            if raw.bidirectional {
                graph.node_links[end.node.index()].push((id, true));
            }
            graph.links.push(OffMeshLink {
                start:         raw.start,
                end:           raw.end,
                start_node:    start.node,
                end_node:      end.node,
                bidirectional: raw.bidirectional,
                cost_factor:   raw.cost_factor,
                alive:         true,
            });
        }

        Ok(graph)
    }
}

impl Default for NavGraphBuilder {
    fn default() -> Self {
        Self::new(MovementPlane::XZ)
    }
}
