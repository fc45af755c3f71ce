//! Off-mesh links: connectors between non-adjacent parts of the mesh
//! (ladders, jumps, teleporters) that agents cross outside normal steering.

use glam::Vec3;

use nav_core::NodeId;

/// One off-mesh link.  Endpoints are snapped to mesh nodes when the graph is
/// built.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OffMeshLink {
    pub start: Vec3,
    pub end:   Vec3,

    /// Node containing (or nearest to) `start`.
    pub start_node: NodeId,
    /// Node containing (or nearest to) `end`.
    pub end_node:   NodeId,

    /// `false` for one-way links (drop-downs).
    pub bidirectional: bool,

    /// Multiplier on the straight-line length when the router prices the link.
    pub cost_factor: f32,

    /// `false` once destroyed.  Ids are never reused.
    pub alive: bool,
}

impl OffMeshLink {
    /// Straight-line length between the endpoints.
    #[inline]
    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    /// `(entry, exit)` for a crossing in the given direction.
    #[inline]
    pub fn endpoints(&self, reverse: bool) -> (Vec3, Vec3) {
        if reverse { (self.end, self.start) } else { (self.start, self.end) }
    }

    /// `(entry_node, exit_node)` for a crossing in the given direction.
    #[inline]
    pub fn nodes(&self, reverse: bool) -> (NodeId, NodeId) {
        if reverse { (self.end_node, self.start_node) } else { (self.start_node, self.end_node) }
    }
}
