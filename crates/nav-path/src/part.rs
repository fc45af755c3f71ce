//! Path parts and the small value types the tracer trades in.

use glam::Vec3;

use nav_core::LinkId;

/// One contiguous segment of a path.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathPart {
    /// Walk across `nodes[start..=end]` of the owning tracer.
    Nodes { start: usize, end: usize },

    /// Cross an off-mesh link from `start` to `end`.
    Link {
        link:    LinkId,
        start:   Vec3,
        end:     Vec3,
        reverse: bool,
    },
}

impl PathPart {
    #[inline]
    pub fn is_link(&self) -> bool {
        matches!(self, PathPart::Link { .. })
    }

    /// Number of nodes covered; 0 for links.
    #[inline]
    pub fn node_count(&self) -> usize {
        match *self {
            PathPart::Nodes { start, end } => end + 1 - start,
            PathPart::Link { .. } => 0,
        }
    }

    /// Move node indices by `delta`.  No effect on links.
    pub(crate) fn shift(&mut self, delta: isize) {
        if let PathPart::Nodes { start, end } = self {
            *start = start.wrapping_add_signed(delta);
            *end   = end.wrapping_add_signed(delta);
        }
    }
}

/// How hard a repair looks before giving up.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RepairQuality {
    Low,
    High,
}

/// Bounds on the breadth-first repair search.
///
/// A repair never visits more than `max_visited_*` nodes or walks more than
/// `*_depth` edges from the node nearest the new point, whatever the size of
/// the graph.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RepairLimits {
    pub low_depth:        u32,
    pub high_depth:       u32,
    pub low_max_visited:  usize,
    pub high_max_visited: usize,

    /// A point farther than this from every walkable node cannot be repaired
    /// onto the graph.
    pub snap_distance: f32,
}

impl RepairLimits {
    #[inline]
    pub fn depth(&self, quality: RepairQuality) -> u32 {
        match quality {
            RepairQuality::Low  => self.low_depth,
            RepairQuality::High => self.high_depth,
        }
    }

    #[inline]
    pub fn max_visited(&self, quality: RepairQuality) -> usize {
        match quality {
            RepairQuality::Low  => self.low_max_visited,
            RepairQuality::High => self.high_max_visited,
        }
    }
}

impl Default for RepairLimits {
    fn default() -> Self {
        Self {
            low_depth:        4,
            high_depth:       16,
            low_max_visited:  64,
            high_max_visited: 512,
            snap_distance:    1.0,
        }
    }
}

/// What a start or end update did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RepairOutcome {
    /// The point moved within the current end part.  Topology unchanged.
    Slid,
    /// A new chain of nodes was spliced in.  `version` was bumped.
    Repaired,
    /// No chain within the search bounds.  Topology untouched, path stale.
    Failed,
    /// There is no path to repair.
    NoPath,
}

impl RepairOutcome {
    #[inline]
    pub fn is_failure(self) -> bool {
        self == RepairOutcome::Failed
    }
}

/// Why [`next_corners`](crate::PathTracer::next_corners) stopped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CornerBoundary {
    /// The last corner is the end of the path.
    EndOfPath,
    /// The last corner is the entry of the link at this part index.
    OffMeshLink(usize),
    /// The output buffer was filled first.
    Truncated,
    /// Nothing to steer along.
    NoPath,
}
