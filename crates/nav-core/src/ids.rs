//! Strongly typed, zero-cost identifier wrappers.
//!
//! Plain ids (`NodeId`, `LinkId`, `RequestId`) are indices into
//! externally-owned arrays.  Handles (`AgentHandle`, `SlotHandle`) pair an
//! index with a generation so a handle to a freed slot is detectably dead
//! instead of silently aliasing whatever reused the slot.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID".
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

/// Generate an index + generation handle.
macro_rules! generational_handle {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name {
            pub index:      u32,
            pub generation: u32,
        }

        impl $name {
            #[inline(always)]
            pub fn new(index: u32, generation: u32) -> Self {
                Self { index, generation }
            }

            #[inline(always)]
            pub fn index(self) -> usize {
                self.index as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}v{})", stringify!($name), self.index, self.generation)
            }
        }
    };
}

typed_id! {
    /// Index of a navigation-graph node (one navmesh triangle).
    pub struct NodeId(u32);
}

typed_id! {
    /// Index of an off-mesh link.
    pub struct LinkId(u32);
}

typed_id! {
    /// Monotonic id of a full-path request.  A result whose id does not match
    /// the agent's outstanding request is a late answer and is dropped.
    pub struct RequestId(u64);
}

generational_handle! {
    /// Stable handle to an agent in the agent arena.
    pub struct AgentHandle;
}

generational_handle! {
    /// Registration of one agent in the shared avoidance simulation.
    pub struct SlotHandle;
}
