//! `nav-graph` — the navigation graph agents move across.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                      |
//! |--------------|---------------------------------------------------------------|
//! | [`graph`]    | `NavGraph` (triangles in CSR + R-tree), `NavGraphBuilder`      |
//! | [`link`]     | `OffMeshLink`                                                 |
//! | [`geometry`] | triangle projection and clamping helpers                      |
//! | [`presets`]  | grid and corridor meshes for prototyping                      |
//! | [`router`]   | `Router` trait, `RoutedPath`, `AStarRouter`                   |
//! | [`error`]    | `GraphError`, `GraphResult<T>`                                |
//!
//! The graph is owned outside the agents and passed by reference into every
//! navigation call.  Destroying nodes or links bumps [`NavGraph::revision`]
//! so path holders know to re-validate.
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on plain data types.        |

pub mod error;
pub mod geometry;
pub mod graph;
pub mod link;
pub mod presets;
pub mod router;


pub use error::{GraphError, GraphResult};
pub use graph::{NavGraph, NavGraphBuilder, NodeHit, TraversalConstraints};
pub use link::OffMeshLink;
pub use router::{AStarRouter, PathStep, RoutedPath, Router};
