//! `nav-sim` — tick orchestrator for the navigation agents.
//!
//! # Sub-step loop
//!
//! ```text
//! every tick:
//!   solve the full-plan requests queued during the previous tick
//!   for each of ceil(time_scale) sub-steps (at most max_substeps):
//!     ① Deliver   — hand solved plans to their agents (first sub-step only;
//!                   late or despawned answers are dropped).
//!     ② Produce   — per agent: repair the path, decide on a re-plan, then
//!                   either step the active link crossing or steer along
//!                   the corners (parallel with the `parallel` feature).
//!     ③ Submit    — in slot order: queue plan requests, submit avoidance
//!                   inputs, then one avoidance solve.
//!     ④ Resolve   — per agent: merge the avoidance answer, apply the
//!                   limits, integrate, refresh the reached flags.
//!     ⑤ Dispatch  — in slot order: queued events go to the observer.
//! ```
//!
//! # Crate layout
//!
//! | Module         | Contents                                              |
//! |----------------|-------------------------------------------------------|
//! | [`config`]     | `NavConfig`                                           |
//! | [`requests`]   | `PathRequestQueue`, `PendingPlan`                     |
//! | [`integrator`] | `Integrator`, `ClampingIntegrator`, `FreeIntegrator`  |
//! | [`observer`]   | `NavObserver`, `NoopObserver`, `EventLog`             |
//! | [`sim`]        | `NavSim`                                              |
//! | [`builder`]    | `NavSimBuilder`                                       |
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                  |
//! |------------|---------------------------------------------------------|
//! | `parallel` | Runs the produce and resolve phases on Rayon's pool.    |
//! | `serde`    | Derives `Serialize`/`Deserialize` on `NavConfig`.       |
//! | `toml`     | Adds `NavConfig::from_toml_str`.                        |

pub mod builder;
pub mod config;
pub mod error;
pub mod integrator;
pub mod observer;
pub mod requests;
pub mod sim;


pub use builder::NavSimBuilder;
pub use config::NavConfig;
pub use error::{SimError, SimResult};
pub use integrator::{ClampingIntegrator, FreeIntegrator, Integrator};
pub use observer::{EventLog, NavObserver, NoopObserver};
pub use requests::{PathRequestQueue, PendingPlan};
pub use sim::NavSim;
