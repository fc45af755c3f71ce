//! Off-mesh link crossings as an explicit, resumable state machine.
//!
//! # Phases
//!
//! ```text
//! NotTraversing ──lead-in crossed──▶ Entering ──next step──▶ Traversing
//!       ▲                                                        │
//!       │                                  handler: Continue ◀───┤
//!       ├──────────────── Finished ◀──── handler: Done ──────────┤
//!       └──────────────── Aborted  ◀──── handler: Aborted,       │
//!                                        link destroyed, cancel ─┘
//! ```
//!
//! The machine is stepped once per sub-step by the owning agent.  `Finished`
//! and `Aborted` are reported by [`OffMeshLinkTraversal::step`] and the agent
//! then takes the context, which puts the machine back to `NotTraversing`.
//!
//! While a context exists, new paths are parked in the machine and applied
//! once the crossing ends.

use std::sync::Arc;

use glam::{Quat, Vec3};
use rustc_hash::FxHashMap;
use tracing::trace;

use nav_core::{LinkId, MovementPlane};
use nav_graph::{NavGraph, RoutedPath};

/// Where an agent is in a link crossing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TraversalPhase {
    NotTraversing,
    /// Lead-in crossed; the agent is put on the link entry.
    Entering,
    /// A [`LinkHandler`] drives the agent.
    Traversing,
    Finished,
    Aborted,
}

/// Result of one handler step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LinkStep {
    Continue,
    Done,
    Aborted,
}

/// Why a crossing was aborted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AbortReason {
    /// The link was destroyed while the agent was on it.
    LinkDestroyed,
    /// The link handler gave up.
    Handler,
    /// Cancelled from outside, or interrupted by a teleport.
    Cancelled,
}

/// Everything known about the crossing in progress.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkTraversalContext {
    pub link:    LinkId,
    /// Entry point, in the direction of travel.
    pub start:   Vec3,
    /// Exit point, in the direction of travel.
    pub end:     Vec3,
    pub reverse: bool,

    /// Avoidance was switched off for this crossing and must be switched
    /// back on when it ends, however it ends.
    pub avoidance_suspended: bool,

    /// Seconds spent in `Traversing`.
    pub elapsed: f32,
    pub phase:   TraversalPhase,

    /// Where the agent stood when the crossing began.
    pub entry_position: Vec3,

    /// Parts up to and including the link, popped on success.
    pub(crate) parts_to_pop: usize,
}

/// The part of the agent's transform a link handler may drive.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LinkPose {
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    /// The agent's cruising speed.
    pub speed:    f32,
    pub plane:    MovementPlane,
}

/// Custom crossing behaviour (jumps, ladders, doors…).
///
/// Handlers are shared between agents and may be stepped from several
/// threads at once, so all per-crossing state lives in the
/// [`LinkTraversalContext`].
pub trait LinkHandler: Send + Sync + 'static {
    /// Advance the crossing by `dt` seconds.
    fn step(&self, link: &LinkTraversalContext, pose: &mut LinkPose, dt: f32) -> LinkStep;
}

// ── LinearLinkHandler ─────────────────────────────────────────────────────────

/// Walks straight from entry to exit, facing the direction of travel.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct LinearLinkHandler {
    /// Overrides the agent's speed on the link.
    pub speed: Option<f32>,
}

impl LinkHandler for LinearLinkHandler {
    fn step(&self, link: &LinkTraversalContext, pose: &mut LinkPose, dt: f32) -> LinkStep {
        let speed  = self.speed.unwrap_or(pose.speed).max(0.0);
        let to_end = link.end - pose.position;
        let dist   = to_end.length();
        let reach  = speed * dt;

        if dist <= reach || dist < 1e-4 {
            pose.velocity = if dt > 0.0 { to_end / dt } else { Vec3::ZERO };
            pose.position = link.end;
            return LinkStep::Done;
        }
        let dir = to_end / dist;
        pose.velocity  = dir * speed;
        pose.position += pose.velocity * dt;
        if let Some(yaw) = pose.plane.yaw_of_direction(dir) {
            pose.rotation = pose.plane.rotation_from_yaw(yaw);
        }
        LinkStep::Continue
    }
}

// ── LinkHandlers ──────────────────────────────────────────────────────────────

/// Handler registry: one default plus per-link overrides.
#[derive(Clone)]
pub struct LinkHandlers {
    default: Arc<dyn LinkHandler>,
    custom:  FxHashMap<LinkId, Arc<dyn LinkHandler>>,
}

impl Default for LinkHandlers {
    fn default() -> Self {
        Self {
            default: Arc::new(LinearLinkHandler::default()),
            custom:  FxHashMap::default(),
        }
    }
}

impl LinkHandlers {
    pub fn set_default(&mut self, handler: impl LinkHandler) {
        self.default = Arc::new(handler);
    }

    pub fn register(&mut self, link: LinkId, handler: impl LinkHandler) {
        self.custom.insert(link, Arc::new(handler));
    }

    /// Returns `true` if a custom handler was registered.
    pub fn unregister(&mut self, link: LinkId) -> bool {
        self.custom.remove(&link).is_some()
    }

    pub fn handler_for(&self, link: LinkId) -> &dyn LinkHandler {
        self.custom.get(&link).unwrap_or(&self.default).as_ref()
    }
}

// ── OffMeshLinkTraversal ──────────────────────────────────────────────────────

/// A path that arrived mid-crossing.
#[derive(Clone, Debug, PartialEq)]
pub struct ParkedPath {
    pub path:               RoutedPath,
    /// Make the path's end the new destination.
    pub update_destination: bool,
    /// Repair the path's end onto the current destination when installed.
    pub align_end:          bool,
}

/// The per-agent state machine.
#[derive(Clone, Debug, Default)]
pub struct OffMeshLinkTraversal {
    context:       Option<LinkTraversalContext>,
    deferred_path: Option<ParkedPath>,
}

impl OffMeshLinkTraversal {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.context.is_some()
    }

    pub fn phase(&self) -> TraversalPhase {
        self.context.as_ref().map_or(TraversalPhase::NotTraversing, |c| c.phase)
    }

    pub fn context(&self) -> Option<&LinkTraversalContext> {
        self.context.as_ref()
    }

    /// Start crossing.  `link_part` is the index of the link among the
    /// path's parts.
    pub fn begin(
        &mut self,
        link:           LinkId,
        start:          Vec3,
        end:            Vec3,
        reverse:        bool,
        link_part:      usize,
        entry_position: Vec3,
    ) -> &mut LinkTraversalContext {
        trace!(%link, reverse, "entering off-mesh link");
        self.context.insert(LinkTraversalContext {
            link,
            start,
            end,
            reverse,
            avoidance_suspended: false,
            elapsed:             0.0,
            phase:               TraversalPhase::Entering,
            entry_position,
            parts_to_pop:        link_part + 1,
        })
    }

    /// Advance one sub-step.  `Done` and `Aborted` leave the context in the
    /// `Finished` or `Aborted` phase for the caller to [`take`](Self::take).
    pub fn step(
        &mut self,
        graph:    &NavGraph,
        handlers: &LinkHandlers,
        pose:     &mut LinkPose,
        dt:       f32,
    ) -> Option<(LinkStep, Option<AbortReason>)> {
        let ctx = self.context.as_mut()?;
        if !graph.is_link_alive(ctx.link) {
            ctx.phase = TraversalPhase::Aborted;
            return Some((LinkStep::Aborted, Some(AbortReason::LinkDestroyed)));
        }
        match ctx.phase {
            TraversalPhase::Entering => {
                pose.position = ctx.start;
                ctx.phase = TraversalPhase::Traversing;
                Some((LinkStep::Continue, None))
            }
            TraversalPhase::Traversing => {
                let step = handlers.handler_for(ctx.link).step(ctx, pose, dt);
                ctx.elapsed += dt;
                match step {
                    LinkStep::Continue => {}
                    LinkStep::Done     => ctx.phase = TraversalPhase::Finished,
                    LinkStep::Aborted  => ctx.phase = TraversalPhase::Aborted,
                }
                let reason = (step == LinkStep::Aborted).then_some(AbortReason::Handler);
                Some((step, reason))
            }
            TraversalPhase::Finished => Some((LinkStep::Done, None)),
            TraversalPhase::Aborted  => Some((LinkStep::Aborted, Some(AbortReason::Handler))),
            TraversalPhase::NotTraversing => None,
        }
    }

    /// Mark the crossing aborted.  `None` if there is none.
    pub fn abort(&mut self) -> Option<&mut LinkTraversalContext> {
        let ctx = self.context.as_mut()?;
        ctx.phase = TraversalPhase::Aborted;
        Some(ctx)
    }

    /// Remove the context, returning the machine to `NotTraversing`.
    pub fn take(&mut self) -> Option<LinkTraversalContext> {
        self.context.take()
    }

    /// Park a path until the crossing ends.  A later one replaces it.
    pub fn defer_path(&mut self, parked: ParkedPath) {
        self.deferred_path = Some(parked);
    }

    pub fn take_deferred_path(&mut self) -> Option<ParkedPath> {
        self.deferred_path.take()
    }
}
