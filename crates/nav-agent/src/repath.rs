//! When to ask for a full re-plan instead of relying on local repair.
//!
//! # Timeline
//!
//! ```text
//! should_request ─▶ on_requested(id) ─▶ … one tick … ─▶ on_completed(ok)
//!                    pending = id                        pending cleared
//!                                                        ok:  last_recompute = now − jitter
//!                                                        err: retry after back-off
//! ```
//!
//! The jitter is drawn from the agent's own RNG so agents that asked at the
//! same time drift apart without breaking determinism.

use glam::Vec3;
use tracing::trace;

use nav_core::{AgentRng, RequestId};
use nav_path::RepairOutcome;

/// Largest jitter, as a fraction of the re-plan period.
const JITTER_FRACTION: f32 = 0.1;

/// Distances to the destination below this count as this for the dynamic
/// mode, so a moving target next to the agent doesn't trigger every tick.
const MIN_DYNAMIC_DISTANCE: f32 = 0.5;

/// Automatic re-plan rule.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AutoRepathMode {
    /// Only explicit requests.
    Never,

    /// Whenever `period` seconds have passed since the last plan.
    EveryNSeconds { period: f32 },

    /// As soon as the destination changes.
    OnDestinationChange,

    /// Every `max_period` seconds at most, sooner the further the destination
    /// moved relative to how far away it is.
    Dynamic { sensitivity: f32, max_period: f32 },
}

impl Default for AutoRepathMode {
    fn default() -> Self {
        AutoRepathMode::Dynamic { sensitivity: 10.0, max_period: 2.0 }
    }
}

impl AutoRepathMode {
    /// Nominal seconds between plans, used to scale the jitter.
    fn period(&self) -> f32 {
        match *self {
            AutoRepathMode::EveryNSeconds { period }      => period,
            AutoRepathMode::Dynamic { max_period, .. }    => max_period,
            AutoRepathMode::Never | AutoRepathMode::OnDestinationChange => 0.0,
        }
    }
}

/// Exponential back-off after failed plans.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Backoff {
    /// Delay after the first failure.
    pub initial: f32,
    /// Delays double per consecutive failure up to this cap.
    pub max:     f32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self { initial: 0.5, max: 8.0 }
    }
}

impl Backoff {
    pub fn delay(&self, failures: u32) -> f32 {
        if failures == 0 {
            return 0.0;
        }
        let doublings = (failures - 1).min(30) as i32;
        (self.initial * 2f32.powi(doublings)).min(self.max)
    }
}

/// Per-agent re-plan bookkeeping.
#[derive(Clone, Debug)]
pub struct AutoRepathPolicy {
    pub mode:    AutoRepathMode,
    pub backoff: Backoff,

    last_recompute:      f64,
    last_destination:    Option<Vec3>,
    pending:             Option<RequestId>,
    destination_changed: bool,
    forced:              bool,
    failures:            u32,
    retry_at:            f64,
    link_aborts:         u32,
    recover:             bool,
}

impl Default for AutoRepathPolicy {
    fn default() -> Self {
        Self::new(AutoRepathMode::default())
    }
}

impl AutoRepathPolicy {
    pub fn new(mode: AutoRepathMode) -> Self {
        Self {
            mode,
            backoff:             Backoff::default(),
            last_recompute:      f64::NEG_INFINITY,
            last_destination:    None,
            pending:             None,
            destination_changed: false,
            forced:              false,
            failures:            0,
            retry_at:            f64::NEG_INFINITY,
            link_aborts:         0,
            recover:             false,
        }
    }

    #[inline]
    pub fn pending(&self) -> Option<RequestId> {
        self.pending
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    #[inline]
    pub fn last_recompute(&self) -> f64 {
        self.last_recompute
    }

    /// Consecutive failed plans.
    #[inline]
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn notify_destination_changed(&mut self) {
        self.destination_changed = true;
    }

    /// Called after every start or end repair.  A failed repair asks for a
    /// plan in every mode but [`AutoRepathMode::Never`].
    pub fn notify_repair(&mut self, outcome: RepairOutcome) {
        if outcome.is_failure() {
            self.forced = true;
        }
    }

    /// The path crosses destroyed graph elements.  Same effect as a failed
    /// repair.
    pub fn notify_broken(&mut self) {
        self.forced = true;
    }

    /// A link crossing was aborted.  The recovery plan is asked for in every
    /// mode, after a back-off that grows with each abort until a crossing
    /// succeeds.
    pub fn notify_link_aborted(&mut self, now: f64) {
        self.link_aborts += 1;
        let delay = self.backoff.delay(self.link_aborts);
        self.retry_at = self.retry_at.max(now + delay as f64);
        self.recover  = true;
        trace!(aborts = self.link_aborts, delay, "link crossing aborted, backing off");
    }

    pub fn notify_link_crossed(&mut self) {
        self.link_aborts = 0;
    }

    /// Aborted crossings since the last successful one.
    #[inline]
    pub fn link_aborts(&self) -> u32 {
        self.link_aborts
    }

    /// A recovery plan is waiting out its back-off.
    #[inline]
    pub fn is_recovering(&self) -> bool {
        self.recover
    }

    /// Whether the mode wants a plan now.  Never while a plan is in flight
    /// or a back-off is running, and never without a destination.  The
    /// periodic mode also needs a path to refresh.
    pub fn should_request(&self, now: f64, destination: Option<Vec3>, position: Vec3, has_path: bool) -> bool {
        let Some(destination) = destination.filter(|d| d.is_finite()) else {
            return false;
        };
        if self.pending.is_some() || now < self.retry_at {
            return false;
        }
        if self.recover {
            return true;
        }
        let elapsed = (now - self.last_recompute) as f32;
        match self.mode {
            AutoRepathMode::Never => false,
            AutoRepathMode::OnDestinationChange => self.destination_changed || self.forced,
            AutoRepathMode::EveryNSeconds { period } => self.forced || (has_path && elapsed >= period),
            AutoRepathMode::Dynamic { sensitivity, max_period } => {
                let moved = self.last_destination.map_or(0.0, |last| last.distance(destination));
                let distance = position.distance(destination).max(MIN_DYNAMIC_DISTANCE);
                let period = max_period / (1.0 + sensitivity * moved / distance);
                self.forced || elapsed >= period
            }
        }
    }

    /// A request for `destination` went out as `id`.
    pub fn on_requested(&mut self, id: RequestId, destination: Vec3) {
        self.pending             = Some(id);
        self.last_destination    = Some(destination);
        self.destination_changed = false;
        self.forced              = false;
        self.recover             = false;
    }

    /// Forget the in-flight request; its result will be dropped.
    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }

    /// The plan for the pending request came back.
    pub fn on_completed(&mut self, now: f64, ok: bool, rng: &mut AgentRng) {
        self.pending = None;
        if ok {
            self.failures = 0;
            self.retry_at = f64::NEG_INFINITY;
            let jitter = rng.random::<f32>() * JITTER_FRACTION * self.mode.period();
            self.last_recompute = now - jitter as f64;
        } else {
            self.failures += 1;
            let delay = self.backoff.delay(self.failures);
            self.retry_at       = now + delay as f64;
            self.last_recompute = now;
            trace!(failures = self.failures, delay, "plan failed, backing off");
        }
    }
}
