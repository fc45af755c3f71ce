//! Simulation time model.
//!
//! # Design
//!
//! Time is a monotonically increasing tick counter plus accumulated
//! simulated seconds.  Each tick is split into one or more fixed sub-steps;
//! a sub-step is a complete repair → steer → avoid → integrate cycle, so
//! raising the time scale never lengthens the step the integrator sees
//! beyond `dt`.

use std::fmt;

// ── SimClock ──────────────────────────────────────────────────────────────────

/// Tick counter and accumulated simulated seconds.
///
/// `SimClock` is cheap to copy and intentionally holds no heap data.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimClock {
    /// Number of completed ticks.
    pub tick: u64,
    /// Simulated seconds since the clock was created.  `f64` so long runs do
    /// not lose sub-millisecond precision.
    pub now_secs: f64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance simulated time by one sub-step of `dt` seconds.
    #[inline]
    pub fn advance_secs(&mut self, dt: f32) {
        self.now_secs += dt as f64;
    }

    /// Mark the end of a tick.
    #[inline]
    pub fn finish_tick(&mut self) {
        self.tick += 1;
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{} ({:.3}s)", self.tick, self.now_secs)
    }
}

// ── SubSteps ──────────────────────────────────────────────────────────────────

/// How one tick is divided into sequential sub-steps.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SubSteps {
    pub count: u32,
    pub dt:    f32,
}

impl SubSteps {
    /// Split a tick of `dt` real seconds at `time_scale` into sub-steps no
    /// longer than `dt` each, capped at `max_substeps`.
    ///
    /// Scales `<= 1` run a single step of `dt * time_scale`.
    pub fn plan(dt: f32, time_scale: f32, max_substeps: u32) -> Self {
        let scaled = (dt * time_scale).max(0.0);
        if time_scale <= 1.0 {
            return Self { count: 1, dt: scaled };
        }
        let count = (time_scale.ceil() as u32).clamp(1, max_substeps.max(1));
        Self { count, dt: scaled / count as f32 }
    }

    /// Total simulated seconds covered by the plan.
    #[inline]
    pub fn total(&self) -> f32 {
        self.dt * self.count as f32
    }
}
