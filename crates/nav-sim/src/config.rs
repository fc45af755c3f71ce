//! Simulation-wide configuration.

use nav_core::SubSteps;
use nav_path::RepairLimits;

use crate::{SimError, SimResult};

/// Global knobs of a [`NavSim`](crate::NavSim).
///
/// Per-agent tuning lives in `MovementSettings` and `AvoidanceSettings`;
/// this only covers what every agent shares.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NavConfig {
    /// Seconds of real time per tick.
    pub fixed_dt: f32,

    /// Simulated seconds per real second.  Above 1 the tick is split into
    /// `ceil(time_scale)` sub-steps; 0 pauses movement.
    pub time_scale: f32,

    /// Upper bound on sub-steps per tick.
    pub max_substeps: u32,

    /// Corners computed per agent per sub-step.
    pub corner_count: usize,

    /// Bounds on local path repair, shared by every agent.
    pub repair_limits: RepairLimits,

    /// Global seed for the per-agent RNGs.
    pub seed: u64,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            fixed_dt:      1.0 / 60.0,
            time_scale:    1.0,
            max_substeps:  8,
            corner_count:  4,
            repair_limits: RepairLimits::default(),
            seed:          0,
        }
    }
}

impl NavConfig {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.fixed_dt.is_finite() && self.fixed_dt > 0.0) {
            return Err(SimError::Config(format!("fixed_dt must be positive, got {}", self.fixed_dt)));
        }
        if !(self.time_scale.is_finite() && self.time_scale >= 0.0) {
            return Err(SimError::Config(format!("time_scale must be >= 0, got {}", self.time_scale)));
        }
        if self.max_substeps == 0 {
            return Err(SimError::Config("max_substeps must be at least 1".into()));
        }
        if self.corner_count < 2 {
            return Err(SimError::Config(format!("corner_count must be at least 2, got {}", self.corner_count)));
        }
        Ok(())
    }

    /// How one tick splits into sub-steps.
    #[inline]
    pub fn substeps(&self) -> SubSteps {
        SubSteps::plan(self.fixed_dt, self.time_scale, self.max_substeps)
    }

    /// Parse and validate a TOML document.  Missing keys take their defaults.
    ///
    /// ```toml
    /// fixed_dt   = 0.02
    /// time_scale = 2.0
    /// seed       = 7
    ///
    /// [repair_limits]
    /// high_depth = 24
    /// ```
    #[cfg(feature = "toml")]
    pub fn from_toml_str(s: &str) -> SimResult<Self> {
        let config: NavConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
