//! Tunable per-agent movement settings.

use nav_path::RepairQuality;

/// How an agent moves along its path.
///
/// Angles are radians, times seconds, distances world units.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MovementSettings {
    /// Cruising speed.
    pub speed: f32,

    /// Largest change of velocity per second.
    pub acceleration: f32,

    /// Largest turn rate.
    pub max_rotation_speed: f32,

    /// Time it takes to brake from full speed to a stop at the end of the
    /// path.  Braking starts `speed * slowdown_time` away from the end.
    pub slowdown_time: f32,

    /// Within this distance of the end the agent stops and counts as
    /// arrived.
    pub stop_distance: f32,

    /// Within this distance of the destination a requested facing replaces
    /// the direction of travel as the target rotation.
    pub facing_lead_in: f32,

    /// A requested facing counts as reached within this angle.
    pub facing_tolerance: f32,

    /// Time constant of exponential rotation smoothing.  `0` disables it.
    pub rotation_smoothing: f32,

    /// Time constant of the smoothed visual position.  `0` makes the visual
    /// position follow the simulated one exactly.
    pub position_smoothing: f32,

    /// Distance from a link's entry at which the crossing begins.
    pub link_lead_in: f32,

    /// Drop out of avoidance while crossing off-mesh links.
    pub suspend_avoidance_on_links: bool,

    /// Search effort of the per-tick start repair.  Destination changes
    /// always repair with [`RepairQuality::High`].
    pub repair_quality: RepairQuality,

    /// Tolerance of the crowded-end check.
    pub crowded_end: CrowdedEndTolerance,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            speed:                      5.0,
            acceleration:               20.0,
            max_rotation_speed:         10.0,
            slowdown_time:              0.5,
            stop_distance:              0.2,
            facing_lead_in:             1.0,
            facing_tolerance:           0.05,
            rotation_smoothing:         0.0,
            position_smoothing:         0.0,
            link_lead_in:               0.1,
            suspend_avoidance_on_links: true,
            repair_quality:             RepairQuality::Low,
            crowded_end:                CrowdedEndTolerance::default(),
        }
    }
}

impl MovementSettings {
    /// Distance from the end at which braking starts.
    #[inline]
    pub fn slowdown_distance(&self) -> f32 {
        self.speed * self.slowdown_time
    }
}

/// How far the avoidance simulation's end of path may lie from the path's
/// own end point before a crowded-end flag is ignored:
/// `base + factor * remaining_distance`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CrowdedEndTolerance {
    pub base:   f32,
    pub factor: f32,
}

impl Default for CrowdedEndTolerance {
    fn default() -> Self {
        Self { base: 0.1, factor: 0.1 }
    }
}

impl CrowdedEndTolerance {
    #[inline]
    pub fn at(&self, remaining_distance: f32) -> f32 {
        self.base + self.factor * remaining_distance
    }
}
