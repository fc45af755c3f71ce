//! The agent's side of local avoidance.

use glam::Vec3;
use tracing::debug;

use nav_avoidance::{AgentInput, AgentOutput, AvoidanceSettings, AvoidanceSimulation, AvoidanceSolver};
use nav_core::{NavResult, SlotHandle};

use crate::CrowdedEndTolerance;

/// Connects one agent to an externally owned [`AvoidanceSimulation`].
///
/// Holds the slot handle and the settings to register with; every other bit
/// of avoidance state lives in the simulation.
#[derive(Clone, Debug, Default)]
pub struct LocalAvoidanceAdapter {
    slot:      Option<SlotHandle>,
    settings:  AvoidanceSettings,
    suspended: bool,
}

impl LocalAvoidanceAdapter {
    pub fn new(settings: AvoidanceSettings) -> Self {
        Self { slot: None, settings, suspended: false }
    }

    #[inline]
    pub fn slot(&self) -> Option<SlotHandle> {
        self.slot
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.slot.is_some()
    }

    #[inline]
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn settings(&self) -> &AvoidanceSettings {
        &self.settings
    }

    /// Register with `sim`.  No-op if already registered.
    pub fn enable<S: AvoidanceSolver>(&mut self, sim: &mut AvoidanceSimulation<S>) {
        if self.slot.is_none() {
            self.slot = Some(sim.register(self.settings.clone()));
        }
    }

    /// Unregister from `sim`.  No-op if not registered.
    pub fn disable<S: AvoidanceSolver>(&mut self, sim: &mut AvoidanceSimulation<S>) -> NavResult<()> {
        match self.slot.take() {
            Some(slot) => sim.unregister(slot),
            None => Ok(()),
        }
    }

    /// Change the settings, pushing them to `sim` if registered.
    pub fn set_settings<S: AvoidanceSolver>(
        &mut self,
        sim:      &mut AvoidanceSimulation<S>,
        settings: AvoidanceSettings,
    ) -> NavResult<()> {
        if let Some(slot) = self.slot {
            sim.set_settings(slot, settings.clone())?;
        }
        self.settings = settings;
        Ok(())
    }

    /// Stop taking part in solves without giving up the slot.  Returns
    /// `true` if this call suspended it.
    pub fn suspend(&mut self) -> bool {
        let changed = self.slot.is_some() && !self.suspended;
        self.suspended |= changed;
        changed
    }

    pub fn restore(&mut self) {
        self.suspended = false;
    }

    /// This step's submission.  Suspended slots go in inactive so they are
    /// invisible to neighbours and solved for nobody.
    pub fn input(
        &self,
        position:    Vec3,
        radius:      f32,
        desired:     Vec3,
        max_speed:   f32,
        end_of_path: Vec3,
    ) -> Option<(SlotHandle, AgentInput)> {
        let slot = self.slot?;
        Some((slot, AgentInput {
            position,
            radius,
            desired_velocity: desired,
            max_speed,
            end_of_path,
            active: !self.suspended,
        }))
    }

    /// The solve's answer, if registered and not suspended.
    pub fn read<S: AvoidanceSolver>(&self, sim: &AvoidanceSimulation<S>) -> Option<AgentOutput> {
        let slot = self.slot.filter(|_| !self.suspended)?;
        match sim.read(slot) {
            Ok(out) => Some(out),
            Err(err) => {
                debug!(%err, "avoidance slot vanished");
                None
            }
        }
    }
}

/// Whether a crowded-end flag from the solve applies to the current path.
///
/// The solve may have run against an older end of path, e.g. right after a
/// destination change.  Its flag only counts when the end it used lies
/// within `tolerance.at(remaining_distance)` of `path_end`.
pub fn crowded_end(
    output:             &AgentOutput,
    path_end:           Vec3,
    remaining_distance: f32,
    tolerance:          &CrowdedEndTolerance,
) -> bool {
    output.reached_end
        && remaining_distance.is_finite()
        && output.end_of_path.distance(path_end) <= tolerance.at(remaining_distance)
}
