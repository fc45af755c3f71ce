//! Simulation observer trait for progress reporting and event collection.

use nav_agent::{AgentArena, NavEvent};
use nav_core::SimClock;

/// Callbacks invoked by [`NavSim::step`](crate::NavSim::step).
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
///
/// # Example: arrival printer
///
/// ```rust,ignore
/// struct Arrivals;
///
/// impl NavObserver for Arrivals {
///     fn on_event(&mut self, event: &NavEvent) {
///         if let NavEvent::ReachedDestination { agent } = event {
///             println!("{agent} arrived");
///         }
///     }
/// }
/// ```
pub trait NavObserver {
    /// Called at the very start of each tick, before plans are resolved.
    fn on_tick_start(&mut self, _clock: &SimClock) {}

    /// Called once per event, in agent slot order, at the end of the
    /// sub-step that produced it.
    fn on_event(&mut self, _event: &NavEvent) {}

    /// Called at the end of each tick with read access to every agent.
    fn on_tick_end(&mut self, _clock: &SimClock, _agents: &AgentArena) {}
}

/// A [`NavObserver`] that does nothing.
pub struct NoopObserver;

impl NavObserver for NoopObserver {}

/// Records every event.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    pub events: Vec<NavEvent>,
}

impl NavObserver for EventLog {
    fn on_event(&mut self, event: &NavEvent) {
        self.events.push(*event);
    }
}
