//! Events an agent reports to the simulation observer.

use nav_core::{AgentHandle, LinkId, RequestId};

use crate::AbortReason;

/// Something observable happened to an agent.
///
/// Agents queue events while they step; the simulation dispatches them in
/// handle order once per sub-step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum NavEvent {
    /// A full plan was requested.
    PathRequested { agent: AgentHandle, request: RequestId },

    /// A requested plan arrived and was installed (or parked, if the agent
    /// was crossing a link).
    PathPlanned { agent: AgentHandle, request: RequestId, partial: bool },

    /// A requested plan could not be found.
    PathFailed { agent: AgentHandle, request: RequestId },

    LinkTraversalStarted { agent: AgentHandle, link: LinkId },

    LinkTraversalFinished { agent: AgentHandle, link: LinkId },

    LinkTraversalAborted { agent: AgentHandle, link: LinkId, reason: AbortReason },

    /// `reached_destination` became true.
    ReachedDestination { agent: AgentHandle },
}

impl NavEvent {
    pub fn agent(&self) -> AgentHandle {
        match *self {
            NavEvent::PathRequested { agent, .. }
            | NavEvent::PathPlanned { agent, .. }
            | NavEvent::PathFailed { agent, .. }
            | NavEvent::LinkTraversalStarted { agent, .. }
            | NavEvent::LinkTraversalFinished { agent, .. }
            | NavEvent::LinkTraversalAborted { agent, .. }
            | NavEvent::ReachedDestination { agent } => agent,
        }
    }
}
