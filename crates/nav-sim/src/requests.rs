//! The full-plan request queue.
//!
//! Requests queued during tick `t` are solved and delivered at the start of
//! tick `t + 1`, against the graph as it is then.  Ids come from one
//! monotonic counter, so a late answer can always be told from the current
//! one.

use tracing::trace;

use nav_agent::PlanRequest;
use nav_core::{AgentHandle, RequestId};
use nav_graph::{GraphResult, NavGraph, RoutedPath, Router};

/// A solved request, on its way back to the agent.
#[derive(Debug)]
pub struct PendingPlan {
    pub agent:  AgentHandle,
    pub id:     RequestId,
    pub result: GraphResult<RoutedPath>,
}

#[derive(Debug, Default)]
pub struct PathRequestQueue {
    next_id: u64,
    queued:  Vec<(AgentHandle, RequestId, PlanRequest)>,
}

impl PathRequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queued.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    /// Queue a request and return its id.
    pub fn push(&mut self, agent: AgentHandle, request: PlanRequest) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        trace!(%agent, %id, "plan queued");
        self.queued.push((agent, id, request));
        id
    }

    /// Solve everything queued so far, in submission order.
    pub fn resolve<R: Router + ?Sized>(&mut self, graph: &NavGraph, router: &R) -> Vec<PendingPlan> {
        self.queued
            .drain(..)
            .map(|(agent, id, req)| PendingPlan {
                agent,
                id,
                result: router.route(graph, req.start, req.end, &req.constraints),
            })
            .collect()
    }
}
