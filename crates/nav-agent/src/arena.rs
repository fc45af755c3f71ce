//! Generational storage for agents.
//!
//! Slots are reused after a despawn, but each reuse bumps the slot's
//! generation, so an [`AgentHandle`] kept across a despawn is rejected with
//! [`NavError::InvalidHandle`] instead of reaching the newcomer.
//!
//! Iteration is always in slot order.  The simulation relies on that for
//! deterministic request ids and event order, with or without `parallel`.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use nav_core::{AgentHandle, NavError, NavResult};

use crate::Agent;

#[derive(Clone, Debug, Default)]
pub struct AgentArena {
    slots:       Vec<Option<Agent>>,
    generations: Vec<u32>,
    free:        Vec<u32>,
    len:         usize,
}

impl AgentArena {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocate a handle and store the agent `make` builds for it.
    pub fn insert(&mut self, make: impl FnOnce(AgentHandle) -> Agent) -> AgentHandle {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(None);
                self.generations.push(0);
                (self.slots.len() - 1) as u32
            }
        };
        let handle = AgentHandle::new(index, self.generations[index as usize]);
        self.slots[index as usize] = Some(make(handle));
        self.len += 1;
        handle
    }

    pub fn remove(&mut self, handle: AgentHandle) -> NavResult<Agent> {
        if !self.contains(handle) {
            return Err(NavError::InvalidHandle(handle));
        }
        let i = handle.index();
        let agent = self.slots[i].take().ok_or(NavError::InvalidHandle(handle))?;
        self.generations[i] = self.generations[i].wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        Ok(agent)
    }

    #[inline]
    pub fn contains(&self, handle: AgentHandle) -> bool {
        let i = handle.index();
        self.generations.get(i) == Some(&handle.generation)
            && self.slots.get(i).is_some_and(Option::is_some)
    }

    pub fn get(&self, handle: AgentHandle) -> NavResult<&Agent> {
        match self.slots.get(handle.index()) {
            Some(Some(agent)) if self.generations[handle.index()] == handle.generation => Ok(agent),
            _ => Err(NavError::InvalidHandle(handle)),
        }
    }

    pub fn get_mut(&mut self, handle: AgentHandle) -> NavResult<&mut Agent> {
        let generation = self.generations.get(handle.index()).copied();
        match self.slots.get_mut(handle.index()) {
            Some(Some(agent)) if generation == Some(handle.generation) => Ok(agent),
            _ => Err(NavError::InvalidHandle(handle)),
        }
    }

    /// Live agents in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Agent> + '_ {
        self.slots.iter_mut().flatten()
    }

    pub fn handles(&self) -> impl Iterator<Item = AgentHandle> + '_ {
        self.iter().map(Agent::handle)
    }

    /// Run `f` on every live agent and collect the results in slot order.
    ///
    /// With the `parallel` feature the calls are spread over Rayon's pool;
    /// each call gets exclusive access to one agent only.
    pub fn map_collect<T, F>(&mut self, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&mut Agent) -> T + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        {
            self.slots
                .par_iter_mut()
                .filter_map(Option::as_mut)
                .map(f)
                .collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            self.slots.iter_mut().flatten().map(f).collect()
        }
    }
}
