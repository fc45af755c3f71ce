//! Deterministic per-agent RNG.
//!
//! # Determinism strategy
//!
//! Each agent gets its own independent `SmallRng` seeded by:
//!
//!   seed = global_seed XOR (mix(index, generation) * MIXING_CONSTANT)
//!
//! The mixing constant is the 64-bit fractional part of the golden ratio,
//! which spreads consecutive handles uniformly across the seed space.
//! Agents never share RNG state, so the parallel produce phase needs no
//! synchronisation and two runs with the same seed draw identical values.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::AgentHandle;

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Per-agent deterministic RNG, owned by the agent it was seeded for.
#[derive(Clone, Debug)]
pub struct AgentRng(SmallRng);

impl AgentRng {
    /// Seed deterministically from the run's global seed and an agent handle.
    pub fn new(global_seed: u64, agent: AgentHandle) -> Self {
        let key = ((agent.generation as u64) << 32) | agent.index as u64;
        let seed = global_seed ^ key.wrapping_add(1).wrapping_mul(MIXING_CONSTANT);
        AgentRng(SmallRng::seed_from_u64(seed))
    }

    /// Sample a uniformly distributed value of any `Standard`-distributed type.
    #[inline]
    pub fn random<T>(&mut self) -> T
    where
        rand::distributions::Standard: rand::distributions::Distribution<T>,
    {
        self.0.r#gen()
    }
}
