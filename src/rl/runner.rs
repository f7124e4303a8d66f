// src/rl/runner.rs
//
// Episode rollout harness.
//
// The environment does not choose actions; a `Policy` does. This module
// provides the trait, a seeded uniform policy over legal actions (used by
// the rollout CLI as a baseline), and the loop that drives one episode:
//   mask -> act -> step -> feed outlet back as next inlet.

use rand::seq::IteratorRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::backend::{SimulationEngine, UnitOperations};
use crate::error::Result;
use crate::types::UnitKind;

use super::action_encoding::ACTION_DIM;
use super::env::{Action, EpisodeSummary, FlowsheetEnv};
use super::observation::Observation;
use super::sequencer::ActionMask;

pub trait Policy {
    /// Version string recorded alongside rollouts.
    fn version(&self) -> &str;

    /// Choose an action. Implementations must pick a kind enabled in `mask`.
    fn act(&mut self, obs: &Observation, mask: &ActionMask) -> Action;

    /// Called at the start of each episode.
    fn reset_episode(&mut self, seed: u64, episode_id: u64);
}

pub const UNIFORM_POLICY_VERSION: &str = "uniform-masked-v1";

/// Uniform over enabled unit kinds, uniform continuous vector in [0, 1].
pub struct UniformMaskedPolicy {
    rng: ChaCha8Rng,
}

impl UniformMaskedPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Policy for UniformMaskedPolicy {
    fn version(&self) -> &str {
        UNIFORM_POLICY_VERSION
    }

    fn act(&mut self, _obs: &Observation, mask: &ActionMask) -> Action {
        let kind = mask
            .enabled()
            .choose(&mut self.rng)
            .unwrap_or(UnitKind::Mixer);
        let continuous = (0..ACTION_DIM).map(|_| self.rng.gen::<f64>()).collect();
        Action::new(kind, continuous)
    }

    fn reset_episode(&mut self, seed: u64, episode_id: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(episode_id));
    }
}

/// Run one episode to termination and return its summary.
pub fn run_episode<E, U, P>(env: &mut FlowsheetEnv<E, U>, policy: &mut P) -> Result<EpisodeSummary>
where
    E: SimulationEngine,
    U: UnitOperations,
    P: Policy + ?Sized,
{
    let (_, mut stream) = env.reset()?;
    let mut is_initial = true;

    loop {
        let mask = env.legal_action_mask(&stream, is_initial);
        is_initial = false;

        let action = policy.act(&env.observation(), &mask);
        let result = env.step(&action, &stream)?;
        stream = result.outlet;
        if result.done {
            break;
        }
    }

    Ok(env.summary())
}
