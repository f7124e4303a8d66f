// src/rl/mod.rs
//
// Markov decision process for step-by-step flowsheet synthesis.
//
// Key components:
// - action_encoding: continuous action vector -> physical operating parameters
// - cost:            normalised capital / operating cost surrogates
// - sequencer:       stage machine and legal-action masks
// - dispatch:        unit placement, solve, convergence check, pricing
// - reward:          shaping terms, terminal and one-shot bonuses
// - env:             reset / step lifecycle and episode state
// - runner:          policy trait and rollout loop

pub mod action_encoding;
pub mod cost;
pub mod dispatch;
pub mod env;
pub mod info;
pub mod observation;
pub mod reward;
pub mod runner;
pub mod sequencer;

pub use action_encoding::{denormalize, OperatingParams, ACTION_DIM, FIELDS};
pub use dispatch::{DispatchOutcome, Flowsheet, Products, UnitCounters, UnitDispatcher, UnitStep};
pub use env::{Action, EpisodeSummary, FlowsheetEnv, StepInfo, StepResult, TerminationReason};
pub use info::{InfoEntry, InfoLog, UnitRecord};
pub use observation::{Observation, ObservationScale, OBS_DIM};
pub use reward::{RewardComponents, RewardWeights};
pub use runner::{run_episode, Policy, UniformMaskedPolicy};
pub use sequencer::{ActionMask, Stage, StageInputs, StageSequencer, Topology};
