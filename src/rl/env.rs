// src/rl/env.rs
//
// Gym-style flowsheet synthesis environment.
//
// - reset() -> (observation, feed stream)
// - legal_action_mask(inlet, is_initial) -> mask over the 11 unit kinds
// - step(action, inlet) -> (observation, reward, done, info log, outlet)
//
// One environment owns one simulation-engine session; episodes are
// strictly sequential and the environment is not shared across threads.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::{SimulationEngine, UnitOperations};
use crate::config::FlowsheetConfig;
use crate::error::{FlowsheetError, Result};
use crate::stream::Stream;
use crate::types::{Species, UnitKind};

use super::action_encoding::{OperatingParams, ACTION_DIM};
use super::dispatch::{DispatchOutcome, Flowsheet, UnitCounters, UnitDispatcher, UnitStep};
use super::info::InfoLog;
use super::observation::Observation;
use super::reward::{self, RewardComponents};
use super::sequencer::{self, ActionMask, Stage, StageInputs, StageSequencer, Topology};

/// One agent decision: a unit kind index and the full continuous vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub discrete: usize,
    pub continuous: Vec<f64>,
}

impl Action {
    pub fn new(kind: UnitKind, continuous: Vec<f64>) -> Self {
        Self {
            discrete: kind.index(),
            continuous,
        }
    }

    /// Every continuous field at the midpoint of its range.
    pub fn midpoint(kind: UnitKind) -> Self {
        Self::new(kind, vec![0.5; ACTION_DIM])
    }
}

/// Why an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// Iteration budget exhausted.
    BudgetExhausted,
    /// Both products reached purity before the budget ran out.
    PurityAchieved,
    /// The simulation engine failed to converge.
    NotConverged,
}

/// Additional information about a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepInfo {
    pub iteration: u32,
    pub stage: Stage,
    pub kind: Option<UnitKind>,
    pub tag: Option<String>,
    pub converged: bool,
    pub termination_reason: Option<TerminationReason>,
    pub reward_components: Option<RewardComponents>,
    pub bzn_pure: bool,
    pub metan_pure: bool,
}

/// Result of a single environment step.
#[derive(Debug, Clone)]
pub struct StepResult<S> {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
    pub info: StepInfo,
    /// Snapshot of the episode info log after this step.
    pub info_log: InfoLog,
    /// Primary outlet of the placed unit; inlet of the next step.
    pub outlet: S,
}

/// Summary of a completed (or in-progress) episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub iterations: u32,
    pub total_reward: f64,
    pub termination_reason: Option<TerminationReason>,
    pub bzn_pure: bool,
    pub metan_pure: bool,
    /// BZN molar flow of the latest product candidate.
    pub bzn_product_flow: Option<f64>,
    /// Every instance tag placed this episode, in order.
    pub units: Vec<String>,
}

pub struct FlowsheetEnv<E, U: UnitOperations> {
    config: FlowsheetConfig,
    dispatcher: UnitDispatcher<E, U>,
    sequencer: StageSequencer,
    mask: ActionMask,
    sheet: Flowsheet<U::Stream>,
    observation: Observation,
    current: Option<U::Stream>,
    iteration: u32,
    done: bool,
    bzn_pure: bool,
    metan_pure: bool,
    bzn_extra_added: bool,
    total_reward: f64,
    termination: Option<TerminationReason>,
    placed: Vec<String>,
}

impl<E, U> FlowsheetEnv<E, U>
where
    E: SimulationEngine,
    U: UnitOperations,
{
    pub fn new(config: FlowsheetConfig, engine: E, units: U) -> Result<Self> {
        config.validate()?;
        let observation = Observation::from_inlet(&config.inlet, &config.observation, config.max_iter);
        Ok(Self {
            config,
            dispatcher: UnitDispatcher::new(engine, units),
            sequencer: StageSequencer::new(),
            mask: sequencer::initial_mask(),
            sheet: Flowsheet::default(),
            observation,
            current: None,
            iteration: 0,
            done: false,
            bzn_pure: false,
            metan_pure: false,
            bzn_extra_added: false,
            total_reward: 0.0,
            termination: None,
            placed: Vec::new(),
        })
    }

    /// Start a new episode. Returns the feed observation and feed stream.
    pub fn reset(&mut self) -> Result<(Observation, U::Stream)> {
        let feed = self.dispatcher.reset(&self.config.inlet)?;

        self.sequencer.reset();
        self.mask = sequencer::initial_mask();
        self.sheet = Flowsheet::default();
        self.iteration = 0;
        self.done = false;
        self.bzn_pure = false;
        self.metan_pure = false;
        self.bzn_extra_added = false;
        self.total_reward = 0.0;
        self.termination = None;
        self.placed.clear();
        self.observation = Observation::from_inlet(
            &self.config.inlet,
            &self.config.observation,
            self.config.max_iter,
        );
        self.current = Some(feed.clone());

        Ok((self.observation, feed))
    }

    /// Advance the stage machine for `inlet` and return the legal actions.
    ///
    /// With `is_initial` the feed specification stands in for the stream
    /// and conversion is taken as zero.
    pub fn legal_action_mask(&mut self, inlet: &U::Stream, is_initial: bool) -> ActionMask {
        let inputs = if is_initial {
            StageInputs {
                temperature: self.config.inlet.temperature,
                pressure: self.config.inlet.pressure,
                conversion: 0.0,
            }
        } else {
            let tol_feed = self.config.inlet.tol;
            StageInputs {
                temperature: inlet.temperature(),
                pressure: inlet.pressure(),
                conversion: (tol_feed - inlet.molar_flow(Species::Tol)) / tol_feed,
            }
        };
        let stage = self.sequencer.advance(&inputs, self.bzn_pure);
        self.mask = sequencer::mask_for(stage, &self.sheet.topology);
        self.mask
    }

    /// Apply one action to `inlet`.
    ///
    /// Fails fast on an action outside the current mask, a malformed
    /// continuous vector, or a recycle with no mixer to close on.
    pub fn step(&mut self, action: &Action, inlet: &U::Stream) -> Result<StepResult<U::Stream>> {
        if self.done {
            return Ok(self.terminal_result(inlet));
        }

        let kind = UnitKind::from_index(action.discrete)?;
        if !self.mask.allows(kind) {
            return Err(FlowsheetError::IllegalAction {
                action: action.discrete,
                stage: self.sequencer.stage(),
            });
        }
        let params = OperatingParams::from_normalized(&action.continuous)?;

        // A dispatch error leaves the episode as it was.
        let outcome = self.dispatcher.dispatch(
            kind,
            &params,
            inlet,
            &mut self.sheet,
            &self.config.reward,
        )?;
        self.iteration += 1;
        self.placed.push(outcome.tag().to_string());
        if kind == UnitKind::Mixer {
            self.mask.set(UnitKind::Mixer, false);
        }

        let (reward, components, converged, outlet) = match outcome {
            DispatchOutcome::NotConverged { tag, outlet, .. } => {
                warn!(tag = %tag, iteration = self.iteration, "simulation did not converge");
                self.done = true;
                self.termination = Some(TerminationReason::NotConverged);
                (self.config.reward.non_convergence_reward, None, false, outlet)
            }
            DispatchOutcome::Converged(step) => {
                let components = self.score(&step, inlet);
                self.observation = Observation::from_stream(
                    &step.outlet,
                    &self.config.observation,
                    self.iteration,
                    self.config.max_iter,
                );
                (components.total(), Some(components), true, step.outlet)
            }
        };

        self.total_reward += reward;
        self.current = Some(outlet.clone());
        debug!(
            iteration = self.iteration,
            stage = %self.sequencer.stage(),
            kind = %kind,
            reward,
            "step"
        );
        if self.done {
            info!(
                iterations = self.iteration,
                total_reward = self.total_reward,
                reason = ?self.termination,
                "episode finished"
            );
        }

        Ok(StepResult {
            observation: self.observation,
            reward,
            done: self.done,
            info: StepInfo {
                iteration: self.iteration,
                stage: self.sequencer.stage(),
                kind: Some(kind),
                tag: self.placed.last().cloned(),
                converged,
                termination_reason: self.termination,
                reward_components: components,
                bzn_pure: self.bzn_pure,
                metan_pure: self.metan_pure,
            },
            info_log: self.sheet.info.clone(),
            outlet,
        })
    }

    /// Fold shaping terms, purity tracking and termination into the reward.
    fn score(&mut self, step: &UnitStep<U::Stream>, inlet: &U::Stream) -> RewardComponents {
        let w = &self.config.reward;
        let tol_feed = self.config.inlet.tol;
        let h2_feed = self.config.inlet.hydrogen;
        let outlet = &step.outlet;
        let kind = step.kind;

        let mut c = RewardComponents {
            cost: step.cost,
            temperature_bonus: reward::temperature_bonus(
                kind,
                outlet.temperature(),
                self.sheet.topology.mixer_in_segment,
                w,
            ),
            ratio_bonus: reward::ratio_bonus(
                kind,
                step.recycle.as_ref().map(|r| r.molar_flow(Species::Hydrogen)),
                h2_feed,
                tol_feed,
                w,
            ),
            conversion_bonus: reward::conversion_bonus(
                kind,
                inlet.mole_fraction(Species::Tol),
                outlet.mole_fraction(Species::Tol),
            ),
            hydrogen_bonus: reward::hydrogen_bonus(
                kind,
                inlet.mole_fraction(Species::Hydrogen),
                outlet.mole_fraction(Species::Hydrogen),
                w,
            ),
            recovery_bonus: reward::recovery_bonus(
                kind,
                outlet.molar_flow(Species::Bzn),
                tol_feed,
                w,
            ),
            ..RewardComponents::default()
        };

        // Purity flags latch once set.
        if !self.metan_pure {
            if let Some(purge) = &self.sheet.products.metan_out {
                self.metan_pure = purge.mole_fraction(Species::Methane) >= w.methane_purity;
            }
        }
        if !self.bzn_pure {
            if let Some(product) = &self.sheet.products.bzn_out {
                self.bzn_pure = product.mole_fraction(Species::Bzn) >= self.config.purity_target;
            }
        }

        if self.iteration >= self.config.max_iter {
            self.done = true;
            self.termination = Some(TerminationReason::BudgetExhausted);
            if !(self.bzn_pure && self.metan_pure) {
                c.terminal_penalty = reward::terminal_penalty(
                    self.config.purity_target,
                    outlet.mole_fraction(Species::Bzn),
                    w,
                );
            }
        } else if self.bzn_pure && self.metan_pure {
            self.done = true;
            self.termination = Some(TerminationReason::PurityAchieved);
            c.early_success_bonus =
                reward::early_success_bonus(self.config.max_iter - self.iteration, w);
        }

        if self.bzn_pure && !self.bzn_extra_added {
            if let Some(product) = &self.sheet.products.bzn_out {
                c.bzn_extra = reward::bzn_extra(product.molar_flow(Species::Bzn), tol_feed, w);
                self.bzn_extra_added = true;
            }
        }

        c
    }

    fn terminal_result(&self, inlet: &U::Stream) -> StepResult<U::Stream> {
        StepResult {
            observation: self.observation,
            reward: 0.0,
            done: true,
            info: StepInfo {
                iteration: self.iteration,
                stage: self.sequencer.stage(),
                kind: None,
                tag: None,
                converged: false,
                termination_reason: self.termination,
                reward_components: None,
                bzn_pure: self.bzn_pure,
                metan_pure: self.metan_pure,
            },
            info_log: self.sheet.info.clone(),
            outlet: self.current.clone().unwrap_or_else(|| inlet.clone()),
        }
    }

    pub fn summary(&self) -> EpisodeSummary {
        EpisodeSummary {
            iterations: self.iteration,
            total_reward: self.total_reward,
            termination_reason: self.termination,
            bzn_pure: self.bzn_pure,
            metan_pure: self.metan_pure,
            bzn_product_flow: self
                .sheet
                .products
                .bzn_out
                .as_ref()
                .map(|s| s.molar_flow(Species::Bzn)),
            units: self.placed.clone(),
        }
    }

    pub fn config(&self) -> &FlowsheetConfig {
        &self.config
    }

    /// Mask as last computed (without advancing the stage machine).
    pub fn action_mask(&self) -> ActionMask {
        self.mask
    }

    pub fn stage(&self) -> Stage {
        self.sequencer.stage()
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn observation(&self) -> Observation {
        self.observation
    }

    pub fn info_log(&self) -> &InfoLog {
        &self.sheet.info
    }

    pub fn topology(&self) -> &Topology {
        &self.sheet.topology
    }

    pub fn counters(&self) -> UnitCounters {
        self.dispatcher.counters()
    }

    pub fn bzn_pure(&self) -> bool {
        self.bzn_pure
    }

    pub fn metan_pure(&self) -> bool {
        self.metan_pure
    }

    pub fn bzn_extra_added(&self) -> bool {
        self.bzn_extra_added
    }

    pub fn engine(&self) -> &E {
        self.dispatcher.engine()
    }

    pub fn units(&self) -> &U {
        self.dispatcher.units()
    }
}
