// src/config.rs
//
// Episode configuration for the flowsheet environment.
//
// Sources, in increasing precedence:
// 1. Built-in defaults (toluene hydrodealkylation feed)
// 2. JSON file (FLOWSHEET_CONFIG or an explicit path)
// 3. Environment overrides (FLOWSHEET_MAX_ITER, FLOWSHEET_PURITY_TARGET)
//
// Any override that fails to parse is ignored with a warning.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{FlowsheetError, Result};
use crate::rl::observation::ObservationScale;
use crate::rl::reward::RewardWeights;
use crate::types::InletSpec;

pub const ENV_CONFIG_PATH: &str = "FLOWSHEET_CONFIG";
pub const ENV_MAX_ITER: &str = "FLOWSHEET_MAX_ITER";
pub const ENV_PURITY_TARGET: &str = "FLOWSHEET_PURITY_TARGET";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowsheetConfig {
    /// BZN mole fraction the product stream must reach.
    pub purity_target: f64,
    /// Iteration budget per episode.
    pub max_iter: u32,
    /// Feed stream.
    pub inlet: InletSpec,
    /// Reward and cost constants.
    pub reward: RewardWeights,
    /// Observation normalisation.
    pub observation: ObservationScale,
}

impl Default for FlowsheetConfig {
    fn default() -> Self {
        Self {
            purity_target: 0.95,
            max_iter: 20,
            inlet: InletSpec::default(),
            reward: RewardWeights::default(),
            observation: ObservationScale::default(),
        }
    }
}

impl FlowsheetConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        let cfg: FlowsheetConfig = serde_json::from_str(&raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults (or the file named by FLOWSHEET_CONFIG) plus env overrides.
    pub fn from_env() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(path) if !path.is_empty() => {
                info!(path = %path, "loading flowsheet config from file");
                Self::from_json_file(&path)?
            }
            _ => Self::default(),
        };
        cfg.apply_overrides(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply overrides from a key lookup (environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_ITER) {
            match raw.trim().parse::<u32>() {
                Ok(v) => {
                    self.max_iter = v;
                    info!(key = ENV_MAX_ITER, value = v, "overrode default");
                }
                Err(_) => warn!(
                    key = ENV_MAX_ITER,
                    raw = %raw,
                    default = self.max_iter,
                    "could not parse override; keeping value"
                ),
            }
        }

        if let Some(raw) = lookup(ENV_PURITY_TARGET) {
            match raw.trim().parse::<f64>() {
                Ok(v) => {
                    self.purity_target = v;
                    info!(key = ENV_PURITY_TARGET, value = v, "overrode default");
                }
                Err(_) => warn!(
                    key = ENV_PURITY_TARGET,
                    raw = %raw,
                    default = self.purity_target,
                    "could not parse override; keeping value"
                ),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iter == 0 {
            return Err(FlowsheetError::Config("max_iter must be positive".into()));
        }
        if !(self.purity_target > 0.0 && self.purity_target <= 1.0) {
            return Err(FlowsheetError::Config(format!(
                "purity_target must be in (0, 1], got {}",
                self.purity_target
            )));
        }
        if !(self.inlet.tol > 0.0) {
            return Err(FlowsheetError::Config(format!(
                "inlet TOL feed must be positive, got {}",
                self.inlet.tol
            )));
        }
        if self.observation.temperature <= 0.0 || self.observation.pressure <= 0.0 {
            return Err(FlowsheetError::Config(
                "observation scales must be positive".into(),
            ));
        }
        Ok(())
    }
}
