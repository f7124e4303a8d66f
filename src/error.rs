// src/error.rs
//
// Crate-wide error type.
//
// Non-convergence of the simulation engine has no variant: it is an episode
// outcome (fixed penalty, done=true).

use thiserror::Error;

use crate::rl::sequencer::Stage;

#[derive(Debug, Error)]
pub enum FlowsheetError {
    /// Discrete action not enabled by the current legal-action mask.
    #[error("action {action} is not legal in stage {stage}")]
    IllegalAction { action: usize, stage: Stage },

    /// Discrete action index outside [0, 10].
    #[error("unknown discrete action index {0}")]
    UnknownAction(usize),

    /// Continuous action vector has the wrong length.
    #[error("continuous action must have {expected} fields, got {got}")]
    ActionDimension { expected: usize, got: usize },

    /// A recycle-closing unit was placed but no mixer exists to receive the recycle.
    #[error("no mixer in the topology to receive the recycle from {tag}")]
    MissingRecycleTarget { tag: String },

    /// Sizing input outside the domain of a cost correlation.
    #[error("invalid sizing input {what} = {value}")]
    InvalidSizing { what: &'static str, value: f64 },

    /// Failure reported by the simulation engine or a unit-operation provider.
    #[error("backend error in {unit}: {message}")]
    Backend { unit: String, message: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlowsheetError {
    pub fn backend(unit: impl Into<String>, message: impl Into<String>) -> Self {
        FlowsheetError::Backend {
            unit: unit.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FlowsheetError>;
