//! Flowsheet synthesis environment.
//!
//! A reinforcement-learning environment that builds a chemical process
//! flowsheet for toluene hydrodealkylation one unit operation at a time.
//! Each step places a unit (mixer, heater, reactor, flash, column, ...),
//! asks the simulation backend to solve it, prices it and shapes a reward
//! towards pure benzene and methane products.
//!
//! The simulator sits behind two traits in [`backend`]; [`surrogate`] is a
//! lightweight in-process implementation used by the rollout binary
//! (`src/bin/flowsheet_rollout.rs`) and the tests.

pub mod backend;
pub mod config;
pub mod error;
pub mod logging;
pub mod rl;
pub mod stream;
pub mod surrogate;
pub mod types;

// --- Re-exports for ergonomic external use ---------------------------------

pub use backend::{SimulationEngine, UnitOperations};

pub use config::FlowsheetConfig;

pub use error::{FlowsheetError, Result};

pub use rl::{
    Action, ActionMask, EpisodeSummary, FlowsheetEnv, Observation, Stage, StepResult,
    TerminationReason,
};

pub use stream::{Stream, StreamSummary};

pub use surrogate::{SurrogateEngine, SurrogateStream, SurrogateUnits};

pub use types::{InletSpec, Species, UnitKind};
