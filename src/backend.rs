// src/backend.rs
//
// Contracts for the external collaborators of the environment:
// - SimulationEngine: solves the current topology and reports convergence
// - UnitOperations:   places unit operations on an inlet stream
//
// Outlet streams are handles; their values (and the energy / sizing
// accessors) are only meaningful after `SimulationEngine::run`.

use crate::error::Result;
use crate::stream::Stream;

/// Process simulation engine session. One session per episode instance.
pub trait SimulationEngine {
    /// Re-solve the whole topology. Blocks until the solver returns.
    fn run(&mut self) -> Result<()>;

    /// Whether the last `run` converged.
    fn is_converged(&self) -> bool;

    /// Clear all topology state for a new episode.
    fn reinitialize(&mut self) -> Result<()>;

    /// Wire `stream` into inlet `port` of the existing unit `block`.
    fn connect(&mut self, block: &str, stream: &str, port: &str) -> Result<()>;
}

/// Reactor energy model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactorMode {
    Isothermal,
    Adiabatic,
}

/// Column operating specification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSpec {
    pub stages: u32,
    pub distillate_rate: f64,
    pub reflux_ratio: f64,
    pub pressure: f64,
}

#[derive(Debug, Clone)]
pub struct ColumnOutlets<S> {
    pub distillate: S,
    pub bottoms: S,
}

/// Three-product column: distillate, bottoms and a light vent.
#[derive(Debug, Clone)]
pub struct PartialColumnOutlets<S> {
    pub distillate: S,
    pub bottoms: S,
    pub vent: S,
}

#[derive(Debug, Clone)]
pub struct FlashOutlets<S> {
    pub vapor: S,
    pub liquid: S,
}

#[derive(Debug, Clone)]
pub struct SplitterOutlets<S> {
    pub recycle: S,
    pub purge: S,
}

/// Unit-operation providers, one method per unit type. Each call creates a
/// new unit with instance tag `tag` fed by `inlet`.
pub trait UnitOperations {
    type Stream: Stream + Clone + std::fmt::Debug;

    /// Feed stream built from the episode's inlet specification.
    fn feed(&mut self, spec: &crate::types::InletSpec) -> Result<Self::Stream>;

    fn mixer(&mut self, tag: &str, inlet: &Self::Stream) -> Result<Self::Stream>;

    fn heater(
        &mut self,
        tag: &str,
        temperature: f64,
        pressure: f64,
        inlet: &Self::Stream,
    ) -> Result<Self::Stream>;

    fn cooler(&mut self, tag: &str, temperature: f64, inlet: &Self::Stream)
        -> Result<Self::Stream>;

    fn reactor(
        &mut self,
        tag: &str,
        mode: ReactorMode,
        diameter: f64,
        length: f64,
        inlet: &Self::Stream,
    ) -> Result<Self::Stream>;

    fn column(
        &mut self,
        tag: &str,
        spec: &ColumnSpec,
        inlet: &Self::Stream,
    ) -> Result<ColumnOutlets<Self::Stream>>;

    fn partial_column(
        &mut self,
        tag: &str,
        spec: &ColumnSpec,
        inlet: &Self::Stream,
    ) -> Result<PartialColumnOutlets<Self::Stream>>;

    fn flash(
        &mut self,
        tag: &str,
        temperature: f64,
        pressure: f64,
        inlet: &Self::Stream,
    ) -> Result<FlashOutlets<Self::Stream>>;

    fn splitter(
        &mut self,
        tag: &str,
        recycle_ratio: f64,
        inlet: &Self::Stream,
    ) -> Result<SplitterOutlets<Self::Stream>>;

    /// Energy duty of unit `tag` (kW, magnitude).
    fn energy_consumption(&self, tag: &str) -> Result<f64>;

    /// Column diameter and height (m) of unit `tag`.
    fn column_sizing(&self, tag: &str) -> Result<(f64, f64)>;
}
