// src/rl/dispatch.rs
//
// Unit-operation dispatch.
//
// For one legal discrete action the dispatcher:
// 1. generates a unique instance tag from the per-kind counter,
// 2. places the unit through the provider (plus the recycle splitter and
//    its wiring into the active mixer for the recycle-closing kinds),
// 3. solves the topology and checks convergence,
// 4. on convergence records the info log entry, prices the unit and
//    updates product tracking.
//
// On non-convergence nothing is recorded; the caller ends the episode.

use tracing::debug;

use crate::backend::{ColumnSpec, ReactorMode, SimulationEngine, UnitOperations};
use crate::error::{FlowsheetError, Result};
use crate::stream::{Stream, StreamSummary};
use crate::types::{Species, UnitKind};

use super::action_encoding::OperatingParams;
use super::cost;
use super::info::{InfoLog, UnitRecord};
use super::reward::RewardWeights;
use super::sequencer::Topology;

/// Inlet port of a mixer that receives recycle streams.
pub const RECYCLE_PORT: &str = "F(IN)";

/// Reflux ratio and pressure (bar) of the product columns.
pub const PRODUCT_COLUMN_REFLUX: f64 = 2.5;
pub const PRODUCT_COLUMN_PRESSURE: f64 = 1.0;
/// Reflux ratio of the methane purge column (runs at inlet pressure).
pub const PURGE_COLUMN_REFLUX: f64 = 1.5;

/// Per-type instance counters. Reactors share one counter, as do all
/// columns and both flash variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitCounters {
    pub mixer: u32,
    pub heater: u32,
    pub cooler: u32,
    pub reactor: u32,
    pub column: u32,
    pub flash: u32,
}

impl UnitCounters {
    fn slot(&mut self, kind: UnitKind) -> &mut u32 {
        match kind {
            UnitKind::Mixer => &mut self.mixer,
            UnitKind::Heater => &mut self.heater,
            UnitKind::Cooler => &mut self.cooler,
            UnitKind::Reactor | UnitKind::AdiabaticReactor => &mut self.reactor,
            UnitKind::Column
            | UnitKind::PurgeColumn
            | UnitKind::RecycleColumn
            | UnitKind::TriColumn => &mut self.column,
            UnitKind::Flash | UnitKind::FlashRecycle => &mut self.flash,
        }
    }

    /// Tag the next instance of `kind` would receive.
    pub fn peek_tag(&self, kind: UnitKind) -> String {
        let mut copy = *self;
        format!("{}{}", kind.tag_prefix(), *copy.slot(kind) + 1)
    }

    /// Increment the counter for `kind` and return its new value.
    pub fn bump(&mut self, kind: UnitKind) -> u32 {
        let slot = self.slot(kind);
        *slot += 1;
        *slot
    }
}

/// Most recent streams believed to be the purified products.
#[derive(Debug, Clone)]
pub struct Products<S> {
    pub bzn_out: Option<S>,
    pub metan_out: Option<S>,
}

impl<S> Default for Products<S> {
    fn default() -> Self {
        Self {
            bzn_out: None,
            metan_out: None,
        }
    }
}

/// Flowsheet under construction: topology record, product candidates and
/// the info log.
#[derive(Debug, Clone)]
pub struct Flowsheet<S> {
    pub topology: Topology,
    pub products: Products<S>,
    pub info: InfoLog,
}

impl<S> Default for Flowsheet<S> {
    fn default() -> Self {
        Self {
            topology: Topology::default(),
            products: Products::default(),
            info: InfoLog::default(),
        }
    }
}

/// A converged unit placement.
#[derive(Debug, Clone)]
pub struct UnitStep<S> {
    pub kind: UnitKind,
    pub tag: String,
    /// Primary outlet, fed to the next step.
    pub outlet: S,
    /// Recycle stream for the recycle-closing kinds.
    pub recycle: Option<S>,
    /// Capital plus operating cost (non-positive).
    pub cost: f64,
}

#[derive(Debug, Clone)]
pub enum DispatchOutcome<S> {
    Converged(UnitStep<S>),
    NotConverged { kind: UnitKind, tag: String, outlet: S },
}

impl<S> DispatchOutcome<S> {
    pub fn outlet(&self) -> &S {
        match self {
            DispatchOutcome::Converged(step) => &step.outlet,
            DispatchOutcome::NotConverged { outlet, .. } => outlet,
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            DispatchOutcome::Converged(step) => &step.tag,
            DispatchOutcome::NotConverged { tag, .. } => tag,
        }
    }
}

/// Owns the engine session and the provider set of one episode.
pub struct UnitDispatcher<E, U> {
    engine: E,
    units: U,
    counters: UnitCounters,
}

impl<E, U> UnitDispatcher<E, U>
where
    E: SimulationEngine,
    U: UnitOperations,
{
    pub fn new(engine: E, units: U) -> Self {
        Self {
            engine,
            units,
            counters: UnitCounters::default(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn units(&self) -> &U {
        &self.units
    }

    pub fn counters(&self) -> UnitCounters {
        self.counters
    }

    /// Clear engine topology and counters; build the feed stream.
    pub fn reset(&mut self, spec: &crate::types::InletSpec) -> Result<U::Stream> {
        self.engine.reinitialize()?;
        self.counters = UnitCounters::default();
        self.units.feed(spec)
    }

    /// Place and solve one unit of `kind` fed by `inlet`.
    pub fn dispatch(
        &mut self,
        kind: UnitKind,
        params: &OperatingParams,
        inlet: &U::Stream,
        sheet: &mut Flowsheet<U::Stream>,
        weights: &RewardWeights,
    ) -> Result<DispatchOutcome<U::Stream>> {
        let recycle_target = match kind {
            UnitKind::FlashRecycle | UnitKind::RecycleColumn => {
                let target = sheet.topology.active_mixer.clone().ok_or_else(|| {
                    FlowsheetError::MissingRecycleTarget {
                        tag: self.counters.peek_tag(kind),
                    }
                })?;
                Some(target)
            }
            _ => None,
        };

        // Restored when a handler errors. A non-converged solve keeps the
        // consumed tag.
        let counters = self.counters;
        let topology = sheet.topology.clone();

        let n = self.counters.bump(kind);
        let tag = format!("{}{}", kind.tag_prefix(), n);
        sheet.topology.record(kind, &tag);
        debug!(tag = %tag, kind = %kind, "placing unit");

        let outcome = match kind {
            UnitKind::Mixer => self.mixer(tag, inlet, sheet, weights),
            UnitKind::Heater => self.heater(tag, params, inlet, sheet, weights),
            UnitKind::Cooler => self.cooler(tag, params, inlet, sheet, weights),
            UnitKind::Reactor => self.reactor(tag, ReactorMode::Isothermal, params, inlet, sheet, weights),
            UnitKind::AdiabaticReactor => {
                self.reactor(tag, ReactorMode::Adiabatic, params, inlet, sheet, weights)
            }
            UnitKind::Column => {
                let spec = ColumnSpec {
                    stages: params.column_stages,
                    distillate_rate: params.column_distillate_rate,
                    reflux_ratio: PRODUCT_COLUMN_REFLUX,
                    pressure: PRODUCT_COLUMN_PRESSURE,
                };
                self.product_column(tag, spec, inlet, sheet, weights)
            }
            UnitKind::PurgeColumn => self.purge_column(tag, params, inlet, sheet, weights),
            UnitKind::RecycleColumn => {
                // Checked above.
                let target = recycle_target.unwrap_or_default();
                self.recycle_column(tag, n, &target, params, inlet, sheet, weights)
            }
            UnitKind::TriColumn => self.tri_column(tag, params, inlet, sheet, weights),
            UnitKind::Flash => self.flash(tag, params, inlet, sheet, weights),
            UnitKind::FlashRecycle => {
                let target = recycle_target.unwrap_or_default();
                self.flash_recycle(tag, n, &target, params, inlet, sheet, weights)
            }
        };
        if outcome.is_err() {
            self.counters = counters;
            sheet.topology = topology;
        }
        outcome
    }

    fn solve(&mut self) -> Result<bool> {
        self.engine.run()?;
        Ok(self.engine.is_converged())
    }

    fn energy_cost(&self, tag: &str, ratio: f64, weights: &RewardWeights) -> Result<f64> {
        let energy = self.units.energy_consumption(tag)?;
        Ok(cost::energy_cost(energy, weights.energy_scale, ratio))
    }

    fn column_capital(&self, tag: &str, weights: &RewardWeights) -> Result<f64> {
        let (diameter, height) = self.units.column_sizing(tag)?;
        Ok(cost::sized_fixed_cost(
            weights.unit_fixed_cost,
            cost::column_sizing_cost(diameter, height)?,
        ))
    }

    fn track_bzn_product(
        sheet: &mut Flowsheet<U::Stream>,
        distillate: &U::Stream,
        weights: &RewardWeights,
    ) {
        if distillate.molar_flow(Species::Bzn) > weights.bzn_product_min_flow {
            sheet.products.bzn_out = Some(distillate.clone());
        }
    }

    fn mixer(
        &mut self,
        tag: String,
        inlet: &U::Stream,
        sheet: &mut Flowsheet<U::Stream>,
        weights: &RewardWeights,
    ) -> Result<DispatchOutcome<U::Stream>> {
        let outlet = self.units.mixer(&tag, inlet)?;
        if !self.solve()? {
            return Ok(not_converged(UnitKind::Mixer, tag, outlet));
        }
        sheet.info.insert(
            tag.clone(),
            UnitRecord::Mixer {
                outlet: StreamSummary::of(&outlet),
            },
        );
        Ok(converged(UnitKind::Mixer, tag, outlet, None, -weights.mixer_fixed_cost))
    }

    fn heater(
        &mut self,
        tag: String,
        p: &OperatingParams,
        inlet: &U::Stream,
        sheet: &mut Flowsheet<U::Stream>,
        weights: &RewardWeights,
    ) -> Result<DispatchOutcome<U::Stream>> {
        let outlet = self
            .units
            .heater(&tag, p.heater_temperature, p.heater_pressure, inlet)?;
        if !self.solve()? {
            return Ok(not_converged(UnitKind::Heater, tag, outlet));
        }
        let cost = -weights.unit_fixed_cost + self.energy_cost(&tag, 1.0, weights)?;
        sheet.info.insert(
            tag.clone(),
            UnitRecord::Heater {
                temperature: p.heater_temperature,
                pressure: p.heater_pressure,
                outlet: StreamSummary::of(&outlet),
            },
        );
        Ok(converged(UnitKind::Heater, tag, outlet, None, cost))
    }

    fn cooler(
        &mut self,
        tag: String,
        p: &OperatingParams,
        inlet: &U::Stream,
        sheet: &mut Flowsheet<U::Stream>,
        weights: &RewardWeights,
    ) -> Result<DispatchOutcome<U::Stream>> {
        let outlet = self.units.cooler(&tag, p.cooler_temperature, inlet)?;
        if !self.solve()? {
            return Ok(not_converged(UnitKind::Cooler, tag, outlet));
        }
        let cost = -weights.unit_fixed_cost + self.energy_cost(&tag, 1.0, weights)?;
        sheet.info.insert(
            tag.clone(),
            UnitRecord::Cooler {
                temperature: p.cooler_temperature,
                outlet: StreamSummary::of(&outlet),
            },
        );
        Ok(converged(UnitKind::Cooler, tag, outlet, None, cost))
    }

    fn reactor(
        &mut self,
        tag: String,
        mode: ReactorMode,
        p: &OperatingParams,
        inlet: &U::Stream,
        sheet: &mut Flowsheet<U::Stream>,
        weights: &RewardWeights,
    ) -> Result<DispatchOutcome<U::Stream>> {
        let (kind, diameter, length) = match mode {
            ReactorMode::Isothermal => (UnitKind::Reactor, p.reactor_diameter, p.reactor_length),
            ReactorMode::Adiabatic => (
                UnitKind::AdiabaticReactor,
                p.adiabatic_reactor_diameter,
                p.adiabatic_reactor_length,
            ),
        };
        let outlet = self.units.reactor(&tag, mode, diameter, length, inlet)?;
        if !self.solve()? {
            return Ok(not_converged(kind, tag, outlet));
        }
        let fixed = cost::sized_fixed_cost(
            weights.unit_fixed_cost,
            cost::reactor_sizing_cost(diameter, length)?,
        );
        // The adiabatic reactor has no external duty.
        let variable = match mode {
            ReactorMode::Isothermal => self.energy_cost(&tag, 1.0, weights)?,
            ReactorMode::Adiabatic => 0.0,
        };
        sheet.info.insert(
            tag.clone(),
            UnitRecord::Reactor {
                adiabatic: mode == ReactorMode::Adiabatic,
                diameter,
                length,
                outlet: StreamSummary::of(&outlet),
            },
        );
        Ok(converged(kind, tag, outlet, None, fixed + variable))
    }

    fn product_column(
        &mut self,
        tag: String,
        spec: ColumnSpec,
        inlet: &U::Stream,
        sheet: &mut Flowsheet<U::Stream>,
        weights: &RewardWeights,
    ) -> Result<DispatchOutcome<U::Stream>> {
        let outlets = self.units.column(&tag, &spec, inlet)?;
        if !self.solve()? {
            return Ok(not_converged(UnitKind::Column, tag, outlets.distillate));
        }
        let cost = self.column_capital(&tag, weights)? + self.energy_cost(&tag, 1.0, weights)?;
        sheet.info.insert(
            tag.clone(),
            UnitRecord::Column {
                stages: spec.stages,
                distillate_rate: spec.distillate_rate,
                distillate: StreamSummary::of(&outlets.distillate),
                bottoms: StreamSummary::of(&outlets.bottoms),
            },
        );
        Self::track_bzn_product(sheet, &outlets.distillate, weights);
        Ok(converged(UnitKind::Column, tag, outlets.distillate, None, cost))
    }

    fn purge_column(
        &mut self,
        tag: String,
        p: &OperatingParams,
        inlet: &U::Stream,
        sheet: &mut Flowsheet<U::Stream>,
        weights: &RewardWeights,
    ) -> Result<DispatchOutcome<U::Stream>> {
        // Take the methane overhead; with a recycle loop the agent may draw
        // extra distillate to purge accumulated lights.
        let mut distillate_rate = inlet.molar_flow(Species::Methane);
        if sheet.topology.mixer_in_segment {
            distillate_rate += p.purge_column_distillate_offset;
        }
        let spec = ColumnSpec {
            stages: p.purge_column_stages,
            distillate_rate,
            reflux_ratio: PURGE_COLUMN_REFLUX,
            pressure: inlet.pressure(),
        };
        let outlets = self.units.column(&tag, &spec, inlet)?;
        if !self.solve()? {
            return Ok(not_converged(UnitKind::PurgeColumn, tag, outlets.bottoms));
        }
        let cost = self.column_capital(&tag, weights)? + self.energy_cost(&tag, 1.0, weights)?;
        sheet.info.insert(
            tag.clone(),
            UnitRecord::PurgeColumn {
                stages: spec.stages,
                distillate_rate,
                distillate: StreamSummary::of(&outlets.distillate),
                bottoms: StreamSummary::of(&outlets.bottoms),
            },
        );
        if outlets.distillate.molar_flow(Species::Methane) > weights.methane_product_min_flow {
            sheet.products.metan_out = Some(outlets.distillate.clone());
        }
        Ok(converged(UnitKind::PurgeColumn, tag, outlets.bottoms, None, cost))
    }

    #[allow(clippy::too_many_arguments)]
    fn recycle_column(
        &mut self,
        tag: String,
        n: u32,
        mixer: &str,
        p: &OperatingParams,
        inlet: &U::Stream,
        sheet: &mut Flowsheet<U::Stream>,
        weights: &RewardWeights,
    ) -> Result<DispatchOutcome<U::Stream>> {
        let spec = ColumnSpec {
            stages: p.recycle_column_stages,
            distillate_rate: p.recycle_column_distillate_rate,
            reflux_ratio: PRODUCT_COLUMN_REFLUX,
            pressure: PRODUCT_COLUMN_PRESSURE,
        };
        let ratio = p.recycle_column_recycle_ratio;
        let outlets = self.units.column(&tag, &spec, inlet)?;
        let split = self
            .units
            .splitter(&format!("S{n}"), ratio, &outlets.bottoms)?;
        self.engine.connect(mixer, split.recycle.name(), RECYCLE_PORT)?;

        if !self.solve()? {
            return Ok(not_converged(UnitKind::RecycleColumn, tag, outlets.distillate));
        }
        let cost = self.column_capital(&tag, weights)? + self.energy_cost(&tag, ratio, weights)?;
        sheet.info.insert(
            tag.clone(),
            UnitRecord::RecycleColumn {
                stages: spec.stages,
                distillate_rate: spec.distillate_rate,
                recycle_ratio: ratio,
                distillate: StreamSummary::of(&outlets.distillate),
                recycle: StreamSummary::of(&split.recycle),
            },
        );
        Self::track_bzn_product(sheet, &outlets.distillate, weights);
        sheet.topology.start_segment();
        Ok(converged(
            UnitKind::RecycleColumn,
            tag,
            outlets.distillate,
            Some(split.recycle),
            cost,
        ))
    }

    fn tri_column(
        &mut self,
        tag: String,
        p: &OperatingParams,
        inlet: &U::Stream,
        sheet: &mut Flowsheet<U::Stream>,
        weights: &RewardWeights,
    ) -> Result<DispatchOutcome<U::Stream>> {
        let spec = ColumnSpec {
            stages: p.tri_column_stages,
            distillate_rate: p.tri_column_distillate_rate,
            reflux_ratio: PRODUCT_COLUMN_REFLUX,
            pressure: PRODUCT_COLUMN_PRESSURE,
        };
        let outlets = self.units.partial_column(&tag, &spec, inlet)?;
        if !self.solve()? {
            return Ok(not_converged(UnitKind::TriColumn, tag, outlets.distillate));
        }
        let cost = self.column_capital(&tag, weights)? + self.energy_cost(&tag, 1.0, weights)?;
        sheet.info.insert(
            tag.clone(),
            UnitRecord::TriColumn {
                stages: spec.stages,
                distillate_rate: spec.distillate_rate,
                distillate: StreamSummary::of(&outlets.distillate),
                bottoms: StreamSummary::of(&outlets.bottoms),
            },
        );
        Self::track_bzn_product(sheet, &outlets.distillate, weights);
        Ok(converged(UnitKind::TriColumn, tag, outlets.distillate, None, cost))
    }

    fn flash_capital(&self, inlet: &U::Stream, weights: &RewardWeights) -> Result<f64> {
        let volume = cost::flash_volume(inlet.volume_flow());
        Ok(cost::sized_fixed_cost(
            weights.unit_fixed_cost,
            cost::flash_sizing_cost(volume)?,
        ))
    }

    fn flash(
        &mut self,
        tag: String,
        p: &OperatingParams,
        inlet: &U::Stream,
        sheet: &mut Flowsheet<U::Stream>,
        weights: &RewardWeights,
    ) -> Result<DispatchOutcome<U::Stream>> {
        let outlets = self
            .units
            .flash(&tag, p.flash_temperature, p.flash_pressure, inlet)?;
        if !self.solve()? {
            return Ok(not_converged(UnitKind::Flash, tag, outlets.liquid));
        }
        let cost = self.flash_capital(inlet, weights)? + self.energy_cost(&tag, 1.0, weights)?;
        sheet.info.insert(
            tag.clone(),
            UnitRecord::Flash {
                temperature: p.flash_temperature,
                pressure: p.flash_pressure,
                vapor: StreamSummary::of(&outlets.vapor),
                liquid: StreamSummary::of(&outlets.liquid),
            },
        );
        Ok(converged(UnitKind::Flash, tag, outlets.liquid, None, cost))
    }

    #[allow(clippy::too_many_arguments)]
    fn flash_recycle(
        &mut self,
        tag: String,
        n: u32,
        mixer: &str,
        p: &OperatingParams,
        inlet: &U::Stream,
        sheet: &mut Flowsheet<U::Stream>,
        weights: &RewardWeights,
    ) -> Result<DispatchOutcome<U::Stream>> {
        let ratio = p.flash_recycle_ratio;
        let outlets = self.units.flash(
            &tag,
            p.flash_recycle_temperature,
            p.flash_recycle_pressure,
            inlet,
        )?;
        let split = self
            .units
            .splitter(&format!("SF{n}"), ratio, &outlets.vapor)?;
        self.engine.connect(mixer, split.recycle.name(), RECYCLE_PORT)?;

        if !self.solve()? {
            return Ok(not_converged(UnitKind::FlashRecycle, tag, outlets.liquid));
        }
        let cost = self.flash_capital(inlet, weights)? + self.energy_cost(&tag, ratio, weights)?;
        sheet.info.insert(
            tag.clone(),
            UnitRecord::FlashRecycle {
                temperature: p.flash_recycle_temperature,
                pressure: p.flash_recycle_pressure,
                recycle_ratio: ratio,
                recycle: StreamSummary::of(&split.recycle),
                liquid: StreamSummary::of(&outlets.liquid),
            },
        );
        Ok(converged(
            UnitKind::FlashRecycle,
            tag,
            outlets.liquid,
            Some(split.recycle),
            cost,
        ))
    }
}

fn converged<S>(
    kind: UnitKind,
    tag: String,
    outlet: S,
    recycle: Option<S>,
    cost: f64,
) -> DispatchOutcome<S> {
    DispatchOutcome::Converged(UnitStep {
        kind,
        tag,
        outlet,
        recycle,
        cost,
    })
}

fn not_converged<S>(kind: UnitKind, tag: String, outlet: S) -> DispatchOutcome<S> {
    DispatchOutcome::NotConverged { kind, tag, outlet }
}
