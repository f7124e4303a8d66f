// src/surrogate.rs
//
// Deterministic in-process backend for rollouts and tests.
//
// Units are simple mass/energy balances for toluene hydrodealkylation
// (TOL + H2 -> BZN + CH4):
//   - heaters / coolers: set T (and P), duty ~ F * cp * |dT|
//   - reactors:          first-order conversion in reactor volume, H2-limited
//   - flash:             volatility-ordered vapour split, sharper at high P / low T
//   - columns:           distillate filled in volatility order with stage-
//                        dependent leakage
//
// The engine records recycle connections but does not iterate tear
// streams; every `run` converges unless a failure is scripted.

use std::collections::HashMap;
use std::f64::consts::PI;

use crate::backend::{
    ColumnOutlets, ColumnSpec, FlashOutlets, PartialColumnOutlets, ReactorMode,
    SimulationEngine, SplitterOutlets, UnitOperations,
};
use crate::error::{FlowsheetError, Result};
use crate::stream::Stream;
use crate::types::{InletSpec, Species};

/// Heat capacity used for sensible duties (kW per kmol/h per K).
const HEAT_CAPACITY: f64 = 0.035;
/// Ideal-gas constant in m³·bar/(kmol·K).
const GAS_CONSTANT: f64 = 0.08314;
/// First-order rate constants per m³ of reactor volume.
const RATE_ISOTHERMAL: f64 = 0.035;
const RATE_ADIABATIC: f64 = 0.045;
/// Adiabatic temperature rise per unit of reaction extent / total flow.
const ADIABATIC_RISE: f64 = 420.0;
/// Heat removed per kmol/h reacted in the isothermal reactor (kW).
const REACTION_DUTY: f64 = 12.0;
const REACTOR_PRESSURE_DROP: f64 = 0.5;
/// Reboiler + condenser duty per kmol/h of column vapour (kW).
const COLUMN_DUTY: f64 = 9.0;
const DISTILLATE_TEMPERATURE: f64 = 80.0;
const BOTTOMS_TEMPERATURE: f64 = 110.0;

/// Lightest to heaviest.
const VOLATILITY_ORDER: [Species; 4] = [
    Species::Hydrogen,
    Species::Methane,
    Species::Bzn,
    Species::Tol,
];

/// Vapour fraction of each species at the reference flash condition.
fn base_vapor_fraction(species: Species) -> f64 {
    match species {
        Species::Hydrogen => 0.995,
        Species::Methane => 0.92,
        Species::Bzn => 0.02,
        Species::Tol => 0.008,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurrogateStream {
    name: String,
    temperature: f64,
    pressure: f64,
    flows: [f64; 4],
}

impl SurrogateStream {
    pub fn new(name: impl Into<String>, temperature: f64, pressure: f64, flows: [f64; 4]) -> Self {
        Self {
            name: name.into(),
            temperature,
            pressure,
            flows,
        }
    }

    pub fn flows(&self) -> [f64; 4] {
        self.flows
    }
}

impl Stream for SurrogateStream {
    fn name(&self) -> &str {
        &self.name
    }

    fn temperature(&self) -> f64 {
        self.temperature
    }

    fn pressure(&self) -> f64 {
        self.pressure
    }

    fn molar_flow(&self, species: Species) -> f64 {
        self.flows[species.index()]
    }

    fn total_molar_flow(&self) -> f64 {
        self.flows.iter().sum()
    }

    fn volume_flow(&self) -> f64 {
        self.total_molar_flow() * GAS_CONSTANT * (self.temperature + 273.15) / self.pressure
    }
}

/// Engine session with optional scripted failure.
#[derive(Debug, Clone, Default)]
pub struct SurrogateEngine {
    runs: u32,
    converged: bool,
    fail_on_run: Option<u32>,
    connections: Vec<(String, String, String)>,
    sessions: u32,
}

impl SurrogateEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail to converge on the `run`-th solve of every episode (1-based).
    pub fn with_failure_on_run(run: u32) -> Self {
        Self {
            fail_on_run: Some(run),
            ..Self::default()
        }
    }

    pub fn runs(&self) -> u32 {
        self.runs
    }

    /// Number of `reinitialize` calls.
    pub fn sessions(&self) -> u32 {
        self.sessions
    }

    /// `(block, stream, port)` for every recycle connection this episode.
    pub fn connections(&self) -> &[(String, String, String)] {
        &self.connections
    }
}

impl SimulationEngine for SurrogateEngine {
    fn run(&mut self) -> Result<()> {
        self.runs += 1;
        self.converged = self.fail_on_run != Some(self.runs);
        Ok(())
    }

    fn is_converged(&self) -> bool {
        self.converged
    }

    fn reinitialize(&mut self) -> Result<()> {
        self.runs = 0;
        self.converged = false;
        self.connections.clear();
        self.sessions += 1;
        Ok(())
    }

    fn connect(&mut self, block: &str, stream: &str, port: &str) -> Result<()> {
        self.connections
            .push((block.to_string(), stream.to_string(), port.to_string()));
        Ok(())
    }
}

/// Unit-operation providers backed by the balances above.
#[derive(Debug, Clone, Default)]
pub struct SurrogateUnits {
    duties: HashMap<String, f64>,
    sizing: HashMap<String, (f64, f64)>,
}

impl SurrogateUnits {
    pub fn new() -> Self {
        Self::default()
    }

    fn sensible_duty(flow: f64, from: f64, to: f64) -> f64 {
        flow * HEAT_CAPACITY * (to - from).abs()
    }

    fn split_column(
        &mut self,
        tag: &str,
        spec: &ColumnSpec,
        inlet: &SurrogateStream,
    ) -> Result<(SurrogateStream, SurrogateStream)> {
        if spec.distillate_rate < 0.0 || !spec.distillate_rate.is_finite() {
            return Err(FlowsheetError::backend(
                tag,
                format!("invalid distillate rate {}", spec.distillate_rate),
            ));
        }
        let total = inlet.total_molar_flow();
        let rate = spec.distillate_rate.min(total);

        // Ideal split: fill the distillate from the lightest species down.
        let mut ideal = [0.0; 4];
        let mut remaining = rate;
        for species in VOLATILITY_ORDER {
            let take = inlet.molar_flow(species).min(remaining);
            ideal[species.index()] = take;
            remaining -= take;
        }

        // Leakage towards feed composition shrinks with stages and reflux.
        let leakage = 0.3 * 0.8f64.powi(spec.stages as i32) / spec.reflux_ratio.max(0.1);
        let mut top = [0.0; 4];
        let mut bottom = [0.0; 4];
        for species in Species::ALL {
            let i = species.index();
            let feed = inlet.molar_flow(species);
            let mixed = if total > 0.0 { rate * feed / total } else { 0.0 };
            top[i] = ((1.0 - leakage) * ideal[i] + leakage * mixed).min(feed);
            bottom[i] = (feed - top[i]).max(0.0);
        }

        let vapor = (spec.reflux_ratio + 1.0) * rate;
        let diameter = 0.3 + 0.1 * vapor.sqrt();
        let height = 1.2 * 0.61 * (spec.stages.max(3) as f64 - 2.0);
        self.duties.insert(tag.to_string(), COLUMN_DUTY * vapor);
        self.sizing.insert(tag.to_string(), (diameter, height));

        Ok((
            SurrogateStream::new(format!("{tag}_D"), DISTILLATE_TEMPERATURE, spec.pressure, top),
            SurrogateStream::new(format!("{tag}_B"), BOTTOMS_TEMPERATURE, spec.pressure, bottom),
        ))
    }
}

impl UnitOperations for SurrogateUnits {
    type Stream = SurrogateStream;

    fn feed(&mut self, spec: &InletSpec) -> Result<SurrogateStream> {
        self.duties.clear();
        self.sizing.clear();
        Ok(SurrogateStream::new(
            "IN",
            spec.temperature,
            spec.pressure,
            [spec.tol, spec.hydrogen, spec.methane, spec.bzn],
        ))
    }

    fn mixer(&mut self, tag: &str, inlet: &SurrogateStream) -> Result<SurrogateStream> {
        Ok(SurrogateStream::new(
            format!("{tag}_OUT"),
            inlet.temperature,
            inlet.pressure,
            inlet.flows,
        ))
    }

    fn heater(
        &mut self,
        tag: &str,
        temperature: f64,
        pressure: f64,
        inlet: &SurrogateStream,
    ) -> Result<SurrogateStream> {
        let duty = Self::sensible_duty(inlet.total_molar_flow(), inlet.temperature, temperature);
        self.duties.insert(tag.to_string(), duty);
        Ok(SurrogateStream::new(format!("{tag}_OUT"), temperature, pressure, inlet.flows))
    }

    fn cooler(
        &mut self,
        tag: &str,
        temperature: f64,
        inlet: &SurrogateStream,
    ) -> Result<SurrogateStream> {
        let duty = Self::sensible_duty(inlet.total_molar_flow(), inlet.temperature, temperature);
        self.duties.insert(tag.to_string(), duty);
        Ok(SurrogateStream::new(
            format!("{tag}_OUT"),
            temperature,
            inlet.pressure,
            inlet.flows,
        ))
    }

    fn reactor(
        &mut self,
        tag: &str,
        mode: ReactorMode,
        diameter: f64,
        length: f64,
        inlet: &SurrogateStream,
    ) -> Result<SurrogateStream> {
        if !(diameter > 0.0 && length > 0.0) {
            return Err(FlowsheetError::backend(
                tag,
                format!("invalid reactor size D={diameter} L={length}"),
            ));
        }
        let volume = PI * diameter * diameter * length / 4.0;
        let rate = match mode {
            ReactorMode::Isothermal => RATE_ISOTHERMAL,
            ReactorMode::Adiabatic => RATE_ADIABATIC,
        };
        let conversion = 1.0 - (-rate * volume).exp();

        let mut flows = inlet.flows;
        let extent = (conversion * flows[Species::Tol.index()]).min(flows[Species::Hydrogen.index()]);
        flows[Species::Tol.index()] -= extent;
        flows[Species::Hydrogen.index()] -= extent;
        flows[Species::Bzn.index()] += extent;
        flows[Species::Methane.index()] += extent;

        let total = inlet.total_molar_flow();
        let (temperature, duty) = match mode {
            ReactorMode::Isothermal => (inlet.temperature, REACTION_DUTY * extent),
            ReactorMode::Adiabatic => {
                let rise = if total > 0.0 {
                    ADIABATIC_RISE * extent / total
                } else {
                    0.0
                };
                (inlet.temperature + rise, 0.0)
            }
        };
        self.duties.insert(tag.to_string(), duty);

        Ok(SurrogateStream::new(
            format!("{tag}_OUT"),
            temperature,
            (inlet.pressure - REACTOR_PRESSURE_DROP).max(1.0),
            flows,
        ))
    }

    fn column(
        &mut self,
        tag: &str,
        spec: &ColumnSpec,
        inlet: &SurrogateStream,
    ) -> Result<ColumnOutlets<SurrogateStream>> {
        let (distillate, bottoms) = self.split_column(tag, spec, inlet)?;
        Ok(ColumnOutlets {
            distillate,
            bottoms,
        })
    }

    fn partial_column(
        &mut self,
        tag: &str,
        spec: &ColumnSpec,
        inlet: &SurrogateStream,
    ) -> Result<PartialColumnOutlets<SurrogateStream>> {
        // Lights leave through the vent before the main split.
        let mut vent = [0.0; 4];
        let mut rest = inlet.flows;
        for species in [Species::Hydrogen, Species::Methane] {
            let i = species.index();
            vent[i] = 0.97 * rest[i];
            rest[i] -= vent[i];
        }
        let stripped = SurrogateStream::new(
            format!("{tag}_FEED"),
            inlet.temperature,
            inlet.pressure,
            rest,
        );
        let (distillate, bottoms) = self.split_column(tag, spec, &stripped)?;
        Ok(PartialColumnOutlets {
            distillate,
            bottoms,
            vent: SurrogateStream::new(
                format!("{tag}_S"),
                DISTILLATE_TEMPERATURE,
                spec.pressure,
                vent,
            ),
        })
    }

    fn flash(
        &mut self,
        tag: &str,
        temperature: f64,
        pressure: f64,
        inlet: &SurrogateStream,
    ) -> Result<FlashOutlets<SurrogateStream>> {
        if !(pressure > 0.0) {
            return Err(FlowsheetError::backend(tag, format!("invalid pressure {pressure}")));
        }
        // Sharper split (less vapour) at higher pressure and lower temperature.
        let sharpness = (pressure / 20.0) * (300.0 / (temperature + 273.15)).powi(3);
        let mut vapor = [0.0; 4];
        let mut liquid = [0.0; 4];
        for species in Species::ALL {
            let i = species.index();
            let phi = base_vapor_fraction(species).powf(sharpness);
            vapor[i] = phi * inlet.flows[i];
            liquid[i] = inlet.flows[i] - vapor[i];
        }
        let duty = 0.2 * Self::sensible_duty(inlet.total_molar_flow(), inlet.temperature, temperature);
        self.duties.insert(tag.to_string(), duty);

        Ok(FlashOutlets {
            vapor: SurrogateStream::new(format!("{tag}_V"), temperature, pressure, vapor),
            liquid: SurrogateStream::new(format!("{tag}_L"), temperature, pressure, liquid),
        })
    }

    fn splitter(
        &mut self,
        tag: &str,
        recycle_ratio: f64,
        inlet: &SurrogateStream,
    ) -> Result<SplitterOutlets<SurrogateStream>> {
        if !(0.0..=1.0).contains(&recycle_ratio) {
            return Err(FlowsheetError::backend(
                tag,
                format!("recycle ratio {recycle_ratio} outside [0, 1]"),
            ));
        }
        let recycle = inlet.flows.map(|f| f * recycle_ratio);
        let purge = inlet.flows.map(|f| f * (1.0 - recycle_ratio));
        Ok(SplitterOutlets {
            recycle: SurrogateStream::new(format!("{tag}_REC"), inlet.temperature, inlet.pressure, recycle),
            purge: SurrogateStream::new(format!("{tag}_PURGE"), inlet.temperature, inlet.pressure, purge),
        })
    }

    fn energy_consumption(&self, tag: &str) -> Result<f64> {
        self.duties
            .get(tag)
            .copied()
            .ok_or_else(|| FlowsheetError::backend(tag, "no duty recorded"))
    }

    fn column_sizing(&self, tag: &str) -> Result<(f64, f64)> {
        self.sizing
            .get(tag)
            .copied()
            .ok_or_else(|| FlowsheetError::backend(tag, "not a column"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed() -> SurrogateStream {
        SurrogateStream::new("IN", 650.0, 35.0, [100.0, 250.0, 5.0, 0.0])
    }

    #[test]
    fn reactor_conserves_moles_and_is_hydrogen_limited() {
        let mut units = SurrogateUnits::new();
        let out = units
            .reactor("R1", ReactorMode::Isothermal, 3.5, 12.0, &feed())
            .unwrap();
        assert!((out.total_molar_flow() - 355.0).abs() < 1e-9);
        assert!(out.molar_flow(Species::Tol) < 5.0);

        let lean = SurrogateStream::new("IN", 650.0, 35.0, [100.0, 20.0, 0.0, 0.0]);
        let out = units
            .reactor("R2", ReactorMode::Isothermal, 3.5, 12.0, &lean)
            .unwrap();
        assert!((out.molar_flow(Species::Hydrogen)).abs() < 1e-9);
        assert!((out.molar_flow(Species::Bzn) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn adiabatic_reactor_heats_up_without_duty() {
        let mut units = SurrogateUnits::new();
        let out = units
            .reactor("AR1", ReactorMode::Adiabatic, 2.0, 10.0, &feed())
            .unwrap();
        assert!(out.temperature() > 650.0);
        assert_eq!(units.energy_consumption("AR1").unwrap(), 0.0);
    }

    #[test]
    fn column_split_conserves_species() {
        let mut units = SurrogateUnits::new();
        let s = SurrogateStream::new("L", 30.0, 35.0, [20.0, 0.5, 1.5, 78.0]);
        let spec = ColumnSpec {
            stages: 20,
            distillate_rate: 80.0,
            reflux_ratio: 2.5,
            pressure: 1.0,
        };
        let out = units.column("DC1", &spec, &s).unwrap();
        for species in Species::ALL {
            let sum = out.distillate.molar_flow(species) + out.bottoms.molar_flow(species);
            assert!((sum - s.molar_flow(species)).abs() < 1e-9);
        }
        assert!(out.distillate.mole_fraction(Species::Bzn) > 0.9);
        assert!(units.column_sizing("DC1").is_ok());
    }

    #[test]
    fn scripted_engine_failure() {
        let mut engine = SurrogateEngine::with_failure_on_run(2);
        engine.reinitialize().unwrap();
        engine.run().unwrap();
        assert!(engine.is_converged());
        engine.run().unwrap();
        assert!(!engine.is_converged());
        engine.reinitialize().unwrap();
        engine.run().unwrap();
        assert!(engine.is_converged());
    }
}
