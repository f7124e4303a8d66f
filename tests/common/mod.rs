// Scripted backend shared by the integration tests.
//
// ScriptedUnits pops pre-queued outlet streams in call order (mixers pass
// through without popping). ScriptedEngine converges on every run except
// the ones listed in `fail_on`.

#![allow(dead_code)]

use std::collections::VecDeque;

use flowsheet_env::backend::{
    ColumnOutlets, ColumnSpec, FlashOutlets, PartialColumnOutlets, ReactorMode, SplitterOutlets,
};
use flowsheet_env::{
    FlowsheetConfig, FlowsheetEnv, InletSpec, Result, SimulationEngine, SurrogateStream,
    UnitOperations,
};

/// Stream with flows in `[TOL, H2, CH4, BZN]` order.
pub fn stream(name: &str, temperature: f64, pressure: f64, flows: [f64; 4]) -> SurrogateStream {
    SurrogateStream::new(name, temperature, pressure, flows)
}

#[derive(Debug, Default)]
pub struct ScriptedEngine {
    pub fail_on: Vec<u32>,
    pub runs: u32,
    pub converged: bool,
    pub connections: Vec<(String, String, String)>,
}

impl ScriptedEngine {
    pub fn failing_on(runs: &[u32]) -> Self {
        Self {
            fail_on: runs.to_vec(),
            ..Self::default()
        }
    }
}

impl SimulationEngine for ScriptedEngine {
    fn run(&mut self) -> Result<()> {
        self.runs += 1;
        self.converged = !self.fail_on.contains(&self.runs);
        Ok(())
    }

    fn is_converged(&self) -> bool {
        self.converged
    }

    fn reinitialize(&mut self) -> Result<()> {
        self.runs = 0;
        self.connections.clear();
        Ok(())
    }

    fn connect(&mut self, block: &str, stream: &str, port: &str) -> Result<()> {
        self.connections
            .push((block.to_string(), stream.to_string(), port.to_string()));
        Ok(())
    }
}

#[derive(Debug)]
pub struct ScriptedUnits {
    pub outlets: VecDeque<SurrogateStream>,
    /// Duty reported for every unit.
    pub energy: f64,
    /// (diameter, height) reported for every column.
    pub sizing: (f64, f64),
    pub column_specs: Vec<(String, ColumnSpec)>,
}

impl ScriptedUnits {
    pub fn new(outlets: Vec<SurrogateStream>) -> Self {
        Self {
            outlets: outlets.into(),
            energy: 0.0,
            sizing: (1.0, 5.0),
            column_specs: Vec::new(),
        }
    }

    fn next(&mut self, inlet: &SurrogateStream) -> SurrogateStream {
        self.outlets.pop_front().unwrap_or_else(|| inlet.clone())
    }
}

impl UnitOperations for ScriptedUnits {
    type Stream = SurrogateStream;

    fn feed(&mut self, spec: &InletSpec) -> Result<SurrogateStream> {
        Ok(stream(
            "IN",
            spec.temperature,
            spec.pressure,
            [spec.tol, spec.hydrogen, spec.methane, spec.bzn],
        ))
    }

    fn mixer(&mut self, _tag: &str, inlet: &SurrogateStream) -> Result<SurrogateStream> {
        Ok(inlet.clone())
    }

    fn heater(
        &mut self,
        _tag: &str,
        _temperature: f64,
        _pressure: f64,
        inlet: &SurrogateStream,
    ) -> Result<SurrogateStream> {
        Ok(self.next(inlet))
    }

    fn cooler(
        &mut self,
        _tag: &str,
        _temperature: f64,
        inlet: &SurrogateStream,
    ) -> Result<SurrogateStream> {
        Ok(self.next(inlet))
    }

    fn reactor(
        &mut self,
        _tag: &str,
        _mode: ReactorMode,
        _diameter: f64,
        _length: f64,
        inlet: &SurrogateStream,
    ) -> Result<SurrogateStream> {
        Ok(self.next(inlet))
    }

    fn column(
        &mut self,
        tag: &str,
        spec: &ColumnSpec,
        inlet: &SurrogateStream,
    ) -> Result<ColumnOutlets<SurrogateStream>> {
        self.column_specs.push((tag.to_string(), *spec));
        Ok(ColumnOutlets {
            distillate: self.next(inlet),
            bottoms: self.next(inlet),
        })
    }

    fn partial_column(
        &mut self,
        tag: &str,
        spec: &ColumnSpec,
        inlet: &SurrogateStream,
    ) -> Result<PartialColumnOutlets<SurrogateStream>> {
        self.column_specs.push((tag.to_string(), *spec));
        Ok(PartialColumnOutlets {
            distillate: self.next(inlet),
            bottoms: self.next(inlet),
            vent: self.next(inlet),
        })
    }

    fn flash(
        &mut self,
        _tag: &str,
        _temperature: f64,
        _pressure: f64,
        inlet: &SurrogateStream,
    ) -> Result<FlashOutlets<SurrogateStream>> {
        Ok(FlashOutlets {
            vapor: self.next(inlet),
            liquid: self.next(inlet),
        })
    }

    fn splitter(
        &mut self,
        _tag: &str,
        _recycle_ratio: f64,
        inlet: &SurrogateStream,
    ) -> Result<SplitterOutlets<SurrogateStream>> {
        Ok(SplitterOutlets {
            recycle: self.next(inlet),
            purge: self.next(inlet),
        })
    }

    fn energy_consumption(&self, _tag: &str) -> Result<f64> {
        Ok(self.energy)
    }

    fn column_sizing(&self, _tag: &str) -> Result<(f64, f64)> {
        Ok(self.sizing)
    }
}

pub type ScriptedEnv = FlowsheetEnv<ScriptedEngine, ScriptedUnits>;

pub fn env_with(cfg: FlowsheetConfig, engine: ScriptedEngine, outlets: Vec<SurrogateStream>) -> ScriptedEnv {
    FlowsheetEnv::new(cfg, engine, ScriptedUnits::new(outlets)).unwrap()
}

/// Heater -> reactor -> cooler outlets: 90% TOL conversion at 650 °C.
pub fn reaction_train() -> Vec<SurrogateStream> {
    vec![
        stream("HX1_OUT", 650.0, 35.0, [100.0, 250.0, 5.0, 0.0]),
        stream("R1_OUT", 650.0, 34.5, [10.0, 160.0, 95.0, 90.0]),
        stream("C1_OUT", 30.0, 34.5, [10.0, 160.0, 95.0, 90.0]),
    ]
}

/// Flash vapour and liquid for the reaction train above.
pub fn flash_outlets() -> Vec<SurrogateStream> {
    vec![
        stream("F1_V", 30.0, 34.5, [0.1, 155.0, 80.0, 1.0]),
        stream("F1_L", 30.0, 34.5, [9.9, 5.0, 15.0, 89.0]),
    ]
}

/// Mixer-segment train: reaction outlets, FR1 + SF1, PDC1, DCR2 + S2.
pub fn recycle_outlets() -> Vec<SurrogateStream> {
    let mut out = reaction_train();
    out.extend([
        // FR1 vapour / liquid, then SF1 recycle / purge.
        stream("FR1_V", 30.0, 34.5, [0.1, 155.0, 80.0, 1.0]),
        stream("FR1_L", 30.0, 34.5, [9.9, 5.0, 15.0, 89.0]),
        stream("SF1_REC", 30.0, 34.5, [0.07, 108.5, 56.0, 0.7]),
        stream("SF1_PURGE", 30.0, 34.5, [0.03, 46.5, 24.0, 0.3]),
        // PDC1 distillate / bottoms.
        stream("PDC1_D", 40.0, 34.5, [0.0, 2.0, 15.5, 0.0]),
        stream("PDC1_B", 120.0, 34.5, [9.9, 1.0, 1.5, 89.0]),
        // DCR2 distillate / bottoms, then S2 recycle / purge.
        stream("DCR2_D", 80.0, 1.0, [4.0, 1.0, 1.5, 86.0]),
        stream("DCR2_B", 110.0, 1.0, [9.5, 0.0, 0.0, 3.0]),
        stream("S2_REC", 110.0, 1.0, [7.6, 0.0, 0.0, 2.4]),
        stream("S2_PURGE", 110.0, 1.0, [1.9, 0.0, 0.0, 0.6]),
    ]);
    out
}
