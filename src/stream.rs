// src/stream.rs
//
// Read-only stream contract. Streams are produced by unit-operation
// providers; the environment only ever reads them.

use serde::{Deserialize, Serialize};

use crate::types::Species;

pub trait Stream {
    /// Identifier of the stream in the simulation engine (used for wiring).
    fn name(&self) -> &str;
    /// Temperature in °C.
    fn temperature(&self) -> f64;
    /// Pressure in bar.
    fn pressure(&self) -> f64;
    /// Molar flow of one species (kmol/h).
    fn molar_flow(&self, species: Species) -> f64;
    /// Total molar flow (kmol/h).
    fn total_molar_flow(&self) -> f64;
    /// Volumetric flow (m³/h).
    fn volume_flow(&self) -> f64;

    /// Mole fraction of `species`; 0 for an empty stream.
    fn mole_fraction(&self, species: Species) -> f64 {
        let total = self.total_molar_flow();
        if total > 0.0 {
            self.molar_flow(species) / total
        } else {
            0.0
        }
    }
}

/// Snapshot of a stream for the info log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSummary {
    pub temperature: f64,
    pub pressure: f64,
    pub tol: f64,
    pub hydrogen: f64,
    pub methane: f64,
    pub bzn: f64,
}

impl StreamSummary {
    pub fn of<S: Stream + ?Sized>(stream: &S) -> Self {
        Self {
            temperature: stream.temperature(),
            pressure: stream.pressure(),
            tol: stream.molar_flow(Species::Tol),
            hydrogen: stream.molar_flow(Species::Hydrogen),
            methane: stream.molar_flow(Species::Methane),
            bzn: stream.molar_flow(Species::Bzn),
        }
    }
}
