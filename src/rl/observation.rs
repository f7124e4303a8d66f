// src/rl/observation.rs
//
// Seven-feature observation derived from the latest outlet stream:
//   [T / T_scale, P / P_scale, x_TOL, x_H2, x_CH4, x_BZN, iter / max_iter]

use serde::{Deserialize, Serialize};

use crate::stream::Stream;
use crate::types::{InletSpec, Species};

pub const OBS_DIM: usize = 7;

/// Normalisation constants for temperature (°C) and pressure (bar).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationScale {
    pub temperature: f64,
    pub pressure: f64,
}

impl Default for ObservationScale {
    fn default() -> Self {
        Self {
            temperature: 900.0,
            pressure: 38.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation(pub [f64; OBS_DIM]);

impl Observation {
    pub fn from_stream<S: Stream + ?Sized>(
        stream: &S,
        scale: &ObservationScale,
        iteration: u32,
        max_iter: u32,
    ) -> Self {
        Observation([
            stream.temperature() / scale.temperature,
            stream.pressure() / scale.pressure,
            stream.mole_fraction(Species::Tol),
            stream.mole_fraction(Species::Hydrogen),
            stream.mole_fraction(Species::Methane),
            stream.mole_fraction(Species::Bzn),
            progress(iteration, max_iter),
        ])
    }

    /// Observation of the feed at episode start.
    pub fn from_inlet(spec: &InletSpec, scale: &ObservationScale, max_iter: u32) -> Self {
        let total = spec.total_molar_flow();
        let frac = |s: Species| {
            if total > 0.0 {
                spec.molar_flow(s) / total
            } else {
                0.0
            }
        };
        Observation([
            spec.temperature / scale.temperature,
            spec.pressure / scale.pressure,
            frac(Species::Tol),
            frac(Species::Hydrogen),
            frac(Species::Methane),
            frac(Species::Bzn),
            progress(0, max_iter),
        ])
    }
}

fn progress(iteration: u32, max_iter: u32) -> f64 {
    if max_iter == 0 {
        1.0
    } else {
        iteration as f64 / max_iter as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inlet_observation_uses_species_order() {
        let spec = InletSpec {
            temperature: 90.0,
            pressure: 19.0,
            tol: 1.0,
            hydrogen: 2.0,
            methane: 1.0,
            bzn: 0.0,
        };
        let obs = Observation::from_inlet(&spec, &ObservationScale::default(), 20);
        assert!((obs.0[0] - 0.1).abs() < 1e-12);
        assert!((obs.0[1] - 0.5).abs() < 1e-12);
        assert!((obs.0[2] - 0.25).abs() < 1e-12);
        assert!((obs.0[3] - 0.5).abs() < 1e-12);
        assert!((obs.0[4] - 0.25).abs() < 1e-12);
        assert_eq!(obs.0[5], 0.0);
        assert_eq!(obs.0[6], 0.0);
    }
}
