// src/rl/cost.rs
//
// Normalised capital and operating cost surrogates.
//
// Capital terms are Marshall & Swift indexed correlations divided by their
// value at a fixed reference (maximum) size, so in-range equipment scores
// roughly in [0, 1]. Sizes must be strictly positive and finite.

use crate::error::{FlowsheetError, Result};

/// Marshall & Swift equipment index (2018).
pub const MARSHALL_SWIFT: f64 = 1638.2;

/// Reference reactor size (m).
pub const REACTOR_MAX_DIAMETER: f64 = 3.5;
pub const REACTOR_MAX_LENGTH: f64 = 12.0;

/// Reference column size (m): 25 stages at 0.61 m tray spacing, 20% margin.
pub const COLUMN_MAX_DIAMETER: f64 = 2.5;
pub const COLUMN_MAX_HEIGHT: f64 = 1.2 * 0.61 * (25.0 - 2.0);

/// Reference flash drum volume (m³).
pub const FLASH_MAX_VOLUME: f64 = 200.0;

// Vertical pressure vessel: bare-module (2.18) plus material/pressure (1.15).
const VESSEL_FACTOR: f64 = 2.18 + 1.15;
const VESSEL_COEFF: f64 = 101.9;

fn positive(what: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(FlowsheetError::InvalidSizing { what, value })
    }
}

fn vessel_shell_cost(diameter: f64, height: f64) -> f64 {
    MARSHALL_SWIFT / 280.0
        * VESSEL_COEFF
        * diameter.powf(1.066)
        * height.powf(0.802)
        * VESSEL_FACTOR
}

fn column_internals_cost(diameter: f64, height: f64) -> f64 {
    MARSHALL_SWIFT / 280.0 * diameter.powf(1.55) * height
}

fn flash_drum_cost(volume: f64) -> f64 {
    let lv = volume.log10();
    (2.25 + 1.82) * (813.0 / 397.0) * 10f64.powf(3.4974 + 0.4485 * lv + 0.1074 * lv * lv)
}

/// Normalised reactor capital cost from diameter and length.
pub fn reactor_sizing_cost(diameter: f64, length: f64) -> Result<f64> {
    let d = positive("reactor_diameter", diameter)?;
    let l = positive("reactor_length", length)?;
    Ok(vessel_shell_cost(d, l) / vessel_shell_cost(REACTOR_MAX_DIAMETER, REACTOR_MAX_LENGTH))
}

/// Normalised column capital cost: internals plus shell, each normalised.
pub fn column_sizing_cost(diameter: f64, height: f64) -> Result<f64> {
    let d = positive("column_diameter", diameter)?;
    let h = positive("column_height", height)?;
    let internals =
        column_internals_cost(d, h) / column_internals_cost(COLUMN_MAX_DIAMETER, COLUMN_MAX_HEIGHT);
    let shell = vessel_shell_cost(d, h) / vessel_shell_cost(COLUMN_MAX_DIAMETER, COLUMN_MAX_HEIGHT);
    Ok(internals + shell)
}

/// Normalised flash drum capital cost from vessel volume.
pub fn flash_sizing_cost(volume: f64) -> Result<f64> {
    let v = positive("flash_volume", volume)?;
    Ok(flash_drum_cost(v) / flash_drum_cost(FLASH_MAX_VOLUME))
}

/// Flash drum volume from inlet volumetric flow (5 min hold-up at 20% fill).
pub fn flash_volume(inlet_volume_flow: f64) -> f64 {
    inlet_volume_flow * 0.05 / 0.2
}

/// Fixed cost term for sized equipment: `-base * (1 + sizing)`.
pub fn sized_fixed_cost(base: f64, sizing: f64) -> f64 {
    -base * (1.0 + sizing)
}

/// Operating (energy) cost term, optionally scaled by a recycle/reflux ratio.
pub fn energy_cost(energy: f64, energy_scale: f64, ratio: f64) -> f64 {
    -energy * ratio / energy_scale
}
