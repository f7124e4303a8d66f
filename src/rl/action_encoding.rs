// src/rl/action_encoding.rs
//
// Parameter mapping for the continuous half of the action.
//
// The agent always emits a fixed-length vector in [0, 1]^21 so the action
// space stays static; each unit type reads only its own fields. Mapping is
// a plain linear interpolation onto the physical range of each field.
// Inputs outside [0, 1] extrapolate along the same line (no clamping).
// Stage counts are rounded half-up onto integers.

use serde::{Deserialize, Serialize};

use crate::error::{FlowsheetError, Result};

/// Dimension of the continuous action vector.
pub const ACTION_DIM: usize = 21;

/// Physical range of one continuous field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldBounds {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    /// Rounded half-up onto an integer after interpolation.
    pub integer: bool,
}

const fn real(name: &'static str, min: f64, max: f64) -> FieldBounds {
    FieldBounds {
        name,
        min,
        max,
        integer: false,
    }
}

const fn stages(name: &'static str, min: f64, max: f64) -> FieldBounds {
    FieldBounds {
        name,
        min,
        max,
        integer: true,
    }
}

/// Field layout of the continuous vector, in index order.
pub const FIELDS: [FieldBounds; ACTION_DIM] = [
    real("heater_pressure", 32.0, 38.0),
    real("heater_temperature", 550.0, 704.0),
    real("cooler_temperature", 10.0, 50.0),
    real("reactor_diameter", 0.5, 3.5),
    real("reactor_length", 6.5, 12.0),
    real("adiabatic_reactor_diameter", 0.5, 3.5),
    real("adiabatic_reactor_length", 6.5, 12.0),
    stages("purge_column_stages", 5.0, 15.0),
    real("purge_column_distillate_offset", 0.0, 5.0),
    stages("column_stages", 5.0, 25.0),
    real("column_distillate_rate", 70.0, 130.0),
    stages("recycle_column_stages", 5.0, 25.0),
    real("recycle_column_distillate_rate", 70.0, 130.0),
    real("recycle_column_recycle_ratio", 0.5, 0.95),
    stages("tri_column_stages", 5.0, 25.0),
    real("tri_column_distillate_rate", 70.0, 130.0),
    real("flash_temperature", 1.0, 50.0),
    real("flash_pressure", 1.0, 38.0),
    real("flash_recycle_temperature", 1.0, 50.0),
    real("flash_recycle_pressure", 1.0, 38.0),
    real("flash_recycle_ratio", 0.5, 0.80),
];

#[inline]
fn interpolate(val: f64, min: f64, max: f64) -> f64 {
    min + val * (max - min)
}

/// Map a normalized vector onto physical ranges, field by field.
pub fn denormalize(normalized: &[f64; ACTION_DIM]) -> [f64; ACTION_DIM] {
    let mut out = [0.0; ACTION_DIM];
    for (i, field) in FIELDS.iter().enumerate() {
        let v = interpolate(normalized[i], field.min, field.max);
        out[i] = if field.integer { (v + 0.5).floor() } else { v };
    }
    out
}

/// Physically-scaled operating parameters for every unit type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingParams {
    pub heater_pressure: f64,
    pub heater_temperature: f64,
    pub cooler_temperature: f64,
    pub reactor_diameter: f64,
    pub reactor_length: f64,
    pub adiabatic_reactor_diameter: f64,
    pub adiabatic_reactor_length: f64,
    pub purge_column_stages: u32,
    pub purge_column_distillate_offset: f64,
    pub column_stages: u32,
    pub column_distillate_rate: f64,
    pub recycle_column_stages: u32,
    pub recycle_column_distillate_rate: f64,
    pub recycle_column_recycle_ratio: f64,
    pub tri_column_stages: u32,
    pub tri_column_distillate_rate: f64,
    pub flash_temperature: f64,
    pub flash_pressure: f64,
    pub flash_recycle_temperature: f64,
    pub flash_recycle_pressure: f64,
    pub flash_recycle_ratio: f64,
}

impl OperatingParams {
    /// Validate the length of `normalized` and map it.
    pub fn from_normalized(normalized: &[f64]) -> Result<Self> {
        let fixed: &[f64; ACTION_DIM] =
            normalized
                .try_into()
                .map_err(|_| FlowsheetError::ActionDimension {
                    expected: ACTION_DIM,
                    got: normalized.len(),
                })?;
        Ok(Self::from_mapped(&denormalize(fixed)))
    }

    /// Name the fields of an already-mapped vector.
    pub fn from_mapped(m: &[f64; ACTION_DIM]) -> Self {
        // Stage counts are already integral and at least 5 for in-range input.
        let count = |v: f64| v.max(0.0) as u32;
        Self {
            heater_pressure: m[0],
            heater_temperature: m[1],
            cooler_temperature: m[2],
            reactor_diameter: m[3],
            reactor_length: m[4],
            adiabatic_reactor_diameter: m[5],
            adiabatic_reactor_length: m[6],
            purge_column_stages: count(m[7]),
            purge_column_distillate_offset: m[8],
            column_stages: count(m[9]),
            column_distillate_rate: m[10],
            recycle_column_stages: count(m[11]),
            recycle_column_distillate_rate: m[12],
            recycle_column_recycle_ratio: m[13],
            tri_column_stages: count(m[14]),
            tri_column_distillate_rate: m[15],
            flash_temperature: m[16],
            flash_pressure: m[17],
            flash_recycle_temperature: m[18],
            flash_recycle_pressure: m[19],
            flash_recycle_ratio: m[20],
        }
    }
}
