// src/types.rs
//
// Core value types shared across the environment: tracked species, the
// discrete unit-operation catalogue, and the feed specification.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FlowsheetError, Result};

/// Chemical species tracked in molar-flow form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Species {
    Tol,
    Hydrogen,
    Methane,
    Bzn,
}

impl Species {
    /// Fixed ordering used for observations and stream summaries.
    pub const ALL: [Species; 4] = [
        Species::Tol,
        Species::Hydrogen,
        Species::Methane,
        Species::Bzn,
    ];

    /// Component identifier as registered in the simulation engine.
    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Tol => "TOL",
            Species::Hydrogen => "HYDROGEN",
            Species::Methane => "METHANE",
            Species::Bzn => "BZN",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Species::Tol => 0,
            Species::Hydrogen => 1,
            Species::Methane => 2,
            Species::Bzn => 3,
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of discrete actions.
pub const NUM_UNIT_KINDS: usize = 11;

/// Discrete action catalogue. The discriminant is the action index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    Mixer = 0,
    Heater = 1,
    Column = 2,
    Cooler = 3,
    Reactor = 4,
    AdiabaticReactor = 5,
    Flash = 6,
    FlashRecycle = 7,
    PurgeColumn = 8,
    RecycleColumn = 9,
    TriColumn = 10,
}

impl UnitKind {
    pub const ALL: [UnitKind; NUM_UNIT_KINDS] = [
        UnitKind::Mixer,
        UnitKind::Heater,
        UnitKind::Column,
        UnitKind::Cooler,
        UnitKind::Reactor,
        UnitKind::AdiabaticReactor,
        UnitKind::Flash,
        UnitKind::FlashRecycle,
        UnitKind::PurgeColumn,
        UnitKind::RecycleColumn,
        UnitKind::TriColumn,
    ];

    pub fn from_index(index: usize) -> Result<UnitKind> {
        UnitKind::ALL
            .get(index)
            .copied()
            .ok_or(FlowsheetError::UnknownAction(index))
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Prefix of the instance tags generated for this kind.
    pub fn tag_prefix(self) -> &'static str {
        match self {
            UnitKind::Mixer => "M",
            UnitKind::Heater => "HX",
            UnitKind::Column => "DC",
            UnitKind::Cooler => "C",
            UnitKind::Reactor => "R",
            UnitKind::AdiabaticReactor => "AR",
            UnitKind::Flash => "F",
            UnitKind::FlashRecycle => "FR",
            UnitKind::PurgeColumn => "PDC",
            UnitKind::RecycleColumn => "DCR",
            UnitKind::TriColumn => "TC",
        }
    }

    pub fn is_reactor(self) -> bool {
        matches!(self, UnitKind::Reactor | UnitKind::AdiabaticReactor)
    }

    pub fn is_flash(self) -> bool {
        matches!(self, UnitKind::Flash | UnitKind::FlashRecycle)
    }

    /// Columns that count as "a main column has been placed" for masking.
    /// The three-product column does not.
    pub fn is_main_column_family(self) -> bool {
        matches!(
            self,
            UnitKind::Column | UnitKind::PurgeColumn | UnitKind::RecycleColumn
        )
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Feed stream specification: temperature (°C), pressure (bar) and molar
/// flows per species (kmol/h).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InletSpec {
    pub temperature: f64,
    pub pressure: f64,
    pub tol: f64,
    pub hydrogen: f64,
    pub methane: f64,
    pub bzn: f64,
}

impl Default for InletSpec {
    fn default() -> Self {
        Self {
            temperature: 25.0,
            pressure: 25.0,
            tol: 100.0,
            hydrogen: 250.0,
            methane: 5.0,
            bzn: 0.0,
        }
    }
}

impl InletSpec {
    pub fn molar_flow(&self, species: Species) -> f64 {
        match species {
            Species::Tol => self.tol,
            Species::Hydrogen => self.hydrogen,
            Species::Methane => self.methane,
            Species::Bzn => self.bzn,
        }
    }

    pub fn total_molar_flow(&self) -> f64 {
        self.tol + self.hydrogen + self.methane + self.bzn
    }
}
