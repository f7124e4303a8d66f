// src/rl/sequencer.rs
//
// Stage sequencing and legal-action masking.
//
// The stage encodes a fixed process template:
//   feed prep -> reaction -> cooling -> light-gas removal -> separation
// with agent choice over sizing and over recycle branches once a mixer
// (recycle point) exists. Masks are a full overwrite per stage, derived
// from the stage and the structured topology record below.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{UnitKind, NUM_UNIT_KINDS};

pub const REACTION_MIN_TEMPERATURE: f64 = 500.0;
pub const REACTION_MIN_PRESSURE: f64 = 1.0;
pub const REACTION_MAX_CONVERSION: f64 = 0.1;
pub const COOLING_MIN_CONVERSION: f64 = 0.75;

/// Phase of process construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Pre,
    /// Declared but never produced by the transition rules.
    Hex,
    Reac,
    Cool,
    Flash,
    Predistill,
    Distill,
    Pure,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Pre => "pre",
            Stage::Hex => "hex",
            Stage::Reac => "reac",
            Stage::Cool => "cool",
            Stage::Flash => "flash",
            Stage::Predistill => "predistill",
            Stage::Distill => "distill",
            Stage::Pure => "pure",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean mask over the 11 discrete actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMask([bool; NUM_UNIT_KINDS]);

impl ActionMask {
    pub fn none() -> Self {
        ActionMask([false; NUM_UNIT_KINDS])
    }

    pub fn only(kinds: &[UnitKind]) -> Self {
        let mut mask = Self::none();
        for &k in kinds {
            mask.set(k, true);
        }
        mask
    }

    pub fn set(&mut self, kind: UnitKind, enabled: bool) {
        self.0[kind.index()] = enabled;
    }

    pub fn allows(&self, kind: UnitKind) -> bool {
        self.0[kind.index()]
    }

    /// Whether the raw action index is enabled (false when out of range).
    pub fn allows_index(&self, index: usize) -> bool {
        self.0.get(index).copied().unwrap_or(false)
    }

    pub fn enabled(&self) -> impl Iterator<Item = UnitKind> + '_ {
        UnitKind::ALL.into_iter().filter(|k| self.allows(*k))
    }

    pub fn count(&self) -> usize {
        self.0.iter().filter(|b| **b).count()
    }
}

/// Structured record of what the topology contains.
///
/// Segment flags (`mixer_in_segment`, `main_column_in_segment`, `history`)
/// are cleared when a recycle-closing column converges; the active mixer
/// and the mixer-placed flag live for the whole episode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub mixer_placed: bool,
    pub mixer_in_segment: bool,
    pub main_column_in_segment: bool,
    /// Mixer receiving recycle streams.
    pub active_mixer: Option<String>,
    /// Instance tags of the current segment, in placement order.
    pub history: Vec<String>,
}

impl Topology {
    /// Record a unit placed by the dispatcher.
    pub fn record(&mut self, kind: UnitKind, tag: &str) {
        if kind == UnitKind::Mixer {
            self.mixer_placed = true;
            self.mixer_in_segment = true;
            if self.active_mixer.is_none() {
                self.active_mixer = Some(tag.to_string());
            }
        }
        if kind.is_main_column_family() {
            self.main_column_in_segment = true;
        }
        self.history.push(tag.to_string());
    }

    /// Start a fresh downstream segment.
    pub fn start_segment(&mut self) {
        self.mixer_in_segment = false;
        self.main_column_in_segment = false;
        self.history.clear();
    }
}

/// Process conditions the transition rules read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageInputs {
    pub temperature: f64,
    pub pressure: f64,
    /// Fraction of the initial TOL feed consumed so far.
    pub conversion: f64,
}

/// Finite-state machine over `Stage`.
#[derive(Debug, Clone)]
pub struct StageSequencer {
    stage: Stage,
}

impl Default for StageSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl StageSequencer {
    pub fn new() -> Self {
        Self { stage: Stage::Pre }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn reset(&mut self) {
        self.stage = Stage::Pre;
    }

    /// Apply the transition table once; first matching rule wins.
    pub fn advance(&mut self, inputs: &StageInputs, bzn_pure: bool) -> Stage {
        self.stage = next_stage(self.stage, inputs, bzn_pure);
        self.stage
    }
}

/// Transition table.
pub fn next_stage(current: Stage, inputs: &StageInputs, bzn_pure: bool) -> Stage {
    if bzn_pure {
        Stage::Pure
    } else if inputs.temperature >= REACTION_MIN_TEMPERATURE
        && inputs.pressure >= REACTION_MIN_PRESSURE
        && inputs.conversion < REACTION_MAX_CONVERSION
    {
        Stage::Reac
    } else if inputs.conversion >= COOLING_MIN_CONVERSION && current == Stage::Reac {
        Stage::Cool
    } else {
        match current {
            Stage::Cool => Stage::Flash,
            Stage::Flash => Stage::Predistill,
            Stage::Predistill | Stage::Distill => Stage::Distill,
            other => other,
        }
    }
}

/// Mask used before the first sequencer call of an episode.
pub fn initial_mask() -> ActionMask {
    ActionMask::only(&[UnitKind::Mixer])
}

/// Legal actions for `stage` given the topology built so far.
pub fn mask_for(stage: Stage, topology: &Topology) -> ActionMask {
    match stage {
        Stage::Pre => {
            // Heater is mandatory before reaction; the single mixer stays
            // available until it has been placed.
            let mut mask = ActionMask::only(&[UnitKind::Heater]);
            mask.set(UnitKind::Mixer, !topology.mixer_placed);
            mask
        }
        Stage::Hex => ActionMask::only(&[UnitKind::Heater]),
        Stage::Reac => ActionMask::only(&[UnitKind::Reactor, UnitKind::AdiabaticReactor]),
        Stage::Cool => ActionMask::only(&[UnitKind::Cooler]),
        Stage::Flash => {
            if topology.mixer_in_segment {
                ActionMask::only(&[UnitKind::FlashRecycle])
            } else {
                ActionMask::only(&[UnitKind::Flash])
            }
        }
        Stage::Predistill => ActionMask::only(&[UnitKind::PurgeColumn]),
        Stage::Distill => {
            if topology.mixer_in_segment {
                if topology.main_column_in_segment {
                    ActionMask::only(&[UnitKind::RecycleColumn])
                } else {
                    ActionMask::only(&[UnitKind::PurgeColumn])
                }
            } else {
                ActionMask::only(&[UnitKind::Column, UnitKind::TriColumn])
            }
        }
        Stage::Pure => ActionMask::only(&[UnitKind::Column]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(temperature: f64, pressure: f64, conversion: f64) -> StageInputs {
        StageInputs {
            temperature,
            pressure,
            conversion,
        }
    }

    fn with_mixer() -> Topology {
        let mut t = Topology::default();
        t.record(UnitKind::Mixer, "M1");
        t
    }

    #[test]
    fn masks_per_stage_without_mixer() {
        let t = Topology::default();
        let expect = |stage: Stage, kinds: &[UnitKind]| {
            assert_eq!(mask_for(stage, &t), ActionMask::only(kinds), "stage {stage}");
        };
        expect(Stage::Pre, &[UnitKind::Mixer, UnitKind::Heater]);
        expect(Stage::Hex, &[UnitKind::Heater]);
        expect(Stage::Reac, &[UnitKind::Reactor, UnitKind::AdiabaticReactor]);
        expect(Stage::Cool, &[UnitKind::Cooler]);
        expect(Stage::Flash, &[UnitKind::Flash]);
        expect(Stage::Predistill, &[UnitKind::PurgeColumn]);
        expect(Stage::Distill, &[UnitKind::Column, UnitKind::TriColumn]);
        expect(Stage::Pure, &[UnitKind::Column]);
    }

    #[test]
    fn masks_per_stage_with_mixer() {
        let mut t = with_mixer();
        assert_eq!(mask_for(Stage::Pre, &t), ActionMask::only(&[UnitKind::Heater]));
        assert_eq!(
            mask_for(Stage::Flash, &t),
            ActionMask::only(&[UnitKind::FlashRecycle])
        );
        assert_eq!(
            mask_for(Stage::Distill, &t),
            ActionMask::only(&[UnitKind::PurgeColumn])
        );

        t.record(UnitKind::PurgeColumn, "PDC1");
        assert_eq!(
            mask_for(Stage::Distill, &t),
            ActionMask::only(&[UnitKind::RecycleColumn])
        );
        assert_eq!(mask_for(Stage::Pure, &t), ActionMask::only(&[UnitKind::Column]));
    }

    #[test]
    fn tri_column_does_not_count_as_main_column() {
        let mut t = with_mixer();
        t.record(UnitKind::TriColumn, "TC1");
        assert_eq!(
            mask_for(Stage::Distill, &t),
            ActionMask::only(&[UnitKind::PurgeColumn])
        );
    }

    #[test]
    fn new_segment_keeps_active_mixer() {
        let mut t = with_mixer();
        t.record(UnitKind::RecycleColumn, "DCR3");
        t.start_segment();
        assert!(t.history.is_empty());
        assert!(!t.mixer_in_segment);
        assert_eq!(t.active_mixer.as_deref(), Some("M1"));
        assert_eq!(
            mask_for(Stage::Distill, &t),
            ActionMask::only(&[UnitKind::Column, UnitKind::TriColumn])
        );
    }

    #[test]
    fn transition_rules_in_order() {
        let mut s = StageSequencer::new();
        assert_eq!(s.advance(&at(25.0, 25.0, 0.0), false), Stage::Pre);
        assert_eq!(s.advance(&at(600.0, 35.0, 0.0), false), Stage::Reac);
        // Not enough conversion yet: stays in reac.
        assert_eq!(s.advance(&at(650.0, 35.0, 0.5), false), Stage::Reac);
        assert_eq!(s.advance(&at(680.0, 35.0, 0.8), false), Stage::Cool);
        assert_eq!(s.advance(&at(30.0, 35.0, 0.8), false), Stage::Flash);
        assert_eq!(s.advance(&at(30.0, 35.0, 0.8), false), Stage::Predistill);
        assert_eq!(s.advance(&at(90.0, 1.0, 0.8), false), Stage::Distill);
        assert_eq!(s.advance(&at(90.0, 1.0, 0.8), false), Stage::Distill);
        assert_eq!(s.advance(&at(90.0, 1.0, 0.8), true), Stage::Pure);
    }

    #[test]
    fn pure_is_absorbing_once_reached() {
        let mut s = StageSequencer::new();
        s.advance(&at(90.0, 1.0, 0.8), true);
        for inputs in [at(600.0, 35.0, 0.0), at(30.0, 1.0, 0.9), at(25.0, 25.0, 0.0)] {
            assert_eq!(s.advance(&inputs, true), Stage::Pure);
        }
    }

    #[test]
    fn hex_is_never_produced() {
        let samples = [0.0, 0.05, 0.5, 0.8];
        let stages = [
            Stage::Pre,
            Stage::Reac,
            Stage::Cool,
            Stage::Flash,
            Stage::Predistill,
            Stage::Distill,
            Stage::Pure,
        ];
        for &stage in &stages {
            for &conv in &samples {
                for &(t, p) in &[(25.0, 25.0), (600.0, 35.0), (600.0, 0.5)] {
                    assert_ne!(next_stage(stage, &at(t, p, conv), false), Stage::Hex);
                }
            }
        }
    }

    #[test]
    fn initial_mask_only_allows_mixer() {
        let m = initial_mask();
        assert_eq!(m.count(), 1);
        assert!(m.allows(UnitKind::Mixer));
        assert!(!m.allows_index(42));
    }
}
