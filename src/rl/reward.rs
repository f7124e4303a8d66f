// src/rl/reward.rs
//
// Reward components and weights for a converged step.
//
// r_t = cost
//     + temperature bonus     (reactors kept under the temperature limit)
//     + ratio bonus/penalty   (H2 recycle vs. discarding H2)
//     + conversion bonus      (drop in TOL mole fraction)
//     + hydrogen bonus        (drop in H2 mole fraction across flashes)
//     + recovery bonus        (BZN kept in the purge-column bottoms)
//     + terminal penalty      (budget exhausted short of purity)
//     + early-success bonus   (purity reached with iterations to spare)
//     + one-shot BZN bonus    (first time BZN purity is reached)

use serde::{Deserialize, Serialize};

use crate::types::UnitKind;

/// Every numeric constant of the cost and reward model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardWeights {
    /// Fixed cost of a mixer.
    pub mixer_fixed_cost: f64,
    /// Base fixed cost of every other unit (scaled by sizing where sized).
    pub unit_fixed_cost: f64,
    /// Energy duty that costs one reward unit.
    pub energy_scale: f64,
    pub temperature_bonus: f64,
    /// Reactor outlet limit without a recycle loop (°C).
    pub reactor_temperature_limit: f64,
    /// Reactor outlet limit once a mixer closes a recycle (°C).
    pub reactor_temperature_limit_recycle: f64,
    /// Minimum (recycled + fresh) H2 to fresh TOL molar ratio.
    pub hydrogen_ratio: f64,
    pub ratio_bonus: f64,
    /// Penalty for a plain flash that discards H2.
    pub discard_hydrogen_penalty: f64,
    pub hydrogen_weight: f64,
    pub recovery_weight: f64,
    pub terminal_weight: f64,
    /// Bonus per unused iteration when both products are pure.
    pub early_success_per_iter: f64,
    pub bzn_extra_weight: f64,
    /// Fixed reward when the engine fails to converge.
    pub non_convergence_reward: f64,
    /// Methane mole fraction that marks the purge stream as pure.
    pub methane_purity: f64,
    /// Minimum distillate BZN flow for a column outlet to count as product.
    pub bzn_product_min_flow: f64,
    /// Minimum distillate METHANE flow for a purge outlet to count as product.
    pub methane_product_min_flow: f64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            mixer_fixed_cost: 0.1,
            unit_fixed_cost: 0.2,
            energy_scale: 30_000.0,
            temperature_bonus: 0.2,
            reactor_temperature_limit: 700.0,
            reactor_temperature_limit_recycle: 750.0,
            hydrogen_ratio: 3.0,
            ratio_bonus: 0.5,
            discard_hydrogen_penalty: 15.0,
            hydrogen_weight: 0.8,
            recovery_weight: 0.4,
            terminal_weight: 15.0,
            early_success_per_iter: 0.2,
            bzn_extra_weight: 1.2,
            non_convergence_reward: -8.0,
            methane_purity: 0.80,
            bzn_product_min_flow: 10.0,
            methane_product_min_flow: 5.0,
        }
    }
}

/// Breakdown of one step's reward.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardComponents {
    pub cost: f64,
    pub temperature_bonus: f64,
    pub ratio_bonus: f64,
    pub conversion_bonus: f64,
    pub hydrogen_bonus: f64,
    pub recovery_bonus: f64,
    pub terminal_penalty: f64,
    pub early_success_bonus: f64,
    pub bzn_extra: f64,
}

impl RewardComponents {
    pub fn total(&self) -> f64 {
        self.cost
            + self.temperature_bonus
            + self.ratio_bonus
            + self.conversion_bonus
            + self.hydrogen_bonus
            + self.recovery_bonus
            + self.terminal_penalty
            + self.early_success_bonus
            + self.bzn_extra
    }
}

/// Reactors earn a bonus when the outlet stays under the topology's limit.
pub fn temperature_bonus(
    kind: UnitKind,
    outlet_temperature: f64,
    recycle_topology: bool,
    w: &RewardWeights,
) -> f64 {
    if !kind.is_reactor() {
        return 0.0;
    }
    let limit = if recycle_topology {
        w.reactor_temperature_limit_recycle
    } else {
        w.reactor_temperature_limit
    };
    if outlet_temperature <= limit {
        w.temperature_bonus
    } else {
        0.0
    }
}

/// Flash-with-recycle is rewarded for keeping enough H2 in the loop;
/// a plain flash is penalised for throwing it away.
pub fn ratio_bonus(
    kind: UnitKind,
    recycle_hydrogen: Option<f64>,
    initial_hydrogen: f64,
    initial_tol: f64,
    w: &RewardWeights,
) -> f64 {
    match (kind, recycle_hydrogen) {
        (UnitKind::FlashRecycle, Some(h2))
            if h2 + initial_hydrogen >= w.hydrogen_ratio * initial_tol =>
        {
            w.ratio_bonus
        }
        (UnitKind::Flash, _) => -w.discard_hydrogen_penalty,
        _ => 0.0,
    }
}

/// Drop in TOL mole fraction; separators that only remove lights earn nothing.
pub fn conversion_bonus(kind: UnitKind, inlet_tol_frac: f64, outlet_tol_frac: f64) -> f64 {
    match kind {
        UnitKind::Flash | UnitKind::FlashRecycle | UnitKind::PurgeColumn => 0.0,
        _ => inlet_tol_frac - outlet_tol_frac,
    }
}

pub fn hydrogen_bonus(
    kind: UnitKind,
    inlet_h2_frac: f64,
    outlet_h2_frac: f64,
    w: &RewardWeights,
) -> f64 {
    if kind.is_flash() {
        w.hydrogen_weight * (inlet_h2_frac - outlet_h2_frac)
    } else {
        0.0
    }
}

pub fn recovery_bonus(
    kind: UnitKind,
    outlet_bzn_flow: f64,
    initial_tol: f64,
    w: &RewardWeights,
) -> f64 {
    if kind == UnitKind::PurgeColumn {
        w.recovery_weight * outlet_bzn_flow / initial_tol
    } else {
        0.0
    }
}

pub fn terminal_penalty(purity_target: f64, outlet_bzn_frac: f64, w: &RewardWeights) -> f64 {
    -w.terminal_weight * (purity_target - outlet_bzn_frac)
}

pub fn early_success_bonus(remaining_iterations: u32, w: &RewardWeights) -> f64 {
    w.early_success_per_iter * remaining_iterations as f64
}

pub fn bzn_extra(product_bzn_flow: f64, initial_tol: f64, w: &RewardWeights) -> f64 {
    w.bzn_extra_weight * product_bzn_flow / initial_tol
}
