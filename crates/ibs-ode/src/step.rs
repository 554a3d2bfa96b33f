use ibs_core::{EquilibriumParameters, GrowthRates};
use serde::{Deserialize, Serialize};

/// Hard cap on the number of adaptive iterations.
pub const MAX_STEPS: usize = 10_000;

/// Upper bound (s) applied to the slowest timescale when sizing the budget.
pub const MAX_TIMESCALE: f64 = 1.0;

/// Step-size derivation from damping times and instantaneous growth rates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepSizeEstimator {
    damping: [f64; 3],
}

impl StepSizeEstimator {
    /// Captures the damping times of the run.
    pub fn new(equilibrium: &EquilibriumParameters) -> Self {
        Self {
            damping: equilibrium.damping_times(),
        }
    }

    /// All six characteristic timescales: the damping times followed by
    /// `1/|a|` for each growth rate. A zero rate maps to infinity.
    pub fn timescales(&self, rates: &GrowthRates) -> [f64; 6] {
        let growth = rates.as_array().map(|rate| 1.0 / rate.abs());
        [
            self.damping[0],
            self.damping[1],
            self.damping[2],
            growth[0],
            growth[1],
            growth[2],
        ]
    }

    /// Shortest timescale.
    pub fn fastest(&self, rates: &GrowthRates) -> f64 {
        self.timescales(rates).into_iter().fold(f64::INFINITY, f64::min)
    }

    /// Longest timescale, clamped to [`MAX_TIMESCALE`].
    ///
    /// Growth rates enter as `1/a` here, so a negative (damping) rate never
    /// raises the maximum.
    pub fn slowest(&self, rates: &GrowthRates) -> f64 {
        let growth = rates.as_array().map(|rate| 1.0 / rate);
        self.damping
            .into_iter()
            .chain(growth)
            .fold(0.0, f64::max)
            .min(MAX_TIMESCALE)
    }

    /// Iteration budget `min(⌊10 τ_max / τ_min⌋, MAX_STEPS)`, never below one.
    pub fn step_budget(&self, initial: &GrowthRates) -> usize {
        let ratio = 10.0 * self.slowest(initial) / self.fastest(initial);
        if !ratio.is_finite() || ratio >= MAX_STEPS as f64 {
            return MAX_STEPS;
        }
        (ratio.floor() as usize).clamp(1, MAX_STEPS)
    }

    /// Adaptive step: half of the fastest timescale at the current rates.
    pub fn adaptive_step(&self, rates: &GrowthRates) -> f64 {
        0.5 * self.fastest(rates)
    }
}
