use ibs_core::errors::{ErrorInfo, IbsError};
use ibs_core::{BeamState, EquilibriumParameters, GrowthRates};
use ibs_rad::sigs_from_sige;
use serde::{Deserialize, Serialize};

/// Stepping algorithm, fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scheme {
    /// Implicit relaxation towards the IBS-modified equilibrium.
    Relaxation,
    /// Explicit Euler on the coupled moment equations.
    #[default]
    Derivative,
}

impl Scheme {
    /// Parses `rlx`/`relaxation` or `der`/`derivative`, ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "rlx" | "relaxation" => Some(Scheme::Relaxation),
            "der" | "derivative" => Some(Scheme::Derivative),
            _ => None,
        }
    }

    /// Short selector name.
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Relaxation => "rlx",
            Scheme::Derivative => "der",
        }
    }

    /// Factor applied to the adaptive step.
    pub fn adaptive_multiplier(self) -> f64 {
        match self {
            Scheme::Relaxation => 4.0,
            Scheme::Derivative => 1.0,
        }
    }

    /// Advances `state` by `dt` with this scheme.
    pub fn advance(
        self,
        state: &BeamState,
        rates: &GrowthRates,
        equilibrium: &EquilibriumParameters,
        dt: f64,
    ) -> Result<BeamState, IbsError> {
        match self {
            Scheme::Relaxation => advance_relaxation(state, rates, equilibrium, dt),
            Scheme::Derivative => Ok(advance_derivative(state, rates, equilibrium, dt)),
        }
    }
}

/// Time derivatives of the evolved moments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Derivatives {
    /// `d ex / dt`.
    pub ex: f64,
    /// `d ey / dt`.
    pub ey: f64,
    /// `d σE / dt`.
    pub sige: f64,
}

/// Damping towards the radiation equilibrium plus IBS growth.
pub fn derivatives(
    state: &BeamState,
    rates: &GrowthRates,
    equilibrium: &EquilibriumParameters,
) -> Derivatives {
    Derivatives {
        ex: -(state.ex - equilibrium.ex0) * 2.0 / equilibrium.tau_x
            + state.ex * 2.0 * rates.horizontal,
        ey: -(state.ey - equilibrium.ey0_coupled) * 2.0 / equilibrium.tau_y
            + state.ey * 2.0 * rates.vertical,
        sige: -(state.sige - equilibrium.sige0()) / equilibrium.tau_s
            + state.sige * rates.longitudinal,
    }
}

fn next_state(
    state: &BeamState,
    equilibrium: &EquilibriumParameters,
    dt: f64,
    ex: f64,
    ey: f64,
    sige: f64,
) -> BeamState {
    let long = &equilibrium.longitudinal;
    let sigs = sigs_from_sige(sige, long.gamma, long.gamma_tr, long.omega_s);
    BeamState::new(state.t + dt, ex, ey, sigs, sige)
}

/// Explicit Euler step. The bunch length follows from the new energy spread.
pub fn advance_derivative(
    state: &BeamState,
    rates: &GrowthRates,
    equilibrium: &EquilibriumParameters,
    dt: f64,
) -> BeamState {
    let d = derivatives(state, rates, equilibrium);
    next_state(
        state,
        equilibrium,
        dt,
        state.ex + dt * d.ex,
        state.ey + dt * d.ey,
        state.sige + dt * d.sige,
    )
}

/// Equilibrium enhancement factors `1 / (1 − τ a)` per plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelaxationFactors {
    /// Horizontal factor.
    pub x: f64,
    /// Vertical factor.
    pub y: f64,
    /// Longitudinal factor.
    pub s: f64,
}

fn ratios(rates: &GrowthRates, equilibrium: &EquilibriumParameters) -> [(&'static str, f64); 3] {
    [
        ("x", equilibrium.tau_x * rates.horizontal),
        ("y", equilibrium.tau_y * rates.vertical),
        ("s", equilibrium.tau_s * rates.longitudinal),
    ]
}

/// Computes the relaxation factors, failing when a denominator is exactly
/// zero.
pub fn relaxation_factors(
    rates: &GrowthRates,
    equilibrium: &EquilibriumParameters,
) -> Result<RelaxationFactors, IbsError> {
    let mut factors = [0.0; 3];
    for (slot, (plane, ratio)) in factors.iter_mut().zip(ratios(rates, equilibrium)) {
        let denominator = 1.0 - ratio;
        if denominator == 0.0 {
            return Err(IbsError::Numerical(
                ErrorInfo::new("singular-relaxation", "growth balances damping exactly")
                    .with_context("plane", plane)
                    .with_value("ratio", ratio)
                    .with_hint("use the derivative scheme for this working point"),
            ));
        }
        *slot = 1.0 / denominator;
    }
    Ok(RelaxationFactors {
        x: factors[0],
        y: factors[1],
        s: factors[2],
    })
}

/// True when any `τ × a` reaches one, i.e. growth outpaces damping.
pub fn relaxation_guard(rates: &GrowthRates, equilibrium: &EquilibriumParameters) -> bool {
    ratios(rates, equilibrium)
        .iter()
        .any(|(_, ratio)| *ratio >= 1.0)
}

/// Relaxation step towards the growth-modified equilibrium.
pub fn advance_relaxation(
    state: &BeamState,
    rates: &GrowthRates,
    equilibrium: &EquilibriumParameters,
    dt: f64,
) -> Result<BeamState, IbsError> {
    let f = relaxation_factors(rates, equilibrium)?;
    let coupling = equilibrium.coupling;
    let ex = state.ex + dt * (f.x * equilibrium.ex0 - state.ex);
    let ey = state.ey
        + dt * (((1.0 - coupling) * f.y + coupling * f.x) * equilibrium.ey0_coupled - state.ey);
    let sige = state.sige + dt * (f.s * equilibrium.sige0() - state.sige);
    Ok(next_state(state, equilibrium, dt, ex, ey, sige))
}
