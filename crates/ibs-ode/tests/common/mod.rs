#![allow(dead_code)]

use std::collections::BTreeMap;
use std::f64::consts::PI;

use ibs_core::constants::ELECTRON_MASS;
use ibs_core::{
    BeamState, ElementIntegrals, EquilibriumParameters, EquilibriumSolver, GrowthRates,
    LatticeSummary, RfConfiguration, TwissTable,
};
use ibs_ode::BeamHistory;
use ibs_rad::RadiationEquilibriumSolver;

pub const DIPOLES: usize = 40;
pub const PARTICLES: f64 = 4.0e10;

pub fn header() -> BTreeMap<String, f64> {
    [
        ("GAMMA", 3.0 / ELECTRON_MASS),
        ("PC", 3.0),
        ("GAMMATR", 1.0 / 1.0e-3_f64.sqrt()),
        ("MASS", ELECTRON_MASS),
        ("CHARGE", -1.0),
        ("Q1", 18.2),
        ("LENGTH", 500.0),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect()
}

fn dipole() -> ElementIntegrals {
    let theta = 2.0 * PI / DIPOLES as f64;
    let length = 2.0;
    ElementIntegrals {
        i1: 0.5 / DIPOLES as f64,
        i2: theta * theta / length,
        i3: theta.powi(3) / (length * length),
        i4x: 0.0,
        i4y: 0.0,
        i5x: 3.75e-5 / DIPOLES as f64,
        i5y: 3.75e-7 / DIPOLES as f64,
    }
}

/// 3 GeV electron ring, 500 m, forty identical bends, 1% natural coupling.
pub fn storage_ring() -> LatticeSummary {
    LatticeSummary::from_header(&header(), TwissTable::new())
        .unwrap()
        .with_radiation(vec![dipole(); DIPOLES])
}

pub fn single_cavity() -> RfConfiguration {
    RfConfiguration::single(833.0, 2.0e6).unwrap()
}

pub fn equilibrium(coupling: f64) -> EquilibriumParameters {
    RadiationEquilibriumSolver::default()
        .solve(&storage_ring(), &single_cavity())
        .unwrap()
        .with_coupling(coupling)
}

/// Seed sitting exactly on the radiation equilibrium of `eq`.
pub fn seed_at(eq: &EquilibriumParameters) -> BeamState {
    BeamState::new(0.0, eq.ex0, eq.ey0_coupled, eq.sigs_inf, eq.sige0())
}

/// Seed displaced from equilibrium in every plane.
pub fn displaced_seed(eq: &EquilibriumParameters) -> BeamHistory {
    BeamHistory::seeded(BeamState::new(
        0.0,
        3.0 * eq.ex0,
        0.5 * eq.ey0_coupled,
        2.0 * eq.sigs_inf,
        2.0 * eq.sige0(),
    ))
}

/// Growth rates expressed as fractions of the damping rates.
pub fn scaled_rates(eq: &EquilibriumParameters, ks: f64, kx: f64, ky: f64) -> GrowthRates {
    GrowthRates::new(ks / eq.tau_s, kx / eq.tau_x, ky / eq.tau_y)
}

pub fn is_strictly_increasing(values: &[f64]) -> bool {
    values.windows(2).all(|pair| pair[1] > pair[0])
}
