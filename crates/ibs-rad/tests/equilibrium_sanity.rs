mod common;

use std::f64::consts::PI;

use ibs_core::{EquilibriumSolver, RfConfiguration};
use ibs_rad::{
    rf_energy_gain, sigs_from_sige, synchronous_phase, synchrotron_tune, RadiationEquilibriumSolver,
};

use common::{bending_radius, single_cavity, storage_ring, ENERGY_GEV};

#[test]
fn energy_loss_matches_isomagnetic_rule() {
    let eq = RadiationEquilibriumSolver::default()
        .solve(&storage_ring(), &single_cavity())
        .unwrap();
    // U0 [GeV] = Cγ E⁴ / ρ with Cγ = 8.846e-5 m GeV⁻³ for electrons.
    let expected = 8.846e-5 * ENERGY_GEV.powi(4) / bending_radius() * 1e9;
    let u0 = eq.longitudinal.u0;
    assert!(((u0 - expected) / expected).abs() < 1e-3, "u0 = {u0}, expected {expected}");
}

#[test]
fn synchronous_phase_balances_loss_above_transition() {
    let rf = single_cavity();
    let eq = RadiationEquilibriumSolver::default()
        .solve(&storage_ring(), &rf)
        .unwrap();
    let long = eq.longitudinal;
    assert!(long.eta > 0.0);
    assert!(long.phi_s > PI / 2.0 && long.phi_s < PI);
    let gain = rf_energy_gain(long.phi_s, -1.0, &rf).unwrap();
    assert!(((gain - long.u0) / long.u0).abs() < 1e-6);
    assert!((long.omega_s - long.qs * long.omega0).abs() < 1e-9 * long.omega_s);
}

#[test]
fn damping_follows_robinson_sum() {
    let eq = RadiationEquilibriumSolver::default()
        .solve(&storage_ring(), &single_cavity())
        .unwrap();
    let p = eq.partition;
    assert!((p.jx + p.jy + p.js - 4.0).abs() < 1e-12);
    assert!((eq.tau_x - 2.0 * eq.tau_s).abs() < 1e-12 * eq.tau_x);
    assert!(eq.tau_x > 0.01 && eq.tau_x < 0.03, "tau_x = {}", eq.tau_x);
}

#[test]
fn equilibrium_moments_are_consistent() {
    let eq = RadiationEquilibriumSolver::default()
        .solve(&storage_ring(), &single_cavity())
        .unwrap();
    assert!(eq.ex0 > 5e-10 && eq.ex0 < 2e-9, "ex0 = {}", eq.ex0);
    assert!((eq.ey0 / eq.ex0 - 0.01).abs() < 1e-9);
    assert_eq!(eq.ey0_coupled, eq.ey0);
    assert_eq!(eq.coupling, 0.0);
    let sige0 = eq.sige0();
    assert!(sige0 > 5e-4 && sige0 < 1e-3, "sige0 = {sige0}");
    let sigs = sigs_from_sige(sige0, eq.longitudinal.gamma, eq.longitudinal.gamma_tr, eq.omega_s());
    assert_eq!(sigs, eq.sigs_inf);
}

#[test]
fn weak_rf_has_no_synchronous_phase() {
    let rf = RfConfiguration::single(833.0, 1.0e5).unwrap();
    let err = RadiationEquilibriumSolver::default()
        .solve(&storage_ring(), &rf)
        .unwrap_err();
    assert_eq!(err.code(), "no-synchronous-phase");
}

#[test]
fn lattice_without_bends_is_rejected() {
    let lattice = storage_ring().with_radiation(Vec::new());
    let err = RadiationEquilibriumSolver::default()
        .solve(&lattice, &single_cavity())
        .unwrap_err();
    assert_eq!(err.code(), "no-bending");
}

#[test]
fn beam_at_transition_is_rejected() {
    let mut lattice = storage_ring();
    lattice.gamma_tr = lattice.gamma;
    let err = RadiationEquilibriumSolver::default()
        .solve(&lattice, &single_cavity())
        .unwrap_err();
    assert_eq!(err.code(), "transition-energy");
}

#[test]
fn harmonic_cavity_keeps_a_stable_phase() {
    let rf = RfConfiguration::new(vec![833.0, 2499.0], vec![2.0e6, 3.0e5]).unwrap();
    let eq = RadiationEquilibriumSolver::default()
        .solve(&storage_ring(), &rf)
        .unwrap();
    let gain = rf_energy_gain(eq.longitudinal.phi_s, -1.0, &rf).unwrap();
    assert!(((gain - eq.longitudinal.u0) / eq.longitudinal.u0).abs() < 1e-6);
    assert!(eq.longitudinal.qs > 0.0);
}

#[test]
fn empty_rf_arrays_report_missing_rf() {
    let rf = RfConfiguration {
        harmonics: Vec::new(),
        voltages: Vec::new(),
    };
    assert_eq!(rf_energy_gain(1.0, -1.0, &rf).unwrap_err().code(), "no-rf");
    assert_eq!(
        synchronous_phase(5.0e5, -1.0, &rf, 1e-3, 1e-9).unwrap_err().code(),
        "no-rf"
    );
    assert_eq!(
        synchrotron_tune(-1.0, &rf, 2.8, 1e-3, 1.0, 3.0e9).unwrap_err().code(),
        "no-rf"
    );
}
