use ibs_rad::{beta_from_gamma, revolution, sige_from_sigs, sigs_from_sige, slip_factor};
use proptest::prelude::*;

proptest! {
    #[test]
    fn bunch_length_relation_inverts(
        sige in 1e-5f64..1e-2,
        gamma in 2.0f64..2.0e4,
        gamma_tr in 1.5f64..80.0,
        omega_s in 1.0e2f64..1.0e6,
    ) {
        prop_assume!(slip_factor(gamma, gamma_tr).abs() > 1e-9);
        let sigs = sigs_from_sige(sige, gamma, gamma_tr, omega_s);
        prop_assert!(sigs > 0.0);
        let back = sige_from_sigs(sigs, gamma, gamma_tr, omega_s);
        prop_assert!(((back - sige) / sige).abs() < 1e-12);
    }

    #[test]
    fn bunch_length_is_linear_in_energy_spread(
        sige in 1e-5f64..1e-2,
        factor in 0.1f64..10.0,
        omega_s in 1.0e2f64..1.0e6,
    ) {
        let base = sigs_from_sige(sige, 5870.0, 31.6, omega_s);
        let scaled = sigs_from_sige(sige * factor, 5870.0, 31.6, omega_s);
        prop_assert!(((scaled / base) - factor).abs() < 1e-9 * factor);
    }
}

#[test]
fn slip_factor_changes_sign_at_transition() {
    assert!(slip_factor(100.0, 30.0) > 0.0);
    assert!(slip_factor(10.0, 30.0) < 0.0);
}

#[test]
fn revolution_of_ultra_relativistic_ring() {
    let beta = beta_from_gamma(5870.0);
    let rev = revolution(299.792458, beta);
    assert!((rev.t_rev - 1.0e-6).abs() < 1e-12);
    assert!((rev.omega0 - 2.0 * std::f64::consts::PI * rev.f_rev).abs() < 1e-3);
}
