mod common;

use ibs_ode::{constant_registry, ConfigWarning, IntegrationConfig, Integrator};

use common::{displaced_seed, equilibrium, scaled_rates, single_cavity, storage_ring, PARTICLES};

#[test]
fn out_of_range_coupling_behaves_like_zero() {
    let lattice = storage_ring();
    let rf = single_cavity();
    let eq = equilibrium(0.0);
    let registry = constant_registry(scaled_rates(&eq, 0.1, 0.3, 0.2));
    let integrator = Integrator::new(&lattice, &rf, &registry);

    for scheme in ["der", "rlx"] {
        let run = |coupling: i32| {
            let mut history = displaced_seed(&eq);
            let config =
                IntegrationConfig::adaptive(11, PARTICLES, coupling, 1e-5).with_scheme(scheme);
            let summary = integrator.run(&config, &mut history).unwrap();
            (history, summary)
        };
        let (reference, reference_summary) = run(0);
        assert!(reference_summary.warnings.is_empty());
        assert_eq!(reference_summary.coupling, 0.0);

        for coupling in [150, -5] {
            let (history, summary) = run(coupling);
            assert_eq!(history, reference, "coupling {coupling} with {scheme}");
            assert_eq!(summary.history_hash, reference_summary.history_hash);
            assert_eq!(summary.coupling, 0.0);
            assert_eq!(
                summary.warnings,
                vec![ConfigWarning::CouplingClamped {
                    requested: coupling
                }]
            );
        }
    }
}

#[test]
fn coupling_raises_the_vertical_target() {
    let lattice = storage_ring();
    let rf = single_cavity();
    let eq = equilibrium(0.0);
    let registry = constant_registry(scaled_rates(&eq, 0.0, 0.0, 0.0));
    let integrator = Integrator::new(&lattice, &rf, &registry);

    let mut history = displaced_seed(&eq);
    let summary = integrator
        .run(&IntegrationConfig::adaptive(11, PARTICLES, 10, 1e-6), &mut history)
        .unwrap();
    assert_eq!(summary.coupling, 0.1);
    let target = summary.equilibrium.ey0_coupled;
    assert_eq!(target, 0.1 * eq.ex0);
    let last = history.last().unwrap();
    assert!(((last.ey - target) / target).abs() < 1e-4);

    // Below the natural vertical emittance the radiation value wins.
    let weak = integrator.equilibrium(0.001).unwrap();
    assert_eq!(weak.ey0_coupled, weak.ey0);
}
