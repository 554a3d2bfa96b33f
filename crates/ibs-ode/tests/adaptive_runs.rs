mod common;

use std::sync::{Arc, Mutex};

use ibs_core::{GrowthRateInput, GrowthRates};
use ibs_ode::{
    constant_registry, BeamHistory, ConfigWarning, GrowthRateRegistry, IbsModel,
    IntegrationConfig, Integrator, Outcome, Reporter, Scheme, StepProgress, StepSizeEstimator,
    MAX_STEPS,
};

use common::{
    displaced_seed, equilibrium, is_strictly_increasing, scaled_rates, seed_at, single_cavity,
    storage_ring, PARTICLES,
};

#[test]
fn equilibrium_seed_converges_in_one_step() {
    let lattice = storage_ring();
    let rf = single_cavity();
    let registry = constant_registry(GrowthRates::zero());
    let integrator = Integrator::new(&lattice, &rf, &registry);

    for scheme in ["der", "rlx"] {
        let mut history = BeamHistory::seeded(seed_at(&equilibrium(0.0)));
        let config = IntegrationConfig::adaptive(4, PARTICLES, 0, 1e-4).with_scheme(scheme);
        let summary = integrator.run(&config, &mut history).unwrap();
        assert_eq!(summary.outcome, Outcome::Converged, "scheme {scheme}");
        assert!(summary.converged());
        assert_eq!(summary.steps, 1);
        assert_eq!(history.len(), 2);
        assert!(history.is_aligned());
        assert!(summary.warnings.is_empty());
    }
}

#[test]
fn displaced_seed_relaxes_towards_equilibrium() {
    let lattice = storage_ring();
    let rf = single_cavity();
    let registry = constant_registry(GrowthRates::zero());
    let integrator = Integrator::new(&lattice, &rf, &registry);
    let eq = equilibrium(0.0);

    let mut history = displaced_seed(&eq);
    let config = IntegrationConfig::adaptive(1, PARTICLES, 0, 1e-6);
    let summary = integrator.run(&config, &mut history).unwrap();

    assert_eq!(summary.outcome, Outcome::Converged);
    assert!(summary.steps <= summary.step_budget);
    assert_eq!(history.len(), summary.steps + 1);
    assert!(is_strictly_increasing(history.t()));
    let last = history.last().unwrap();
    assert!(((last.ex - eq.ex0) / eq.ex0).abs() < 1e-4);
    assert!(((last.sige - eq.sige0()) / eq.sige0()).abs() < 1e-4);
    assert_eq!(summary.final_state, last);
}

#[test]
fn runaway_growth_exhausts_the_budget() {
    let lattice = storage_ring();
    let rf = single_cavity();
    let eq = equilibrium(0.0);
    let rates = scaled_rates(&eq, 0.0, 1.2, 0.0);
    let registry = constant_registry(rates);
    let integrator = Integrator::new(&lattice, &rf, &registry);

    let mut history = BeamHistory::seeded(seed_at(&eq));
    let config = IntegrationConfig::adaptive(9, PARTICLES, 0, 1e-4);
    let summary = integrator.run(&config, &mut history).unwrap();

    let expected_budget = StepSizeEstimator::new(&eq).step_budget(&rates);
    assert_eq!(summary.outcome, Outcome::StepBudgetExhausted);
    assert!(!summary.converged());
    assert_eq!(summary.step_budget, expected_budget);
    assert!(summary.step_budget <= MAX_STEPS);
    assert_eq!(summary.steps, expected_budget);
    assert_eq!(history.len(), expected_budget + 1);
    assert!(history.last().unwrap().ex > eq.ex0);
}

#[test]
fn relaxation_steps_four_times_further() {
    let lattice = storage_ring();
    let rf = single_cavity();
    let registry = constant_registry(GrowthRates::zero());
    let integrator = Integrator::new(&lattice, &rf, &registry);
    let eq = equilibrium(0.0);

    let mut der = BeamHistory::seeded(seed_at(&eq));
    let mut rlx = BeamHistory::seeded(seed_at(&eq));
    let base = IntegrationConfig::adaptive(2, PARTICLES, 0, 1e-4);
    let der_summary = integrator.run(&base, &mut der).unwrap();
    let rlx_summary = integrator
        .run(&base.clone().with_scheme("relaxation"), &mut rlx)
        .unwrap();

    assert_eq!(der_summary.scheme, Scheme::Derivative);
    assert_eq!(rlx_summary.scheme, Scheme::Relaxation);
    let tau_min = eq.tau_s.min(eq.tau_x).min(eq.tau_y);
    assert_eq!(der.t()[1], 0.5 * tau_min);
    assert_eq!(rlx.t()[1], 4.0 * der.t()[1]);
    assert_eq!(rlx_summary.final_step_size, 4.0 * der_summary.final_step_size);
}

#[test]
fn invalid_threshold_and_scheme_are_replaced() {
    let lattice = storage_ring();
    let rf = single_cavity();
    let registry = constant_registry(GrowthRates::zero());
    let integrator = Integrator::new(&lattice, &rf, &registry);

    let mut history = BeamHistory::seeded(seed_at(&equilibrium(0.0)));
    let config = IntegrationConfig::adaptive(3, PARTICLES, 0, 5.0).with_scheme("rk4");
    let summary = integrator.run(&config, &mut history).unwrap();

    assert_eq!(summary.threshold, Some(1e-4));
    assert_eq!(summary.scheme, Scheme::Derivative);
    assert_eq!(
        summary.warnings,
        vec![
            ConfigWarning::SchemeDefaulted {
                requested: "rk4".to_string()
            },
            ConfigWarning::ThresholdClamped {
                requested: 5.0,
                applied: 1e-4
            },
        ]
    );
}

#[test]
fn growth_rates_shift_the_steady_state() {
    let lattice = storage_ring();
    let rf = single_cavity();
    let eq = equilibrium(0.0);
    let registry = constant_registry(scaled_rates(&eq, 0.2, 0.5, 0.0));
    let integrator = Integrator::new(&lattice, &rf, &registry);

    let mut history = BeamHistory::seeded(seed_at(&eq));
    let summary = integrator
        .run(&IntegrationConfig::adaptive(6, PARTICLES, 0, 1e-6), &mut history)
        .unwrap();
    assert_eq!(summary.outcome, Outcome::Converged);
    let last = history.last().unwrap();
    // dex/dt = 0 at ex = ex0 / (1 - τx aex)
    assert!(((last.ex - 2.0 * eq.ex0) / (2.0 * eq.ex0)).abs() < 1e-3);
    assert!(((last.sige - 1.25 * eq.sige0()) / (1.25 * eq.sige0())).abs() < 1e-3);
}

#[derive(Default)]
struct StepSizes(Vec<f64>);

impl Reporter for StepSizes {
    fn progress(&mut self, progress: &StepProgress) {
        self.0.push(progress.dt);
    }
}

#[test]
fn rates_and_step_size_follow_the_current_state() {
    let lattice = storage_ring();
    let rf = single_cavity();
    let eq = equilibrium(0.0);
    let (tau_x, ey_target) = (eq.tau_x, eq.ey0_coupled);

    // Horizontal cooling that strengthens as ey relaxes upwards, so 1/|aex|
    // overtakes the shortest damping time part way through the run.
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&seen);
    let mut registry = GrowthRateRegistry::new();
    registry.register_fn(IbsModel::BjorkenMtingwa, move |input: &GrowthRateInput<'_>| {
        recorded.lock().unwrap().push(input.state.t);
        let horizontal = -3.0 * (input.state.ey / ey_target) / tau_x;
        Ok(GrowthRates::new(0.0, horizontal, 0.0))
    });
    let integrator = Integrator::new(&lattice, &rf, &registry);

    let mut history = displaced_seed(&eq);
    let mut sizes = StepSizes::default();
    let config = IntegrationConfig::adaptive(9, PARTICLES, 0, 1e-4).with_scheme("rlx");
    let summary = integrator
        .run_with_reporter(&config, &mut history, &mut sizes)
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), summary.steps);
    assert_eq!(seen.as_slice(), &history.t()[..summary.steps]);

    let damping_min = eq.tau_x.min(eq.tau_y).min(eq.tau_s);
    let dts = sizes.0;
    assert_eq!(dts.len(), summary.steps);
    for (k, dt) in dts.iter().enumerate() {
        let aex = -3.0 * (history.ey()[k] / ey_target) / tau_x;
        let expected = 4.0 * 0.5 * damping_min.min(1.0 / aex.abs());
        assert!((dt - expected).abs() <= 1e-12 * expected, "step {}", k + 1);
    }
    assert_eq!(dts[0], 2.0 * damping_min);
    assert!(dts.windows(2).all(|pair| pair[1] <= pair[0]));
    assert!(*dts.last().unwrap() < dts[0]);
}
