use ibs_core::{BeamState, EquilibriumParameters, GrowthRates};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::config::ConfigWarning;
use crate::kernel::RunSummary;
use crate::models::IbsModel;
use crate::scheme::Scheme;

/// Parameters fixed at the start of the stepping loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunParameters {
    /// Growth-rate model in use.
    pub model: IbsModel,
    /// Stepping scheme.
    pub scheme: Scheme,
    /// Coupling fraction.
    pub coupling: f64,
    /// Iteration budget (adaptive) or requested step count (fixed).
    pub steps: usize,
    /// Slowest timescale used for the budget, adaptive runs only.
    pub tau_max: Option<f64>,
    /// Step size at the first iteration (s).
    pub initial_dt: f64,
    /// Growth rates at the seed.
    pub initial_rates: GrowthRates,
}

/// Snapshot emitted after each iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepProgress {
    /// One based iteration index.
    pub step: usize,
    /// Iteration budget or requested step count.
    pub total: usize,
    /// Step size used (s).
    pub dt: f64,
    /// Rates the step was taken with.
    pub rates: GrowthRates,
    /// State appended by the step.
    pub state: BeamState,
}

/// Diagnostic sink for an integration run.
///
/// Every method defaults to a no-op. Reporters observe the run and never
/// influence the numbers it produces.
pub trait Reporter {
    /// Equilibrium computed before the loop, coupling applied.
    fn equilibrium(&mut self, _equilibrium: &EquilibriumParameters) {}

    /// Parameters fixed at loop start.
    fn run_parameters(&mut self, _parameters: &RunParameters) {}

    /// A configuration value was replaced.
    fn warning(&mut self, _warning: &ConfigWarning) {}

    /// The relaxation guard halved the fixed step.
    fn step_halved(&mut self, _step: usize, _dt: f64) {}

    /// One iteration completed.
    fn progress(&mut self, _progress: &StepProgress) {}

    /// The run finished.
    fn finished(&mut self, _summary: &RunSummary) {}
}

/// Reporter that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {}

/// Reporter forwarding to `tracing` events. No subscriber is installed here.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn equilibrium(&mut self, eq: &EquilibriumParameters) {
        let long = &eq.longitudinal;
        info!(
            tau_x = eq.tau_x,
            tau_y = eq.tau_y,
            tau_s = eq.tau_s,
            "radiation damping times"
        );
        info!(
            qs = long.qs,
            omega_s = long.omega_s,
            phi_s = long.phi_s,
            u0 = long.u0,
            eta = long.eta,
            "longitudinal parameters"
        );
        info!(
            ex0 = eq.ex0,
            ey0 = eq.ey0,
            ey0_coupled = eq.ey0_coupled,
            sige0 = eq.sige0(),
            sigs_inf = eq.sigs_inf,
            "radiation equilibrium"
        );
    }

    fn run_parameters(&mut self, p: &RunParameters) {
        info!(
            model = %p.model,
            scheme = p.scheme.as_str(),
            coupling = p.coupling,
            steps = p.steps,
            tau_max = ?p.tau_max,
            dt = p.initial_dt,
            aes = p.initial_rates.longitudinal,
            aex = p.initial_rates.horizontal,
            aey = p.initial_rates.vertical,
            "run parameters"
        );
    }

    fn warning(&mut self, warning: &ConfigWarning) {
        warn!("{warning}");
    }

    fn step_halved(&mut self, step: usize, dt: f64) {
        debug!(step, dt, "relaxation guard halved the step");
    }

    fn progress(&mut self, p: &StepProgress) {
        trace!(
            step = p.step,
            total = p.total,
            percent = 100.0 * p.step as f64 / p.total.max(1) as f64,
            dt = p.dt,
            ex = p.state.ex,
            ey = p.state.ey,
            sigs = p.state.sigs,
            "step"
        );
    }

    fn finished(&mut self, summary: &RunSummary) {
        let last = summary.final_state;
        let rates = summary.final_rates;
        info!(
            outcome = summary.outcome.as_str(),
            steps = summary.steps,
            ex = last.ex,
            ey = last.ey,
            sigs = last.sigs,
            tau_ibs_x = 1.0 / rates.horizontal,
            tau_ibs_y = 1.0 / rates.vertical,
            tau_ibs_s = 1.0 / rates.longitudinal,
            "integration finished"
        );
    }
}
