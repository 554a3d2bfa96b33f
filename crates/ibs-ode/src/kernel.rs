use ibs_core::errors::{ErrorInfo, IbsError};
use ibs_core::{
    BeamState, EquilibriumParameters, EquilibriumSolver, GrowthRateInput, GrowthRates,
    LatticeSummary, RfConfiguration,
};
use ibs_rad::RadiationEquilibriumSolver;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigWarning, IntegrationConfig, ResolvedConfig, ResolvedStopping};
use crate::convergence::ConvergenceMonitor;
use crate::hash::stable_hash_string;
use crate::history::BeamHistory;
use crate::models::{GrowthRateRegistry, IbsModel};
use crate::report::{NullReporter, Reporter, RunParameters, StepProgress, TracingReporter};
use crate::scheme::{relaxation_guard, Scheme};
use crate::step::StepSizeEstimator;

fn seed_error(code: &str, message: impl Into<String>) -> IbsError {
    IbsError::Config(ErrorInfo::new(code, message))
}

/// How a run terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// Relative changes fell to the threshold.
    Converged,
    /// The adaptive iteration budget ran out first.
    StepBudgetExhausted,
    /// A fixed-step run took all requested steps.
    StepsCompleted,
}

impl Outcome {
    /// Kebab-case label.
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Converged => "converged",
            Outcome::StepBudgetExhausted => "step-budget-exhausted",
            Outcome::StepsCompleted => "steps-completed",
        }
    }
}

/// Summary returned to callers after a run completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Termination reason.
    pub outcome: Outcome,
    /// Number of iterations executed (entries appended).
    pub steps: usize,
    /// Iteration budget (adaptive) or requested step count (fixed).
    pub step_budget: usize,
    /// Growth-rate model used.
    pub model: IbsModel,
    /// Stepping scheme used.
    pub scheme: Scheme,
    /// Coupling fraction applied.
    pub coupling: f64,
    /// Sanitized threshold, adaptive runs only.
    pub threshold: Option<f64>,
    /// Step size of the last iteration (s).
    pub final_step_size: f64,
    /// Equilibrium with coupling applied.
    pub equilibrium: EquilibriumParameters,
    /// Growth rates at the seed.
    pub initial_rates: GrowthRates,
    /// Growth rates of the last iteration.
    pub final_rates: GrowthRates,
    /// Last state in the history.
    pub final_state: BeamState,
    /// Number of relaxation guard halvings in fixed mode.
    pub step_halvings: usize,
    /// Configuration values replaced during resolution.
    pub warnings: Vec<ConfigWarning>,
    /// SHA-256 of the history contents.
    pub history_hash: String,
}

impl RunSummary {
    /// True when the run ended on the threshold.
    pub fn converged(&self) -> bool {
        self.outcome == Outcome::Converged
    }
}

struct LoopResult {
    outcome: Outcome,
    steps: usize,
    budget: usize,
    dt: f64,
    rates: GrowthRates,
    state: BeamState,
    halvings: usize,
}

/// Time-stepping integrator for one lattice and RF configuration.
///
/// The equilibrium solver runs once per call to [`Integrator::run`]; growth
/// rates are looked up in the registry at every iteration.
pub struct Integrator<'a, S = RadiationEquilibriumSolver> {
    lattice: &'a LatticeSummary,
    rf: &'a RfConfiguration,
    registry: &'a GrowthRateRegistry,
    solver: S,
}

impl<'a> Integrator<'a> {
    /// Integrator using the radiation-integral equilibrium solver.
    pub fn new(
        lattice: &'a LatticeSummary,
        rf: &'a RfConfiguration,
        registry: &'a GrowthRateRegistry,
    ) -> Self {
        Self {
            lattice,
            rf,
            registry,
            solver: RadiationEquilibriumSolver::default(),
        }
    }
}

impl<'a, S: EquilibriumSolver> Integrator<'a, S> {
    /// Replaces the equilibrium solver.
    pub fn with_solver<T: EquilibriumSolver>(self, solver: T) -> Integrator<'a, T> {
        Integrator {
            lattice: self.lattice,
            rf: self.rf,
            registry: self.registry,
            solver,
        }
    }

    /// Solves the radiation equilibrium and applies a coupling fraction.
    pub fn equilibrium(&self, coupling: f64) -> Result<EquilibriumParameters, IbsError> {
        Ok(self.solver.solve(self.lattice, self.rf)?.with_coupling(coupling))
    }

    /// Runs the integration, tracing progress when `config.debug` is set.
    pub fn run(
        &self,
        config: &IntegrationConfig,
        history: &mut BeamHistory,
    ) -> Result<RunSummary, IbsError> {
        if config.debug {
            self.run_with_reporter(config, history, &mut TracingReporter)
        } else {
            self.run_with_reporter(config, history, &mut NullReporter)
        }
    }

    /// Runs the integration, extending `history` in place.
    ///
    /// `history` must hold exactly one physical seed state. On error the
    /// entries appended before the failure stay in the history.
    pub fn run_with_reporter(
        &self,
        config: &IntegrationConfig,
        history: &mut BeamHistory,
        reporter: &mut dyn Reporter,
    ) -> Result<RunSummary, IbsError> {
        let (resolved, warnings) = config.resolve()?;
        for warning in &warnings {
            reporter.warning(warning);
        }
        self.registry.ensure(resolved.model)?;
        let seed = seed_state(history)?;

        let equilibrium = self.equilibrium(resolved.coupling)?;
        reporter.equilibrium(&equilibrium);

        let stepper = Stepper {
            integrator: self,
            resolved: &resolved,
            equilibrium: &equilibrium,
            estimator: StepSizeEstimator::new(&equilibrium),
        };
        let initial_rates = stepper.rates_at(&seed)?;
        let (result, threshold) = match resolved.stopping {
            ResolvedStopping::Threshold { threshold } => (
                stepper.adaptive(seed, initial_rates, threshold, history, reporter)?,
                Some(threshold),
            ),
            ResolvedStopping::Fixed { steps, step_size } => (
                stepper.fixed(seed, initial_rates, steps, step_size, history, reporter)?,
                None,
            ),
        };

        let summary = RunSummary {
            outcome: result.outcome,
            steps: result.steps,
            step_budget: result.budget,
            model: resolved.model,
            scheme: resolved.scheme,
            coupling: resolved.coupling,
            threshold,
            final_step_size: result.dt,
            equilibrium,
            initial_rates,
            final_rates: result.rates,
            final_state: result.state,
            step_halvings: result.halvings,
            warnings,
            history_hash: stable_hash_string(history)?,
        };
        reporter.finished(&summary);
        Ok(summary)
    }
}

fn seed_state(history: &BeamHistory) -> Result<BeamState, IbsError> {
    if !history.is_aligned() || history.len() != 1 {
        return Err(IbsError::Config(
            ErrorInfo::new("invalid-seed", "history must hold exactly one seed entry")
                .with_context("entries", history.len().to_string()),
        ));
    }
    let seed = history
        .last()
        .ok_or_else(|| seed_error("invalid-seed", "history must hold exactly one seed entry"))?;
    if !seed.is_physical() {
        return Err(IbsError::Config(
            ErrorInfo::new("unphysical-seed", "seed moments must be positive and finite")
                .with_value("ex", seed.ex)
                .with_value("ey", seed.ey)
                .with_value("sigs", seed.sigs)
                .with_value("sige", seed.sige),
        ));
    }
    Ok(seed)
}

fn ensure_physical(state: &BeamState, step: usize) -> Result<(), IbsError> {
    if state.is_physical() {
        return Ok(());
    }
    Err(IbsError::Numerical(
        ErrorInfo::new("unphysical-state", "integration produced a non-positive moment")
            .with_context("step", step.to_string())
            .with_value("t", state.t)
            .with_value("ex", state.ex)
            .with_value("ey", state.ey)
            .with_value("sigs", state.sigs)
            .with_value("sige", state.sige)
            .with_hint("reduce the step size or switch scheme"),
    ))
}

struct Stepper<'r, 'a, S> {
    integrator: &'r Integrator<'a, S>,
    resolved: &'r ResolvedConfig,
    equilibrium: &'r EquilibriumParameters,
    estimator: StepSizeEstimator,
}

impl<'r, 'a, S> Stepper<'r, 'a, S> {
    fn rates_at(&self, state: &BeamState) -> Result<GrowthRates, IbsError> {
        let input = GrowthRateInput {
            state,
            particles: self.resolved.particles,
            lattice: self.integrator.lattice,
            r0: self.equilibrium.r0,
        };
        self.integrator
            .registry
            .evaluate(self.resolved.model, &input)
    }

    fn parameters(
        &self,
        steps: usize,
        tau_max: Option<f64>,
        initial_dt: f64,
        initial_rates: GrowthRates,
    ) -> RunParameters {
        RunParameters {
            model: self.resolved.model,
            scheme: self.resolved.scheme,
            coupling: self.resolved.coupling,
            steps,
            tau_max,
            initial_dt,
            initial_rates,
        }
    }

    fn adaptive(
        &self,
        seed: BeamState,
        initial_rates: GrowthRates,
        threshold: f64,
        history: &mut BeamHistory,
        reporter: &mut dyn Reporter,
    ) -> Result<LoopResult, IbsError> {
        let scheme = self.resolved.scheme;
        let monitor = ConvergenceMonitor::new(threshold);
        let budget = self.estimator.step_budget(&initial_rates);
        let multiplier = scheme.adaptive_multiplier();
        reporter.run_parameters(&self.parameters(
            budget,
            Some(self.estimator.slowest(&initial_rates)),
            self.estimator.adaptive_step(&initial_rates) * multiplier,
            initial_rates,
        ));

        let mut current = seed;
        let mut rates = initial_rates;
        let mut step = 0;
        loop {
            if step > 0 {
                rates = self.rates_at(&current)?;
            }
            let dt = self.estimator.adaptive_step(&rates) * multiplier;
            let next = scheme.advance(&current, &rates, self.equilibrium, dt)?;
            step += 1;
            ensure_physical(&next, step)?;
            history.push(next);
            reporter.progress(&StepProgress {
                step,
                total: budget,
                dt,
                rates,
                state: next,
            });

            let converged = monitor.converged(&current, &next)?;
            current = next;
            let outcome = if converged {
                Some(Outcome::Converged)
            } else if step >= budget {
                Some(Outcome::StepBudgetExhausted)
            } else {
                None
            };
            if let Some(outcome) = outcome {
                return Ok(LoopResult {
                    outcome,
                    steps: step,
                    budget,
                    dt,
                    rates,
                    state: current,
                    halvings: 0,
                });
            }
        }
    }

    fn fixed(
        &self,
        seed: BeamState,
        initial_rates: GrowthRates,
        steps: usize,
        step_size: f64,
        history: &mut BeamHistory,
        reporter: &mut dyn Reporter,
    ) -> Result<LoopResult, IbsError> {
        let scheme = self.resolved.scheme;
        reporter.run_parameters(&self.parameters(steps, None, step_size, initial_rates));

        let mut current = seed;
        let mut rates = initial_rates;
        let mut dt = step_size;
        let mut halvings = 0;
        for step in 1..=steps {
            if step > 1 {
                rates = self.rates_at(&current)?;
            }
            if scheme == Scheme::Relaxation && relaxation_guard(&rates, self.equilibrium) {
                dt /= 2.0;
                halvings += 1;
                reporter.step_halved(step, dt);
            }
            let next = scheme.advance(&current, &rates, self.equilibrium, dt)?;
            ensure_physical(&next, step)?;
            history.push(next);
            reporter.progress(&StepProgress {
                step,
                total: steps,
                dt,
                rates,
                state: next,
            });
            current = next;
        }

        Ok(LoopResult {
            outcome: Outcome::StepsCompleted,
            steps,
            budget: steps,
            dt,
            rates,
            state: current,
            halvings,
        })
    }
}
