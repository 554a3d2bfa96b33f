#![deny(missing_docs)]
#![doc = "Time-stepping integrator for beam emittances, bunch length and energy spread under radiation damping, quantum excitation and intrabeam scattering."]

//! A run starts from a single seed state, solves the radiation equilibrium
//! once, then advances the moments with the relaxation or derivative scheme
//! until the relative change drops below a threshold, the adaptive step
//! budget runs out, or a fixed number of steps has been taken.

/// YAML configuration schema, defaults and sanitization.
pub mod config;
/// Termination predicate of adaptive runs.
pub mod convergence;
/// Stable hashing helpers for run fingerprints.
pub mod hash;
/// Parallel column beam history with CSV export.
pub mod history;
/// Integrator kernel and run summaries.
pub mod kernel;
/// Model identifiers and the growth-rate registry.
pub mod models;
/// Diagnostic reporters.
pub mod report;
/// Relaxation and derivative stepping schemes.
pub mod scheme;
/// Step size and step budget derivation.
pub mod step;

pub use config::{
    ConfigWarning, IntegrationConfig, ResolvedConfig, ResolvedStopping, StoppingPolicy,
};
pub use convergence::ConvergenceMonitor;
pub use hash::stable_hash_string;
pub use history::BeamHistory;
pub use kernel::{Integrator, Outcome, RunSummary};
pub use models::{constant_registry, ConstantRates, GrowthRateRegistry, IbsModel};
pub use report::{NullReporter, Reporter, RunParameters, StepProgress, TracingReporter};
pub use scheme::Scheme;
pub use step::{StepSizeEstimator, MAX_STEPS};
