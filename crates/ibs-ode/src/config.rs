use std::fmt;
use std::fs;
use std::path::Path;

use ibs_core::errors::{ErrorInfo, IbsError};
use serde::{Deserialize, Serialize};

use crate::convergence::{sanitize_threshold, DEFAULT_THRESHOLD};
use crate::models::IbsModel;
use crate::scheme::Scheme;

fn config_error(code: &str, message: impl Into<String>) -> IbsError {
    IbsError::Config(ErrorInfo::new(code, message))
}

fn default_scheme() -> String {
    Scheme::Derivative.as_str().to_string()
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

/// YAML-configurable parameters of one integration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationConfig {
    /// Growth-rate model identifier in `1..=13`.
    pub model: i64,
    /// Number of particles in the bunch.
    pub particles: f64,
    /// Horizontal to vertical betatron coupling in percent.
    #[serde(default)]
    pub coupling_percentage: i32,
    /// Stepping scheme selector (`rlx` or `der`).
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Termination policy.
    #[serde(default)]
    pub stopping: StoppingPolicy,
    /// Emit progress through the tracing reporter.
    #[serde(default)]
    pub debug: bool,
}

/// How the integration loop terminates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StoppingPolicy {
    /// Adaptive steps until the relative change drops below `threshold` or
    /// the step budget runs out.
    Threshold {
        /// Relative change cutoff, sanitized to `[1e-6, 1]`.
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    /// A fixed number of steps of a caller supplied size.
    Fixed {
        /// Number of steps to take.
        steps: usize,
        /// Step size (s).
        step_size: f64,
    },
}

impl Default for StoppingPolicy {
    fn default() -> Self {
        StoppingPolicy::Threshold {
            threshold: default_threshold(),
        }
    }
}

/// Non-fatal adjustment applied while resolving a configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ConfigWarning {
    /// Unknown scheme selector replaced by the derivative scheme.
    SchemeDefaulted {
        /// Selector as supplied.
        requested: String,
    },
    /// Threshold outside `[1e-6, 1]` replaced by the default.
    ThresholdClamped {
        /// Threshold as supplied.
        requested: f64,
        /// Threshold used instead.
        applied: f64,
    },
    /// Coupling outside `[0, 100]` replaced by zero.
    CouplingClamped {
        /// Percentage as supplied.
        requested: i32,
    },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::SchemeDefaulted { requested } => {
                write!(f, "unknown scheme '{requested}', using derivative")
            }
            ConfigWarning::ThresholdClamped { requested, applied } => write!(
                f,
                "threshold {requested:e} outside [1e-6, 1], using {applied:e}"
            ),
            ConfigWarning::CouplingClamped { requested } => {
                write!(f, "coupling {requested}% outside [0, 100], using 0")
            }
        }
    }
}

/// Stopping policy after sanitization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ResolvedStopping {
    /// Adaptive run with a valid threshold.
    Threshold {
        /// Relative change cutoff.
        threshold: f64,
    },
    /// Fixed run with a positive finite step size.
    Fixed {
        /// Number of steps.
        steps: usize,
        /// Initial step size (s).
        step_size: f64,
    },
}

/// Configuration with every selector resolved and every value sanitized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    /// Growth-rate model.
    pub model: IbsModel,
    /// Number of particles in the bunch.
    pub particles: f64,
    /// Coupling fraction in `[0, 1]`.
    pub coupling: f64,
    /// Stepping scheme.
    pub scheme: Scheme,
    /// Termination policy.
    pub stopping: ResolvedStopping,
    /// Whether debug tracing was requested.
    pub debug: bool,
}

impl IntegrationConfig {
    /// Adaptive-threshold configuration.
    pub fn adaptive(model: i64, particles: f64, coupling_percentage: i32, threshold: f64) -> Self {
        Self {
            model,
            particles,
            coupling_percentage,
            scheme: default_scheme(),
            stopping: StoppingPolicy::Threshold { threshold },
            debug: false,
        }
    }

    /// Fixed-step configuration.
    pub fn fixed(
        model: i64,
        particles: f64,
        coupling_percentage: i32,
        steps: usize,
        step_size: f64,
    ) -> Self {
        Self {
            model,
            particles,
            coupling_percentage,
            scheme: default_scheme(),
            stopping: StoppingPolicy::Fixed { steps, step_size },
            debug: false,
        }
    }

    /// Sets the scheme selector.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Sets the debug flag.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Parses a configuration from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, IbsError> {
        serde_yaml::from_str(text).map_err(|err| {
            IbsError::Serde(
                ErrorInfo::new("config-parse", "invalid integration config")
                    .with_hint(err.to_string()),
            )
        })
    }

    /// Loads a YAML configuration from disk.
    pub fn load(path: &Path) -> Result<Self, IbsError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            IbsError::Serde(
                ErrorInfo::new("config-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        serde_yaml::from_str(&contents).map_err(|err| {
            IbsError::Serde(
                ErrorInfo::new("config-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    /// Validates hard errors and sanitizes recoverable ones.
    ///
    /// Unknown schemes, out of range thresholds and out of range coupling
    /// percentages are replaced and reported as warnings. An unknown model,
    /// a non-positive particle count or an invalid fixed step size fail.
    pub fn resolve(&self) -> Result<(ResolvedConfig, Vec<ConfigWarning>), IbsError> {
        let model = IbsModel::from_id(self.model)?;
        if !(self.particles.is_finite() && self.particles > 0.0) {
            return Err(IbsError::Config(
                ErrorInfo::new("invalid-particles", "particle count must be positive")
                    .with_value("particles", self.particles),
            ));
        }

        let mut warnings = Vec::new();
        let scheme = Scheme::parse(&self.scheme).unwrap_or_else(|| {
            warnings.push(ConfigWarning::SchemeDefaulted {
                requested: self.scheme.clone(),
            });
            Scheme::Derivative
        });

        let coupling = if (0..=100).contains(&self.coupling_percentage) {
            f64::from(self.coupling_percentage) / 100.0
        } else {
            warnings.push(ConfigWarning::CouplingClamped {
                requested: self.coupling_percentage,
            });
            0.0
        };

        let stopping = match self.stopping {
            StoppingPolicy::Threshold { threshold } => {
                let (applied, clamped) = sanitize_threshold(threshold);
                if clamped {
                    warnings.push(ConfigWarning::ThresholdClamped {
                        requested: threshold,
                        applied,
                    });
                }
                ResolvedStopping::Threshold { threshold: applied }
            }
            StoppingPolicy::Fixed { steps, step_size } => {
                if !(step_size.is_finite() && step_size > 0.0) {
                    return Err(config_error(
                        "invalid-step-size",
                        format!("fixed step size must be positive and finite, got {step_size}"),
                    ));
                }
                ResolvedStopping::Fixed { steps, step_size }
            }
        };

        Ok((
            ResolvedConfig {
                model,
                particles: self.particles,
                coupling,
                scheme,
                stopping,
                debug: self.debug,
            },
            warnings,
        ))
    }
}
