use ibs_core::errors::{ErrorInfo, IbsError};
use ibs_core::BeamState;
use serde::{Deserialize, Serialize};

/// Smallest accepted convergence threshold.
pub const MIN_THRESHOLD: f64 = 1e-6;
/// Largest accepted convergence threshold.
pub const MAX_THRESHOLD: f64 = 1.0;
/// Threshold substituted for out-of-range requests.
pub const DEFAULT_THRESHOLD: f64 = 1e-4;

/// Returns the threshold to use and whether the request was replaced.
pub fn sanitize_threshold(requested: f64) -> (f64, bool) {
    if (MIN_THRESHOLD..=MAX_THRESHOLD).contains(&requested) {
        (requested, false)
    } else {
        (DEFAULT_THRESHOLD, true)
    }
}

fn relative_change(name: &str, previous: f64, current: f64) -> Result<f64, IbsError> {
    if previous.is_nan() || previous <= 0.0 {
        return Err(IbsError::Numerical(
            ErrorInfo::new("degenerate-state", "relative change against a non-positive value")
                .with_context("quantity", name)
                .with_value("previous", previous),
        ));
    }
    Ok(((current - previous) / previous).abs())
}

/// Termination predicate of the adaptive run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceMonitor {
    threshold: f64,
}

impl ConvergenceMonitor {
    /// Creates a monitor. The threshold is expected to be sanitized.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Active threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Relative changes of `(ex, ey, sigs)` between two consecutive states.
    pub fn relative_changes(
        &self,
        previous: &BeamState,
        current: &BeamState,
    ) -> Result<[f64; 3], IbsError> {
        Ok([
            relative_change("ex", previous.ex, current.ex)?,
            relative_change("ey", previous.ey, current.ey)?,
            relative_change("sigs", previous.sigs, current.sigs)?,
        ])
    }

    /// True once every relative change is at or below the threshold.
    pub fn converged(&self, previous: &BeamState, current: &BeamState) -> Result<bool, IbsError> {
        let changes = self.relative_changes(previous, current)?;
        Ok(changes.iter().all(|change| *change <= self.threshold))
    }
}
