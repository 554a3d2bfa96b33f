#![deny(missing_docs)]
#![doc = "Core traits and beam data types for the IBS equilibrium integrator."]

pub mod constants;
pub mod errors;
mod types;

pub use errors::{ErrorInfo, IbsError};
pub use types::{
    BeamState, ElementIntegrals, EquilibriumParameters, GrowthRates, LatticeSummary,
    LongitudinalParameters, PartitionNumbers, RadiationIntegrals, RfConfiguration, TwissTable,
};

/// Everything a growth-rate model may read when evaluating one beam state.
#[derive(Debug, Clone, Copy)]
pub struct GrowthRateInput<'a> {
    /// Beam state at which the rates are evaluated.
    pub state: &'a BeamState,
    /// Number of particles in the bunch.
    pub particles: f64,
    /// Lattice summary including the per-element twiss table.
    pub lattice: &'a LatticeSummary,
    /// Classical radius of the beam particle (m).
    pub r0: f64,
}

/// Contract for an IBS growth-rate formula.
///
/// Implementations must be pure with respect to their input so that runs can
/// be executed concurrently by callers. Rates are returned ordered
/// (longitudinal, horizontal, vertical).
pub trait GrowthRateModel: Send + Sync {
    /// Evaluates the growth rates at the provided state.
    fn growth_rates(&self, input: &GrowthRateInput<'_>) -> Result<GrowthRates, IbsError>;
}

impl<F> GrowthRateModel for F
where
    F: Fn(&GrowthRateInput<'_>) -> Result<GrowthRates, IbsError> + Send + Sync,
{
    fn growth_rates(&self, input: &GrowthRateInput<'_>) -> Result<GrowthRates, IbsError> {
        self(input)
    }
}

/// Contract for the pre-loop radiation equilibrium computation.
pub trait EquilibriumSolver {
    /// Computes damping times, natural equilibria and synchrotron frequency.
    ///
    /// The returned parameters carry zero coupling; callers apply the run's
    /// coupling with [`EquilibriumParameters::with_coupling`].
    fn solve(
        &self,
        lattice: &LatticeSummary,
        rf: &RfConfiguration,
    ) -> Result<EquilibriumParameters, IbsError>;
}
