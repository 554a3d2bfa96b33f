#![deny(missing_docs)]
#![doc = "Radiation damping equilibria, radiation integrals and longitudinal beam dynamics used before an IBS integration starts."]

/// Default equilibrium solver.
pub mod equilibrium;
/// Revolution, RF bucket and bunch-length relations.
pub mod longitudinal;
/// Radiation integrals and damping partition numbers.
pub mod radiation;

pub use equilibrium::RadiationEquilibriumSolver;
pub use longitudinal::{
    beta_from_gamma, energy_loss_per_turn, revolution, rf_energy_gain, sige_from_sigs,
    sigs_from_sige, slip_factor, synchronous_phase, synchrotron_tune, Revolution,
};
pub use radiation::{element_integrals_from_twiss, partition_numbers};
