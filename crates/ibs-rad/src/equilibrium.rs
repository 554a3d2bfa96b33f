use ibs_core::constants::{classical_radius, quantum_constant, GEV};
use ibs_core::errors::{ErrorInfo, IbsError};
use ibs_core::{
    EquilibriumParameters, EquilibriumSolver, LatticeSummary, LongitudinalParameters,
    RfConfiguration,
};
use serde::{Deserialize, Serialize};

use crate::longitudinal::{
    beta_from_gamma, energy_loss_per_turn, revolution, sigs_from_sige, slip_factor,
    synchronous_phase, synchrotron_tune,
};
use crate::radiation::partition_numbers;

fn default_phase_tolerance() -> f64 {
    1e-9
}

/// Equilibrium solver driven by the lattice radiation integrals and the RF
/// configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadiationEquilibriumSolver {
    /// Bisection tolerance (rad) for the synchronous phase.
    #[serde(default = "default_phase_tolerance")]
    pub phase_tolerance: f64,
}

impl Default for RadiationEquilibriumSolver {
    fn default() -> Self {
        Self {
            phase_tolerance: default_phase_tolerance(),
        }
    }
}

impl EquilibriumSolver for RadiationEquilibriumSolver {
    fn solve(
        &self,
        lattice: &LatticeSummary,
        rf: &RfConfiguration,
    ) -> Result<EquilibriumParameters, IbsError> {
        lattice.validate()?;
        rf.validate()?;

        let gamma = lattice.gamma;
        let beta = beta_from_gamma(gamma);
        let r0 = classical_radius(lattice.charge, lattice.mass);
        let rev = revolution(lattice.length, beta);
        let eta = slip_factor(gamma, lattice.gamma_tr);
        if eta.abs() < f64::EPSILON {
            return Err(IbsError::Lattice(
                ErrorInfo::new("transition-energy", "beam sits at transition, slip factor is zero")
                    .with_value("gamma", gamma)
                    .with_value("gamma_tr", lattice.gamma_tr),
            ));
        }

        let integrals = lattice.radiation_integrals();
        if !(integrals.i2.is_finite() && integrals.i2 > 0.0) {
            return Err(IbsError::Lattice(
                ErrorInfo::new("no-bending", "radiation integral I2 must be positive")
                    .with_context("elements", lattice.radiation.len().to_string()),
            ));
        }

        let u0 = energy_loss_per_turn(gamma, lattice.mass, r0, integrals.i2);
        let phi_s = synchronous_phase(u0, lattice.charge, rf, eta, self.phase_tolerance)?;
        let energy = lattice.energy() * GEV;
        let qs = synchrotron_tune(lattice.charge, rf, phi_s, eta, beta, energy)?;
        let omega_s = qs * rev.omega0;

        let partition = partition_numbers(&integrals)?;
        let damping_time = |j: f64| 2.0 * energy * rev.t_rev / (j * u0);

        let scale = quantum_constant(lattice.mass) * gamma * gamma / integrals.i2;
        let ex0 = scale * integrals.i5x / partition.jx;
        let ey0 = scale * integrals.i5y / partition.jy;
        let sige2 = scale * integrals.i3 / partition.js;
        let sigs_inf = sigs_from_sige(sige2.sqrt(), gamma, lattice.gamma_tr, omega_s);

        Ok(EquilibriumParameters {
            tau_x: damping_time(partition.jx),
            tau_y: damping_time(partition.jy),
            tau_s: damping_time(partition.js),
            ex0,
            ey0,
            ey0_coupled: ey0,
            coupling: 0.0,
            sige2,
            sigs_inf,
            r0,
            partition,
            integrals,
            longitudinal: LongitudinalParameters {
                gamma,
                gamma_tr: lattice.gamma_tr,
                beta,
                eta,
                t_rev: rev.t_rev,
                f_rev: rev.f_rev,
                omega0: rev.omega0,
                u0,
                phi_s,
                qs,
                omega_s,
            },
        })
    }
}
