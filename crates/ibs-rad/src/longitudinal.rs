use std::f64::consts::PI;

use ibs_core::constants::{CLIGHT, GEV, TWO_PI};
use ibs_core::errors::{ErrorInfo, IbsError};
use ibs_core::RfConfiguration;
use serde::{Deserialize, Serialize};

const PHASE_SCAN_POINTS: usize = 3600;
const MAX_BISECTIONS: usize = 200;

/// Revolution timing of the reference particle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Revolution {
    /// Revolution period (s).
    pub t_rev: f64,
    /// Revolution frequency (Hz).
    pub f_rev: f64,
    /// Revolution angular frequency (rad/s).
    pub omega0: f64,
}

/// Relativistic beta for the given gamma.
pub fn beta_from_gamma(gamma: f64) -> f64 {
    (1.0 - 1.0 / (gamma * gamma)).sqrt()
}

/// Slip factor `η = 1/γ_tr² − 1/γ²`.
pub fn slip_factor(gamma: f64, gamma_tr: f64) -> f64 {
    1.0 / (gamma_tr * gamma_tr) - 1.0 / (gamma * gamma)
}

/// Revolution period, frequency and angular frequency for a ring of
/// circumference `length` (m).
pub fn revolution(length: f64, beta: f64) -> Revolution {
    let t_rev = length / (beta * CLIGHT);
    let f_rev = 1.0 / t_rev;
    Revolution {
        t_rev,
        f_rev,
        omega0: TWO_PI * f_rev,
    }
}

/// Synchrotron radiation energy loss per turn (eV),
/// `U0 = (2/3) r0 γ⁴ mc² I2`.
pub fn energy_loss_per_turn(gamma: f64, mass: f64, r0: f64, i2: f64) -> f64 {
    2.0 / 3.0 * r0 * gamma.powi(4) * mass * GEV * i2
}

fn base_harmonic(rf: &RfConfiguration) -> Result<f64, IbsError> {
    rf.harmonics.first().copied().ok_or_else(|| {
        IbsError::Lattice(ErrorInfo::new("no-rf", "at least one RF system is required"))
    })
}

fn gain_at(phi: f64, charge: f64, rf: &RfConfiguration, h0: f64) -> f64 {
    charge.abs()
        * rf
            .systems()
            .map(|(harmonic, voltage)| voltage * (harmonic / h0 * phi).sin())
            .sum::<f64>()
}

fn slope_at(phi: f64, charge: f64, rf: &RfConfiguration, h0: f64) -> f64 {
    charge.abs()
        * rf
            .systems()
            .map(|(harmonic, voltage)| voltage * harmonic / h0 * (harmonic / h0 * phi).cos())
            .sum::<f64>()
}

/// Energy gained per turn (eV) by a particle at RF phase `phi`, with the
/// phase of every system scaled by its harmonic relative to the first one.
pub fn rf_energy_gain(phi: f64, charge: f64, rf: &RfConfiguration) -> Result<f64, IbsError> {
    Ok(gain_at(phi, charge, rf, base_harmonic(rf)?))
}

fn bisect(f: impl Fn(f64) -> f64, mut lo: f64, mut hi: f64, tolerance: f64) -> f64 {
    let mut f_lo = f(lo);
    for _ in 0..MAX_BISECTIONS {
        if (hi - lo).abs() <= tolerance {
            break;
        }
        let mid = 0.5 * (lo + hi);
        let f_mid = f(mid);
        if f_mid == 0.0 {
            return mid;
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Finds the stable synchronous phase (rad) in `[0, π]` where the RF energy
/// gain balances the radiation loss `u0` (eV).
///
/// A root is stable when `η · dV/dφ < 0`. Roots are scanned from zero phase
/// upwards and the first stable one is refined by bisection to `tolerance`.
pub fn synchronous_phase(
    u0: f64,
    charge: f64,
    rf: &RfConfiguration,
    eta: f64,
    tolerance: f64,
) -> Result<f64, IbsError> {
    let h0 = base_harmonic(rf)?;
    let balance = |phi: f64| gain_at(phi, charge, rf, h0) - u0;
    let stable = |phi: f64| eta * slope_at(phi, charge, rf, h0) < 0.0;

    let mut prev_phi = 0.0;
    let mut prev = balance(prev_phi);
    if prev == 0.0 && stable(prev_phi) {
        return Ok(prev_phi);
    }
    for step in 1..=PHASE_SCAN_POINTS {
        let phi = PI * step as f64 / PHASE_SCAN_POINTS as f64;
        let value = balance(phi);
        if value == 0.0 {
            if stable(phi) {
                return Ok(phi);
            }
        } else if prev != 0.0 && prev.signum() != value.signum() {
            let root = bisect(balance, prev_phi, phi, tolerance);
            if stable(root) {
                return Ok(root);
            }
        }
        prev_phi = phi;
        prev = value;
    }

    let peak: f64 = charge.abs() * rf.voltages.iter().map(|v| v.abs()).sum::<f64>();
    Err(IbsError::Lattice(
        ErrorInfo::new(
            "no-synchronous-phase",
            "no stable RF phase balances the radiation loss",
        )
        .with_value("u0_ev", u0)
        .with_value("peak_gain_ev", peak)
        .with_hint("raise the RF voltage or check the sign of the slip factor"),
    ))
}

/// Synchrotron tune from the RF bucket curvature at the synchronous phase,
/// `Qs² = −η |q| Σ h_k V_k cos(h_k/h_0 φs) / (2π β² E)` with `E` in eV.
pub fn synchrotron_tune(
    charge: f64,
    rf: &RfConfiguration,
    phi_s: f64,
    eta: f64,
    beta: f64,
    energy: f64,
) -> Result<f64, IbsError> {
    let h0 = base_harmonic(rf)?;
    let curvature: f64 = charge.abs()
        * rf
            .systems()
            .map(|(harmonic, voltage)| harmonic * voltage * (harmonic / h0 * phi_s).cos())
            .sum::<f64>();
    let radicand = -eta * curvature / (TWO_PI * beta * beta * energy);
    if !(radicand.is_finite() && radicand > 0.0) {
        return Err(IbsError::Lattice(
            ErrorInfo::new("unstable-bucket", "RF bucket has no focusing at the synchronous phase")
                .with_value("phi_s", phi_s)
                .with_value("eta", eta),
        ));
    }
    Ok(radicand.sqrt())
}

/// Bunch length (m) matched to the energy spread `sige` in the RF bucket,
/// `σs = β c |η| σE / Ωs`.
pub fn sigs_from_sige(sige: f64, gamma: f64, gamma_tr: f64, omega_s: f64) -> f64 {
    let beta = beta_from_gamma(gamma);
    let eta = slip_factor(gamma, gamma_tr);
    beta * CLIGHT * eta.abs() * sige / omega_s
}

/// Inverse of [`sigs_from_sige`].
pub fn sige_from_sigs(sigs: f64, gamma: f64, gamma_tr: f64, omega_s: f64) -> f64 {
    let beta = beta_from_gamma(gamma);
    let eta = slip_factor(gamma, gamma_tr);
    sigs * omega_s / (beta * CLIGHT * eta.abs())
}
