//! Physical constants in SI units, with particle energies in GeV.

use std::f64::consts::PI;

/// Speed of light (m/s).
pub const CLIGHT: f64 = 299_792_458.0;

/// Electron rest energy (GeV).
pub const ELECTRON_MASS: f64 = 0.510_998_950e-3;

/// Proton rest energy (GeV).
pub const PROTON_MASS: f64 = 0.938_272_088_16;

/// Classical electron radius (m).
pub const ELECTRON_RADIUS: f64 = 2.817_940_326_2e-15;

/// Reduced Planck constant times the speed of light (GeV m).
pub const HBAR_C: f64 = 1.973_269_804e-16;

/// Conversion factor between GeV and eV.
pub const GEV: f64 = 1.0e9;

/// Electron to proton mass ratio.
pub const ELECTRON_PROTON_RATIO: f64 = ELECTRON_MASS / PROTON_MASS;

/// Classical radius of a particle with charge `charge` (units of e) and rest
/// energy `mass` (GeV), scaled from the electron radius.
pub fn classical_radius(charge: f64, mass: f64) -> f64 {
    charge * charge * ELECTRON_RADIUS * ELECTRON_MASS / mass
}

/// Quantum excitation constant `Cq = 55 ħc / (32 √3 mc²)` (m) for a particle
/// of rest energy `mass` (GeV).
pub fn quantum_constant(mass: f64) -> f64 {
    55.0 / (32.0 * 3.0_f64.sqrt()) * HBAR_C / mass
}

/// Full turn in radians.
pub const TWO_PI: f64 = 2.0 * PI;
