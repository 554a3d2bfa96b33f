#![allow(dead_code)]

use std::collections::BTreeMap;
use std::f64::consts::PI;

use ibs_core::constants::ELECTRON_MASS;
use ibs_core::{ElementIntegrals, LatticeSummary, RfConfiguration, TwissTable};

pub const DIPOLES: usize = 40;
pub const DIPOLE_LENGTH: f64 = 2.0;
pub const ENERGY_GEV: f64 = 3.0;

pub fn bend_angle() -> f64 {
    2.0 * PI / DIPOLES as f64
}

pub fn bending_radius() -> f64 {
    DIPOLE_LENGTH / bend_angle()
}

pub fn header() -> BTreeMap<String, f64> {
    let gamma = ENERGY_GEV / ELECTRON_MASS;
    [
        ("GAMMA", gamma),
        ("PC", ENERGY_GEV),
        ("GAMMATR", 1.0 / 1.0e-3_f64.sqrt()),
        ("MASS", ELECTRON_MASS),
        ("CHARGE", -1.0),
        ("Q1", 18.2),
        ("LENGTH", 500.0),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect()
}

pub fn dipole_integrals() -> ElementIntegrals {
    let theta = bend_angle();
    let l = DIPOLE_LENGTH;
    ElementIntegrals {
        i1: 0.5 / DIPOLES as f64,
        i2: theta * theta / l,
        i3: theta.powi(3) / (l * l),
        i4x: 0.0,
        i4y: 0.0,
        i5x: 3.75e-5 / DIPOLES as f64,
        i5y: 3.75e-7 / DIPOLES as f64,
    }
}

/// 3 GeV electron ring of 500 m with forty identical sector bends.
pub fn storage_ring() -> LatticeSummary {
    LatticeSummary::from_header(&header(), TwissTable::new())
        .unwrap()
        .with_radiation(vec![dipole_integrals(); DIPOLES])
}

pub fn single_cavity() -> RfConfiguration {
    RfConfiguration::single(833.0, 2.0e6).unwrap()
}
