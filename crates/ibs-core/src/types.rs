use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, IbsError};

fn lattice_error(code: &str, message: impl Into<String>) -> IbsError {
    IbsError::Lattice(ErrorInfo::new(code, message))
}

/// Beam moments at one instant of the integration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeamState {
    /// Elapsed time (s).
    pub t: f64,
    /// Horizontal emittance (m rad).
    pub ex: f64,
    /// Vertical emittance (m rad).
    pub ey: f64,
    /// Bunch length (m).
    pub sigs: f64,
    /// Relative energy spread.
    pub sige: f64,
    /// Cached square of the energy spread.
    pub sige2: f64,
}

impl BeamState {
    /// Creates a state and caches `sige²`.
    pub fn new(t: f64, ex: f64, ey: f64, sigs: f64, sige: f64) -> Self {
        Self {
            t,
            ex,
            ey,
            sigs,
            sige,
            sige2: sige * sige,
        }
    }

    /// Returns true when every moment is finite and ex, ey, sigs, sige are
    /// strictly positive.
    pub fn is_physical(&self) -> bool {
        self.t.is_finite()
            && [self.ex, self.ey, self.sigs, self.sige]
                .iter()
                .all(|value| value.is_finite() && *value > 0.0)
    }
}

/// IBS growth rates (1/s) evaluated at a single beam state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthRates {
    /// Longitudinal growth rate `aes`.
    pub longitudinal: f64,
    /// Horizontal growth rate `aex`.
    pub horizontal: f64,
    /// Vertical growth rate `aey`.
    pub vertical: f64,
}

impl GrowthRates {
    /// Creates rates ordered (longitudinal, horizontal, vertical).
    pub fn new(longitudinal: f64, horizontal: f64, vertical: f64) -> Self {
        Self {
            longitudinal,
            horizontal,
            vertical,
        }
    }

    /// Rates that leave the beam to radiation damping alone.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Returns the rates as `[aes, aex, aey]`.
    pub fn as_array(&self) -> [f64; 3] {
        [self.longitudinal, self.horizontal, self.vertical]
    }

    /// Returns true when all three rates are finite.
    pub fn is_finite(&self) -> bool {
        self.as_array().iter().all(|rate| rate.is_finite())
    }
}

impl From<[f64; 3]> for GrowthRates {
    fn from(rates: [f64; 3]) -> Self {
        Self::new(rates[0], rates[1], rates[2])
    }
}

/// Per-element contribution to the synchrotron radiation integrals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementIntegrals {
    /// `∫ Dx/ρ ds`.
    pub i1: f64,
    /// `∫ 1/ρ² ds`.
    pub i2: f64,
    /// `∫ 1/|ρ|³ ds`.
    pub i3: f64,
    /// `∫ Dx/ρ (1/ρ² + 2k) ds`.
    pub i4x: f64,
    /// Vertical counterpart of `i4x`.
    #[serde(default)]
    pub i4y: f64,
    /// `∫ Hx/|ρ|³ ds`.
    pub i5x: f64,
    /// `∫ Hy/|ρ|³ ds`.
    #[serde(default)]
    pub i5y: f64,
}

/// Ring-wide radiation integrals, the sum of all element contributions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RadiationIntegrals {
    /// Momentum compaction integral.
    pub i1: f64,
    /// Energy loss integral.
    pub i2: f64,
    /// Energy spread excitation integral.
    pub i3: f64,
    /// Horizontal damping partition integral.
    pub i4x: f64,
    /// Vertical damping partition integral.
    pub i4y: f64,
    /// Horizontal quantum excitation integral.
    pub i5x: f64,
    /// Vertical quantum excitation integral.
    pub i5y: f64,
}

impl RadiationIntegrals {
    /// Sums per-element contributions.
    pub fn sum<'a>(elements: impl IntoIterator<Item = &'a ElementIntegrals>) -> Self {
        elements
            .into_iter()
            .fold(Self::default(), |mut acc, element| {
                acc.i1 += element.i1;
                acc.i2 += element.i2;
                acc.i3 += element.i3;
                acc.i4x += element.i4x;
                acc.i4y += element.i4y;
                acc.i5x += element.i5x;
                acc.i5y += element.i5y;
                acc
            })
    }
}

/// Column oriented per-element lattice table (MAD-X twiss layout).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TwissTable {
    columns: BTreeMap<String, Vec<f64>>,
}

impl TwissTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a column. Column names are stored upper case.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) -> &mut Self {
        self.columns.insert(name.into().to_uppercase(), values);
        self
    }

    /// Builder variant of [`TwissTable::insert`].
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.insert(name, values);
        self
    }

    /// Returns the named column.
    pub fn column(&self, name: &str) -> Result<&[f64], IbsError> {
        self.columns
            .get(&name.to_uppercase())
            .map(Vec::as_slice)
            .ok_or_else(|| {
                IbsError::Lattice(
                    ErrorInfo::new("missing-twiss-column", "twiss table lacks a required column")
                        .with_context("column", name),
                )
            })
    }

    /// Returns true when the named column is present.
    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(&name.to_uppercase())
    }

    /// Number of rows, taken as the shortest column.
    pub fn len(&self) -> usize {
        self.columns.values().map(Vec::len).min().unwrap_or(0)
    }

    /// Returns true when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over the column names.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

/// Scalar machine parameters plus per-element lattice data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatticeSummary {
    /// Relativistic gamma.
    pub gamma: f64,
    /// Momentum times c (GeV).
    pub pc: f64,
    /// Transition gamma.
    pub gamma_tr: f64,
    /// Particle rest energy (GeV).
    pub mass: f64,
    /// Particle charge in units of e.
    pub charge: f64,
    /// Horizontal betatron tune.
    pub q1: f64,
    /// Ring circumference (m).
    pub length: f64,
    /// Per-element radiation integral contributions.
    #[serde(default)]
    pub radiation: Vec<ElementIntegrals>,
    /// Per-element twiss data consumed by lattice-resolved growth-rate models.
    #[serde(default)]
    pub twiss: TwissTable,
}

impl LatticeSummary {
    /// Header keys required by [`LatticeSummary::from_header`].
    pub const HEADER_KEYS: [&'static str; 7] =
        ["GAMMA", "PC", "GAMMATR", "MASS", "CHARGE", "Q1", "LENGTH"];

    /// Builds a summary from a twiss header map keyed by MAD-X names.
    pub fn from_header(header: &BTreeMap<String, f64>, twiss: TwissTable) -> Result<Self, IbsError> {
        let fetch = |key: &str| -> Result<f64, IbsError> {
            let value = header.get(key).copied().ok_or_else(|| {
                IbsError::Lattice(
                    ErrorInfo::new("missing-header-key", "twiss header lacks a required key")
                        .with_context("key", key),
                )
            })?;
            if !value.is_finite() {
                return Err(IbsError::Lattice(
                    ErrorInfo::new("non-finite-header", "twiss header value is not finite")
                        .with_context("key", key),
                ));
            }
            Ok(value)
        };
        Ok(Self {
            gamma: fetch("GAMMA")?,
            pc: fetch("PC")?,
            gamma_tr: fetch("GAMMATR")?,
            mass: fetch("MASS")?,
            charge: fetch("CHARGE")?,
            q1: fetch("Q1")?,
            length: fetch("LENGTH")?,
            radiation: Vec::new(),
            twiss,
        })
    }

    /// Attaches per-element radiation integrals.
    pub fn with_radiation(mut self, radiation: Vec<ElementIntegrals>) -> Self {
        self.radiation = radiation;
        self
    }

    /// Sums the per-element radiation integrals.
    pub fn radiation_integrals(&self) -> RadiationIntegrals {
        RadiationIntegrals::sum(&self.radiation)
    }

    /// Total particle energy (GeV).
    pub fn energy(&self) -> f64 {
        self.gamma * self.mass
    }

    /// Checks the scalar parameters needed for the equilibrium computation.
    pub fn validate(&self) -> Result<(), IbsError> {
        if !(self.gamma.is_finite() && self.gamma > 1.0) {
            return Err(IbsError::Lattice(
                ErrorInfo::new("invalid-gamma", "relativistic gamma must exceed 1")
                    .with_value("gamma", self.gamma),
            ));
        }
        if !(self.length.is_finite() && self.length > 0.0) {
            return Err(lattice_error("invalid-length", "ring length must be positive"));
        }
        if !(self.mass.is_finite() && self.mass > 0.0) {
            return Err(lattice_error("invalid-mass", "particle mass must be positive"));
        }
        if !self.charge.is_finite() || self.charge == 0.0 {
            return Err(lattice_error("invalid-charge", "particle charge must be non-zero"));
        }
        if !(self.gamma_tr.is_finite() && self.gamma_tr > 0.0) {
            return Err(lattice_error(
                "invalid-gamma-tr",
                "transition gamma must be positive",
            ));
        }
        Ok(())
    }
}

/// RF systems as index aligned harmonic numbers and voltages (V).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfConfiguration {
    /// Harmonic number of each RF system.
    pub harmonics: Vec<f64>,
    /// Peak voltage of each RF system (V).
    pub voltages: Vec<f64>,
}

impl RfConfiguration {
    /// Creates and validates an RF configuration.
    pub fn new(harmonics: Vec<f64>, voltages: Vec<f64>) -> Result<Self, IbsError> {
        let rf = Self {
            harmonics,
            voltages,
        };
        rf.validate()?;
        Ok(rf)
    }

    /// Single RF system convenience constructor.
    pub fn single(harmonic: f64, voltage: f64) -> Result<Self, IbsError> {
        Self::new(vec![harmonic], vec![voltage])
    }

    /// Number of RF systems (`nrf`).
    pub fn len(&self) -> usize {
        self.harmonics.len()
    }

    /// Returns true when no RF system is configured.
    pub fn is_empty(&self) -> bool {
        self.harmonics.is_empty()
    }

    /// Iterates over `(harmonic, voltage)` pairs.
    pub fn systems(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.harmonics
            .iter()
            .copied()
            .zip(self.voltages.iter().copied())
    }

    /// Checks that the arrays are non-empty, aligned and finite.
    pub fn validate(&self) -> Result<(), IbsError> {
        if self.harmonics.is_empty() {
            return Err(lattice_error("no-rf", "at least one RF system is required"));
        }
        if self.harmonics.len() != self.voltages.len() {
            return Err(IbsError::Lattice(
                ErrorInfo::new("rf-misaligned", "harmonic and voltage arrays differ in length")
                    .with_context("harmonics", self.harmonics.len().to_string())
                    .with_context("voltages", self.voltages.len().to_string()),
            ));
        }
        for (idx, (harmonic, voltage)) in self.systems().enumerate() {
            if !(harmonic.is_finite() && harmonic > 0.0) || !voltage.is_finite() {
                return Err(IbsError::Lattice(
                    ErrorInfo::new("invalid-rf-system", "RF harmonic must be positive and voltage finite")
                        .with_context("index", idx.to_string()),
                ));
            }
        }
        Ok(())
    }
}

/// Damping partition numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartitionNumbers {
    /// Horizontal partition number.
    pub jx: f64,
    /// Vertical partition number.
    pub jy: f64,
    /// Longitudinal partition number.
    pub js: f64,
}

/// Longitudinal and revolution quantities derived alongside the equilibrium.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LongitudinalParameters {
    /// Relativistic gamma copied from the lattice.
    pub gamma: f64,
    /// Transition gamma copied from the lattice.
    pub gamma_tr: f64,
    /// Relativistic beta.
    pub beta: f64,
    /// Slip factor.
    pub eta: f64,
    /// Revolution period (s).
    pub t_rev: f64,
    /// Revolution frequency (Hz).
    pub f_rev: f64,
    /// Revolution angular frequency (rad/s).
    pub omega0: f64,
    /// Radiation energy loss per turn (eV).
    pub u0: f64,
    /// Synchronous phase (rad).
    pub phi_s: f64,
    /// Synchrotron tune.
    pub qs: f64,
    /// Synchrotron angular frequency (rad/s).
    pub omega_s: f64,
}

/// Radiation equilibrium targets and timescales, fixed for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquilibriumParameters {
    /// Horizontal amplitude damping time (s).
    pub tau_x: f64,
    /// Vertical amplitude damping time (s).
    pub tau_y: f64,
    /// Longitudinal amplitude damping time (s).
    pub tau_s: f64,
    /// Natural horizontal equilibrium emittance.
    pub ex0: f64,
    /// Natural vertical equilibrium emittance from radiation alone.
    pub ey0: f64,
    /// Vertical target including betatron coupling.
    pub ey0_coupled: f64,
    /// Coupling fraction used for `ey0_coupled`.
    pub coupling: f64,
    /// Equilibrium energy spread squared.
    pub sige2: f64,
    /// Equilibrium bunch length at infinite time (m).
    pub sigs_inf: f64,
    /// Classical radius of the beam particle (m).
    pub r0: f64,
    /// Damping partition numbers.
    pub partition: PartitionNumbers,
    /// Summed radiation integrals.
    pub integrals: RadiationIntegrals,
    /// Longitudinal quantities.
    pub longitudinal: LongitudinalParameters,
}

impl EquilibriumParameters {
    /// Applies a coupling fraction, setting
    /// `ey0_coupled = max(coupling * ex0, ey0)`.
    pub fn with_coupling(mut self, coupling: f64) -> Self {
        self.coupling = coupling;
        self.ey0_coupled = (coupling * self.ex0).max(self.ey0);
        self
    }

    /// Equilibrium energy spread.
    pub fn sige0(&self) -> f64 {
        self.sige2.sqrt()
    }

    /// Synchrotron angular frequency (rad/s).
    pub fn omega_s(&self) -> f64 {
        self.longitudinal.omega_s
    }

    /// Damping times ordered `(τ_x, τ_y, τ_s)`.
    pub fn damping_times(&self) -> [f64; 3] {
        [self.tau_x, self.tau_y, self.tau_s]
    }
}
