use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::WriterBuilder;
use ibs_core::errors::{ErrorInfo, IbsError};
use ibs_core::{BeamState, EquilibriumParameters};
use ibs_rad::sige_from_sigs;
use serde::{Deserialize, Serialize};

fn wrap_csv(code: &str, err: csv::Error) -> IbsError {
    IbsError::Serde(ErrorInfo::new(code, "CSV history export failure").with_hint(err.to_string()))
}

const CSV_HEADER: [&str; 4] = ["t", "ex", "ey", "sigs"];

#[derive(Serialize)]
struct CsvRow {
    t: f64,
    ex: f64,
    ey: f64,
    sigs: f64,
}

/// Append-only time series of beam moments stored as parallel columns.
///
/// Entry 0 is the seed supplied by the caller. The integrator only ever
/// appends, so every column shares one length after a run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BeamHistory {
    t: Vec<f64>,
    ex: Vec<f64>,
    ey: Vec<f64>,
    sigs: Vec<f64>,
    sige: Vec<f64>,
    sige2: Vec<f64>,
}

impl BeamHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a history holding a single seed state.
    pub fn seeded(seed: BeamState) -> Self {
        let mut history = Self::new();
        history.push(seed);
        history
    }

    /// Seeds a history from an emittance pair and a bunch length, deriving
    /// the energy spread from the RF bucket of `equilibrium`.
    pub fn seeded_from_bunch_length(
        ex: f64,
        ey: f64,
        sigs: f64,
        equilibrium: &EquilibriumParameters,
    ) -> Self {
        let long = &equilibrium.longitudinal;
        let sige = sige_from_sigs(sigs, long.gamma, long.gamma_tr, long.omega_s);
        Self::seeded(BeamState::new(0.0, ex, ey, sigs, sige))
    }

    /// Builds a history from caller owned columns. `sige²` is derived.
    ///
    /// Columns of unequal length are accepted here; the integrator rejects
    /// them when the history is used as a seed.
    pub fn from_columns(
        t: Vec<f64>,
        ex: Vec<f64>,
        ey: Vec<f64>,
        sigs: Vec<f64>,
        sige: Vec<f64>,
    ) -> Self {
        let sige2 = sige.iter().map(|value| value * value).collect();
        Self {
            t,
            ex,
            ey,
            sigs,
            sige,
            sige2,
        }
    }

    /// Appends a state to every column.
    pub fn push(&mut self, state: BeamState) {
        self.t.push(state.t);
        self.ex.push(state.ex);
        self.ey.push(state.ey);
        self.sigs.push(state.sigs);
        self.sige.push(state.sige);
        self.sige2.push(state.sige2);
    }

    fn column_lengths(&self) -> [usize; 6] {
        [
            self.t.len(),
            self.ex.len(),
            self.ey.len(),
            self.sigs.len(),
            self.sige.len(),
            self.sige2.len(),
        ]
    }

    /// Number of complete entries, the shortest column length.
    pub fn len(&self) -> usize {
        self.column_lengths().into_iter().min().unwrap_or(0)
    }

    /// Returns true when no complete entry exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true when every column has the same length.
    pub fn is_aligned(&self) -> bool {
        let lengths = self.column_lengths();
        lengths.iter().all(|len| *len == lengths[0])
    }

    /// Entry at `index`.
    pub fn get(&self, index: usize) -> Option<BeamState> {
        if index >= self.len() {
            return None;
        }
        Some(BeamState {
            t: self.t[index],
            ex: self.ex[index],
            ey: self.ey[index],
            sigs: self.sigs[index],
            sige: self.sige[index],
            sige2: self.sige2[index],
        })
    }

    /// Most recent complete entry.
    pub fn last(&self) -> Option<BeamState> {
        self.len().checked_sub(1).and_then(|index| self.get(index))
    }

    /// Iterates over complete entries in order.
    pub fn iter(&self) -> impl Iterator<Item = BeamState> + '_ {
        (0..self.len()).filter_map(move |index| self.get(index))
    }

    /// Time column (s).
    pub fn t(&self) -> &[f64] {
        &self.t
    }

    /// Horizontal emittance column.
    pub fn ex(&self) -> &[f64] {
        &self.ex
    }

    /// Vertical emittance column.
    pub fn ey(&self) -> &[f64] {
        &self.ey
    }

    /// Bunch length column (m).
    pub fn sigs(&self) -> &[f64] {
        &self.sigs
    }

    /// Energy spread column.
    pub fn sige(&self) -> &[f64] {
        &self.sige
    }

    /// Cached energy spread squared.
    pub fn sige2(&self) -> &[f64] {
        &self.sige2
    }

    /// Writes `t,ex,ey,sigs` rows to `writer`, one per complete entry.
    ///
    /// The header comes from the row type; an empty history still gets one.
    pub fn to_csv_writer<W: Write>(&self, writer: W) -> Result<(), IbsError> {
        let mut writer = WriterBuilder::new().from_writer(writer);
        if self.is_empty() {
            writer
                .write_record(CSV_HEADER)
                .map_err(|err| wrap_csv("history-write-header", err))?;
        }
        for index in 0..self.len() {
            writer
                .serialize(CsvRow {
                    t: self.t[index],
                    ex: self.ex[index],
                    ey: self.ey[index],
                    sigs: self.sigs[index],
                })
                .map_err(|err| wrap_csv("history-write-row", err))?;
        }
        writer
            .flush()
            .map_err(|err| wrap_csv("history-flush", err.into()))
    }

    /// Writes the history as CSV to `path`.
    pub fn write_csv(&self, path: &Path) -> Result<(), IbsError> {
        let file = File::create(path).map_err(|err| {
            IbsError::Serde(
                ErrorInfo::new("history-create", "failed to create CSV file")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        self.to_csv_writer(BufWriter::new(file)).map_err(|err| match err {
            IbsError::Serde(info) => {
                IbsError::Serde(info.with_context("path", path.display().to_string()))
            }
            other => other,
        })
    }
}
