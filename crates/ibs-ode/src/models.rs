use std::collections::BTreeMap;
use std::fmt;

use ibs_core::errors::{ErrorInfo, IbsError};
use ibs_core::{GrowthRateInput, GrowthRateModel, GrowthRates};
use serde::{Deserialize, Serialize};

fn unsupported_model(model: impl fmt::Display) -> IbsError {
    IbsError::Model(
        ErrorInfo::new("unsupported-model", "no growth-rate implementation for model")
            .with_context("model", model.to_string()),
    )
}

/// IBS growth-rate formulas addressable by their numeric model identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IbsModel {
    /// Piwinski in the smooth lattice approximation (id 1).
    PiwinskiSmooth,
    /// Piwinski evaluated element by element (id 2).
    PiwinskiLattice,
    /// Piwinski lattice with the modified dispersion invariant (id 3).
    PiwinskiLatticeModified,
    /// Nagaitsev (id 4).
    Nagaitsev,
    /// Nagaitsev with Coulomb logarithm tail cut (id 5).
    NagaitsevTailCut,
    /// MAD-X high energy approximation (id 6).
    Madx,
    /// MAD-X with tail cut (id 7).
    MadxTailCut,
    /// Bjorken-Mtingwa, alternative integration (id 8).
    BjorkenMtingwa2,
    /// Bjorken-Mtingwa (id 9).
    BjorkenMtingwa,
    /// Bjorken-Mtingwa with tail cut (id 10).
    BjorkenMtingwaTailCut,
    /// Conte-Martini (id 11).
    ConteMartini,
    /// Conte-Martini with tail cut (id 12).
    ConteMartiniTailCut,
    /// Full MAD-X IBS routine (id 13).
    MadxIbs,
}

impl IbsModel {
    /// Every model, ordered by identifier.
    pub const ALL: [IbsModel; 13] = [
        IbsModel::PiwinskiSmooth,
        IbsModel::PiwinskiLattice,
        IbsModel::PiwinskiLatticeModified,
        IbsModel::Nagaitsev,
        IbsModel::NagaitsevTailCut,
        IbsModel::Madx,
        IbsModel::MadxTailCut,
        IbsModel::BjorkenMtingwa2,
        IbsModel::BjorkenMtingwa,
        IbsModel::BjorkenMtingwaTailCut,
        IbsModel::ConteMartini,
        IbsModel::ConteMartiniTailCut,
        IbsModel::MadxIbs,
    ];

    /// Resolves a numeric model identifier in `1..=13`.
    pub fn from_id(id: i64) -> Result<Self, IbsError> {
        match id {
            1..=13 => Ok(Self::ALL[id as usize - 1]),
            _ => Err(unsupported_model(id)),
        }
    }

    /// Numeric identifier of the model.
    pub fn id(self) -> u8 {
        self as u8 + 1
    }

    /// Stable kebab-case name.
    pub fn name(self) -> &'static str {
        match self {
            IbsModel::PiwinskiSmooth => "piwinski-smooth",
            IbsModel::PiwinskiLattice => "piwinski-lattice",
            IbsModel::PiwinskiLatticeModified => "piwinski-lattice-modified",
            IbsModel::Nagaitsev => "nagaitsev",
            IbsModel::NagaitsevTailCut => "nagaitsev-tail-cut",
            IbsModel::Madx => "madx",
            IbsModel::MadxTailCut => "madx-tail-cut",
            IbsModel::BjorkenMtingwa2 => "bjorken-mtingwa2",
            IbsModel::BjorkenMtingwa => "bjorken-mtingwa",
            IbsModel::BjorkenMtingwaTailCut => "bjorken-mtingwa-tail-cut",
            IbsModel::ConteMartini => "conte-martini",
            IbsModel::ConteMartiniTailCut => "conte-martini-tail-cut",
            IbsModel::MadxIbs => "madx-ibs",
        }
    }
}

impl fmt::Display for IbsModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.id())
    }
}

/// Lookup table from model identifier to growth-rate implementation.
///
/// The integrator consults the same registry for the initial rates and for
/// every iteration, so a run always uses one formula throughout.
#[derive(Default)]
pub struct GrowthRateRegistry {
    models: BTreeMap<IbsModel, Box<dyn GrowthRateModel>>,
}

impl GrowthRateRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the implementation of `model`.
    pub fn register(&mut self, model: IbsModel, implementation: impl GrowthRateModel + 'static) {
        self.models.insert(model, Box::new(implementation));
    }

    /// Registers a closure, letting the compiler infer its signature.
    pub fn register_fn<F>(&mut self, model: IbsModel, rates: F)
    where
        F: Fn(&GrowthRateInput<'_>) -> Result<GrowthRates, IbsError> + Send + Sync + 'static,
    {
        self.register(model, rates);
    }

    /// Builder variant of [`GrowthRateRegistry::register`].
    pub fn with(mut self, model: IbsModel, implementation: impl GrowthRateModel + 'static) -> Self {
        self.register(model, implementation);
        self
    }

    /// Returns true when `model` has an implementation.
    pub fn contains(&self, model: IbsModel) -> bool {
        self.models.contains_key(&model)
    }

    /// Registered models in identifier order.
    pub fn models(&self) -> impl Iterator<Item = IbsModel> + '_ {
        self.models.keys().copied()
    }

    /// Fails with `unsupported-model` when `model` is not registered.
    pub fn ensure(&self, model: IbsModel) -> Result<(), IbsError> {
        if self.contains(model) {
            Ok(())
        } else {
            Err(unsupported_model(model))
        }
    }

    /// Evaluates `model` and rejects non-finite rates.
    pub fn evaluate(
        &self,
        model: IbsModel,
        input: &GrowthRateInput<'_>,
    ) -> Result<GrowthRates, IbsError> {
        let implementation = self
            .models
            .get(&model)
            .ok_or_else(|| unsupported_model(model))?;
        let rates = implementation.growth_rates(input)?;
        if !rates.is_finite() {
            return Err(IbsError::Numerical(
                ErrorInfo::new("non-finite-growth-rate", "growth-rate model returned a non-finite value")
                    .with_context("model", model.to_string())
                    .with_value("aes", rates.longitudinal)
                    .with_value("aex", rates.horizontal)
                    .with_value("aey", rates.vertical)
                    .with_value("t", input.state.t),
            ));
        }
        Ok(rates)
    }
}

impl fmt::Debug for GrowthRateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrowthRateRegistry")
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Growth-rate model returning the same triple for every state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstantRates(pub GrowthRates);

impl GrowthRateModel for ConstantRates {
    fn growth_rates(&self, _input: &GrowthRateInput<'_>) -> Result<GrowthRates, IbsError> {
        Ok(self.0)
    }
}

/// Registry mapping every model identifier to [`ConstantRates`].
///
/// Handy for dry runs and for exercising the integrator without a physics
/// backend.
pub fn constant_registry(rates: GrowthRates) -> GrowthRateRegistry {
    IbsModel::ALL
        .iter()
        .fold(GrowthRateRegistry::new(), |registry, &model| {
            registry.with(model, ConstantRates(rates))
        })
}
