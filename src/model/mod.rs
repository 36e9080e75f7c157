//! Power-prediction models
//!
//! Every model family fits a least-squares regression over the fixed feature
//! space {airspeed, vertical speed, mass}; families differ in the regressors
//! they derive from those features and in how they transform the target.
//! Callers only ever see [`PowerPredictor::predict`], so evaluation and
//! forecasting never special-case a family.

pub mod least_squares;
pub mod trainer;

pub use trainer::*;

use crate::error::{ForecastError, Result};
use crate::features::FeatureVector;
use crate::types::FlightId;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Anything that maps a feature vector to instantaneous power [W].
///
/// Implementations must be pure: the same input always yields the same output.
pub trait PowerPredictor {
    fn predict(&self, features: &FeatureVector) -> f64;

    /// Whether samples of this flight were used to fit the predictor.
    /// Evaluating such a flight is reported as leakage.
    fn trained_on(&self, _flight_id: FlightId) -> bool {
        false
    }
}

impl<P: PowerPredictor + ?Sized> PowerPredictor for &P {
    fn predict(&self, features: &FeatureVector) -> f64 {
        (**self).predict(features)
    }

    fn trained_on(&self, flight_id: FlightId) -> bool {
        (**self).trained_on(flight_id)
    }
}

const MAX_TERMS: usize = 4;

/// Regression families available to the trainer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum ModelFamily {
    /// Training-set mean power, ignores the features
    #[cfg_attr(feature = "serde", serde(rename = "mean", alias = "mean-power"))]
    MeanPower,
    /// `P = b0 + b1 * airspeed + b2 * vertical_speed + b3 * mass`
    Linear,
    /// Regression on `P^(2/3)` with mass and speed-squared terms scaled by `mass^(2/3)`
    #[default]
    PowerLaw,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 3] = [ModelFamily::MeanPower, ModelFamily::Linear, ModelFamily::PowerLaw];

    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::MeanPower => "mean",
            ModelFamily::Linear => "linear",
            ModelFamily::PowerLaw => "power-law",
        }
    }

    /// Names of the fitted coefficients, intercept first
    pub fn term_names(&self) -> &'static [&'static str] {
        match self {
            ModelFamily::MeanPower => &["mean_power"],
            ModelFamily::Linear => &["intercept", "airspeed", "vertical_speed", "mass"],
            ModelFamily::PowerLaw => &[
                "intercept",
                "mass",
                "airspeed_factor",
                "vertical_speed_factor",
            ],
        }
    }

    pub fn term_count(&self) -> usize {
        self.term_names().len()
    }

    /// Fewest training samples the family accepts
    pub fn min_samples(&self) -> usize {
        self.term_count()
    }

    /// Design-matrix row for one sample; only the first `term_count()` entries are used
    fn design_row(&self, f: &FeatureVector) -> [f64; MAX_TERMS] {
        match self {
            ModelFamily::MeanPower => [1.0, 0.0, 0.0, 0.0],
            ModelFamily::Linear => [1.0, f.airspeed, f.vertical_speed, f.mass],
            ModelFamily::PowerLaw => {
                let mass_factor = f.mass.powf(2.0 / 3.0);
                [
                    1.0,
                    f.mass,
                    f.airspeed * f.airspeed * mass_factor,
                    f.vertical_speed * f.vertical_speed * mass_factor,
                ]
            }
        }
    }

    /// Power [W] → regression target
    fn transform_power(&self, power: f64) -> f64 {
        match self {
            ModelFamily::PowerLaw => signed_pow(power, 2.0 / 3.0),
            _ => power,
        }
    }

    /// Regression output → power [W]
    fn retransform_power(&self, indicator: f64) -> f64 {
        match self {
            ModelFamily::PowerLaw => signed_pow(indicator, 1.5),
            _ => indicator,
        }
    }

    /// Fit this family to a training set.
    ///
    /// Fails with `InsufficientData` when the set holds fewer samples than
    /// [`min_samples`](Self::min_samples) or the solve does not converge to
    /// finite coefficients.
    pub fn fit(&self, training: &TrainingSet) -> Result<FittedModel> {
        let samples = training.len();
        let required = self.min_samples();
        if samples < required {
            return Err(ForecastError::InsufficientData { samples, required });
        }

        let cols = self.term_count();
        let mut rows = Vec::with_capacity(samples * cols);
        let mut targets = Vec::with_capacity(samples);
        for (features, power) in training.iter() {
            rows.extend_from_slice(&self.design_row(features)[..cols]);
            targets.push(self.transform_power(power));
        }

        let beta = least_squares::solve(&rows, cols, &targets)
            .ok_or(ForecastError::InsufficientData { samples, required })?;

        let coefficients = self
            .term_names()
            .iter()
            .zip(beta)
            .map(|(name, value)| Coefficient {
                name: (*name).to_string(),
                value,
            })
            .collect();

        tracing::debug!(family = self.name(), samples, "model fitted");

        Ok(FittedModel {
            family: *self,
            coefficients,
            training_samples: samples,
            training_flights: training.flight_ids().clone(),
        })
    }
}

/// `sign(x) * |x|^exponent`, keeping negative power negative
fn signed_pow(x: f64, exponent: f64) -> f64 {
    x.signum() * x.abs().powf(exponent)
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelFamily {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" | "mean-power" | "baseline" => Ok(ModelFamily::MeanPower),
            "linear" => Ok(ModelFamily::Linear),
            "power-law" | "powerlaw" | "final" => Ok(ModelFamily::PowerLaw),
            other => Err(ForecastError::Parse(format!("unknown model family '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coefficient {
    pub name: String,
    pub value: f64,
}

/// Immutable result of [`ModelFamily::fit`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FittedModel {
    family: ModelFamily,
    coefficients: Vec<Coefficient>,
    training_samples: usize,
    training_flights: BTreeSet<FlightId>,
}

impl FittedModel {
    pub fn family(&self) -> ModelFamily {
        self.family
    }

    pub fn coefficients(&self) -> &[Coefficient] {
        &self.coefficients
    }

    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.coefficients.iter().find(|c| c.name == name).map(|c| c.value)
    }

    pub fn training_samples(&self) -> usize {
        self.training_samples
    }

    /// Flights that contributed samples to the fit
    pub fn training_flights(&self) -> &BTreeSet<FlightId> {
        &self.training_flights
    }
}

impl PowerPredictor for FittedModel {
    fn predict(&self, features: &FeatureVector) -> f64 {
        let row = self.family.design_row(features);
        let indicator: f64 = self
            .coefficients
            .iter()
            .zip(row.iter())
            .map(|(c, x)| c.value * x)
            .sum();
        self.family.retransform_power(indicator)
    }

    fn trained_on(&self, flight_id: FlightId) -> bool {
        self.training_flights.contains(&flight_id)
    }
}
