use crate::error::{ErrorKind, ForecastError};
use crate::types::FlightId;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pipeline stage at which a flight dropped out of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Stage {
    Filter,
    Training,
    Evaluation,
    Forecast,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Filter => "filter",
            Stage::Training => "training",
            Stage::Evaluation => "evaluation",
            Stage::Forecast => "forecast",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A flight left out of one stage, with the reason
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SkippedFlight {
    pub flight_id: FlightId,
    pub stage: Stage,
    pub kind: ErrorKind,
    pub message: String,
}

impl SkippedFlight {
    pub fn new(flight_id: FlightId, stage: Stage, error: &ForecastError) -> Self {
        Self {
            flight_id,
            stage,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Error metrics for one evaluated flight
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlightEvaluation {
    pub flight_id: FlightId,
    /// False when the flight was also part of the training set
    pub held_out: bool,
    pub samples: usize,
    /// Mean absolute error of instantaneous power [W]
    pub power_mae: f64,
    /// Root-mean-square error of instantaneous power [W]
    pub power_rmse: f64,
    /// Measured energy over the flight [J]
    pub energy_actual: f64,
    /// Predicted energy over the flight [J]
    pub energy_predicted: f64,
    /// `energy_predicted - energy_actual` [J]
    pub energy_error: f64,
    /// Absolute percentage error of total energy, `None` if no energy was measured
    pub energy_ape: Option<f64>,
    /// Mean absolute error of per-interval energy [J]
    pub interval_energy_mae: f64,
    /// Percentage error of per-interval energy over intervals with non-zero
    /// measured energy
    pub interval_energy_mape: Option<f64>,
    /// Coefficient of determination of per-interval energy
    pub interval_energy_r2: Option<f64>,
    /// Mean absolute gap between the cumulative energy curves [J]
    pub cumulative_energy_mae: f64,
    /// Percentage error of cumulative energy, take-off zero excluded
    pub cumulative_energy_mape: Option<f64>,
    pub cumulative_energy_r2: Option<f64>,
}

/// Metrics pooled across held-out flights
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AggregateMetrics {
    pub flights: usize,
    pub samples: usize,
    pub power_mae: f64,
    pub power_rmse: f64,
    pub energy_mae: f64,
    pub energy_rmse: f64,
    pub mean_energy_ape: Option<f64>,
}

/// Result of scoring a model against a set of flights
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EvaluationReport {
    pub flights: Vec<FlightEvaluation>,
    /// Computed over held-out flights only; `None` when there are none
    pub aggregate: Option<AggregateMetrics>,
    /// Flights evaluated although they were used for training
    pub leaked: Vec<FlightId>,
    pub skipped: Vec<SkippedFlight>,
}

impl EvaluationReport {
    pub fn flight(&self, flight_id: FlightId) -> Option<&FlightEvaluation> {
        self.flights.iter().find(|f| f.flight_id == flight_id)
    }

    pub fn has_leakage(&self) -> bool {
        !self.leaked.is_empty()
    }
}

/// Predicted power and running energy at one sample
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ForecastPoint {
    pub time: f64,
    /// Predicted power [W]
    pub power: f64,
    /// Cumulative energy since the first sample [J]
    pub energy: f64,
}

/// Power/energy forecast for one flight
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlightForecast {
    pub flight_id: FlightId,
    pub points: Vec<ForecastPoint>,
    /// Total predicted energy [J]
    pub total_energy: f64,
}

impl FlightForecast {
    pub fn duration_seconds(&self) -> f64 {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => last.time - first.time,
            _ => 0.0,
        }
    }

    /// Mean predicted power over the flight [W]
    pub fn mean_power(&self) -> f64 {
        let duration = self.duration_seconds();
        if duration > 0.0 {
            self.total_energy / duration
        } else {
            0.0
        }
    }
}
