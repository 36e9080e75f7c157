//! End-to-end run: filter → train → evaluate → forecast

use crate::config::RunConfig;
use crate::error::Result;
use crate::evaluate::evaluate;
use crate::forecast::forecast_all;
use crate::model::{FittedModel, ModelFamily, TrainingSet};
use crate::pool::FlightPool;
use crate::types::{EvaluationReport, FlightForecast, FlightId, SkippedFlight, Stage};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Everything a run produced, handed to the reporting layer
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunReport {
    pub model: FittedModel,
    pub training_flights: Vec<FlightId>,
    pub training_samples: usize,
    pub evaluation: EvaluationReport,
    pub forecasts: Vec<FlightForecast>,
    /// Flights dropped at any stage, in stage order. Evaluation skips live
    /// here, `evaluation.skipped` is left empty.
    pub skipped: Vec<SkippedFlight>,
}

impl RunReport {
    pub fn skipped_at(&self, stage: Stage) -> impl Iterator<Item = &SkippedFlight> {
        self.skipped.iter().filter(move |s| s.stage == stage)
    }

    pub fn forecast(&self, flight_id: FlightId) -> Option<&FlightForecast> {
        self.forecasts.iter().find(|f| f.flight_id == flight_id)
    }
}

/// Owns the loaded flights and the chosen model family
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    pool: FlightPool,
    family: ModelFamily,
}

impl ForecastEngine {
    pub fn new(pool: FlightPool, family: ModelFamily) -> Self {
        Self { pool, family }
    }

    pub fn pool(&self) -> &FlightPool {
        &self.pool
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    /// Training pool for a run: admitted by the filters, minus every test
    /// and forecast flight
    pub fn training_pool(&self, config: &RunConfig) -> (FlightPool, Vec<SkippedFlight>) {
        let (admitted, unresolved) = self.pool.partition(&config.filters);
        (admitted.exclude(&config.reserved_ids()), unresolved)
    }

    /// Fit a model on the run's training pool.
    ///
    /// Fails with `InsufficientData` when the pool yields too few samples,
    /// including the case of no eligible flights at all.
    pub fn train(&self, config: &RunConfig) -> Result<(FittedModel, TrainingSet, Vec<SkippedFlight>)> {
        let (training_pool, mut skipped) = self.training_pool(config);
        tracing::info!(
            flights = training_pool.len(),
            pool = self.pool.len(),
            "training pool selected"
        );

        let (training_set, extraction_skipped) = TrainingSet::from_flights(training_pool.iter().map(|f| f.as_ref()));
        skipped.extend(extraction_skipped);

        let model = self.family.fit(&training_set)?;
        tracing::info!(
            family = self.family.name(),
            samples = training_set.len(),
            flights = training_set.flight_ids().len(),
            "model trained"
        );

        Ok((model, training_set, skipped))
    }

    /// Execute a full run with the given filters, test IDs and forecast IDs
    pub fn run(&self, config: &RunConfig) -> Result<RunReport> {
        let (model, training_set, mut skipped) = self.train(config)?;

        let (test_flights, unknown_tests) = self.pool.select(&config.test_ids, Stage::Evaluation);
        let mut evaluation = evaluate(&model, test_flights.iter().map(|f| f.as_ref()));
        // Run-level list is the only copy of evaluation skips
        skipped.extend(std::mem::take(&mut evaluation.skipped));
        skipped.extend(unknown_tests);

        if let Some(aggregate) = &evaluation.aggregate {
            tracing::info!(
                flights = aggregate.flights,
                power_mae = aggregate.power_mae,
                energy_mae = aggregate.energy_mae,
                "evaluation complete"
            );
        }

        let (forecast_flights, unknown_forecasts) = self.pool.select(&config.forecast_ids, Stage::Forecast);
        let (forecasts, forecast_skipped) = forecast_all(&model, forecast_flights.iter().map(|f| f.as_ref()));
        skipped.extend(unknown_forecasts);
        skipped.extend(forecast_skipped);

        Ok(RunReport {
            training_flights: training_set.flight_ids().iter().copied().collect(),
            training_samples: training_set.len(),
            model,
            evaluation,
            forecasts,
            skipped,
        })
    }

    /// Score a model against arbitrary flights, including ones it was fitted
    /// on. Those are flagged as leaked in the report.
    pub fn evaluate_with(&self, model: &FittedModel, ids: &[FlightId]) -> EvaluationReport {
        let (flights, unknown) = self.pool.select(ids, Stage::Evaluation);
        let mut report = evaluate(model, flights.iter().map(|f| f.as_ref()));
        report.skipped.extend(unknown);
        report
    }
}
