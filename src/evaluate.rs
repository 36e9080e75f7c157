//! Scoring a fitted model against flights with measured power
//!
//! Each flight is scored on its own: instantaneous power errors per sample,
//! then energy errors after integrating both series over the flight's time
//! base, per interval and cumulatively. A flight the model was fitted on is
//! still scored but marked as not held out and kept out of the aggregate.

use crate::error::{ForecastError, Result};
use crate::features::{extract_all, FlightRole};
use crate::integration::{cumulative_energy, interval_energy};
use crate::model::PowerPredictor;
use crate::types::{AggregateMetrics, EvaluationReport, FlightEvaluation, FlightRecord, SkippedFlight, Stage};

/// Score one flight.
///
/// Fails with `IncompleteRecord` when electrical columns are missing and with
/// `NotEvaluable` when fewer than two complete samples remain.
pub fn evaluate_flight<P: PowerPredictor>(model: &P, flight: &FlightRecord) -> Result<FlightEvaluation> {
    let vectors = extract_all(flight, FlightRole::Evaluation)?;
    if vectors.len() < 2 {
        return Err(ForecastError::NotEvaluable {
            flight_id: flight.id(),
            valid_samples: vectors.len(),
        });
    }

    let n = vectors.len();
    let time: Vec<f64> = vectors.iter().map(|v| v.time).collect();
    let actual: Vec<f64> = vectors.iter().map(|v| v.power_target.unwrap_or(f64::NAN)).collect();
    let predicted: Vec<f64> = vectors.iter().map(|v| model.predict(v)).collect();

    let (abs_sum, sq_sum) = actual
        .iter()
        .zip(&predicted)
        .fold((0.0, 0.0), |(abs, sq), (a, p)| {
            let e = p - a;
            (abs + e.abs(), sq + e * e)
        });

    let step_actual = interval_energy(&time, &actual);
    let step_predicted = interval_energy(&time, &predicted);
    let cum_actual = cumulative_energy(&time, &actual);
    let cum_predicted = cumulative_energy(&time, &predicted);
    let energy_actual = cum_actual.last().copied().unwrap_or(0.0);
    let energy_predicted = cum_predicted.last().copied().unwrap_or(0.0);
    let energy_error = energy_predicted - energy_actual;

    let energy_ape = if energy_actual != 0.0 {
        Some(energy_error.abs() / energy_actual.abs() * 100.0)
    } else {
        None
    };

    Ok(FlightEvaluation {
        flight_id: flight.id(),
        held_out: !model.trained_on(flight.id()),
        samples: n,
        power_mae: abs_sum / n as f64,
        power_rmse: (sq_sum / n as f64).sqrt(),
        energy_actual,
        energy_predicted,
        energy_error,
        energy_ape,
        interval_energy_mae: mean_absolute_error(&step_actual, &step_predicted),
        interval_energy_mape: mean_absolute_percentage_error(&step_actual, &step_predicted),
        interval_energy_r2: r_squared(&step_actual, &step_predicted),
        cumulative_energy_mae: mean_absolute_error(&cum_actual, &cum_predicted),
        cumulative_energy_mape: mean_absolute_percentage_error(&cum_actual, &cum_predicted),
        cumulative_energy_r2: r_squared(&cum_actual, &cum_predicted),
    })
}

fn mean_absolute_error(observed: &[f64], predicted: &[f64]) -> f64 {
    if observed.is_empty() {
        return 0.0;
    }
    observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| (o - p).abs())
        .sum::<f64>()
        / observed.len() as f64
}

/// Percent error averaged over entries with a non-zero observation;
/// `None` when every observation is zero
fn mean_absolute_percentage_error(observed: &[f64], predicted: &[f64]) -> Option<f64> {
    let ratios: Vec<f64> = observed
        .iter()
        .zip(predicted)
        .filter(|(o, _)| **o != 0.0)
        .map(|(o, p)| ((o - p) / o).abs())
        .collect();
    if ratios.is_empty() {
        return None;
    }
    Some(ratios.iter().sum::<f64>() / ratios.len() as f64 * 100.0)
}

/// Coefficient of determination; `None` when the observed series is constant
fn r_squared(observed: &[f64], predicted: &[f64]) -> Option<f64> {
    if observed.is_empty() {
        return None;
    }
    let mean = observed.iter().sum::<f64>() / observed.len() as f64;
    let ss_tot: f64 = observed.iter().map(|o| (o - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return None;
    }
    let ss_res: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| (o - p).powi(2))
        .sum();
    Some(1.0 - ss_res / ss_tot)
}

/// Pool metrics over held-out flights
pub fn aggregate(flights: &[FlightEvaluation]) -> Option<AggregateMetrics> {
    let held_out: Vec<&FlightEvaluation> = flights.iter().filter(|f| f.held_out).collect();
    if held_out.is_empty() {
        return None;
    }

    let count = held_out.len() as f64;
    let samples: usize = held_out.iter().map(|f| f.samples).sum();
    let abs_sum: f64 = held_out.iter().map(|f| f.power_mae * f.samples as f64).sum();
    let sq_sum: f64 = held_out
        .iter()
        .map(|f| f.power_rmse * f.power_rmse * f.samples as f64)
        .sum();

    let apes: Vec<f64> = held_out.iter().filter_map(|f| f.energy_ape).collect();
    let mean_energy_ape = if apes.is_empty() {
        None
    } else {
        Some(apes.iter().sum::<f64>() / apes.len() as f64)
    };

    Some(AggregateMetrics {
        flights: held_out.len(),
        samples,
        power_mae: abs_sum / samples as f64,
        power_rmse: (sq_sum / samples as f64).sqrt(),
        energy_mae: held_out.iter().map(|f| f.energy_error.abs()).sum::<f64>() / count,
        energy_rmse: (held_out.iter().map(|f| f.energy_error.powi(2)).sum::<f64>() / count).sqrt(),
        mean_energy_ape,
    })
}

/// Score a model against a list of flights.
///
/// Flights the model reports as [`trained_on`](PowerPredictor::trained_on)
/// are flagged as leaked. Per-flight failures are collected in the report.
pub fn evaluate<'a, P, I>(model: &P, flights: I) -> EvaluationReport
where
    P: PowerPredictor,
    I: IntoIterator<Item = &'a FlightRecord>,
{
    let mut report = EvaluationReport::default();

    for flight in flights {
        match evaluate_flight(model, flight) {
            Ok(evaluation) => {
                tracing::debug!(
                    flight = flight.id(),
                    power_mae = evaluation.power_mae,
                    energy_error = evaluation.energy_error,
                    "flight evaluated"
                );
                if !evaluation.held_out {
                    tracing::warn!(
                        flight = flight.id(),
                        "flight was used for training; its metrics are not a generalization estimate"
                    );
                    report.leaked.push(flight.id());
                }
                report.flights.push(evaluation);
            }
            Err(err) => {
                tracing::warn!(flight = flight.id(), "flight not evaluated: {}", err);
                report
                    .skipped
                    .push(SkippedFlight::new(flight.id(), Stage::Evaluation, &err));
            }
        }
    }

    report.aggregate = aggregate(&report.flights);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;
    use crate::types::{Column, FlightId};
    use crate::ErrorKind;
    use std::collections::{BTreeMap, BTreeSet};

    struct Constant(f64);

    impl PowerPredictor for Constant {
        fn predict(&self, _: &FeatureVector) -> f64 {
            self.0
        }
    }

    /// Constant predictor that claims to have been fitted on some flights
    struct Fitted {
        power: f64,
        flights: BTreeSet<FlightId>,
    }

    impl PowerPredictor for Fitted {
        fn predict(&self, _: &FeatureVector) -> f64 {
            self.power
        }

        fn trained_on(&self, flight_id: FlightId) -> bool {
            self.flights.contains(&flight_id)
        }
    }

    fn flight(id: FlightId, time: Vec<f64>, current: Vec<f64>) -> FlightRecord {
        let n = time.len();
        let mut columns = BTreeMap::new();
        columns.insert(Column::VxAnemometer, vec![2.0; n]);
        columns.insert(Column::VyAnemometer, vec![0.0; n]);
        columns.insert(Column::VzImu, vec![0.0; n]);
        columns.insert(Column::TotalMass, vec![3680.0; n]);
        columns.insert(Column::Voltage, vec![10.0; n]);
        columns.insert(Column::Current, current);
        FlightRecord::new(id, time, columns).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_perfect_model_has_zero_error() {
        let f = flight(1, vec![0.0, 1.0, 2.0], vec![1.0, 1.0, 1.0]);
        let eval = evaluate_flight(&Constant(10.0), &f).unwrap();
        assert!(eval.held_out);
        assert_eq!(eval.samples, 3);
        assert_eq!(eval.power_mae, 0.0);
        assert_eq!(eval.power_rmse, 0.0);
        assert_eq!(eval.energy_actual, 20.0);
        assert_eq!(eval.energy_predicted, 20.0);
        assert_eq!(eval.energy_ape, Some(0.0));
        assert_eq!(eval.interval_energy_mae, 0.0);
        assert_eq!(eval.interval_energy_mape, Some(0.0));
        // Constant measured power: interval energies have no variance
        assert_eq!(eval.interval_energy_r2, None);
        assert_eq!(eval.cumulative_energy_r2, Some(1.0));
    }

    #[test]
    fn test_metrics_against_offset_model() {
        // Measured 10 W and 30 W alternating, predicted flat 20 W
        let f = flight(2, vec![0.0, 1.0, 2.0, 3.0], vec![1.0, 3.0, 1.0, 3.0]);
        let eval = evaluate_flight(&Constant(20.0), &f).unwrap();
        assert_eq!(eval.power_mae, 10.0);
        assert_eq!(eval.power_rmse, 10.0);
        assert_eq!(eval.energy_actual, 60.0);
        assert_eq!(eval.energy_predicted, 60.0);
        assert_eq!(eval.energy_error, 0.0);
    }

    #[test]
    fn test_interval_and_cumulative_energy_metrics() {
        // Measured 10, 20, 30 W; predicted flat 20 W.
        // Intervals: measured [15, 25] J, predicted [20, 20] J.
        // Cumulative: measured [0, 15, 40] J, predicted [0, 20, 40] J.
        let f = flight(3, vec![0.0, 1.0, 2.0], vec![1.0, 2.0, 3.0]);
        let eval = evaluate_flight(&Constant(20.0), &f).unwrap();

        assert!(close(eval.interval_energy_mae, 5.0));
        let interval_mape = (5.0 / 15.0 + 5.0 / 25.0) / 2.0 * 100.0;
        assert!(close(eval.interval_energy_mape.unwrap(), interval_mape));
        // ss_res = 50 = ss_tot
        assert!(close(eval.interval_energy_r2.unwrap(), 0.0));

        assert!(close(eval.cumulative_energy_mae, 5.0 / 3.0));
        // The zero at take-off is left out of the percentage
        let cumulative_mape = (5.0 / 15.0 + 0.0) / 2.0 * 100.0;
        assert!(close(eval.cumulative_energy_mape.unwrap(), cumulative_mape));
        // ss_res = 25, ss_tot = 7350 / 9
        assert!(close(eval.cumulative_energy_r2.unwrap(), 1.0 - 225.0 / 7350.0));
    }

    #[test]
    fn test_zero_energy_has_no_percentage_errors() {
        let f = flight(4, vec![0.0, 1.0, 2.0], vec![0.0, 0.0, 0.0]);
        let eval = evaluate_flight(&Constant(5.0), &f).unwrap();
        assert_eq!(eval.energy_ape, None);
        assert_eq!(eval.interval_energy_mape, None);
        assert_eq!(eval.cumulative_energy_mape, None);
        assert!(close(eval.interval_energy_mae, 5.0));
    }

    #[test]
    fn test_energy_ape() {
        let f = flight(5, vec![0.0, 2.0], vec![5.0, 5.0]);
        let eval = evaluate_flight(&Constant(60.0), &f).unwrap();
        // 50 W measured for 2 s vs 60 W predicted
        assert_eq!(eval.energy_actual, 100.0);
        assert_eq!(eval.energy_error, 20.0);
        assert!((eval.energy_ape.unwrap() - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_too_few_valid_samples_is_not_evaluable() {
        let f = flight(6, vec![0.0, 1.0, 2.0], vec![1.0, f64::NAN, f64::NAN]);
        let err = evaluate_flight(&Constant(10.0), &f).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotEvaluable);

        let report = evaluate(&Constant(10.0), [&f]);
        assert!(report.flights.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].kind, ErrorKind::NotEvaluable);
        assert_eq!(report.aggregate, None);
    }

    #[test]
    fn test_training_flight_is_flagged_as_leaked() {
        let trained = flight(7, vec![0.0, 1.0, 2.0], vec![1.0, 2.0, 3.0]);
        let fresh = flight(8, vec![0.0, 1.0, 2.0], vec![2.0, 2.0, 2.0]);
        let model = Fitted {
            power: 20.0,
            flights: [7].into_iter().collect(),
        };

        let report = evaluate(&model, [&trained, &fresh]);
        assert_eq!(report.flights.len(), 2);
        assert!(report.has_leakage());
        assert_eq!(report.leaked, vec![7]);
        assert!(!report.flight(7).unwrap().held_out);
        assert!(report.flight(8).unwrap().held_out);

        // Aggregate only covers the held-out flight
        let aggregate = report.aggregate.unwrap();
        assert_eq!(aggregate.flights, 1);
        assert_eq!(aggregate.samples, 3);
        assert_eq!(aggregate.power_mae, 0.0);
    }

    #[test]
    fn test_fitted_model_flags_its_own_training_flight() {
        use crate::model::{ModelFamily, TrainingSet};

        let trained = flight(9, vec![0.0, 1.0, 2.0], vec![1.0, 2.0, 3.0]);
        let (set, _) = TrainingSet::from_flights([&trained]);
        let model = ModelFamily::MeanPower.fit(&set).unwrap();

        let report = evaluate(&model, [&trained]);
        assert_eq!(report.leaked, vec![9]);
        assert!(!report.flight(9).unwrap().held_out);
        assert_eq!(report.aggregate, None);
    }

    #[test]
    fn test_aggregate_pools_samples() {
        let a = flight(10, vec![0.0, 1.0], vec![1.0, 1.0]);
        let b = flight(11, vec![0.0, 1.0, 2.0, 3.0], vec![3.0, 3.0, 3.0, 3.0]);
        let report = evaluate(&Constant(20.0), [&a, &b]);
        let aggregate = report.aggregate.unwrap();
        assert_eq!(aggregate.samples, 6);
        // Every sample is off by 10 W
        assert!((aggregate.power_mae - 10.0).abs() < 1e-12);
        assert!((aggregate.power_rmse - 10.0).abs() < 1e-12);
        // Energy errors: +10 J over 1 s and -30 J over 3 s
        assert!((aggregate.energy_mae - 20.0).abs() < 1e-12);
    }
}
