//! Power and energy forecasts for flights without electrical measurements

use crate::error::{ForecastError, Result};
use crate::features::{extract, FlightRole};
use crate::integration::cumulative_energy;
use crate::model::PowerPredictor;
use crate::types::{FlightForecast, FlightRecord, ForecastPoint, SkippedFlight, Stage};

/// Predict power at every complete sample and integrate it into energy.
///
/// Negative predictions are kept as they are. Fails with `IncompleteRecord`
/// when a kinematic or mass column is absent and with `NotEvaluable` when
/// fewer than two complete samples remain.
pub fn forecast<P: PowerPredictor>(model: &P, flight: &FlightRecord) -> Result<FlightForecast> {
    let (time, power): (Vec<f64>, Vec<f64>) = extract(flight, FlightRole::Forecast)?
        .map(|v| (v.time, model.predict(&v)))
        .unzip();

    if time.len() < 2 {
        return Err(ForecastError::NotEvaluable {
            flight_id: flight.id(),
            valid_samples: time.len(),
        });
    }

    let energy = cumulative_energy(&time, &power);
    let total_energy = energy.last().copied().unwrap_or(0.0);

    let points = time
        .iter()
        .zip(&power)
        .zip(&energy)
        .map(|((&time, &power), &energy)| ForecastPoint { time, power, energy })
        .collect();

    Ok(FlightForecast {
        flight_id: flight.id(),
        points,
        total_energy,
    })
}

/// Forecast several flights; failures are collected instead of aborting
pub fn forecast_all<'a, P, I>(model: &P, flights: I) -> (Vec<FlightForecast>, Vec<SkippedFlight>)
where
    P: PowerPredictor,
    I: IntoIterator<Item = &'a FlightRecord>,
{
    let mut forecasts = Vec::new();
    let mut skipped = Vec::new();

    for flight in flights {
        match forecast(model, flight) {
            Ok(result) => {
                tracing::debug!(
                    flight = flight.id(),
                    total_energy = result.total_energy,
                    "flight forecast"
                );
                forecasts.push(result);
            }
            Err(err) => {
                tracing::warn!(flight = flight.id(), "flight not forecast: {}", err);
                skipped.push(SkippedFlight::new(flight.id(), Stage::Forecast, &err));
            }
        }
    }

    (forecasts, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;
    use crate::types::Column;
    use crate::ErrorKind;
    use std::collections::BTreeMap;

    struct Constant(f64);

    impl PowerPredictor for Constant {
        fn predict(&self, _: &FeatureVector) -> f64 {
            self.0
        }
    }

    /// Predicts from vertical speed so descent yields negative power
    struct Climb;

    impl PowerPredictor for Climb {
        fn predict(&self, f: &FeatureVector) -> f64 {
            100.0 * f.vertical_speed
        }
    }

    fn planned(time: Vec<f64>, vz: Vec<f64>, with_mass: bool) -> FlightRecord {
        let n = time.len();
        let mut columns = BTreeMap::new();
        columns.insert(Column::VxAnemometer, vec![1.0; n]);
        columns.insert(Column::VyAnemometer, vec![1.0; n]);
        columns.insert(Column::VzImu, vz);
        if with_mass {
            columns.insert(Column::TotalMass, vec![3680.0; n]);
        }
        FlightRecord::new(40, time, columns).unwrap()
    }

    #[test]
    fn test_constant_power_energy() {
        let flight = planned(vec![0.0, 1.0, 2.0], vec![0.0; 3], true);
        let result = forecast(&Constant(10.0), &flight).unwrap();
        assert_eq!(result.total_energy, 20.0);
        let energies: Vec<f64> = result.points.iter().map(|p| p.energy).collect();
        assert_eq!(energies, vec![0.0, 10.0, 20.0]);
        assert_eq!(result.mean_power(), 10.0);
    }

    #[test]
    fn test_missing_mass_is_incomplete() {
        let flight = planned(vec![0.0, 1.0, 2.0], vec![0.0; 3], false);
        let err = forecast(&Constant(10.0), &flight).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompleteRecord);

        let (forecasts, skipped) = forecast_all(&Constant(10.0), [&flight]);
        assert!(forecasts.is_empty());
        assert_eq!(skipped[0].kind, ErrorKind::IncompleteRecord);
        assert_eq!(skipped[0].stage, Stage::Forecast);
    }

    #[test]
    fn test_negative_power_is_surfaced() {
        let flight = planned(vec![0.0, 1.0, 2.0], vec![0.0, -1.0, -1.0], true);
        let result = forecast(&Climb, &flight).unwrap();
        assert_eq!(result.points[1].power, -100.0);
        assert_eq!(result.total_energy, -150.0);
    }

    #[test]
    fn test_non_negative_power_is_monotonic() {
        let flight = planned(vec![0.0, 0.17, 0.34, 0.9, 1.5], vec![0.0, 0.5, 2.0, 0.1, 0.0], true);
        let result = forecast(&Climb, &flight).unwrap();
        assert!(result.points.windows(2).all(|w| w[1].energy >= w[0].energy));
    }
}
