//! Training-set assembly
//!
//! Pools the feature vectors of every admitted training flight. A flight that
//! cannot be extracted is reported and left out; it never blocks the others.

use crate::features::{extract, FeatureVector, FlightRole};
use crate::types::{FlightId, FlightRecord, SkippedFlight, Stage};
use std::collections::BTreeSet;

/// Feature vectors with a measured power target, pooled across flights
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    samples: Vec<FeatureVector>,
    flights: BTreeSet<FlightId>,
}

impl TrainingSet {
    /// Extract and pool training features from the given flights
    pub fn from_flights<'a, I>(flights: I) -> (TrainingSet, Vec<SkippedFlight>)
    where
        I: IntoIterator<Item = &'a FlightRecord>,
    {
        let mut set = TrainingSet::default();
        let mut skipped = Vec::new();

        for flight in flights {
            match extract(flight, FlightRole::Training) {
                Ok(vectors) => {
                    let before = set.samples.len();
                    set.samples.extend(vectors);
                    let added = set.samples.len() - before;
                    tracing::debug!(flight = flight.id(), samples = added, "training flight extracted");
                    if added > 0 {
                        set.flights.insert(flight.id());
                    }
                }
                Err(err) => {
                    tracing::warn!(flight = flight.id(), "skipping training flight: {}", err);
                    skipped.push(SkippedFlight::new(flight.id(), Stage::Training, &err));
                }
            }
        }

        (set, skipped)
    }

    /// Build directly from vectors; samples without a power target are dropped
    pub fn from_samples(samples: Vec<FeatureVector>) -> TrainingSet {
        TrainingSet {
            samples: samples.into_iter().filter(|s| s.power_target.is_some()).collect(),
            flights: BTreeSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Flights that contributed at least one sample
    pub fn flight_ids(&self) -> &BTreeSet<FlightId> {
        &self.flights
    }

    pub fn samples(&self) -> &[FeatureVector] {
        &self.samples
    }

    /// Features paired with their measured power
    pub fn iter(&self) -> impl Iterator<Item = (&FeatureVector, f64)> {
        self.samples
            .iter()
            .filter_map(|s| s.power_target.map(|p| (s, p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Column;
    use crate::ErrorKind;
    use std::collections::BTreeMap;

    fn flight(id: FlightId, with_current: bool) -> FlightRecord {
        let mut columns = BTreeMap::new();
        columns.insert(Column::VxAnemometer, vec![1.0, 2.0, 3.0]);
        columns.insert(Column::VyAnemometer, vec![0.0, 0.0, 0.0]);
        columns.insert(Column::VzImu, vec![0.0, 0.5, 0.0]);
        columns.insert(Column::TotalMass, vec![3680.0; 3]);
        columns.insert(Column::Voltage, vec![22.2; 3]);
        if with_current {
            columns.insert(Column::Current, vec![10.0, 11.0, 12.0]);
        }
        FlightRecord::new(id, vec![0.0, 0.17, 0.34], columns).unwrap()
    }

    #[test]
    fn test_pools_samples_across_flights() {
        let flights = [flight(1, true), flight(2, true)];
        let (set, skipped) = TrainingSet::from_flights(flights.iter());
        assert_eq!(set.len(), 6);
        assert!(skipped.is_empty());
        assert_eq!(set.flight_ids().iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert!(set.iter().all(|(_, p)| p > 0.0));
    }

    #[test]
    fn test_incomplete_flight_is_skipped_not_fatal() {
        let flights = [flight(1, true), flight(2, false)];
        let (set, skipped) = TrainingSet::from_flights(flights.iter());
        assert_eq!(set.len(), 3);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].flight_id, 2);
        assert_eq!(skipped[0].stage, Stage::Training);
        assert_eq!(skipped[0].kind, ErrorKind::IncompleteRecord);
    }

    #[test]
    fn test_from_samples_drops_untargeted() {
        let mut with_target = FeatureVector::new(1.0, 0.0, 3680.0);
        with_target.power_target = Some(200.0);
        let set = TrainingSet::from_samples(vec![with_target, FeatureVector::new(2.0, 0.0, 3680.0)]);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_fitted_model_remembers_training_flights() {
        use crate::model::{ModelFamily, PowerPredictor};

        let flights = [flight(1, true), flight(2, true), flight(3, false)];
        let (set, _) = TrainingSet::from_flights(flights.iter());
        let model = ModelFamily::MeanPower.fit(&set).unwrap();
        assert_eq!(model.training_flights().iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert!(model.trained_on(1));
        assert!(!model.trained_on(3));
    }
}
