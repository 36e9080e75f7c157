//! Collection of loaded flights with filter/exclude projections
//!
//! Records are shared behind `Arc`, so every projection is a cheap, pure copy
//! of handles: the underlying records are never touched after loading.

use crate::error::{ForecastError, Result};
use crate::filters::FilterSet;
use crate::types::{FlightId, FlightRecord, SkippedFlight, Stage};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct FlightPool {
    flights: BTreeMap<FlightId, Arc<FlightRecord>>,
}

impl FlightPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool, rejecting duplicate flight IDs
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = FlightRecord>,
    {
        let mut pool = FlightPool::new();
        for record in records {
            pool.insert(record)?;
        }
        Ok(pool)
    }

    pub fn insert(&mut self, record: FlightRecord) -> Result<()> {
        let id = record.id();
        if self.flights.contains_key(&id) {
            return Err(ForecastError::DuplicateFlight(id));
        }
        self.flights.insert(id, Arc::new(record));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }

    pub fn contains(&self, id: FlightId) -> bool {
        self.flights.contains_key(&id)
    }

    pub fn get(&self, id: FlightId) -> Option<&Arc<FlightRecord>> {
        self.flights.get(&id)
    }

    /// Flight IDs in ascending order
    pub fn ids(&self) -> Vec<FlightId> {
        self.flights.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<FlightRecord>> {
        self.flights.values()
    }

    /// Flights admitted by every rule of `filters`
    pub fn filter(&self, filters: &FilterSet) -> FlightPool {
        self.partition(filters).0
    }

    /// Like [`filter`](Self::filter), but also reports flights that could not
    /// be judged because their parameter row lacks a referenced parameter.
    pub fn partition(&self, filters: &FilterSet) -> (FlightPool, Vec<SkippedFlight>) {
        let mut admitted = BTreeMap::new();
        let mut unresolved = Vec::new();

        for (id, record) in &self.flights {
            match filters.admits(record) {
                Ok(true) => {
                    admitted.insert(*id, Arc::clone(record));
                }
                Ok(false) => {}
                Err(err) => unresolved.push(SkippedFlight::new(*id, Stage::Filter, &err)),
            }
        }

        (FlightPool { flights: admitted }, unresolved)
    }

    /// Copy of this pool without the given flight IDs
    pub fn exclude(&self, ids: &BTreeSet<FlightId>) -> FlightPool {
        let flights = self
            .flights
            .iter()
            .filter(|(id, _)| !ids.contains(id))
            .map(|(id, record)| (*id, Arc::clone(record)))
            .collect();
        FlightPool { flights }
    }

    /// Look up flights by ID, in request order; unknown IDs are reported
    pub fn select(&self, ids: &[FlightId], stage: Stage) -> (Vec<Arc<FlightRecord>>, Vec<SkippedFlight>) {
        let mut found = Vec::with_capacity(ids.len());
        let mut missing = Vec::new();
        let mut seen = BTreeSet::new();

        for &id in ids {
            if !seen.insert(id) {
                continue;
            }
            match self.flights.get(&id) {
                Some(record) => found.push(Arc::clone(record)),
                None => missing.push(SkippedFlight::new(id, stage, &ForecastError::UnknownFlight(id))),
            }
        }

        (found, missing)
    }
}
