//! Per-sample feature extraction
//!
//! Turns a [`FlightRecord`] into a lazy sequence of [`FeatureVector`]s, one per
//! complete sample, in time order. The transform is stateless: no smoothing,
//! no differencing, each vector depends only on its own row.

use crate::error::{ForecastError, Result};
use crate::types::{Column, FlightRecord};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What a flight is used for; decides which columns are mandatory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FlightRole {
    Training,
    Evaluation,
    Forecast,
}

const KINEMATIC_COLUMNS: [Column; 4] = [
    Column::VxAnemometer,
    Column::VyAnemometer,
    Column::VzImu,
    Column::TotalMass,
];

const MEASURED_COLUMNS: [Column; 6] = [
    Column::VxAnemometer,
    Column::VyAnemometer,
    Column::VzImu,
    Column::TotalMass,
    Column::Voltage,
    Column::Current,
];

impl FlightRole {
    /// Columns besides `time` that must be present for this role
    pub fn required_columns(&self) -> &'static [Column] {
        match self {
            FlightRole::Training | FlightRole::Evaluation => &MEASURED_COLUMNS,
            FlightRole::Forecast => &KINEMATIC_COLUMNS,
        }
    }

    /// Whether vectors carry the measured power target
    pub fn needs_target(&self) -> bool {
        !matches!(self, FlightRole::Forecast)
    }
}

/// Model inputs for one sample plus, when measured, the power target.
///
/// `time` rides along for integration and is never a model input.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FeatureVector {
    pub time: f64,
    /// Horizontal airspeed magnitude [m/s], never negative
    pub airspeed: f64,
    /// Vertical speed [m/s]
    pub vertical_speed: f64,
    /// Total mass [g]
    pub mass: f64,
    /// Measured electrical power `voltage * current` [W]
    pub power_target: Option<f64>,
}

impl FeatureVector {
    /// Inputs only, at time zero and without a target
    pub fn new(airspeed: f64, vertical_speed: f64, mass: f64) -> Self {
        Self {
            time: 0.0,
            airspeed,
            vertical_speed,
            mass,
            power_target: None,
        }
    }

    pub fn airspeed_from(vx: f64, vy: f64) -> f64 {
        vx.hypot(vy)
    }
}

/// Lazy iterator over the complete samples of one flight
pub struct FeatureIter<'a> {
    time: &'a [f64],
    vx: &'a [f64],
    vy: &'a [f64],
    vz: &'a [f64],
    mass: &'a [f64],
    electrical: Option<(&'a [f64], &'a [f64])>,
    index: usize,
}

impl<'a> Iterator for FeatureIter<'a> {
    type Item = FeatureVector;

    fn next(&mut self) -> Option<FeatureVector> {
        while self.index < self.time.len() {
            let i = self.index;
            self.index += 1;

            let (vx, vy, vz, mass) = (self.vx[i], self.vy[i], self.vz[i], self.mass[i]);
            if !(vx.is_finite() && vy.is_finite() && vz.is_finite() && mass.is_finite()) || mass <= 0.0 {
                continue;
            }

            let power_target = match self.electrical {
                Some((voltage, current)) => {
                    let power = voltage[i] * current[i];
                    if !power.is_finite() {
                        continue;
                    }
                    Some(power)
                }
                None => None,
            };

            return Some(FeatureVector {
                time: self.time[i],
                airspeed: FeatureVector::airspeed_from(vx, vy),
                vertical_speed: vz,
                mass,
                power_target,
            });
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.time.len() - self.index))
    }
}

/// Start extracting features from a flight in the given role.
///
/// Fails with `IncompleteRecord` when a column the role requires is absent.
/// Samples with a missing or non-finite value are skipped by the iterator.
pub fn extract(flight: &FlightRecord, role: FlightRole) -> Result<FeatureIter<'_>> {
    let column = move |c: Column| {
        flight.column(c).ok_or(ForecastError::IncompleteRecord {
            flight_id: flight.id(),
            column: c,
        })
    };

    for &required in role.required_columns() {
        column(required)?;
    }

    let electrical = if role.needs_target() {
        Some((column(Column::Voltage)?, column(Column::Current)?))
    } else {
        None
    };

    Ok(FeatureIter {
        time: flight.time(),
        vx: column(Column::VxAnemometer)?,
        vy: column(Column::VyAnemometer)?,
        vz: column(Column::VzImu)?,
        mass: column(Column::TotalMass)?,
        electrical,
        index: 0,
    })
}

/// Eager form of [`extract`]
pub fn extract_all(flight: &FlightRecord, role: FlightRole) -> Result<Vec<FeatureVector>> {
    Ok(extract(flight, role)?.collect())
}
