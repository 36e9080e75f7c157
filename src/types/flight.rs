use crate::error::{ForecastError, Result};
use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Flight identifier, unique within a pool
pub type FlightId = u32;

/// Named parameters attached to a flight from the parameter table
pub type Parameters = BTreeMap<String, ParamValue>;

/// Per-sample columns of a flight table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Column {
    Time,
    Voltage,
    Current,
    VxAnemometer,
    VyAnemometer,
    VzImu,
    TotalMass,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Time,
        Column::Voltage,
        Column::Current,
        Column::VxAnemometer,
        Column::VyAnemometer,
        Column::VzImu,
        Column::TotalMass,
    ];

    /// Header name used in flight tables
    pub fn name(&self) -> &'static str {
        match self {
            Column::Time => "time",
            Column::Voltage => "voltage",
            Column::Current => "current",
            Column::VxAnemometer => "vx_anemometer",
            Column::VyAnemometer => "vy_anemometer",
            Column::VzImu => "vz_imu",
            Column::TotalMass => "total_mass",
        }
    }

    pub fn from_name(name: &str) -> Option<Column> {
        Column::ALL.iter().copied().find(|c| c.name() == name.trim())
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value of a flight parameter (payload, route, ...)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl ParamValue {
    /// Parse a table cell, preferring a numeric reading
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => ParamValue::Number(value),
            _ => ParamValue::Text(trimmed.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(value) => Some(*value),
            ParamValue::Text(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(value) => write!(f, "{}", value),
            ParamValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

/// One flight's time series plus its parameters.
///
/// Stored column-wise. `time` is always present; every other column may be
/// absent, which the feature extractor judges against the flight's role.
/// Missing cells inside a present column are NaN. Records are immutable once
/// built; the pool hands them out behind `Arc`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlightRecord {
    id: FlightId,
    time: Vec<f64>,
    columns: BTreeMap<Column, Vec<f64>>,
    parameters: Option<Parameters>,
}

impl FlightRecord {
    /// Build a record, dropping rows that repeat the previous timestamp.
    ///
    /// Fails when columns disagree in length, time goes backwards or is not
    /// finite, fewer than two samples remain, or a present mass is not positive.
    pub fn new(
        id: FlightId,
        time: Vec<f64>,
        mut columns: BTreeMap<Column, Vec<f64>>,
    ) -> Result<Self> {
        columns.remove(&Column::Time);

        for (column, values) in &columns {
            if values.len() != time.len() {
                return Err(ForecastError::InvalidRecord {
                    flight_id: id,
                    reason: format!(
                        "column '{}' has {} rows, time has {}",
                        column,
                        values.len(),
                        time.len()
                    ),
                });
            }
        }

        let mut keep = Vec::with_capacity(time.len());
        let mut last: Option<f64> = None;
        for (i, &t) in time.iter().enumerate() {
            if !t.is_finite() {
                return Err(ForecastError::InvalidRecord {
                    flight_id: id,
                    reason: format!("non-finite time at row {}", i),
                });
            }
            match last {
                Some(prev) if t == prev => continue,
                Some(prev) if t < prev => {
                    return Err(ForecastError::InvalidRecord {
                        flight_id: id,
                        reason: format!("time decreases at row {} ({} < {})", i, t, prev),
                    });
                }
                _ => {}
            }
            keep.push(i);
            last = Some(t);
        }

        if keep.len() < 2 {
            return Err(ForecastError::InvalidRecord {
                flight_id: id,
                reason: format!("{} distinct samples, need at least 2", keep.len()),
            });
        }

        let time: Vec<f64> = keep.iter().map(|&i| time[i]).collect();
        let columns: BTreeMap<Column, Vec<f64>> = columns
            .into_iter()
            .map(|(column, values)| (column, keep.iter().map(|&i| values[i]).collect()))
            .collect();

        if let Some(mass) = columns.get(&Column::TotalMass) {
            if let Some(bad) = mass.iter().find(|m| m.is_finite() && **m <= 0.0) {
                return Err(ForecastError::InvalidRecord {
                    flight_id: id,
                    reason: format!("total_mass must be positive, found {}", bad),
                });
            }
        }

        Ok(Self {
            id,
            time,
            columns,
            parameters: None,
        })
    }

    /// Attach the parameter row for this flight
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn id(&self) -> FlightId {
        self.id
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn column(&self, column: Column) -> Option<&[f64]> {
        match column {
            Column::Time => Some(&self.time),
            other => self.columns.get(&other).map(Vec::as_slice),
        }
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.column(column).is_some()
    }

    /// `None` when the flight has no row in the parameter table
    pub fn parameters(&self) -> Option<&Parameters> {
        self.parameters.as_ref()
    }

    pub fn parameter(&self, name: &str) -> Option<&ParamValue> {
        self.parameters.as_ref()?.get(name)
    }

    /// Number of samples after de-duplication
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Elapsed time between first and last sample in seconds
    pub fn duration_seconds(&self) -> f64 {
        match (self.time.first(), self.time.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(n: usize) -> BTreeMap<Column, Vec<f64>> {
        let mut map = BTreeMap::new();
        map.insert(Column::TotalMass, vec![3680.0; n]);
        map.insert(Column::VzImu, (0..n).map(|i| i as f64).collect());
        map
    }

    #[test]
    fn test_duplicate_timestamps_are_dropped() {
        let record = FlightRecord::new(1, vec![0.0, 0.0, 1.0, 2.0, 2.0], columns(5)).unwrap();
        assert_eq!(record.len(), 3);
        assert_eq!(record.time(), &[0.0, 1.0, 2.0]);
        // First occurrence of each timestamp is kept
        assert_eq!(record.column(Column::VzImu).unwrap(), &[0.0, 2.0, 3.0]);
        assert_eq!(record.duration_seconds(), 2.0);
    }

    #[test]
    fn test_decreasing_time_is_rejected() {
        let err = FlightRecord::new(7, vec![0.0, 2.0, 1.0], columns(3)).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidRecord);
    }

    #[test]
    fn test_single_distinct_sample_is_rejected() {
        assert!(FlightRecord::new(1, vec![5.0, 5.0], columns(2)).is_err());
        assert!(FlightRecord::new(1, vec![0.0], columns(1)).is_err());
    }

    #[test]
    fn test_non_positive_mass_is_rejected() {
        let mut cols = columns(2);
        cols.insert(Column::TotalMass, vec![3680.0, 0.0]);
        assert!(FlightRecord::new(1, vec![0.0, 1.0], cols).is_err());

        // A missing cell is not a mass violation
        let mut cols = columns(2);
        cols.insert(Column::TotalMass, vec![3680.0, f64::NAN]);
        assert!(FlightRecord::new(1, vec![0.0, 1.0], cols).is_ok());
    }

    #[test]
    fn test_column_length_mismatch() {
        let mut cols = columns(3);
        cols.insert(Column::Voltage, vec![22.0]);
        assert!(FlightRecord::new(1, vec![0.0, 1.0, 2.0], cols).is_err());
    }

    #[test]
    fn test_param_value_parse() {
        assert_eq!(ParamValue::parse(" 500 "), ParamValue::Number(500.0));
        assert_eq!(ParamValue::parse("R1"), ParamValue::Text("R1".to_string()));
        assert_eq!(ParamValue::parse("nan"), ParamValue::Text("nan".to_string()));
    }

    #[test]
    fn test_column_names_round_trip() {
        for column in Column::ALL {
            assert_eq!(Column::from_name(column.name()), Some(column));
        }
        assert_eq!(Column::from_name("is_moving"), None);
    }
}
