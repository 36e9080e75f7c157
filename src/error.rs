use crate::types::{Column, FlightId};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Error types for loading, training, evaluating and forecasting
#[derive(Debug)]
pub enum ForecastError {
    /// I/O errors
    Io(std::io::Error),
    /// CSV table errors
    #[cfg(feature = "csv")]
    Csv(csv::Error),
    /// JSON config/report errors
    #[cfg(feature = "json")]
    Json(serde_json::Error),
    /// Malformed table content
    Parse(String),
    /// A flight record breaks a construction invariant
    InvalidRecord { flight_id: FlightId, reason: String },
    /// Filter rule text could not be understood
    InvalidFilter(String),
    /// A column required for the flight's role is absent
    IncompleteRecord { flight_id: FlightId, column: Column },
    /// Too few training samples for the chosen model family
    InsufficientData { samples: usize, required: usize },
    /// A filter references a parameter the flight's parameter row lacks
    UnresolvablePredicate { flight_id: FlightId, parameter: String },
    /// Fewer than two valid samples, nothing to integrate
    NotEvaluable { flight_id: FlightId, valid_samples: usize },
    /// Requested flight ID is not in the pool
    UnknownFlight(FlightId),
    /// Two records share one flight ID
    DuplicateFlight(FlightId),
}

/// Payload-free classification of [`ForecastError`], used in run reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ErrorKind {
    Io,
    Parse,
    InvalidRecord,
    InvalidFilter,
    IncompleteRecord,
    InsufficientData,
    UnresolvablePredicate,
    NotEvaluable,
    UnknownFlight,
    DuplicateFlight,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Io => "io",
            ErrorKind::Parse => "parse",
            ErrorKind::InvalidRecord => "invalid_record",
            ErrorKind::InvalidFilter => "invalid_filter",
            ErrorKind::IncompleteRecord => "incomplete_record",
            ErrorKind::InsufficientData => "insufficient_data",
            ErrorKind::UnresolvablePredicate => "unresolvable_predicate",
            ErrorKind::NotEvaluable => "not_evaluable",
            ErrorKind::UnknownFlight => "unknown_flight",
            ErrorKind::DuplicateFlight => "duplicate_flight",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ForecastError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForecastError::Io(_) => ErrorKind::Io,
            #[cfg(feature = "csv")]
            ForecastError::Csv(_) => ErrorKind::Parse,
            #[cfg(feature = "json")]
            ForecastError::Json(_) => ErrorKind::Parse,
            ForecastError::Parse(_) => ErrorKind::Parse,
            ForecastError::InvalidRecord { .. } => ErrorKind::InvalidRecord,
            ForecastError::InvalidFilter(_) => ErrorKind::InvalidFilter,
            ForecastError::IncompleteRecord { .. } => ErrorKind::IncompleteRecord,
            ForecastError::InsufficientData { .. } => ErrorKind::InsufficientData,
            ForecastError::UnresolvablePredicate { .. } => ErrorKind::UnresolvablePredicate,
            ForecastError::NotEvaluable { .. } => ErrorKind::NotEvaluable,
            ForecastError::UnknownFlight(_) => ErrorKind::UnknownFlight,
            ForecastError::DuplicateFlight(_) => ErrorKind::DuplicateFlight,
        }
    }
}

impl fmt::Display for ForecastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastError::Io(err) => write!(f, "I/O error: {}", err),
            #[cfg(feature = "csv")]
            ForecastError::Csv(err) => write!(f, "CSV error: {}", err),
            #[cfg(feature = "json")]
            ForecastError::Json(err) => write!(f, "JSON error: {}", err),
            ForecastError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ForecastError::InvalidRecord { flight_id, reason } => {
                write!(f, "Invalid record for flight {}: {}", flight_id, reason)
            }
            ForecastError::InvalidFilter(msg) => write!(f, "Invalid filter rule: {}", msg),
            ForecastError::IncompleteRecord { flight_id, column } => write!(
                f,
                "Flight {} is missing required column '{}'",
                flight_id,
                column.name()
            ),
            ForecastError::InsufficientData { samples, required } => write!(
                f,
                "Insufficient training data: {} samples, model requires at least {}",
                samples, required
            ),
            ForecastError::UnresolvablePredicate {
                flight_id,
                parameter,
            } => write!(
                f,
                "Flight {} has no parameter '{}' referenced by the filter",
                flight_id, parameter
            ),
            ForecastError::NotEvaluable {
                flight_id,
                valid_samples,
            } => write!(
                f,
                "Flight {} cannot be integrated: {} valid samples (need 2)",
                flight_id, valid_samples
            ),
            ForecastError::UnknownFlight(id) => write!(f, "Flight {} is not in the pool", id),
            ForecastError::DuplicateFlight(id) => write!(f, "Flight {} appears more than once", id),
        }
    }
}

impl std::error::Error for ForecastError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ForecastError::Io(err) => Some(err),
            #[cfg(feature = "csv")]
            ForecastError::Csv(err) => Some(err),
            #[cfg(feature = "json")]
            ForecastError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ForecastError {
    fn from(err: std::io::Error) -> Self {
        ForecastError::Io(err)
    }
}

#[cfg(feature = "csv")]
impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::Csv(err)
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::Json(err)
    }
}

pub type Result<T> = std::result::Result<T, ForecastError>;
