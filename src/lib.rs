//! UAV Power Forecast Library
//!
//! Predicts the electrical power draw and energy consumption of multirotor
//! UAV flights from kinematic telemetry and take-off mass. A regression model
//! is trained on flights that carry measured voltage and current, scored on
//! held-out flights and then used to forecast flights that have no electrical
//! measurements.
//!
//! # Features
//!
//! - **`csv`** (default): Load flight tables and export CSV reports
//! - **`cli`** (default): Build the command-line interface binary
//! - **`json`**: Read run configurations and write the run report as JSON
//! - **`serde`**: Enable serialization/deserialization of types
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use uav_power_forecast::{
//!     load_flight_data, DataPaths, FilterSet, ForecastEngine, ModelFamily, RunConfig,
//! };
//! use std::path::Path;
//!
//! let outcome = load_flight_data(&DataPaths::from_data_dir(Path::new("data"))).unwrap();
//! let engine = ForecastEngine::new(outcome.pool, ModelFamily::PowerLaw);
//!
//! let filters = FilterSet::parse(["payload=0..500"]).unwrap();
//! let report = engine.run(&RunConfig::new(filters, vec![12, 31], vec![40])).unwrap();
//! for flight in &report.evaluation.flights {
//!     println!("flight {}: power MAE {:.1} W", flight.flight_id, flight.power_mae);
//! }
//! ```
//!
//! # Public API
//!
//! ## Data
//! - [`FlightRecord`] - One flight's time series and parameters
//! - [`FlightPool`] - Flights keyed by ID, with filter/exclude/select
//! - [`load_flight_data`] - Load a data directory into a pool
//!
//! ## Modelling
//! - [`FilterSet`] / [`FilterRule`] - Declarative parameter filters
//! - [`extract`] - Per-sample feature vectors for a flight role
//! - [`ModelFamily`] / [`FittedModel`] - Regression families and fitted models
//! - [`evaluate`] - Score a model on held-out flights
//! - [`forecast`] - Power and cumulative energy for an unmeasured flight
//! - [`ForecastEngine`] - Filter, train, evaluate and forecast in one run
//!
//! ## Export
//! - [`export_reports`] - Write CSV and JSON reports

// Module declarations
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod export;
pub mod features;
pub mod filters;
pub mod forecast;
pub mod integration;
#[cfg(feature = "csv")]
pub mod loader;
pub mod model;
pub mod pool;
pub mod types;

// Re-export everything from modules for convenience
pub use config::*;
pub use engine::*;
pub use error::*;
pub use evaluate::*;
pub use export::*;
pub use features::*;
pub use filters::*;
pub use forecast::*;
pub use integration::*;
#[cfg(feature = "csv")]
pub use loader::*;
pub use model::*;
pub use pool::*;
pub use types::*;

/// Crate version with the git revision it was built from, when known
pub fn crate_version() -> String {
    match option_env!("VERGEN_GIT_DESCRIBE").or(option_env!("VERGEN_GIT_SHA")) {
        Some(rev) if !rev.is_empty() => format!("{} ({})", env!("CARGO_PKG_VERSION"), rev),
        _ => env!("CARGO_PKG_VERSION").to_string(),
    }
}
