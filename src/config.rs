//! Run configuration
//!
//! A run takes exactly three inputs: parameter filters, held-out flight IDs
//! for evaluation, and flight IDs to forecast. Where the data lives and which
//! reports get written are separate, process-level settings.

use crate::filters::FilterSet;
use crate::types::FlightId;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The three per-run inputs
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RunConfig {
    pub filters: FilterSet,
    pub test_ids: Vec<FlightId>,
    pub forecast_ids: Vec<FlightId>,
}

impl RunConfig {
    pub fn new(filters: FilterSet, test_ids: Vec<FlightId>, forecast_ids: Vec<FlightId>) -> Self {
        Self {
            filters,
            test_ids,
            forecast_ids,
        }
    }

    /// IDs that must never reach the training set
    pub fn reserved_ids(&self) -> BTreeSet<FlightId> {
        self.test_ids
            .iter()
            .chain(&self.forecast_ids)
            .copied()
            .collect()
    }

    /// Read a run configuration from a JSON file
    #[cfg(feature = "json")]
    pub fn from_json_file(path: &Path) -> crate::Result<Self> {
        let file = std::fs::File::open(path)?;
        let config = serde_json::from_reader(std::io::BufReader::new(file))?;
        Ok(config)
    }
}

/// Locations of the two input tables
#[derive(Debug, Clone, PartialEq)]
pub struct DataPaths {
    /// Directory holding one `<flight_id>.csv` per flight
    pub flights_dir: PathBuf,
    /// Parameter table, first column = flight ID
    pub parameters: PathBuf,
}

impl DataPaths {
    /// `<data_dir>/flights/` and `<data_dir>/parameters.csv`
    pub fn from_data_dir(data_dir: &Path) -> Self {
        Self {
            flights_dir: data_dir.join("flights"),
            parameters: data_dir.join("parameters.csv"),
        }
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::from_data_dir(Path::new("data"))
    }
}

/// Which reports to write and where
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportOptions {
    pub csv: bool,
    pub json: bool,
    /// Defaults to the current directory
    pub output_dir: Option<String>,
}

impl ReportOptions {
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn any(&self) -> bool {
        self.csv || self.json
    }
}
