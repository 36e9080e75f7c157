use crate::config::DataPaths;
use crate::loader::{read_flight_file, read_parameter_file, ParameterTable};
use crate::pool::FlightPool;
use crate::types::FlightId;
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// A file that could not be turned into a flight record
#[derive(Debug, Clone)]
pub struct RejectedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of loading a data directory
#[derive(Debug)]
pub struct LoadOutcome {
    pub pool: FlightPool,
    pub rejected: Vec<RejectedFile>,
}

/// Flight ID from a `<flight_id>.csv` file name
pub fn flight_id_from_path(path: &Path) -> Option<FlightId> {
    static STEM: OnceLock<Option<Regex>> = OnceLock::new();
    let stem_pattern = STEM.get_or_init(|| Regex::new(r"^\d+$").ok()).as_ref()?;

    let stem = path.file_stem()?.to_str()?;
    if stem_pattern.is_match(stem) {
        stem.parse().ok()
    } else {
        None
    }
}

/// Load every flight under `paths.flights_dir` and attach its parameter row.
///
/// Per-file failures are collected in [`LoadOutcome::rejected`]. Only a
/// missing flights directory or an unreadable parameter table aborts the load.
pub fn load_flight_data(paths: &DataPaths) -> Result<LoadOutcome> {
    if !paths.flights_dir.is_dir() {
        return Err(anyhow!("Flights directory not found: {:?}", paths.flights_dir));
    }

    let mut parameters = if paths.parameters.exists() {
        read_parameter_file(&paths.parameters)?
    } else {
        tracing::warn!(
            path = %paths.parameters.display(),
            "parameter table not found; flights load without parameters"
        );
        ParameterTable::new()
    };

    let pattern = paths.flights_dir.join("*.csv");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| anyhow!("Flights directory is not valid UTF-8: {:?}", paths.flights_dir))?;

    let mut files: Vec<PathBuf> = glob::glob(pattern)
        .with_context(|| format!("Invalid flight file pattern: {}", pattern))?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let mut pool = FlightPool::new();
    let mut rejected = Vec::new();

    for path in files {
        let Some(flight_id) = flight_id_from_path(&path) else {
            tracing::warn!(path = %path.display(), "file name is not a flight ID, skipping");
            rejected.push(RejectedFile {
                path,
                reason: "file name is not a numeric flight ID".to_string(),
            });
            continue;
        };

        let loaded = read_flight_file(&path, flight_id).and_then(|record| {
            let record = match parameters.remove(&flight_id) {
                Some(row) => record.with_parameters(row),
                None => {
                    tracing::debug!(flight = flight_id, "no parameter row");
                    record
                }
            };
            pool.insert(record)?;
            Ok(())
        });

        if let Err(err) = loaded {
            tracing::warn!(path = %path.display(), "flight rejected: {:#}", err);
            rejected.push(RejectedFile {
                path,
                reason: format!("{:#}", err),
            });
        }
    }

    for flight_id in parameters.keys() {
        tracing::debug!(flight = flight_id, "parameter row without a flight file");
    }

    tracing::info!(
        flights = pool.len(),
        rejected = rejected.len(),
        dir = %paths.flights_dir.display(),
        "flight data loaded"
    );

    Ok(LoadOutcome { pool, rejected })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParamValue;
    use std::fs;
    use tempfile::TempDir;

    const FLIGHT: &str = "time,voltage,current,vx_anemometer,vy_anemometer,vz_imu,total_mass\n\
                          0.0,24,10,1,0,0,3680\n\
                          0.5,24,11,1,0,0,3680\n\
                          1.0,24,12,1,0,0,3680\n";

    fn data_dir() -> (TempDir, DataPaths) {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::from_data_dir(dir.path());
        fs::create_dir_all(&paths.flights_dir).unwrap();
        (dir, paths)
    }

    #[test]
    fn test_flight_id_from_path() {
        assert_eq!(flight_id_from_path(Path::new("data/flights/17.csv")), Some(17));
        assert_eq!(flight_id_from_path(Path::new("17b.csv")), None);
        assert_eq!(flight_id_from_path(Path::new("-3.csv")), None);
    }

    #[test]
    fn test_flight_id_stem_pattern_is_reused() {
        // Second call goes through the cached pattern
        for _ in 0..2 {
            assert_eq!(flight_id_from_path(Path::new("204.csv")), Some(204));
            assert_eq!(flight_id_from_path(Path::new("flight.csv")), None);
        }
    }

    #[test]
    fn test_load_with_parameters() {
        let (_dir, paths) = data_dir();
        fs::write(paths.flights_dir.join("1.csv"), FLIGHT).unwrap();
        fs::write(paths.flights_dir.join("2.csv"), FLIGHT).unwrap();
        fs::write(&paths.parameters, "flight,payload,route\n1,250,R1\n").unwrap();

        let outcome = load_flight_data(&paths).unwrap();
        assert!(outcome.rejected.is_empty());
        assert_eq!(outcome.pool.ids(), vec![1, 2]);

        let one = outcome.pool.get(1).unwrap();
        assert_eq!(one.parameter("payload"), Some(&ParamValue::Number(250.0)));
        assert!(outcome.pool.get(2).unwrap().parameters().is_none());
    }

    #[test]
    fn test_missing_parameter_table_is_not_fatal() {
        let (_dir, paths) = data_dir();
        fs::write(paths.flights_dir.join("5.csv"), FLIGHT).unwrap();

        let outcome = load_flight_data(&paths).unwrap();
        assert_eq!(outcome.pool.len(), 1);
    }

    #[test]
    fn test_bad_files_are_rejected_not_fatal() {
        let (_dir, paths) = data_dir();
        fs::write(paths.flights_dir.join("1.csv"), FLIGHT).unwrap();
        fs::write(paths.flights_dir.join("notes.csv"), FLIGHT).unwrap();
        fs::write(paths.flights_dir.join("2.csv"), "time,current\n1,2\n0,3\n").unwrap();
        fs::write(paths.flights_dir.join("3.csv"), "current\n1\n2\n").unwrap();

        let outcome = load_flight_data(&paths).unwrap();
        assert_eq!(outcome.pool.ids(), vec![1]);
        assert_eq!(outcome.rejected.len(), 3);
    }

    #[test]
    fn test_missing_flights_dir_is_fatal() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::from_data_dir(dir.path());
        assert!(load_flight_data(&paths).is_err());
    }
}
