use crate::types::{Column, FlightId, FlightRecord};
use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Read one `<flight_id>.csv` time-series file
pub fn read_flight_file(path: &Path, flight_id: FlightId) -> Result<FlightRecord> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open flight file: {:?}", path))?;
    read_flight_table(file, flight_id).with_context(|| format!("Failed to read flight file: {:?}", path))
}

/// Read a flight table from any reader.
///
/// The header row names the columns. `time` is required, unknown columns are
/// ignored and a cell that is empty or not a number loads as NaN.
pub fn read_flight_table<R: Read>(source: R, flight_id: FlightId) -> Result<FlightRecord> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(source);

    let headers = reader.headers()?.clone();
    let header_indices = map_headers(&headers);

    let time_index = header_indices
        .get(&Column::Time)
        .copied()
        .ok_or_else(|| anyhow!("flight {} has no '{}' column", flight_id, Column::Time))?;

    let mut time = Vec::new();
    let mut columns: BTreeMap<Column, Vec<f64>> = header_indices
        .keys()
        .filter(|c| **c != Column::Time)
        .map(|c| (*c, Vec::new()))
        .collect();

    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("bad row {} in flight {}", row + 1, flight_id))?;
        time.push(get_f64(&record, time_index));
        for (column, values) in columns.iter_mut() {
            values.push(get_f64(&record, header_indices[column]));
        }
    }

    tracing::debug!(
        flight = flight_id,
        rows = time.len(),
        columns = columns.len(),
        "flight table read"
    );

    Ok(FlightRecord::new(flight_id, time, columns)?)
}

fn map_headers(headers: &StringRecord) -> BTreeMap<Column, usize> {
    let mut indices = BTreeMap::new();
    for (i, header) in headers.iter().enumerate() {
        if let Some(column) = Column::from_name(header) {
            // First occurrence wins
            indices.entry(column).or_insert(i);
        }
    }
    indices
}

fn get_f64(record: &StringRecord, index: usize) -> f64 {
    record
        .get(index)
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_known_columns() {
        let table = "time,voltage,current,vx_anemometer,vy_anemometer,vz_imu,total_mass,notes\n\
                     0.0,24.1,10.0,1.0,0.5,0.0,3680,takeoff\n\
                     0.2,24.0,12.0,1.2,0.4,0.1,3680,\n";
        let flight = read_flight_table(table.as_bytes(), 7).unwrap();
        assert_eq!(flight.id(), 7);
        assert_eq!(flight.time(), &[0.0, 0.2]);
        assert_eq!(flight.column(Column::Current).unwrap(), &[10.0, 12.0]);
        assert_eq!(flight.column(Column::TotalMass).unwrap(), &[3680.0, 3680.0]);
    }

    #[test]
    fn test_blank_cells_are_nan() {
        let table = "time,voltage,current\n0,24,\n1,,3\n2,23.9,3.1\n";
        let flight = read_flight_table(table.as_bytes(), 1).unwrap();
        let current = flight.column(Column::Current).unwrap();
        assert!(current[0].is_nan());
        assert_eq!(current[1], 3.0);
        assert!(flight.column(Column::Voltage).unwrap()[1].is_nan());
        assert!(!flight.has_column(Column::VzImu));
    }

    #[test]
    fn test_missing_time_column() {
        let table = "voltage,current\n24,3\n24,3\n";
        let err = read_flight_table(table.as_bytes(), 2).unwrap_err();
        assert!(err.to_string().contains("time"));
    }

    #[test]
    fn test_duplicate_timestamps_are_dropped() {
        let table = "time,current\n0,1\n0,99\n1,2\n";
        let flight = read_flight_table(table.as_bytes(), 3).unwrap();
        assert_eq!(flight.len(), 2);
        assert_eq!(flight.column(Column::Current).unwrap(), &[1.0, 2.0]);
    }
}
