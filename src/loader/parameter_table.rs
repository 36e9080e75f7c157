use crate::types::{FlightId, ParamValue, Parameters};
use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, Trim};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Parameter rows keyed by flight ID
pub type ParameterTable = BTreeMap<FlightId, Parameters>;

pub fn read_parameter_file(path: &Path) -> Result<ParameterTable> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open parameter table: {:?}", path))?;
    read_parameter_table(file).with_context(|| format!("Failed to read parameter table: {:?}", path))
}

/// Read the parameter table: first column is the flight ID, the remaining
/// header names become parameter names. Empty cells are left out of the row.
pub fn read_parameter_table<R: Read>(source: R) -> Result<ParameterTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(source);

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(anyhow!("parameter table has no header row"));
    }

    let mut table = ParameterTable::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("bad parameter row {}", row + 1))?;
        let raw_id = record.get(0).unwrap_or("");
        let flight_id: FlightId = raw_id
            .parse()
            .with_context(|| format!("parameter row {}: '{}' is not a flight ID", row + 1, raw_id))?;

        let parameters: Parameters = headers
            .iter()
            .zip(record.iter())
            .skip(1)
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(name, cell)| (name.to_string(), ParamValue::parse(cell)))
            .collect();

        if table.insert(flight_id, parameters).is_some() {
            return Err(anyhow!("flight {} appears twice in the parameter table", flight_id));
        }
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_rows() {
        let table = "flight,speed,payload,altitude,date,route\n\
                     1,4,250,25,2019-04-07,R5\n\
                     2,10,0,100,2019-04-07,\n";
        let params = read_parameter_table(table.as_bytes()).unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[&1]["payload"], ParamValue::Number(250.0));
        assert_eq!(params[&1]["route"], ParamValue::from("R5"));
        assert_eq!(params[&1]["date"], ParamValue::from("2019-04-07"));
        assert!(!params[&2].contains_key("route"));
    }

    #[test]
    fn test_bad_flight_id() {
        let table = "flight,payload\nabc,250\n";
        assert!(read_parameter_table(table.as_bytes()).is_err());
    }

    #[test]
    fn test_duplicate_row() {
        let table = "flight,payload\n1,250\n1,500\n";
        let err = read_parameter_table(table.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("twice"));
    }
}
