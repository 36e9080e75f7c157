//! Export functionality for run reports
//!
//! Writes the evaluation table, one forecast table per flight and the
//! skipped-flight list as CSV, and the whole run report as JSON.

use crate::config::ReportOptions;
use crate::engine::RunReport;
use crate::error::Result;
use crate::types::FlightId;
use std::path::{Path, PathBuf};

/// Paths written by an export call
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub paths: Vec<PathBuf>,
}

/// File name of a flight's forecast table
pub fn forecast_file_name(flight_id: FlightId) -> String {
    format!("forecast_{}.csv", flight_id)
}

/// Resolve the output directory and create it if missing
pub fn prepare_output_dir(options: &ReportOptions) -> Result<PathBuf> {
    let output_dir = options.output_dir();
    if !output_dir.exists() {
        std::fs::create_dir_all(&output_dir)?;
        tracing::debug!(dir = %output_dir.display(), "created output directory");
    }
    Ok(output_dir)
}

/// Write every report format enabled in `options`
pub fn export_reports(report: &RunReport, options: &ReportOptions) -> Result<ExportReport> {
    let mut exported = ExportReport::default();
    if !options.any() {
        return Ok(exported);
    }

    let output_dir = prepare_output_dir(options)?;

    if options.csv {
        #[cfg(feature = "csv")]
        exported.paths.extend(export_to_csv(report, &output_dir)?);
        #[cfg(not(feature = "csv"))]
        tracing::warn!("CSV export requested but the csv feature is disabled");
    }

    if options.json {
        #[cfg(feature = "json")]
        exported.paths.push(export_to_json(report, &output_dir)?);
        #[cfg(not(feature = "json"))]
        tracing::warn!("JSON export requested but the json feature is disabled");
    }

    for path in &exported.paths {
        tracing::info!(path = %path.display(), "report written");
    }
    Ok(exported)
}

#[cfg(feature = "csv")]
fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// `evaluation.csv`, `forecast_<id>.csv` per forecast and `skipped.csv`
#[cfg(feature = "csv")]
pub fn export_to_csv(report: &RunReport, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    let evaluation_path = output_dir.join("evaluation.csv");
    let mut writer = csv::Writer::from_path(&evaluation_path)?;
    writer.write_record([
        "flight_id",
        "held_out",
        "samples",
        "power_mae",
        "power_rmse",
        "energy_actual",
        "energy_predicted",
        "energy_error",
        "energy_ape",
        "interval_energy_mae",
        "interval_energy_mape",
        "interval_energy_r2",
        "cumulative_energy_mae",
        "cumulative_energy_mape",
        "cumulative_energy_r2",
    ])?;
    for eval in &report.evaluation.flights {
        writer.write_record([
            eval.flight_id.to_string(),
            eval.held_out.to_string(),
            eval.samples.to_string(),
            eval.power_mae.to_string(),
            eval.power_rmse.to_string(),
            eval.energy_actual.to_string(),
            eval.energy_predicted.to_string(),
            eval.energy_error.to_string(),
            optional(eval.energy_ape),
            eval.interval_energy_mae.to_string(),
            optional(eval.interval_energy_mape),
            optional(eval.interval_energy_r2),
            eval.cumulative_energy_mae.to_string(),
            optional(eval.cumulative_energy_mape),
            optional(eval.cumulative_energy_r2),
        ])?;
    }
    writer.flush()?;
    paths.push(evaluation_path);

    for forecast in &report.forecasts {
        let path = output_dir.join(forecast_file_name(forecast.flight_id));
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(["time", "power", "energy"])?;
        for point in &forecast.points {
            writer.write_record([
                point.time.to_string(),
                point.power.to_string(),
                point.energy.to_string(),
            ])?;
        }
        writer.flush()?;
        paths.push(path);
    }

    let skipped_path = output_dir.join("skipped.csv");
    let mut writer = csv::Writer::from_path(&skipped_path)?;
    writer.write_record(["flight_id", "stage", "kind", "message"])?;
    for skipped in &report.skipped {
        writer.write_record([
            skipped.flight_id.to_string(),
            skipped.stage.to_string(),
            skipped.kind.to_string(),
            skipped.message.clone(),
        ])?;
    }
    writer.flush()?;
    paths.push(skipped_path);

    Ok(paths)
}

/// `run_report.json` with the full report
#[cfg(feature = "json")]
pub fn export_to_json(report: &RunReport, output_dir: &Path) -> Result<PathBuf> {
    use std::io::{BufWriter, Write};

    let path = output_dir.join("run_report.json");
    let file = std::fs::File::create(&path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(path)
}
