//! CLI binary for UAV Power Forecast
//!
//! Loads a data directory, trains the selected model family on the flights
//! admitted by the filters, scores it on the test flights and forecasts the
//! requested flights.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use uav_power_forecast::{
    crate_version, export_reports, load_flight_data, DataPaths, FilterSet, FlightId, ForecastEngine,
    ModelFamily, ReportOptions, RunConfig, RunReport,
};

fn build_command() -> Command {
    Command::new("UAV Power Forecast")
        .version(crate_version())
        .about("Train, evaluate and apply power/energy models for multirotor UAV flights.")
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .help("Data directory holding flights/<id>.csv and parameters.csv")
                .value_name("DIR")
                .default_value("data"),
        )
        .arg(
            Arg::new("flights")
                .long("flights")
                .help("Directory of per-flight tables (overrides <data-dir>/flights)")
                .value_name("DIR"),
        )
        .arg(
            Arg::new("parameters")
                .long("parameters")
                .help("Parameter table (overrides <data-dir>/parameters.csv)")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("JSON run configuration; command-line filters and IDs are added to it")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("filter")
                .long("filter")
                .help("Parameter filter, e.g. payload=500, payload>=250, payload=0..500, route=R1,R2")
                .value_name("RULE")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("test")
                .long("test")
                .help("Held-out flight ID to evaluate (repeatable)")
                .value_name("ID")
                .value_parser(value_parser!(FlightId))
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("forecast")
                .long("forecast")
                .help("Flight ID to forecast (repeatable)")
                .value_name("ID")
                .value_parser(value_parser!(FlightId))
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .help("Model family: mean, linear or power-law")
                .value_name("FAMILY")
                .default_value("power-law"),
        )
        .arg(
            Arg::new("csv")
                .long("csv")
                .help("Write evaluation.csv, forecast_<id>.csv and skipped.csv")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Write run_report.json")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .help("Directory for report files (default: current directory)")
                .value_name("DIR"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Enable debug output")
                .action(ArgAction::SetTrue),
        )
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "json")]
fn read_config(path: &Path) -> Result<RunConfig> {
    RunConfig::from_json_file(path).with_context(|| format!("Failed to read run configuration: {:?}", path))
}

#[cfg(not(feature = "json"))]
fn read_config(path: &Path) -> Result<RunConfig> {
    anyhow::bail!(
        "Cannot read {:?}: run configuration files need the json feature",
        path
    )
}

fn print_report(report: &RunReport) {
    println!();
    println!(
        "Model: {} ({} samples from {} flights)",
        report.model.family(),
        report.training_samples,
        report.training_flights.len()
    );
    for coefficient in report.model.coefficients() {
        println!("  {:<16} {:>14.6}", coefficient.name, coefficient.value);
    }

    if !report.evaluation.flights.is_empty() {
        println!();
        println!("Evaluation:");
        for eval in &report.evaluation.flights {
            let ape = eval
                .energy_ape
                .map(|a| format!("{:.1}%", a))
                .unwrap_or_else(|| "n/a".to_string());
            println!(
                "  flight {:>4}: power MAE {:8.2} W  RMSE {:8.2} W  energy {:10.1} J (predicted {:10.1} J, error {})",
                eval.flight_id, eval.power_mae, eval.power_rmse, eval.energy_actual, eval.energy_predicted, ape
            );
        }
        if let Some(aggregate) = &report.evaluation.aggregate {
            println!(
                "  overall ({} flights): power MAE {:.2} W  RMSE {:.2} W  energy MAE {:.1} J",
                aggregate.flights, aggregate.power_mae, aggregate.power_rmse, aggregate.energy_mae
            );
        }
        if report.evaluation.has_leakage() {
            println!(
                "  warning: flights {:?} were also used for training",
                report.evaluation.leaked
            );
        }
    }

    if !report.forecasts.is_empty() {
        println!();
        println!("Forecasts:");
        for forecast in &report.forecasts {
            println!(
                "  flight {:>4}: {:10.1} J over {:.1} s (mean {:.1} W)",
                forecast.flight_id,
                forecast.total_energy,
                forecast.duration_seconds(),
                forecast.mean_power()
            );
        }
    }

    if !report.skipped.is_empty() {
        println!();
        println!("Skipped:");
        for skipped in &report.skipped {
            println!(
                "  flight {:>4} [{}] {}: {}",
                skipped.flight_id, skipped.stage, skipped.kind, skipped.message
            );
        }
    }
}

fn main() -> Result<()> {
    let matches = build_command().get_matches();

    let debug = matches.get_flag("debug");
    init_logging(debug);

    let data_dir = matches
        .get_one::<String>("data-dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));
    let mut paths = DataPaths::from_data_dir(&data_dir);
    if let Some(flights) = matches.get_one::<String>("flights") {
        paths.flights_dir = PathBuf::from(flights);
    }
    if let Some(parameters) = matches.get_one::<String>("parameters") {
        paths.parameters = PathBuf::from(parameters);
    }

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => read_config(Path::new(path))?,
        None => RunConfig::default(),
    };

    let rules: Vec<&str> = matches
        .get_many::<String>("filter")
        .map(|values| values.map(String::as_str).collect())
        .unwrap_or_default();
    for (parameter, rule) in FilterSet::parse(rules)?.iter() {
        config.filters.insert(parameter.clone(), rule.clone());
    }
    if let Some(ids) = matches.get_many::<FlightId>("test") {
        config.test_ids.extend(ids.copied());
    }
    if let Some(ids) = matches.get_many::<FlightId>("forecast") {
        config.forecast_ids.extend(ids.copied());
    }

    let family: ModelFamily = matches
        .get_one::<String>("model")
        .map(String::as_str)
        .unwrap_or("power-law")
        .parse()?;

    let report_options = ReportOptions {
        csv: matches.get_flag("csv"),
        json: matches.get_flag("json"),
        output_dir: matches.get_one::<String>("output-dir").cloned(),
    };

    println!("Loading: {}", paths.flights_dir.display());
    let outcome = load_flight_data(&paths)?;
    println!(
        "Loaded {} flights ({} files rejected)",
        outcome.pool.len(),
        outcome.rejected.len()
    );
    for rejected in &outcome.rejected {
        eprintln!("Warning: {}: {}", rejected.path.display(), rejected.reason);
    }

    if outcome.pool.is_empty() {
        eprintln!("Error: No flights were loaded from {:?}", paths.flights_dir);
        std::process::exit(1);
    }

    let engine = ForecastEngine::new(outcome.pool, family);
    let report = engine.run(&config).context("Run failed")?;
    print_report(&report);

    let exported = export_reports(&report, &report_options)?;
    if !exported.paths.is_empty() {
        println!();
        for path in &exported.paths {
            println!("Exported: {}", path.display());
        }
    }

    Ok(())
}
