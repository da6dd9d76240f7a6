//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - initialises logging
//! - runs the requested fit / calibration pipeline
//! - prints reports/plots
//! - writes optional exports

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{
    BatchArgs, CalibrateArgs, Cli, Command, EnbwArgs, FitArgs, LinewidthArgs, NormalizeArgs, OutputArgs, PlotArgs,
    SimulateArgs, TripletArgs,
};
use crate::data::{SyntheticSpec, generate_triplet_trace};
use crate::domain::{AnalysisConfig, TripletSeed};
use crate::error::AppError;
use crate::io::{FitReport, read_fit_json, timestamp, write_fit_json, write_xy_csv};
use crate::math::{LmOptions, kaiser_enbw};
use crate::models::{lorentzian_flat, lorentzian_triplet};
use crate::plot::{render_ascii_plot, render_ascii_plot_from_report};
use crate::report::residual_stats;

pub mod pipeline;

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "LSFIT_LOG";

/// Entry point for the `lsfit` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine; the environment and flags still apply.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Triplet(args) => handle_triplet(args),
        Command::Calibrate(args) => handle_calibrate(args),
        Command::Linewidth(args) => handle_linewidth(args),
        Command::Normalize(args) => handle_normalize(args),
        Command::Batch(args) => handle_batch(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Enbw(args) => handle_enbw(args),
        Command::Plot(args) => handle_plot(args),
    }
}

/// Install the stderr subscriber. `LSFIT_LOG` wins over `-v` flags.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));
    // Ignore "already initialised" (e.g. when embedded in a test harness).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = analysis_config(&args.output, None, args.invert)?;
    let (ingested, fit) = pipeline::run_lorentzian(&args.trace.input, args.trace.db, args.guess(), &config)?;
    let source = args.trace.input.display().to_string();

    println!("{}", crate::report::format_lorentzian_summary(&source, &fit));

    let trace = &ingested.trace;
    let p = fit.params.to_array();
    let model = |x: f64| lorentzian_flat(x, &p);
    if let Some(stats) = residual_stats(&trace.x, &trace.y, model) {
        println!("{}", crate::report::format_residuals(&stats));
    }
    if config.plot {
        println!(
            "{}",
            render_ascii_plot(&trace.x, &trace.y, Some(model), config.plot_width, config.plot_height)
        );
    }
    if let Some(path) = &config.export_json {
        write_fit_json(path, &FitReport::from_lorentzian(&fit, &trace.x))?;
        info!(path = %path.display(), "fit exported");
    }
    Ok(())
}

fn handle_triplet(args: TripletArgs) -> Result<(), AppError> {
    let config = analysis_config(&args.output, None, args.inverted)?;
    let seed = TripletSeed::from_guess(args.seeds.guess(), args.inverted);
    debug!(?seed, "triplet seeding");

    let (ingested, fit) = pipeline::run_triplet(&args.trace.input, args.trace.db, &seed, &config)?;
    let source = args.trace.input.display().to_string();
    println!("{}", crate::report::format_triplet_summary(&source, &fit));

    let trace = &ingested.trace;
    let p = fit.params.to_array();
    let model = |x: f64| lorentzian_triplet(x, &p);
    if let Some(stats) = residual_stats(&trace.x, &trace.y, model) {
        println!("{}", crate::report::format_residuals(&stats));
    }
    if config.plot {
        println!(
            "{}",
            render_ascii_plot(&trace.x, &trace.y, Some(model), config.plot_width, config.plot_height)
        );
    }
    if let Some(path) = &config.export_json {
        write_fit_json(path, &FitReport::from_triplet(&fit, &trace.x))?;
        info!(path = %path.display(), "fit exported");
    }
    Ok(())
}

fn handle_calibrate(args: CalibrateArgs) -> Result<(), AppError> {
    let config = analysis_config(&args.output, Some(args.eom.eom_frequency), !args.eom.no_invert)?;
    let (ingested, cal) = pipeline::run_calibration(&args.trace.input, args.trace.db, &config)?;
    let source = args.trace.input.display().to_string();
    println!("{}", crate::report::format_calibration_summary(&source, &cal));

    let trace = &ingested.trace;
    let out = args
        .out
        .unwrap_or_else(|| PathBuf::from(format!("calibrated_{}.csv", timestamp())));
    write_xy_csv(&out, &cal.x, &[&trace.y])?;
    println!("Calibrated trace written to {}", out.display());

    if config.plot {
        println!(
            "{}",
            render_ascii_plot(&cal.x, &trace.y, None::<fn(f64) -> f64>, config.plot_width, config.plot_height)
        );
    }
    if let Some(path) = &config.export_json {
        write_fit_json(path, &FitReport::from_calibration(&cal, &trace.x))?;
    }
    Ok(())
}

fn handle_linewidth(args: LinewidthArgs) -> Result<(), AppError> {
    let config = analysis_config(&args.output, Some(args.eom.eom_frequency), !args.eom.no_invert)?;
    let (ingested, lw) = pipeline::run_linewidth(&args.trace.input, args.trace.db, &config)?;
    let source = args.trace.input.display().to_string();
    println!("{}", crate::report::format_linewidth_summary(&source, &lw));

    if config.plot {
        // Plot in the frame the carrier was fitted in.
        let sign = if config.invert { -1.0 } else { 1.0 };
        let half_window = crate::fit::LINEWIDTH_WINDOW * lw.calibration.eom_frequency;
        let (wx, wy): (Vec<f64>, Vec<f64>) = lw
            .calibration
            .x
            .iter()
            .zip(&ingested.trace.y)
            .filter(|(x, _)| x.abs() <= half_window)
            .map(|(&x, &y)| (x, sign * y))
            .unzip();
        let p = lw.peak.params.to_array();
        let model = |x: f64| lorentzian_flat(x, &p);
        println!(
            "{}",
            render_ascii_plot(&wx, &wy, Some(model), config.plot_width, config.plot_height)
        );
    }
    if let Some(path) = &config.export_json {
        write_fit_json(path, &FitReport::from_linewidth(&lw))?;
    }
    Ok(())
}

fn handle_normalize(args: NormalizeArgs) -> Result<(), AppError> {
    let config = analysis_config(&args.output, None, true)?;
    let (ingested, normalized) = pipeline::run_normalize(&args.trace.input, &args.baseline, args.trace.db)?;

    let trace = &ingested.trace;
    let out = args
        .out
        .unwrap_or_else(|| PathBuf::from(format!("normalized_{}.csv", timestamp())));
    write_xy_csv(&out, &trace.x, &[&normalized])?;
    println!("Normalized trace written to {}", out.display());

    if config.plot {
        println!(
            "{}",
            render_ascii_plot(&trace.x, &normalized, None::<fn(f64) -> f64>, config.plot_width, config.plot_height)
        );
    }
    Ok(())
}

fn handle_batch(args: BatchArgs) -> Result<(), AppError> {
    let config = AnalysisConfig {
        eom_frequency: Some(args.eom.eom_frequency),
        invert: !args.eom.no_invert,
        solver: load_solver_options(args.solver_config.as_deref())?,
        ..AnalysisConfig::default()
    };
    let lines = pipeline::run_batch(&args.inputs, args.db, &config, !args.quiet)?;
    println!("{}", crate::report::format_batch_table(&lines));

    if let Some(path) = &args.export_csv {
        write_batch_csv(path, &lines)?;
    }
    if lines.iter().all(|l| l.outcome.is_err()) {
        return Err(AppError::new(4, "No trace in the batch could be fitted."));
    }
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let mut spec = SyntheticSpec {
        n_points: args.points,
        x_min: args.x_min,
        x_max: args.x_max,
        noise_sigma: args.noise,
        seed: args.seed,
        ..SyntheticSpec::default()
    };
    if args.dip {
        spec.params.center.amp = -spec.params.center.amp;
        spec.params.left.amp = -spec.params.left.amp;
        spec.params.right.amp = -spec.params.right.amp;
    }

    let trace = generate_triplet_trace(&spec)?;
    write_xy_csv(&args.out, &trace.x, &[&trace.y])?;
    println!("Synthetic trace ({} points) written to {}", trace.len(), args.out.display());

    if args.plot {
        let p = spec.params;
        println!(
            "{}",
            render_ascii_plot(&trace.x, &trace.y, Some(|x: f64| p.eval(x)), 100, 25)
        );
    }
    Ok(())
}

fn handle_enbw(args: EnbwArgs) -> Result<(), AppError> {
    let enbw = kaiser_enbw(args.samples, args.acquisition_time)?;
    println!("ENBW: {enbw:.6} Hz ({} samples over {} s)", args.samples, args.acquisition_time);
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let report = read_fit_json(&args.report)?;
    if report.grid.x.is_empty() {
        return Err(AppError::new(3, "Fit report has no fitted grid to plot."));
    }
    println!("{} fit from {}", report.model.display_name(), report.created_utc);
    println!("{}", render_ascii_plot_from_report(&report, args.width, args.height));
    Ok(())
}

/// Build the run configuration from shared output flags.
pub fn analysis_config(output: &OutputArgs, eom_frequency: Option<f64>, invert: bool) -> Result<AnalysisConfig, AppError> {
    Ok(AnalysisConfig {
        eom_frequency,
        invert,
        solver: load_solver_options(output.solver_config.as_deref())?,
        plot: output.plot,
        plot_width: output.width,
        plot_height: output.height,
        export_json: output.export_json.clone(),
    })
}

/// Read solver settings from JSON; missing keys keep their defaults.
pub fn load_solver_options(path: Option<&Path>) -> Result<LmOptions, AppError> {
    let Some(path) = path else {
        return Ok(LmOptions::default());
    };
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read solver config '{}': {e}", path.display())))?;
    let opts: LmOptions = serde_json::from_str(&text)
        .map_err(|e| AppError::new(2, format!("Invalid solver config '{}': {e}", path.display())))?;
    debug!(?opts, "solver options");
    Ok(opts)
}

fn write_batch_csv(path: &Path, lines: &[crate::report::BatchLine]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create batch CSV '{}': {e}", path.display())))?;
    writer
        .write_record(["trace", "fwhm", "fwhm_err", "error"])
        .map_err(|e| AppError::new(2, format!("Failed to write batch CSV header: {e}")))?;
    for line in lines {
        let record = match &line.outcome {
            Ok((fwhm, err)) => [line.source.clone(), fwhm.to_string(), err.to_string(), String::new()],
            Err(msg) => [line.source.clone(), String::new(), String::new(), msg.clone()],
        };
        writer
            .write_record(&record)
            .map_err(|e| AppError::new(2, format!("Failed to write batch CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush batch CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solver_config_keeps_defaults_for_missing_keys() {
        let dir = std::env::temp_dir().join(format!("lsfit-app-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("solver.json");
        fs::write(&path, r#"{ "max_iterations": 50 }"#).unwrap();

        let opts = load_solver_options(Some(&path)).unwrap();
        assert_eq!(opts.max_iterations, 50);
        assert_eq!(opts.xtol, LmOptions::default().xtol);

        fs::write(&path, "not json").unwrap();
        assert_eq!(load_solver_options(Some(&path)).unwrap_err().exit_code(), 2);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn no_solver_config_means_defaults() {
        assert_eq!(load_solver_options(None).unwrap(), LmOptions::default());
    }
}
