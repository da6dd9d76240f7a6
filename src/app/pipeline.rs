//! Shared pipeline steps used by the CLI subcommands.
//!
//! Each step is: load trace -> fit/calibrate -> hand the result back. The
//! caller (`app`) focuses on presentation and exports.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::domain::{
    AnalysisConfig, FitOutcome, LorentzianGuess, LorentzianParams, Trace, TripletParams, TripletSeed,
};
use crate::error::{AppError, FitError};
use crate::fit::{
    Calibration, Linewidth, calibrate_x_with, fit_lorentzian_triplet_with, fit_lorentzian_with, get_linewidth_with,
    normalize_transmission_dip,
};
use crate::io::ingest::{IngestedTrace, load_trace};
use crate::math::{argmin, min_max};
use crate::report::{BatchLine, print_status};

/// Width of the batch progress bar.
const PROGRESS_WIDTH: usize = 40;

/// Fill the dip-related seeds for a single-Lorentzian fit.
///
/// The default seeds assume a peak; for a dip the center goes to the minimum
/// and the amplitude is negative.
pub fn dip_guess(trace: &Trace, guess: LorentzianGuess) -> LorentzianGuess {
    let (Some(i_min), Some((y_min, y_max))) = (argmin(&trace.y), min_max(&trace.y)) else {
        return guess;
    };
    LorentzianGuess {
        x0: guess.x0.or(Some(trace.x[i_min])),
        y0: guess.y0.or(Some(y_max)),
        amp: guess.amp.or(Some(y_min - y_max)),
        fwhm: guess.fwhm,
    }
}

pub fn run_lorentzian(
    input: &Path,
    y_in_db: bool,
    guess: LorentzianGuess,
    config: &AnalysisConfig,
) -> Result<(IngestedTrace, FitOutcome<LorentzianParams>), AppError> {
    let ingested = load_trace(input, y_in_db)?;
    let trace = &ingested.trace;
    let guess = if config.invert { dip_guess(trace, guess) } else { guess };

    let fit = fit_lorentzian_with(&trace.x, &trace.y, &guess, None, &config.solver)?;
    info!(
        x0 = fit.params.x0,
        fwhm = fit.params.fwhm,
        iterations = fit.quality.iterations,
        "lorentzian fit"
    );
    Ok((ingested, fit))
}

pub fn run_triplet(
    input: &Path,
    y_in_db: bool,
    seed: &TripletSeed,
    config: &AnalysisConfig,
) -> Result<(IngestedTrace, FitOutcome<TripletParams>), AppError> {
    let ingested = load_trace(input, y_in_db)?;
    let trace = &ingested.trace;

    let fit = fit_lorentzian_triplet_with(&trace.x, &trace.y, seed, &config.solver)?;
    info!(
        x0 = fit.params.center.x0,
        xl = fit.params.left.x,
        xr = fit.params.right.x,
        iterations = fit.quality.iterations,
        "triplet fit"
    );
    Ok((ingested, fit))
}

pub fn run_calibration(
    input: &Path,
    y_in_db: bool,
    config: &AnalysisConfig,
) -> Result<(IngestedTrace, Calibration), AppError> {
    let eom = require_eom(config)?;
    let ingested = load_trace(input, y_in_db)?;
    let trace = &ingested.trace;

    let cal = calibrate_x_with(&trace.x, &trace.y, eom, config.invert, &config.solver)?;
    info!(offset = cal.offset, scale = cal.scale, "x-axis calibrated");
    Ok((ingested, cal))
}

pub fn run_linewidth(
    input: &Path,
    y_in_db: bool,
    config: &AnalysisConfig,
) -> Result<(IngestedTrace, Linewidth), AppError> {
    let eom = require_eom(config)?;
    let ingested = load_trace(input, y_in_db)?;
    let trace = &ingested.trace;

    let lw = get_linewidth_with(&trace.x, &trace.y, eom, config.invert, &config.solver)?;
    info!(fwhm = lw.fwhm, fwhm_err = lw.fwhm_err, "linewidth");
    Ok((ingested, lw))
}

pub fn run_normalize(
    input: &Path,
    baseline: &Path,
    y_in_db: bool,
) -> Result<(IngestedTrace, Vec<f64>), AppError> {
    let ingested = load_trace(input, y_in_db)?;
    let reference = load_trace(baseline, y_in_db)?;
    let trace = &ingested.trace;

    let normalized = normalize_transmission_dip(&trace.x, &trace.y, &reference.trace.y)?;
    info!(points = normalized.len(), baseline_points = reference.trace.len(), "dip normalized");
    Ok((ingested, normalized))
}

/// Linewidths for many traces, fitted in parallel.
///
/// Failures are reported per trace; the batch itself only fails when the EOM
/// frequency is missing. Output order follows `inputs`.
pub fn run_batch(
    inputs: &[impl AsRef<Path> + Sync],
    y_in_db: bool,
    config: &AnalysisConfig,
    show_progress: bool,
) -> Result<Vec<BatchLine>, AppError> {
    let eom = require_eom(config)?;
    let done = AtomicUsize::new(0);
    let total = inputs.len();

    let lines: Vec<BatchLine> = inputs
        .par_iter()
        .map(|input| {
            let path = input.as_ref();
            let outcome = load_trace(path, y_in_db)
                .and_then(|t| {
                    get_linewidth_with(&t.trace.x, &t.trace.y, eom, config.invert, &config.solver)
                        .map_err(AppError::from)
                })
                .map(|lw| (lw.fwhm, lw.fwhm_err))
                .map_err(|e| {
                    warn!(path = %path.display(), error = %e, "batch trace failed");
                    e.to_string()
                });

            let step = done.fetch_add(1, Ordering::Relaxed) + 1;
            if show_progress {
                print_status(step, total, PROGRESS_WIDTH);
            }
            BatchLine {
                source: path.display().to_string(),
                outcome,
            }
        })
        .collect();

    let ok = lines.iter().filter(|l| l.outcome.is_ok()).count();
    info!(ok, total, "batch finished");
    Ok(lines)
}

fn require_eom(config: &AnalysisConfig) -> Result<f64, AppError> {
    config
        .eom_frequency
        .ok_or_else(|| AppError::from(FitError::degenerate("EOM frequency is required for calibration")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SyntheticSpec, generate_triplet_trace};
    use crate::io::write_xy_csv;

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("lsfit-pipeline-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn clean_dip_spec() -> SyntheticSpec {
        let mut spec = SyntheticSpec {
            noise_sigma: 0.0,
            ..SyntheticSpec::default()
        };
        spec.params.center.amp = -spec.params.center.amp;
        spec.params.left.amp = -spec.params.left.amp;
        spec.params.right.amp = -spec.params.right.amp;
        spec
    }

    #[test]
    fn dip_guess_seeds_at_minimum() {
        let trace = Trace::new(vec![0.0, 1.0, 2.0], vec![1.0, 0.2, 1.0]).unwrap();
        let g = dip_guess(&trace, LorentzianGuess::default());
        assert_eq!(g.x0, Some(1.0));
        assert_eq!(g.y0, Some(1.0));
        assert!((g.amp.unwrap() + 0.8).abs() < 1e-12);
        assert_eq!(g.fwhm, None);
    }

    #[test]
    fn batch_keeps_input_order_and_reports_failures() {
        let dir = temp_dir("batch");
        let trace = generate_triplet_trace(&clean_dip_spec()).unwrap();
        let good = dir.join("good.csv");
        write_xy_csv(&good, &trace.x, &[&trace.y]).unwrap();
        let missing = dir.join("missing.csv");

        let config = AnalysisConfig {
            eom_frequency: Some(10.0),
            ..AnalysisConfig::default()
        };
        let lines = run_batch(&[good.clone(), missing.clone()], false, &config, false).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].source, good.display().to_string());
        let (fwhm, _) = lines[0].outcome.clone().unwrap();
        // 0.1 raw units at 20 MHz per unit of sideband separation.
        assert!((fwhm - 2.0).abs() < 0.05, "fwhm {fwhm}");
        assert!(lines[1].outcome.is_err());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn calibration_without_eom_is_rejected() {
        let config = AnalysisConfig::default();
        let err = run_calibration(Path::new("unused.csv"), false, &config).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
