//! Formatted terminal output for fits, calibrations and batch runs.
//!
//! Formatting lives here so the fitting code stays free of presentation and
//! output changes stay localized.

use crate::domain::{FitOutcome, FitQuality, LorentzianParams, ModelKind, TripletParams};
use crate::fit::{Calibration, Linewidth};
use crate::report::ResidualStats;

/// One row of a batch linewidth run.
#[derive(Debug, Clone)]
pub struct BatchLine {
    pub source: String,
    /// `(fwhm, fwhm_err)` or the error message.
    pub outcome: Result<(f64, f64), String>,
}

/// Single-Lorentzian fit summary.
pub fn format_lorentzian_summary(source: &str, fit: &FitOutcome<LorentzianParams>) -> String {
    let mut out = header(source, ModelKind::Lorentzian, &fit.quality);
    out.push_str(&format_params(
        ModelKind::Lorentzian.param_names(),
        &fit.params.to_array(),
        &fit.std_errors(),
    ));
    out.push_str(&format!("Extremum: {:.6}\n", fit.params.extremum()));
    out
}

/// Triplet fit summary.
pub fn format_triplet_summary(source: &str, fit: &FitOutcome<TripletParams>) -> String {
    let mut out = header(source, ModelKind::Triplet, &fit.quality);
    out.push_str(&format_params(
        ModelKind::Triplet.param_names(),
        &fit.params.to_array(),
        &fit.std_errors(),
    ));
    out.push_str(&format!(
        "Sideband separation: {:.6}\n",
        fit.params.sideband_separation()
    ));
    out
}

/// Axis calibration summary.
pub fn format_calibration_summary(source: &str, cal: &Calibration) -> String {
    let mut out = format_triplet_summary(source, &cal.triplet);
    out.push_str("\nCalibration:\n");
    out.push_str(&format!("- EOM frequency: {}\n", cal.eom_frequency));
    out.push_str(&format!("- offset (raw x at 0): {:.6}\n", cal.offset));
    out.push_str(&format!("- scale (per raw unit): {:.6}\n", cal.scale));
    out
}

/// Linewidth summary, in calibrated units.
pub fn format_linewidth_summary(source: &str, lw: &Linewidth) -> String {
    let mut out = header(source, ModelKind::Lorentzian, &lw.peak.quality);
    out.push_str(&format!(
        "Calibration: EOM={} | scale={:.6} | offset={:.6}\n\n",
        lw.calibration.eom_frequency, lw.calibration.scale, lw.calibration.offset
    ));
    out.push_str(&format_params(
        ModelKind::Lorentzian.param_names(),
        &lw.peak.params.to_array(),
        &lw.peak.std_errors(),
    ));
    out.push_str(&format!("Linewidth (FWHM): {}\n", fmt_value_err(lw.fwhm, lw.fwhm_err)));
    out
}

/// One-line residual diagnostics.
pub fn format_residuals(stats: &ResidualStats) -> String {
    format!(
        "Residuals: rms={:.4e} | max |r|={:.4e} at x={:.6}\n",
        stats.rms, stats.max_abs, stats.x_at_max
    )
}

/// Batch linewidth table.
pub fn format_batch_table(lines: &[BatchLine]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<32} {:>14} {:>14}", "trace", "fwhm", "fwhm_err").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<32} {:-<14} {:-<14}", "", "", "").trim_end());
    out.push('\n');

    for line in lines {
        let row = match &line.outcome {
            Ok((fwhm, err)) => format!("{:<32} {fwhm:>14.6} {err:>14.6}", truncate(&line.source, 32)),
            Err(msg) => format!("{:<32} failed: {msg}", truncate(&line.source, 32)),
        };
        out.push_str(row.trim_end());
        out.push('\n');
    }

    let ok = lines.iter().filter(|l| l.outcome.is_ok()).count();
    out.push_str(&format!("{ok}/{} traces fitted\n", lines.len()));
    out
}

fn header(source: &str, kind: ModelKind, quality: &FitQuality) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== lsfit - {} fit ===\n", kind.display_name()));
    out.push_str(&format!("Source: {source}\n"));
    out.push_str(&format!(
        "Points: n={} | SSE={:.4e} | RMSE={:.4e} | iterations={}\n\n",
        quality.n, quality.sse, quality.rmse, quality.iterations
    ));
    out
}

fn format_params(names: &[&str], values: &[f64], std_errors: &[f64]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<8} {:>16} {:>16}", "param", "value", "std_err").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<8} {:-<16} {:-<16}", "", "", "").trim_end());
    out.push('\n');
    for ((name, v), e) in names.iter().zip(values).zip(std_errors) {
        out.push_str(&format!("{name:<8} {v:>16.8} {:>16}\n", fmt_err(*e)));
    }
    out.push('\n');
    out
}

fn fmt_err(e: f64) -> String {
    if e.is_finite() { format!("{e:.3e}") } else { "inf".to_string() }
}

fn fmt_value_err(v: f64, e: f64) -> String {
    format!("{v:.6} +/- {}", fmt_err(e))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn quality() -> FitQuality {
        FitQuality {
            sse: 0.0,
            rmse: 0.0,
            n: 3,
            iterations: 1,
        }
    }

    #[test]
    fn lorentzian_summary_lists_every_param() {
        let fit = FitOutcome {
            params: LorentzianParams {
                x0: 0.0,
                y0: 1.0,
                amp: 2.0,
                fwhm: 0.5,
            },
            covariance: DMatrix::from_element(4, 4, f64::INFINITY),
            quality: quality(),
        };
        let txt = format_lorentzian_summary("trace.csv", &fit);
        assert!(txt.contains("Source: trace.csv"));
        for name in LorentzianParams::NAMES {
            assert!(txt.lines().any(|l| l.starts_with(name)), "missing {name}");
        }
        assert!(txt.contains("inf"));
        assert!(txt.contains("Extremum: 3.000000"));
    }

    #[test]
    fn batch_table_reports_failures() {
        let lines = vec![
            BatchLine {
                source: "a.csv".to_string(),
                outcome: Ok((1.5, 0.01)),
            },
            BatchLine {
                source: "b.csv".to_string(),
                outcome: Err("degenerate geometry: flat".to_string()),
            },
        ];
        let txt = format_batch_table(&lines);
        assert!(txt.contains("b.csv"));
        assert!(txt.contains("failed: degenerate geometry: flat"));
        assert!(txt.ends_with("1/2 traces fitted\n"));
    }

    #[test]
    fn residual_line() {
        let stats = ResidualStats {
            rms: 0.5,
            max_abs: 1.0,
            x_at_max: 2.0,
        };
        assert_eq!(
            format_residuals(&stats),
            "Residuals: rms=5.0000e-1 | max |r|=1.0000e0 at x=2.000000\n"
        );
    }

    #[test]
    fn truncate_long_names() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
