//! Read/write fit report JSON files.
//!
//! A fit report is the portable record of one fit:
//! - model kind + named parameters with standard errors
//! - fit quality
//! - optional calibration (EOM frequency, axis map, linewidth)
//! - a precomputed model grid for quick plotting

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{FitOutcome, FitQuality, LorentzianParams, ModelKind, TripletParams};
use crate::error::AppError;
use crate::fit::{Calibration, Linewidth};
use crate::math::min_max;
use crate::models::{eval_over, lorentzian_flat, lorentzian_triplet};

const GRID_POINTS: usize = 201;

/// One fitted parameter. `std_error` is absent when it is not finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedParam {
    pub name: String,
    pub value: f64,
    pub std_error: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationInfo {
    pub eom_frequency: f64,
    /// Raw x mapped to zero.
    pub offset: f64,
    /// Calibrated units per raw unit.
    pub scale: f64,
    pub linewidth: Option<f64>,
    pub linewidth_err: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitGrid {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub tool: String,
    pub created_utc: DateTime<Utc>,
    pub model: ModelKind,
    pub params: Vec<NamedParam>,
    pub quality: FitQuality,
    pub calibration: Option<CalibrationInfo>,
    pub grid: FitGrid,
}

impl FitReport {
    pub fn from_lorentzian(fit: &FitOutcome<LorentzianParams>, x: &[f64]) -> Self {
        build(ModelKind::Lorentzian, &fit.params.to_array(), &fit.std_errors(), fit.quality, x)
    }

    pub fn from_triplet(fit: &FitOutcome<TripletParams>, x: &[f64]) -> Self {
        build(ModelKind::Triplet, &fit.params.to_array(), &fit.std_errors(), fit.quality, x)
    }

    /// Triplet report plus the axis calibration derived from it.
    pub fn from_calibration(cal: &Calibration, raw_x: &[f64]) -> Self {
        let mut report = Self::from_triplet(&cal.triplet, raw_x);
        report.calibration = Some(CalibrationInfo {
            eom_frequency: cal.eom_frequency,
            offset: cal.offset,
            scale: cal.scale,
            linewidth: None,
            linewidth_err: None,
        });
        report
    }

    /// Carrier fit in calibrated units plus the linewidth.
    pub fn from_linewidth(lw: &Linewidth) -> Self {
        let window: Vec<f64> = lw
            .calibration
            .x
            .iter()
            .copied()
            .filter(|v| v.abs() <= crate::fit::LINEWIDTH_WINDOW * lw.calibration.eom_frequency)
            .collect();
        let mut report = Self::from_lorentzian(&lw.peak, &window);
        report.calibration = Some(CalibrationInfo {
            eom_frequency: lw.calibration.eom_frequency,
            offset: lw.calibration.offset,
            scale: lw.calibration.scale,
            linewidth: Some(lw.fwhm),
            linewidth_err: lw.fwhm_err.is_finite().then_some(lw.fwhm_err),
        });
        report
    }

    /// Parameter values in model order.
    pub fn values(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.value).collect()
    }
}

fn build(kind: ModelKind, values: &[f64], std_errors: &[f64], quality: FitQuality, x: &[f64]) -> FitReport {
    let params = kind
        .param_names()
        .iter()
        .zip(values)
        .zip(std_errors)
        .map(|((name, &value), &err)| NamedParam {
            name: (*name).to_string(),
            value,
            std_error: err.is_finite().then_some(err),
        })
        .collect();

    FitReport {
        tool: "lsfit".to_string(),
        created_utc: Utc::now(),
        model: kind,
        params,
        quality,
        calibration: None,
        grid: build_grid(kind, values, x),
    }
}

fn build_grid(kind: ModelKind, values: &[f64], x: &[f64]) -> FitGrid {
    let (lo, hi) = match min_max(x) {
        Some((lo, hi)) if hi > lo => (lo, hi),
        _ => return FitGrid { x: Vec::new(), y: Vec::new() },
    };
    let xs: Vec<f64> = (0..GRID_POINTS)
        .map(|i| lo + (hi - lo) * i as f64 / (GRID_POINTS as f64 - 1.0))
        .collect();
    let y = match kind {
        ModelKind::Lorentzian => eval_over(lorentzian_flat, &xs, values),
        ModelKind::Triplet => eval_over(lorentzian_triplet, &xs, values),
    };
    FitGrid { x: xs, y }
}

/// Write a fit report JSON file.
pub fn write_fit_json(path: &Path, report: &FitReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create fit JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, report).map_err(|e| AppError::new(2, format!("Failed to write fit JSON: {e}")))?;
    Ok(())
}

/// Read a fit report JSON file.
pub fn read_fit_json(path: &Path) -> Result<FitReport, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open fit JSON '{}': {e}", path.display())))?;
    let report: FitReport =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid fit JSON: {e}")))?;
    Ok(report)
}

/// UTC timestamp for default export names, e.g. `20240131_235959`.
pub fn timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn lorentzian_outcome() -> FitOutcome<LorentzianParams> {
        FitOutcome {
            params: LorentzianParams {
                x0: 0.0,
                y0: 1.0,
                amp: 2.0,
                fwhm: 0.5,
            },
            covariance: DMatrix::from_diagonal_element(4, 4, 0.01),
            quality: FitQuality {
                sse: 1e-6,
                rmse: 1e-4,
                n: 100,
                iterations: 12,
            },
        }
    }

    #[test]
    fn report_names_params_and_samples_the_model() {
        let fit = lorentzian_outcome();
        let report = FitReport::from_lorentzian(&fit, &[-2.0, 0.0, 2.0]);

        let names: Vec<&str> = report.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["x0", "y0", "amp", "fwhm"]);
        assert!((report.params[0].std_error.unwrap() - 0.1).abs() < 1e-15);
        assert_eq!(report.grid.x.len(), GRID_POINTS);
        assert_eq!(report.grid.y[GRID_POINTS / 2], 3.0);
    }

    #[test]
    fn infinite_std_errors_are_omitted() {
        let mut fit = lorentzian_outcome();
        fit.covariance = DMatrix::from_element(4, 4, f64::INFINITY);
        let report = FitReport::from_lorentzian(&fit, &[-1.0, 1.0]);
        assert!(report.params.iter().all(|p| p.std_error.is_none()));
    }

    #[test]
    fn json_round_trip() {
        let dir = std::env::temp_dir().join(format!("lsfit-fitfile-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("fit.json");

        let report = FitReport::from_lorentzian(&lorentzian_outcome(), &[-2.0, 2.0]);
        write_fit_json(&path, &report).unwrap();
        let back = read_fit_json(&path).unwrap();
        assert_eq!(back.model, ModelKind::Lorentzian);
        assert_eq!(back.values(), report.values());
        assert_eq!(back.grid, report.grid);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn timestamp_shape() {
        let ts = timestamp();
        assert_eq!(ts.len(), 15);
        assert_eq!(&ts[8..9], "_");
        assert!(ts.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
    }
}
