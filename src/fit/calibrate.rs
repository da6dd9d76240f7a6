//! Frequency calibration from EOM sidebands and linewidth extraction.
//!
//! The phase modulator puts two sidebands at exactly `±eom_frequency` from the
//! carrier. Fitting the triplet gives their positions in raw sweep units, which
//! fixes a linear map from sweep units to frequency:
//!
//! ```text
//! x_cal = (x − x0) / (xr − xl) · 2·eom_frequency
//! ```

use tracing::debug;

use crate::domain::{Bounds, FitOutcome, LorentzianGuess, LorentzianParams, Trace, TripletParams, TripletSeed};
use crate::error::{FitError, FitResult};
use crate::fit::fitter::validate_series;
use crate::fit::single::fit_lorentzian_with;
use crate::fit::triplet::fit_lorentzian_triplet_with;
use crate::math::{LmOptions, mean};

/// Half-width of the window (in units of `eom_frequency`) kept around the
/// carrier for the linewidth fit.
pub const LINEWIDTH_WINDOW: f64 = 0.5;

/// Bound on the carrier position (in units of `eom_frequency`) during the
/// linewidth fit.
pub const CENTER_TOLERANCE: f64 = 0.1;

/// A calibrated x-axis and the triplet fit it came from.
#[derive(Debug, Clone)]
pub struct Calibration {
    /// Calibrated x values, same order as the input.
    pub x: Vec<f64>,
    /// Raw x that maps to zero (fitted carrier position).
    pub offset: f64,
    /// Calibrated units per raw unit.
    pub scale: f64,
    pub eom_frequency: f64,
    pub triplet: FitOutcome<TripletParams>,
}

impl Calibration {
    /// Map a raw x value to calibrated units.
    pub fn apply(&self, x: f64) -> f64 {
        (x - self.offset) * self.scale
    }
}

/// Calibrated linewidth of the carrier.
#[derive(Debug, Clone)]
pub struct Linewidth {
    /// Full width at half maximum in calibrated units.
    pub fwhm: f64,
    /// One-sigma uncertainty of `fwhm`.
    pub fwhm_err: f64,
    pub peak: FitOutcome<LorentzianParams>,
    pub calibration: Calibration,
}

/// Calibrate `x` using the sidebands of the triplet in `(x, y)`.
///
/// `invert` negates y first, for transmission dips.
pub fn calibrate_x(x: &[f64], y: &[f64], eom_frequency: f64, invert: bool) -> FitResult<Calibration> {
    calibrate_x_with(x, y, eom_frequency, invert, &LmOptions::default())
}

pub fn calibrate_x_with(
    x: &[f64],
    y: &[f64],
    eom_frequency: f64,
    invert: bool,
    opts: &LmOptions,
) -> FitResult<Calibration> {
    if !(eom_frequency.is_finite() && eom_frequency > 0.0) {
        return Err(FitError::degenerate(format!(
            "EOM frequency must be positive (got {eom_frequency})"
        )));
    }
    validate_series(x, y, TripletParams::LEN)?;

    let work: Vec<f64> = if invert { y.iter().map(|v| -v).collect() } else { y.to_vec() };
    let triplet = fit_lorentzian_triplet_with(x, &work, &TripletSeed::AutoEstimate { inverted: false }, opts)?;

    let separation = triplet.params.sideband_separation();
    if !(separation.is_finite() && separation > 0.0) {
        return Err(FitError::degenerate(format!(
            "sideband separation must be positive (xl={}, xr={})",
            triplet.params.left.x, triplet.params.right.x
        )));
    }

    let offset = triplet.params.center.x0;
    let scale = 2.0 * eom_frequency / separation;
    debug!(offset, scale, separation, "x-axis calibration");

    Ok(Calibration {
        x: x.iter().map(|&v| (v - offset) * scale).collect(),
        offset,
        scale,
        eom_frequency,
        triplet,
    })
}

/// Calibrated carrier linewidth.
///
/// Calibrates the axis, keeps `|x_cal| <= 0.5·eom_frequency`, and fits a single
/// Lorentzian with its center bounded to `±0.1·eom_frequency` of zero.
pub fn get_linewidth(x: &[f64], y: &[f64], eom_frequency: f64, invert: bool) -> FitResult<Linewidth> {
    get_linewidth_with(x, y, eom_frequency, invert, &LmOptions::default())
}

pub fn get_linewidth_with(
    x: &[f64],
    y: &[f64],
    eom_frequency: f64,
    invert: bool,
    opts: &LmOptions,
) -> FitResult<Linewidth> {
    let calibration = calibrate_x_with(x, y, eom_frequency, invert, opts)?;

    let half_window = LINEWIDTH_WINDOW * eom_frequency;
    let (wx, wy): (Vec<f64>, Vec<f64>) = calibration
        .x
        .iter()
        .zip(y)
        .filter(|(xc, _)| xc.abs() <= half_window)
        .map(|(&xc, &yv)| (xc, if invert { -yv } else { yv }))
        .unzip();

    let tolerance = CENTER_TOLERANCE * eom_frequency;
    let bounds = Bounds::unbounded(LorentzianParams::LEN)
        .with_param(0, -tolerance, tolerance)
        .with_param(3, 0.0, f64::INFINITY);
    let guess = LorentzianGuess {
        x0: Some(0.0),
        fwhm: Some(calibration.triplet.params.center.fwhm * calibration.scale),
        ..LorentzianGuess::default()
    };

    let peak = fit_lorentzian_with(&wx, &wy, &guess, Some(&bounds), opts)?;
    let fwhm_err = peak.std_errors()[3];
    debug!(fwhm = peak.params.fwhm, fwhm_err, "calibrated linewidth");

    Ok(Linewidth {
        fwhm: peak.params.fwhm,
        fwhm_err,
        peak,
        calibration,
    })
}

/// Normalize a transmission dip against a reference baseline.
///
/// Fits a Lorentzian to `−y` to locate the true dip minimum `y_min`, takes
/// `t_ref = mean(baseline)`, and returns `(y − t_ref) / (t_ref − y_min)`:
/// 0 at the reference transmission and −1 at the bottom of the dip.
pub fn normalize_transmission_dip(x: &[f64], y: &[f64], baseline: &[f64]) -> FitResult<Vec<f64>> {
    let t_ref = mean(baseline).ok_or_else(|| FitError::shape("baseline series is empty"))?;
    if !t_ref.is_finite() {
        return Err(FitError::shape("baseline series is not finite"));
    }

    let flipped = Trace::new(x.to_vec(), y.to_vec())?.negated();
    let fit = fit_lorentzian_with(&flipped.x, &flipped.y, &LorentzianGuess::default(), None, &LmOptions::default())?;
    let y_min = -fit.params.extremum();

    let depth = t_ref - y_min;
    if !(depth > 0.0 && depth.is_finite()) {
        return Err(FitError::degenerate(format!(
            "reference transmission {t_ref} is not above the dip minimum {y_min}"
        )));
    }

    Ok(y.iter().map(|&v| (v - t_ref) / depth).collect())
}
