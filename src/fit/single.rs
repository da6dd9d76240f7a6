//! Single-Lorentzian fit with data-derived seeds.

use tracing::debug;

use crate::domain::{Bounds, FitOutcome, LorentzianGuess, LorentzianParams};
use crate::error::{FitError, FitResult};
use crate::fit::fitter::{curve_fit, validate_series};
use crate::math::{LmOptions, argmax, min_max, span};
use crate::models::lorentzian_flat;

/// Fraction of the x-span used as the default width seed.
const DEFAULT_FWHM_FRACTION: f64 = 0.2;

/// Fill the missing fields of `guess` from the data.
///
/// - `x0`: x at the maximum of y
/// - `y0`: minimum of y
/// - `amp`: `max(y) − min(y)`
/// - `fwhm`: `0.2·|x[last] − x[first]|`
pub fn lorentzian_seed(x: &[f64], y: &[f64], guess: &LorentzianGuess) -> FitResult<LorentzianParams> {
    validate_series(x, y, 1)?;
    let i_max = argmax(y).ok_or_else(|| FitError::shape("empty series"))?;
    let (y_min, y_max) = min_max(y).ok_or_else(|| FitError::shape("empty series"))?;

    Ok(LorentzianParams {
        x0: guess.x0.unwrap_or(x[i_max]),
        y0: guess.y0.unwrap_or(y_min),
        amp: guess.amp.unwrap_or(y_max - y_min),
        fwhm: guess.fwhm.unwrap_or(DEFAULT_FWHM_FRACTION * span(x)),
    })
}

/// Fit one Lorentzian to `(x, y)` with default solver options.
pub fn fit_lorentzian(
    x: &[f64],
    y: &[f64],
    guess: &LorentzianGuess,
    bounds: Option<&Bounds>,
) -> FitResult<FitOutcome<LorentzianParams>> {
    fit_lorentzian_with(x, y, guess, bounds, &LmOptions::default())
}

/// Fit one Lorentzian to `(x, y)`.
///
/// The reported `fwhm` is non-negative; a width that collapses to zero is a
/// degenerate fit.
pub fn fit_lorentzian_with(
    x: &[f64],
    y: &[f64],
    guess: &LorentzianGuess,
    bounds: Option<&Bounds>,
    opts: &LmOptions,
) -> FitResult<FitOutcome<LorentzianParams>> {
    validate_series(x, y, LorentzianParams::LEN)?;
    let seed = lorentzian_seed(x, y, guess)?;
    debug!(?seed, "lorentzian seed");

    let x_scale = span(x);
    let y_scale = min_max(y).map(|(lo, hi)| hi - lo).unwrap_or(1.0);
    let scales = [x_scale, y_scale, y_scale, x_scale];

    let mut fit = curve_fit(lorentzian_flat, x, y, &seed.to_array(), &scales, bounds, opts)?;
    fit.fold_sign(3);

    let params = LorentzianParams::from_slice(&fit.params);
    if params.fwhm == 0.0 {
        return Err(FitError::degenerate("fitted Lorentzian width collapsed to zero"));
    }

    Ok(FitOutcome {
        params,
        covariance: fit.covariance,
        quality: fit.quality,
    })
}
