//! Ten-parameter Lorentzian triplet fit.

use tracing::debug;

use crate::domain::{FitOutcome, TripletParams, TripletSeed};
use crate::error::{FitError, FitResult};
use crate::fit::estimate::{estimate_triplet, explicit_triplet_seed};
use crate::fit::fitter::{curve_fit, validate_series};
use crate::math::{LmOptions, min_max, span};
use crate::models::lorentzian_triplet;

/// Indices of the three widths in the flat parameter vector.
const WIDTH_INDICES: [usize; 3] = [3, 6, 9];

/// Fit the triplet model with default solver options.
pub fn fit_lorentzian_triplet(x: &[f64], y: &[f64], seed: &TripletSeed) -> FitResult<FitOutcome<TripletParams>> {
    fit_lorentzian_triplet_with(x, y, seed, &LmOptions::default())
}

/// Fit the triplet model.
///
/// `TripletSeed::AutoEstimate` walks the data for seeds (peak or dip);
/// `TripletSeed::Explicit` uses the caller's seeds and fixed fallbacks only.
pub fn fit_lorentzian_triplet_with(
    x: &[f64],
    y: &[f64],
    seed: &TripletSeed,
    opts: &LmOptions,
) -> FitResult<FitOutcome<TripletParams>> {
    validate_series(x, y, TripletParams::LEN)?;

    let start = match seed {
        TripletSeed::AutoEstimate { inverted } => estimate_triplet(x, y, *inverted)?,
        TripletSeed::Explicit(guess) => explicit_triplet_seed(x, y, guess)?,
    };
    debug!(?start, "triplet start");

    let xs = span(x);
    let ys = min_max(y).map(|(lo, hi)| hi - lo).unwrap_or(1.0);
    let scales = [xs, ys, ys, xs, xs, ys, xs, xs, ys, xs];

    let mut fit = curve_fit(lorentzian_triplet, x, y, &start.to_array(), &scales, None, opts)?;
    for idx in WIDTH_INDICES {
        fit.fold_sign(idx);
    }

    let params = TripletParams::from_slice(&fit.params);
    if params.center.fwhm == 0.0 {
        return Err(FitError::degenerate("fitted central width collapsed to zero"));
    }

    Ok(FitOutcome {
        params,
        covariance: fit.covariance,
        quality: fit.quality,
    })
}
