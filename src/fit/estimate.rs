//! Triplet seed estimation.
//!
//! Walks the data to find the dominant feature and its two sidebands:
//!
//! 1. central feature: global extremum, baseline = opposite extremum,
//!    width = contiguous half-max run around the extremum (crossings
//!    linearly interpolated)
//! 2. exclusion window: samples within `SIDEBAND_EXCLUSION_FWHM` central
//!    widths of the center are dropped
//! 3. sidebands: extremum of the remaining left/right samples, with their own
//!    half-max width
//!
//! Dip mode runs the same walk on `−y` and mirrors the result.

use tracing::debug;

use crate::domain::{LorentzianParams, Sideband, TripletGuess, TripletParams};
use crate::error::{FitError, FitResult};
use crate::fit::fitter::validate_series;
use crate::math::{argmax, min_max, span};

/// Half-width (in central FWHM) of the window excluded around the center
/// before searching for sidebands.
pub const SIDEBAND_EXCLUSION_FWHM: f64 = 3.0;

/// Estimate triplet seeds from the data.
///
/// `inverted` selects dip-seeking (minimum) instead of peak-seeking (maximum).
pub fn estimate_triplet(x: &[f64], y: &[f64], inverted: bool) -> FitResult<TripletParams> {
    validate_series(x, y, 1)?;
    if !inverted {
        return estimate_peak_triplet(x, y);
    }

    let flipped: Vec<f64> = y.iter().map(|v| -v).collect();
    let p = estimate_peak_triplet(x, &flipped)?;
    Ok(TripletParams {
        center: LorentzianParams {
            y0: -p.center.y0,
            amp: -p.center.amp,
            ..p.center
        },
        left: Sideband {
            amp: -p.left.amp,
            ..p.left
        },
        right: Sideband {
            amp: -p.right.amp,
            ..p.right
        },
    })
}

fn estimate_peak_triplet(x: &[f64], y: &[f64]) -> FitResult<TripletParams> {
    let i_max = argmax(y).ok_or_else(|| FitError::shape("empty series"))?;
    let (y_min, y_max) = min_max(y).ok_or_else(|| FitError::shape("empty series"))?;
    let amp = y_max - y_min;
    if !(amp > 0.0) {
        return Err(FitError::degenerate("trace is flat; no feature to fit"));
    }

    let threshold = y_min + 0.5 * amp;
    let fwhm = half_max_width(x, y, i_max, threshold)
        .ok_or_else(|| FitError::degenerate("central feature has no measurable width"))?;
    let x0 = x[i_max];
    let window = SIDEBAND_EXCLUSION_FWHM * fwhm;

    let mut left = (Vec::new(), Vec::new());
    let mut right = (Vec::new(), Vec::new());
    for (&xi, &yi) in x.iter().zip(y) {
        if xi < x0 - window {
            left.0.push(xi);
            left.1.push(yi);
        } else if xi > x0 + window {
            right.0.push(xi);
            right.1.push(yi);
        }
    }

    let left = sideband_seed(&left.0, &left.1, y_min, fwhm, "left")?;
    let right = sideband_seed(&right.0, &right.1, y_min, fwhm, "right")?;

    let center = LorentzianParams {
        x0,
        y0: y_min,
        amp,
        fwhm,
    };
    debug!(?center, ?left, ?right, "triplet seed");
    Ok(TripletParams { center, left, right })
}

fn sideband_seed(xs: &[f64], ys: &[f64], baseline: f64, central_fwhm: f64, side: &str) -> FitResult<Sideband> {
    let i = argmax(ys).ok_or_else(|| {
        FitError::degenerate(format!(
            "no samples {side} of the exclusion window ({SIDEBAND_EXCLUSION_FWHM} x central FWHM {central_fwhm:.4e})"
        ))
    })?;
    let amp = ys[i] - baseline;
    let fwhm = half_max_width(xs, ys, i, baseline + 0.5 * amp).unwrap_or(0.5 * central_fwhm);
    Ok(Sideband { x: xs[i], amp, fwhm })
}

/// Width of the contiguous run of samples above `threshold` that contains
/// `peak`, with both threshold crossings linearly interpolated.
///
/// A run that reaches the end of the series is cut at the last sample.
/// Returns `None` when the width is not positive.
pub fn half_max_width(x: &[f64], y: &[f64], peak: usize, threshold: f64) -> Option<f64> {
    let n = x.len();
    if peak >= n || y.len() != n {
        return None;
    }

    let mut i = peak;
    while i > 0 && y[i - 1] > threshold {
        i -= 1;
    }
    let left = if i == 0 {
        x[0]
    } else {
        crossing(x[i - 1], y[i - 1], x[i], y[i], threshold)
    };

    let mut j = peak;
    while j + 1 < n && y[j + 1] > threshold {
        j += 1;
    }
    let right = if j + 1 == n {
        x[n - 1]
    } else {
        crossing(x[j], y[j], x[j + 1], y[j + 1], threshold)
    };

    let width = (right - left).abs();
    (width > 0.0 && width.is_finite()).then_some(width)
}

fn crossing(xa: f64, ya: f64, xb: f64, yb: f64, level: f64) -> f64 {
    if ya == yb {
        return xa;
    }
    xa + (level - ya) * (xb - xa) / (yb - ya)
}

/// Fill a partial explicit seed from fixed fractions of the data extent.
///
/// With `s = |x[last] − x[first]|`, `m` the x midpoint and `a = max − min`:
/// center at `m` with width `0.1·s` and amplitude `a` over baseline `min`;
/// sidebands at `m ∓ 0.25·s` with amplitude `0.1·a` and width `0.02·s`.
/// The peak/dip sense plays no role here.
pub fn explicit_triplet_seed(x: &[f64], y: &[f64], guess: &TripletGuess) -> FitResult<TripletParams> {
    validate_series(x, y, 1)?;
    let (y_min, y_max) = min_max(y).ok_or_else(|| FitError::shape("empty series"))?;
    let s = span(x);
    let a = y_max - y_min;
    let m = 0.5 * (x[0] + x[x.len() - 1]);

    Ok(TripletParams {
        center: LorentzianParams {
            x0: guess.x0.unwrap_or(m),
            y0: guess.y0.unwrap_or(y_min),
            amp: guess.amp.unwrap_or(a),
            fwhm: guess.fwhm.unwrap_or(0.1 * s),
        },
        left: Sideband {
            x: guess.xl.unwrap_or(m - 0.25 * s),
            amp: guess.ampl.unwrap_or(0.1 * a),
            fwhm: guess.fwhml.unwrap_or(0.02 * s),
        },
        right: Sideband {
            x: guess.xr.unwrap_or(m + 0.25 * s),
            amp: guess.ampr.unwrap_or(0.1 * a),
            fwhm: guess.fwhmr.unwrap_or(0.02 * s),
        },
    })
}
