//! Window functions and equivalent noise bandwidth.
//!
//! The real-time spectrum analyzer applies a Kaiser window with
//! `α = 16.7/π` (`β = π·α = 16.7`) to each acquisition. Its equivalent noise
//! bandwidth (ENBW) converts a measured power spectral density into a noise
//! power per resolution bandwidth.

use std::f64::consts::PI;

use crate::error::{FitError, FitResult};

/// Kaiser shape factor used by the analyzer (`α`, not `β`).
pub const ANALYZER_KAISER_ALPHA: f64 = 16.7 / PI;

/// Modified Bessel function of the first kind, order zero (power series).
pub fn bessel_i0(x: f64) -> f64 {
    let half = 0.5 * x;
    let mut term = 1.0;
    let mut sum = 1.0;
    for k in 1..500 {
        let r = half / k as f64;
        term *= r * r;
        sum += term;
        if term <= sum * 1e-17 {
            break;
        }
    }
    sum
}

/// Periodic Kaiser window: `w_j = I0(β·sqrt(1 − z²)) / I0(β)`, `z = 2j/N − 1`.
pub fn kaiser_window(n: usize, beta: f64) -> Vec<f64> {
    let norm = bessel_i0(beta);
    (0..n)
        .map(|j| {
            let z = 2.0 * j as f64 / n as f64 - 1.0;
            bessel_i0(beta * (1.0 - z * z).max(0.0).sqrt()) / norm
        })
        .collect()
}

/// ENBW in frequency bins: `N·Σw² / (Σw)²`.
pub fn enbw_bins(window: &[f64]) -> Option<f64> {
    let s1: f64 = window.iter().sum();
    let s2: f64 = window.iter().map(|w| w * w).sum();
    if window.is_empty() || s1 == 0.0 {
        return None;
    }
    Some(window.len() as f64 * s2 / (s1 * s1))
}

/// ENBW (Hz if `acquisition_time` is in seconds) of an acquisition of
/// `samples` points over `acquisition_time`, windowed by the analyzer's Kaiser.
pub fn kaiser_enbw(samples: usize, acquisition_time: f64) -> FitResult<f64> {
    if samples == 0 {
        return Err(FitError::shape("ENBW needs at least one sample"));
    }
    if !(acquisition_time.is_finite() && acquisition_time > 0.0) {
        return Err(FitError::shape(format!(
            "acquisition time must be positive (got {acquisition_time})"
        )));
    }
    let window = kaiser_window(samples, PI * ANALYZER_KAISER_ALPHA);
    let bins = enbw_bins(&window).ok_or_else(|| FitError::degenerate("Kaiser window sums to zero"))?;
    let fs = samples as f64 / acquisition_time;
    Ok(fs * bins / samples as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bessel_i0_reference_values() {
        assert_eq!(bessel_i0(0.0), 1.0);
        assert!((bessel_i0(1.0) - 1.266_065_877_752_008_4).abs() < 1e-14);
        assert!((bessel_i0(5.0) - 27.239_871_823_604_44).abs() < 1e-10);
    }

    #[test]
    fn rectangular_window_has_unit_enbw() {
        let w = kaiser_window(64, 0.0);
        assert!(w.iter().all(|v| (v - 1.0).abs() < 1e-15));
        assert!((enbw_bins(&w).unwrap() - 1.0).abs() < 1e-12);
        // 64 samples over 1 ms -> 1 kHz bin width.
        let rect_enbw = 64.0 / 1e-3 * enbw_bins(&w).unwrap() / 64.0;
        assert!((rect_enbw - 1e3).abs() < 1e-6);
    }

    #[test]
    fn analyzer_window_is_wider_than_rectangular() {
        let tau = 1e-3;
        let enbw = kaiser_enbw(4096, tau).unwrap();
        let bins = enbw * tau;
        assert!(bins > 1.5 && bins < 3.0, "ENBW {bins} bins");

        // Doubling the acquisition time halves the bandwidth.
        let enbw2 = kaiser_enbw(4096, 2.0 * tau).unwrap();
        assert!((enbw / enbw2 - 2.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_acquisitions_are_rejected() {
        assert!(kaiser_enbw(0, 1.0).is_err());
        assert!(kaiser_enbw(16, 0.0).is_err());
    }
}
