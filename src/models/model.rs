//! Lorentzian lineshapes.
//!
//! The fitter relies on two primitive operations:
//! - evaluate a model at one x for a flat parameter vector (for residuals)
//! - evaluate it over a whole x grid (for plots/exports)
//!
//! Parameter vectors use the orders of `LorentzianParams::NAMES` and
//! `TripletParams::NAMES`.

/// `y0 + 0.25·amp·fwhm² / ((x − x0)² + 0.25·fwhm²)`.
///
/// The function is total: when `fwhm = 0` and `x = x0` the denominator
/// vanishes and the baseline `y0` is returned.
pub fn lorentzian(x: f64, x0: f64, y0: f64, amp: f64, fwhm: f64) -> f64 {
    let hwhm_sq = 0.25 * fwhm * fwhm;
    let dx = x - x0;
    let denom = dx * dx + hwhm_sq;
    if denom == 0.0 {
        return y0;
    }
    y0 + amp * hwhm_sq / denom
}

/// Central Lorentzian plus two sidebands.
///
/// Only the left term carries the shared baseline `y0`; the central and
/// right terms are evaluated with zero offset.
///
/// # Panics
/// Panics if `p` has fewer than ten entries.
pub fn lorentzian_triplet(x: f64, p: &[f64]) -> f64 {
    let (x0, y0, amp, fwhm) = (p[0], p[1], p[2], p[3]);
    let (xl, ampl, fwhml) = (p[4], p[5], p[6]);
    let (xr, ampr, fwhmr) = (p[7], p[8], p[9]);
    lorentzian(x, xl, y0, ampl, fwhml) + lorentzian(x, x0, 0.0, amp, fwhm) + lorentzian(x, xr, 0.0, ampr, fwhmr)
}

/// Single Lorentzian with a flat `[x0, y0, amp, fwhm]` vector.
///
/// # Panics
/// Panics if `p` has fewer than four entries.
pub fn lorentzian_flat(x: f64, p: &[f64]) -> f64 {
    lorentzian(x, p[0], p[1], p[2], p[3])
}

/// Evaluate `model` at every x.
pub fn eval_over<F>(model: F, xs: &[f64], params: &[f64]) -> Vec<f64>
where
    F: Fn(f64, &[f64]) -> f64,
{
    xs.iter().map(|&x| model(x, params)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_value_at_center() {
        for &(x0, y0, amp, fwhm) in &[(0.0, 1.0, 1.0, 0.1), (3.5, -2.0, 0.25, 7.0), (-1e3, 0.0, -4.0, 12.5)] {
            let y = lorentzian(x0, x0, y0, amp, fwhm);
            assert!((y - (y0 + amp)).abs() < 1e-12, "center value {y} != {}", y0 + amp);
        }
    }

    #[test]
    fn half_max_at_half_width() {
        let (x0, y0, amp, fwhm) = (0.3, 1.0, 2.0, 0.4);
        let left = lorentzian(x0 - fwhm / 2.0, x0, y0, amp, fwhm);
        let right = lorentzian(x0 + fwhm / 2.0, x0, y0, amp, fwhm);
        assert!((left - (y0 + amp / 2.0)).abs() < 1e-12);
        assert!((right - (y0 + amp / 2.0)).abs() < 1e-12);
    }

    #[test]
    fn zero_width_is_finite() {
        assert_eq!(lorentzian(1.0, 1.0, 0.5, 3.0, 0.0), 0.5);
        assert_eq!(lorentzian(2.0, 1.0, 0.5, 3.0, 0.0), 0.5);
    }

    #[test]
    fn triplet_shares_one_baseline() {
        let p = [0.0, 1.0, 1.0, 0.1, -0.5, 0.1, 0.02, 0.5, 0.1, 0.05];
        // Far from every feature only the baseline remains.
        let far = lorentzian_triplet(1e6, &p);
        assert!((far - 1.0).abs() < 1e-9);

        let expected = lorentzian(0.2, -0.5, 1.0, 0.1, 0.02)
            + lorentzian(0.2, 0.0, 0.0, 1.0, 0.1)
            + lorentzian(0.2, 0.5, 0.0, 0.1, 0.05);
        assert_eq!(lorentzian_triplet(0.2, &p), expected);
    }

    #[test]
    fn evaluation_is_pure() {
        let p = [0.0, 1.0, 1.0, 0.1, -0.5, 0.1, 0.02, 0.5, 0.1, 0.05];
        let xs: Vec<f64> = (0..50).map(|i| -1.0 + i as f64 * 0.04).collect();
        let a = eval_over(lorentzian_triplet, &xs, &p);
        let b = eval_over(lorentzian_triplet, &xs, &p);
        assert_eq!(a, b);

        let single = [0.0, 1.0, 1.0, 0.1];
        assert_eq!(
            eval_over(lorentzian_flat, &xs, &single),
            eval_over(lorentzian_flat, &xs, &single)
        );
    }
}
