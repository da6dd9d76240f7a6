//! Low-level fitting routine shared by every lineshape.
//!
//! Given:
//! - sample positions `x_i` and observations `y_i`
//! - a pointwise model `f(x, p)` and a seed `p0`
//!
//! we validate the series, run Levenberg–Marquardt, and package the solution
//! with its covariance and fit quality.

use nalgebra::DMatrix;

use crate::domain::{Bounds, FitQuality};
use crate::error::{FitError, FitResult};
use crate::math::{LmOptions, covariance_from_jacobian, levenberg_marquardt};

/// Raw fit output in flat-vector form.
#[derive(Debug, Clone)]
pub struct CurveFit {
    pub params: Vec<f64>,
    pub covariance: DMatrix<f64>,
    pub quality: FitQuality,
}

impl CurveFit {
    /// Replace parameter `idx` by its absolute value.
    ///
    /// Used for widths, which enter the lineshapes squared: negating one leaves
    /// the model unchanged but flips the sign of its covariance row/column.
    pub fn fold_sign(&mut self, idx: usize) {
        if self.params[idx] >= 0.0 {
            return;
        }
        self.params[idx] = -self.params[idx];
        let n = self.covariance.nrows();
        for k in 0..n {
            if k != idx {
                self.covariance[(idx, k)] = -self.covariance[(idx, k)];
                self.covariance[(k, idx)] = -self.covariance[(k, idx)];
            }
        }
    }
}

/// Check that a series can support an `n_params` fit.
pub fn validate_series(x: &[f64], y: &[f64], n_params: usize) -> FitResult<()> {
    if x.len() != y.len() {
        return Err(FitError::shape(format!(
            "x has {} samples but y has {}",
            x.len(),
            y.len()
        )));
    }
    if x.len() < n_params {
        return Err(FitError::shape(format!(
            "need at least {n_params} samples to fit {n_params} parameters (got {})",
            x.len()
        )));
    }
    if let Some(i) = x.iter().zip(y).position(|(a, b)| !(a.is_finite() && b.is_finite())) {
        return Err(FitError::shape(format!("sample {i} is not finite")));
    }
    Ok(())
}

/// Fit `model` to `(x, y)` starting from `p0`.
pub fn curve_fit<F>(
    model: F,
    x: &[f64],
    y: &[f64],
    p0: &[f64],
    scales: &[f64],
    bounds: Option<&Bounds>,
    opts: &LmOptions,
) -> FitResult<CurveFit>
where
    F: Fn(f64, &[f64]) -> f64,
{
    validate_series(x, y, p0.len())?;
    if p0.iter().any(|v| !v.is_finite()) {
        return Err(FitError::shape("initial guess is not finite"));
    }

    let solution = levenberg_marquardt(model, x, y, p0, scales, bounds, opts)?;
    let covariance = covariance_from_jacobian(&solution.jacobian, solution.sse);

    let n = x.len();
    Ok(CurveFit {
        params: solution.params,
        covariance,
        quality: FitQuality {
            sse: solution.sse,
            rmse: (solution.sse / n as f64).sqrt(),
            n,
            iterations: solution.iterations,
        },
    })
}
