//! Levenberg–Marquardt nonlinear least squares.
//!
//! Minimizes `Σ (y_i − f(x_i, p))²` for a pointwise model `f`.
//!
//! - Jacobian: central finite differences. The step for parameter `j` is
//!   `∛ε · (|p_j| + 1e-3·scale_j)`, where `scale_j` is a caller-supplied
//!   magnitude (x-span for positions/widths, y-span for levels/amplitudes) so
//!   parameters that sit at exactly zero still get a usable step.
//! - Damping: Marquardt scaling by `diag(JᵀJ)`; ÷10 on an accepted step, ×10
//!   on a rejected one.
//! - Bounds: trial points are clamped into the box; convergence is tested on
//!   the clamped step so a parameter pinned at a bound terminates cleanly.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::Bounds;
use crate::error::{FitError, FitResult};
use crate::math::linalg::solve_damped;

const MIN_DAMPING: f64 = 1e-15;

/// Solver tolerances and budgets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmOptions {
    /// Maximum number of LM iterations (accepted + rejected steps).
    pub max_iterations: usize,
    /// Relative step-size tolerance.
    pub xtol: f64,
    /// Relative cost-reduction tolerance.
    pub ftol: f64,
    /// Absolute tolerance on the largest gradient component.
    pub gtol: f64,
    pub initial_damping: f64,
    /// Damping above which the solve is declared failed.
    pub max_damping: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            xtol: 1e-10,
            ftol: 1e-14,
            gtol: 1e-14,
            initial_damping: 1e-3,
            max_damping: 1e16,
        }
    }
}

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    SmallStep,
    SmallReduction,
    SmallGradient,
    ExactFit,
}

/// Converged solver state.
#[derive(Debug, Clone)]
pub struct LmSolution {
    pub params: Vec<f64>,
    /// Model Jacobian `∂f/∂p` at `params` (`m x n`).
    pub jacobian: DMatrix<f64>,
    /// Sum of squared residuals at `params`.
    pub sse: f64,
    pub iterations: usize,
    pub termination: Termination,
}

/// Run Levenberg–Marquardt from `p0`.
///
/// `scales` must have the same length as `p0` (see module docs).
pub fn levenberg_marquardt<F>(
    model: F,
    x: &[f64],
    y: &[f64],
    p0: &[f64],
    scales: &[f64],
    bounds: Option<&Bounds>,
    opts: &LmOptions,
) -> FitResult<LmSolution>
where
    F: Fn(f64, &[f64]) -> f64,
{
    if x.len() != y.len() {
        return Err(FitError::shape(format!(
            "x has {} samples but y has {}",
            x.len(),
            y.len()
        )));
    }
    if scales.len() != p0.len() {
        return Err(FitError::shape("parameter scales do not match parameter count"));
    }
    if let Some(b) = bounds {
        b.validate(p0.len())?;
    }

    let mut p = p0.to_vec();
    if let Some(b) = bounds {
        b.clamp(&mut p);
    }

    let mut r = residuals(&model, x, y, &p);
    let mut sse = r.norm_squared();
    if !sse.is_finite() {
        return Err(FitError::convergence(0, "model is not finite at the initial guess"));
    }

    let mut jac = jacobian(&model, x, &p, scales);
    let mut lambda = opts.initial_damping;

    for iter in 1..=opts.max_iterations {
        if sse == 0.0 {
            return Ok(finish(p, jac, sse, iter - 1, Termination::ExactFit));
        }

        let jt = jac.transpose();
        let jtj = &jt * &jac;
        let jtr = &jt * &r;
        if jtr.amax() <= opts.gtol {
            return Ok(finish(p, jac, sse, iter - 1, Termination::SmallGradient));
        }

        let Some(delta) = solve_damped(&jtj, &jtr, lambda) else {
            lambda *= 10.0;
            if lambda > opts.max_damping {
                return Err(FitError::convergence(iter, "normal equations are singular"));
            }
            continue;
        };

        let mut trial: Vec<f64> = p.iter().zip(delta.iter()).map(|(a, d)| a + d).collect();
        if let Some(b) = bounds {
            b.clamp(&mut trial);
        }

        let step_norm = p
            .iter()
            .zip(&trial)
            .map(|(a, b)| (b - a) * (b - a))
            .sum::<f64>()
            .sqrt();
        let p_norm = p.iter().map(|v| v * v).sum::<f64>().sqrt();
        if step_norm <= opts.xtol * (p_norm + opts.xtol) {
            return Ok(finish(p, jac, sse, iter, Termination::SmallStep));
        }

        let r_trial = residuals(&model, x, y, &trial);
        let sse_trial = r_trial.norm_squared();

        if sse_trial.is_finite() && sse_trial < sse {
            let reduction = sse - sse_trial;
            let previous = sse;
            p = trial;
            r = r_trial;
            sse = sse_trial;
            jac = jacobian(&model, x, &p, scales);
            lambda = (lambda / 10.0).max(MIN_DAMPING);

            if reduction <= opts.ftol * previous {
                return Ok(finish(p, jac, sse, iter, Termination::SmallReduction));
            }
        } else {
            lambda *= 10.0;
            if lambda > opts.max_damping {
                return Err(FitError::convergence(
                    iter,
                    format!("damping exceeded {:.1e} without reducing the cost", opts.max_damping),
                ));
            }
        }
    }

    Err(FitError::convergence(opts.max_iterations, "iteration budget exhausted"))
}

fn finish(params: Vec<f64>, jacobian: DMatrix<f64>, sse: f64, iterations: usize, termination: Termination) -> LmSolution {
    debug!(iterations, sse, ?termination, "levenberg-marquardt converged");
    LmSolution {
        params,
        jacobian,
        sse,
        iterations,
        termination,
    }
}

fn residuals<F>(model: &F, x: &[f64], y: &[f64], p: &[f64]) -> DVector<f64>
where
    F: Fn(f64, &[f64]) -> f64,
{
    DVector::from_iterator(x.len(), x.iter().zip(y).map(|(&xi, &yi)| yi - model(xi, p)))
}

fn jacobian<F>(model: &F, x: &[f64], p: &[f64], scales: &[f64]) -> DMatrix<f64>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let step_base = f64::EPSILON.cbrt();
    let mut jac = DMatrix::<f64>::zeros(x.len(), p.len());
    let mut work = p.to_vec();

    for j in 0..p.len() {
        let scale = if scales[j].is_finite() && scales[j] > 0.0 { scales[j] } else { 1.0 };
        let h = step_base * (p[j].abs() + 1e-3 * scale);
        let up = p[j] + h;
        let down = p[j] - h;
        let width = up - down;

        for (i, &xi) in x.iter().enumerate() {
            work[j] = up;
            let f_up = model(xi, &work);
            work[j] = down;
            let f_down = model(xi, &work);
            jac[(i, j)] = (f_up - f_down) / width;
        }
        work[j] = p[j];
    }

    jac
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exp_model(x: f64, p: &[f64]) -> f64 {
        p[0] * (-p[1] * x).exp()
    }

    #[test]
    fn recovers_exponential_parameters() {
        let xs: Vec<f64> = (0..40).map(|i| i as f64 * 0.1).collect();
        let ys: Vec<f64> = xs.iter().map(|&x| exp_model(x, &[2.5, 1.3])).collect();

        let sol = levenberg_marquardt(exp_model, &xs, &ys, &[1.0, 0.5], &[1.0, 1.0], None, &LmOptions::default())
            .unwrap();
        assert!((sol.params[0] - 2.5).abs() < 1e-8, "a = {}", sol.params[0]);
        assert!((sol.params[1] - 1.3).abs() < 1e-8, "k = {}", sol.params[1]);
        assert!(sol.sse < 1e-16);
        assert_eq!(sol.jacobian.shape(), (40, 2));
    }

    #[test]
    fn bounds_pin_a_parameter() {
        let xs: Vec<f64> = (0..40).map(|i| i as f64 * 0.1).collect();
        let ys: Vec<f64> = xs.iter().map(|&x| exp_model(x, &[2.5, 1.3])).collect();
        let bounds = Bounds::unbounded(2).with_param(1, 0.0, 1.0);

        let sol = levenberg_marquardt(
            exp_model,
            &xs,
            &ys,
            &[1.0, 0.5],
            &[1.0, 1.0],
            Some(&bounds),
            &LmOptions::default(),
        )
        .unwrap();
        assert!(sol.params[1] <= 1.0);
        assert!((sol.params[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn mismatched_lengths_are_shape_errors() {
        let err = levenberg_marquardt(exp_model, &[0.0, 1.0], &[1.0], &[1.0, 1.0], &[1.0, 1.0], None, &LmOptions::default())
            .unwrap_err();
        assert!(matches!(err, FitError::Shape(_)));
    }

    #[test]
    fn exhausted_budget_is_a_convergence_error() {
        let xs: Vec<f64> = (0..40).map(|i| i as f64 * 0.1).collect();
        let ys: Vec<f64> = xs.iter().map(|&x| exp_model(x, &[2.5, 1.3])).collect();
        let opts = LmOptions {
            max_iterations: 1,
            ..LmOptions::default()
        };
        let err = levenberg_marquardt(exp_model, &xs, &ys, &[1.0, 0.5], &[1.0, 1.0], None, &opts).unwrap_err();
        assert!(matches!(err, FitError::Convergence { .. }));
    }

    #[test]
    fn non_finite_start_is_reported() {
        let xs = [0.0, 1.0, 2.0];
        let ys = [1.0, 1.0, 1.0];
        let model = |x: f64, p: &[f64]| p[0] / x;
        let err = levenberg_marquardt(model, &xs, &ys, &[1.0], &[1.0], None, &LmOptions::default()).unwrap_err();
        assert!(matches!(err, FitError::Convergence { iterations: 0, .. }));
    }
}
