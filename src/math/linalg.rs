//! Dense linear algebra for the Levenberg–Marquardt step.
//!
//! Each LM iteration solves the damped normal equations
//!
//! ```text
//! (JᵀJ + λ·diag(JᵀJ)) δ = Jᵀr
//! ```
//!
//! Implementation choices:
//! - Cholesky first: the damped matrix is symmetric positive definite whenever
//!   the Jacobian has full column rank, and Cholesky is the cheapest solve.
//! - SVD fallback with progressively looser tolerances when Cholesky fails
//!   (rank-deficient Jacobian, e.g. a sideband whose amplitude collapsed to 0).
//! - Covariance follows the usual curve-fit convention: `(JᵀJ)⁺ · SSE/(m − n)`.

use nalgebra::{DMatrix, DVector};

/// Relative floor applied to diagonal entries before damping.
const DIAG_FLOOR: f64 = 1e-12;

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = a.clone().svd(true, true);

    for &tol in &[1e-14, 1e-10, 1e-6] {
        if let Ok(x) = svd.solve(b, tol) {
            if x.iter().all(|v| v.is_finite()) {
                return Some(x);
            }
        }
    }

    None
}

/// Solve the Marquardt-damped normal equations for the step `δ`.
pub fn solve_damped(jtj: &DMatrix<f64>, jtr: &DVector<f64>, lambda: f64) -> Option<DVector<f64>> {
    let n = jtj.nrows();
    let max_diag = (0..n).map(|i| jtj[(i, i)]).fold(0.0_f64, f64::max);
    let floor = if max_diag > 0.0 { max_diag * DIAG_FLOOR } else { DIAG_FLOOR };

    let mut damped = jtj.clone();
    for i in 0..n {
        damped[(i, i)] += lambda * jtj[(i, i)].max(floor);
    }

    if let Some(chol) = damped.clone().cholesky() {
        let delta = chol.solve(jtr);
        if delta.iter().all(|v| v.is_finite()) {
            return Some(delta);
        }
    }

    solve_least_squares(&damped, jtr)
}

/// Parameter covariance from the Jacobian at the solution.
///
/// With `m` residuals and `n` parameters the result is
/// `V·S⁻²·Vᵀ · SSE/(m − n)`, dropping singular values below
/// `ε·max(m, n)·s_max`. When `m <= n` the residual variance is undefined and
/// every entry is `+∞`.
pub fn covariance_from_jacobian(jac: &DMatrix<f64>, sse: f64) -> DMatrix<f64> {
    let (m, n) = jac.shape();
    if m <= n {
        return DMatrix::from_element(n, n, f64::INFINITY);
    }

    let svd = jac.clone().svd(false, true);
    let Some(v_t) = svd.v_t else {
        return DMatrix::from_element(n, n, f64::INFINITY);
    };
    let s = &svd.singular_values;
    let s_max = s.iter().copied().fold(0.0_f64, f64::max);
    let cutoff = f64::EPSILON * m.max(n) as f64 * s_max;

    let mut cov = DMatrix::<f64>::zeros(n, n);
    for k in 0..s.len() {
        if s[k] <= cutoff {
            continue;
        }
        let inv_s2 = 1.0 / (s[k] * s[k]);
        for i in 0..n {
            for j in 0..n {
                cov[(i, j)] += v_t[(k, i)] * v_t[(k, j)] * inv_s2;
            }
        }
    }

    let dof = (m - n) as f64;
    cov * (sse / dof)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let b = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let x = solve_least_squares(&a, &b).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-10);
        assert!((x[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn undamped_step_is_gauss_newton() {
        let jtj = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let jtr = DVector::from_row_slice(&[1.0, 2.0]);
        let delta = solve_damped(&jtj, &jtr, 0.0).unwrap();
        let back = &jtj * &delta;
        assert!((back[0] - 1.0).abs() < 1e-12);
        assert!((back[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn damping_shrinks_the_step() {
        let jtj = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let jtr = DVector::from_row_slice(&[1.0, 2.0]);
        let small = solve_damped(&jtj, &jtr, 1e-3).unwrap();
        let large = solve_damped(&jtj, &jtr, 1e3).unwrap();
        assert!(large.norm() < small.norm() * 1e-2);
    }

    #[test]
    fn singular_system_still_yields_a_step() {
        // Second column is identically zero (parameter has no influence).
        let jtj = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 0.0]);
        let jtr = DVector::from_row_slice(&[1.0, 0.0]);
        let delta = solve_damped(&jtj, &jtr, 1e-3).unwrap();
        assert!(delta.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn covariance_of_linear_fit_matches_closed_form() {
        // y = a + b x with unit design; residual variance s² = SSE/(m-n).
        let xs = [0.0, 1.0, 2.0, 3.0];
        let mut data = Vec::new();
        for &x in &xs {
            data.push(1.0);
            data.push(x);
        }
        let jac = DMatrix::from_row_slice(4, 2, &data);
        let sse = 2.0;
        let cov = covariance_from_jacobian(&jac, sse);

        // (XᵀX)⁻¹ for this design: [[7/10, -3/10], [-3/10, 1/5]].
        let s2 = sse / 2.0;
        assert!((cov[(0, 0)] - 0.7 * s2).abs() < 1e-10);
        assert!((cov[(0, 1)] + 0.3 * s2).abs() < 1e-10);
        assert!((cov[(1, 1)] - 0.2 * s2).abs() < 1e-10);
    }

    #[test]
    fn covariance_is_infinite_without_dof() {
        let jac = DMatrix::<f64>::identity(3, 3);
        let cov = covariance_from_jacobian(&jac, 0.0);
        assert!(cov.iter().all(|v| v.is_infinite()));
    }
}
