//! Reporting utilities: residual statistics, formatted terminal output and
//! progress status lines.

pub mod format;
pub mod progress;

pub use format::*;
pub use progress::*;

/// Summary of `y_obs - y_fit` over a trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualStats {
    pub rms: f64,
    pub max_abs: f64,
    /// x at the largest absolute residual.
    pub x_at_max: f64,
}

/// Compute residual statistics of `model` over `(x, y)`.
///
/// Returns `None` for an empty series or a non-finite prediction.
pub fn residual_stats<F>(x: &[f64], y: &[f64], model: F) -> Option<ResidualStats>
where
    F: Fn(f64) -> f64,
{
    if x.is_empty() || x.len() != y.len() {
        return None;
    }
    let mut sum_sq = 0.0;
    let mut max_abs = 0.0;
    let mut x_at_max = x[0];
    for (&xi, &yi) in x.iter().zip(y) {
        let fit = model(xi);
        if !fit.is_finite() {
            return None;
        }
        let r = yi - fit;
        sum_sq += r * r;
        if r.abs() > max_abs {
            max_abs = r.abs();
            x_at_max = xi;
        }
    }
    Some(ResidualStats {
        rms: (sum_sq / x.len() as f64).sqrt(),
        max_abs,
        x_at_max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residual_stats_basic() {
        let x = [0.0, 1.0, 2.0];
        let y = [1.0, 1.0, 4.0];
        let s = residual_stats(&x, &y, |_| 1.0).unwrap();
        assert_eq!(s.max_abs, 3.0);
        assert_eq!(s.x_at_max, 2.0);
        assert!((s.rms - 3.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn residual_stats_rejects_bad_input() {
        assert!(residual_stats(&[], &[], |_| 0.0).is_none());
        assert!(residual_stats(&[0.0], &[1.0], |_| f64::NAN).is_none());
    }
}
