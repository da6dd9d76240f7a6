//! Auxiliary lineshapes: step, exponential ringdown, line.

/// Heaviside step: 1 for `t > 0`, 0 for `t < 0`, 0.5 at `t = 0`.
pub fn heaviside(t: f64) -> f64 {
    if t > 0.0 {
        1.0
    } else if t < 0.0 {
        0.0
    } else {
        0.5
    }
}

/// `y0 + amp·H(x − x0)·exp(−(x − x0)·gamma)`: a decay switched on at `x0`.
pub fn exp_decay(x: f64, x0: f64, y0: f64, amp: f64, gamma: f64) -> f64 {
    let dx = x - x0;
    let step = heaviside(dx);
    if step == 0.0 {
        return y0;
    }
    y0 + amp * step * (-dx * gamma).exp()
}

/// `m·x + b`.
pub fn line(x: f64, m: f64, b: f64) -> f64 {
    m * x + b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heaviside_values() {
        assert_eq!(heaviside(-1e-9), 0.0);
        assert_eq!(heaviside(0.0), 0.5);
        assert_eq!(heaviside(3.0), 1.0);
    }

    #[test]
    fn exp_decay_switches_on_at_x0() {
        assert_eq!(exp_decay(0.5, 1.0, 0.2, 3.0, 2.0), 0.2);
        assert!((exp_decay(1.0, 1.0, 0.2, 3.0, 2.0) - (0.2 + 1.5)).abs() < 1e-12);
        let y = exp_decay(1.5, 1.0, 0.0, 1.0, 2.0);
        assert!((y - (-1.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn line_slope_intercept() {
        assert_eq!(line(2.0, 3.0, -1.0), 5.0);
    }
}
