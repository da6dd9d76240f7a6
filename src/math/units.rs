//! Power unit conversions between dB and linear scale.

/// `10^(y/10)`.
pub fn db_to_linear(y: f64) -> f64 {
    10f64.powf(y / 10.0)
}

/// `10·log10(y)`. Non-positive input yields `-inf`/NaN as with `log10`.
pub fn linear_to_db(y: f64) -> f64 {
    10.0 * y.log10()
}

pub fn db_to_linear_all(ys: &[f64]) -> Vec<f64> {
    ys.iter().map(|&y| db_to_linear(y)).collect()
}

pub fn linear_to_db_all(ys: &[f64]) -> Vec<f64> {
    ys.iter().map(|&y| linear_to_db(y)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_values() {
        assert!((db_to_linear(10.0) - 10.0).abs() < 1e-12);
        assert!((db_to_linear(-3.0) - 0.501_187_233_627_272_2).abs() < 1e-12);
        assert!((linear_to_db(100.0) - 20.0).abs() < 1e-12);
    }

    #[test]
    fn conversions_invert_each_other() {
        let db = [-80.0, -3.0, 0.0, 12.5];
        let back = linear_to_db_all(&db_to_linear_all(&db));
        for (a, b) in db.iter().zip(&back) {
            assert!((a - b).abs() < 1e-10);
        }
    }
}
