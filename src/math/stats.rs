//! Small sample-statistics helpers used by the seed estimators.
//!
//! All helpers ignore NaN ordering issues by treating incomparable pairs as
//! equal; callers validate finiteness before fitting.

use std::cmp::Ordering;

/// Index of the largest value (first occurrence).
pub fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if v.partial_cmp(&b).unwrap_or(Ordering::Equal) != Ordering::Greater => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Index of the smallest value (first occurrence).
pub fn argmin(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if v.partial_cmp(&b).unwrap_or(Ordering::Equal) != Ordering::Less => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// `(min, max)` of a non-empty slice.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// `|last − first|` of a sweep axis.
pub fn span(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(a), Some(b)) => (b - a).abs(),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extrema_pick_first_occurrence() {
        let v = [1.0, 3.0, 3.0, -2.0, -2.0];
        assert_eq!(argmax(&v), Some(1));
        assert_eq!(argmin(&v), Some(3));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn min_max_mean_span() {
        let v = [2.0, -1.0, 5.0, 0.0];
        assert_eq!(min_max(&v), Some((-1.0, 5.0)));
        assert_eq!(mean(&v), Some(1.5));
        assert_eq!(span(&v), 2.0);
        assert_eq!(mean(&[]), None);
        assert_eq!(span(&[]), 0.0);
    }
}
