//! Ordinary least-squares slope over an evenly spaced series (x = 0..n-1).

/// Slope of the best-fit line; `None` with fewer than two points.
pub fn least_squares_slope<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
    I::IntoIter: ExactSizeIterator,
{
    let iter = values.into_iter();
    let n = iter.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let sum_x = (nf - 1.0) * nf / 2.0;
    let sum_xx = (nf - 1.0) * nf * (2.0 * nf - 1.0) / 6.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    for (i, y) in iter.enumerate() {
        sum_y += y;
        sum_xy += i as f64 * y;
    }
    let denom = nf * sum_xx - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        return Some(0.0);
    }
    Some((nf * sum_xy - sum_x * sum_y) / denom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn linear_series_slope() {
        let ys = vec![100.0, 103.0, 106.0, 109.0, 112.0];
        assert_approx(least_squares_slope(ys).unwrap(), 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn flat_series_has_zero_slope() {
        assert_approx(least_squares_slope(vec![5.0; 8]).unwrap(), 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn noisy_series() {
        // y = 1, 3, 2, 4 → slope 0.8
        assert_approx(least_squares_slope(vec![1.0, 3.0, 2.0, 4.0]).unwrap(), 0.8, DEFAULT_EPSILON);
    }

    #[test]
    fn too_short() {
        assert!(least_squares_slope(vec![1.0]).is_none());
        assert!(least_squares_slope(Vec::<f64>::new()).is_none());
    }
}
