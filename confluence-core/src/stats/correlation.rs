//! Rolling Pearson correlation over paired samples.

use super::window::BoundedWindow;

/// Variance at or below this is treated as a constant series.
const MIN_VARIANCE: f64 = 1e-18;

#[derive(Debug, Clone)]
pub struct RollingCorrelation {
    pairs: BoundedWindow<(f64, f64)>,
    min_samples: usize,
}

impl RollingCorrelation {
    pub fn new(window: usize, min_samples: usize) -> Self {
        assert!(min_samples >= 2, "correlation needs at least two samples");
        Self { pairs: BoundedWindow::new(window), min_samples }
    }

    pub fn push(&mut self, x: f64, y: f64) {
        self.pairs.push((x, y));
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pearson coefficient in [-1, 1].
    ///
    /// `None` below the sample minimum; `0.0` when either side is constant.
    pub fn value(&self) -> Option<f64> {
        let n = self.pairs.len();
        if n < self.min_samples {
            return None;
        }
        let nf = n as f64;
        let (sx, sy) = self.pairs.iter().fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x, sy + y));
        let (mx, my) = (sx / nf, sy / nf);

        let mut cov = 0.0;
        let mut var_x = 0.0;
        let mut var_y = 0.0;
        for (x, y) in self.pairs.iter() {
            let dx = x - mx;
            let dy = y - my;
            cov += dx * dy;
            var_x += dx * dx;
            var_y += dy * dy;
        }
        if var_x <= MIN_VARIANCE || var_y <= MIN_VARIANCE {
            return Some(0.0);
        }
        Some((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn none_below_minimum() {
        let mut c = RollingCorrelation::new(300, 10);
        for i in 0..9 {
            c.push(i as f64, i as f64);
        }
        assert!(c.value().is_none());
        c.push(9.0, 9.0);
        assert_approx(c.value().unwrap(), 1.0, DEFAULT_EPSILON);
    }

    #[test]
    fn perfectly_anti_correlated() {
        let mut c = RollingCorrelation::new(300, 10);
        for i in 0..20 {
            c.push(i as f64, -2.0 * i as f64 + 3.0);
        }
        assert_approx(c.value().unwrap(), -1.0, DEFAULT_EPSILON);
    }

    #[test]
    fn constant_series_is_zero() {
        let mut c = RollingCorrelation::new(300, 10);
        for i in 0..20 {
            c.push(0.0, i as f64);
        }
        assert_eq!(c.value(), Some(0.0));
    }

    #[test]
    fn window_is_bounded() {
        let mut c = RollingCorrelation::new(5, 2);
        for i in 0..50 {
            c.push(i as f64, (i % 3) as f64);
        }
        assert_eq!(c.len(), 5);
    }
}
