//! EMA of squared returns.
//!
//! var[t] = alpha * r[t]^2 + (1 - alpha) * var[t-1]
//! Seed: var[0] = r[0]^2.

#[derive(Debug, Clone)]
pub struct EwmaVariance {
    alpha: f64,
    value: Option<f64>,
}

impl EwmaVariance {
    pub fn new(alpha: f64) -> Self {
        assert!(alpha > 0.0 && alpha <= 1.0, "EWMA alpha must be in (0, 1]");
        Self { alpha, value: None }
    }

    pub fn update(&mut self, ret: f64) -> f64 {
        let sq = ret * ret;
        let next = match self.value {
            Some(prev) => self.alpha * sq + (1.0 - self.alpha) * prev,
            None => sq,
        };
        self.value = Some(next);
        next
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Standard deviation, `None` before the first update.
    pub fn sigma(&self) -> Option<f64> {
        self.value.map(|v| v.max(0.0).sqrt())
    }
}
