//! Single-horizon Z-momentum state.
//!
//! For each accepted price: push into the horizon window; once the window
//! spans the full horizon, take the log-return against the anchor, append it
//! to the bounded return history and fold its square into the EMA variance.
//! Z = last_return / sqrt(max(var, 1e-9)), clamped to ±clip.

use chrono::{DateTime, Duration, Utc};

use super::ewma::EwmaVariance;
use super::window::{BoundedWindow, TimeWindow};

/// Variance floor when normalizing returns.
const VARIANCE_FLOOR: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct HorizonState {
    prices: TimeWindow<f64>,
    returns: BoundedWindow<f64>,
    variance: EwmaVariance,
    clip: f64,
}

impl HorizonState {
    pub fn new(horizon: Duration, capacity: usize, alpha: f64, clip: f64) -> Self {
        assert!(horizon > Duration::zero(), "horizon must be positive");
        Self {
            prices: TimeWindow::new(horizon, capacity),
            returns: BoundedWindow::new(capacity),
            variance: EwmaVariance::new(alpha),
            clip,
        }
    }

    /// Feed one price. Returns the new horizon return when one was produced.
    pub fn update(&mut self, ts: DateTime<Utc>, price: f64) -> Option<f64> {
        self.prices.push(ts, price);
        if self.prices.span() < self.prices.horizon() {
            return None;
        }
        let &(_, anchor) = self.prices.anchor()?;
        let ret = price.ln() - anchor.ln();
        self.returns.push(ret);
        self.variance.update(ret);
        Some(ret)
    }

    pub fn last_return(&self) -> Option<f64> {
        self.returns.latest().copied()
    }

    pub fn variance(&self) -> Option<f64> {
        self.variance.value()
    }

    pub fn sigma(&self) -> Option<f64> {
        self.variance.sigma()
    }

    pub fn z(&self) -> f64 {
        let (Some(ret), Some(var)) = (self.last_return(), self.variance.value()) else {
            return 0.0;
        };
        let sigma = var.max(VARIANCE_FLOOR).sqrt();
        (ret / sigma).clamp(-self.clip, self.clip)
    }

    pub fn returns_len(&self) -> usize {
        self.returns.len()
    }

    pub fn returns_capacity(&self) -> usize {
        self.returns.capacity()
    }

    pub fn window_len(&self) -> usize {
        self.prices.len()
    }
}
