//! Streaming statistics — bounded windows, EMA variance, rolling correlation,
//! least-squares slope.
//!
//! Everything here is O(1) or O(window) per update and never grows past its
//! configured capacity.

pub mod correlation;
pub mod ewma;
pub mod horizon;
pub mod slope;
pub mod window;

pub use correlation::RollingCorrelation;
pub use ewma::EwmaVariance;
pub use horizon::HorizonState;
pub use slope::least_squares_slope;
pub use window::{BoundedWindow, TimeWindow};

/// Clamp into [0, 1]; NaN maps to 0.
pub fn clip01(x: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    x.clamp(0.0, 1.0)
}

/// Symmetric clamp into [-limit, limit]; NaN maps to 0.
pub fn clip_abs(x: f64, limit: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    x.clamp(-limit, limit)
}

/// Assert two f64 values are approximately equal.
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
