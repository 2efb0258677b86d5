//! True-break confirmation.
//!
//! A break counts only when the bar closes beyond the level and the wick
//! overshoots the level by no more than the regime's tolerance.
//!
//! LONG:  close ≥ level  and  low  ≥ level − tolerance·tick
//! SHORT: close ≤ level  and  high ≤ level + tolerance·tick

use serde::{Deserialize, Serialize};

use crate::domain::Side;

/// Float slack for prices that sit exactly on a tick boundary.
const PRICE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BreakVerdict {
    Confirmed,
    NoCloseBeyondLevel,
    WickTooDeep,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrueBreakResult {
    pub verdict: BreakVerdict,
    /// How far the wick went through the level against the trade, in ticks.
    pub overshoot_ticks: f64,
    pub tolerance_ticks: f64,
}

impl TrueBreakResult {
    pub fn is_confirmed(&self) -> bool {
        matches!(self.verdict, BreakVerdict::Confirmed)
    }
}

#[derive(Debug, Clone)]
pub struct TrueBreakValidator {
    tick_size: f64,
}

impl TrueBreakValidator {
    pub fn new(tick_size: f64) -> Self {
        assert!(tick_size > 0.0, "tick_size must be positive");
        Self { tick_size }
    }

    pub fn validate(
        &self,
        high: f64,
        low: f64,
        close: f64,
        level: f64,
        side: Side,
        tolerance_ticks: f64,
    ) -> TrueBreakResult {
        let allowance = tolerance_ticks * self.tick_size;
        let (closed_beyond, overshoot, wick_ok) = match side {
            Side::Long => (
                close >= level - PRICE_EPSILON,
                (level - low).max(0.0),
                low >= level - allowance - PRICE_EPSILON,
            ),
            Side::Short => (
                close <= level + PRICE_EPSILON,
                (high - level).max(0.0),
                high <= level + allowance + PRICE_EPSILON,
            ),
        };

        let verdict = if !closed_beyond {
            BreakVerdict::NoCloseBeyondLevel
        } else if !wick_ok {
            BreakVerdict::WickTooDeep
        } else {
            BreakVerdict::Confirmed
        };

        TrueBreakResult {
            verdict,
            overshoot_ticks: overshoot / self.tick_size,
            tolerance_ticks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{assert_approx, DEFAULT_EPSILON};

    fn validator() -> TrueBreakValidator {
        TrueBreakValidator::new(0.25)
    }

    #[test]
    fn long_break_with_small_wick() {
        let r = validator().validate(4500.50, 4499.50, 4500.25, 4499.75, Side::Long, 5.0);
        assert!(r.is_confirmed());
        assert_approx(r.overshoot_ticks, 1.0, DEFAULT_EPSILON);
    }

    #[test]
    fn close_exactly_at_level_with_no_overshoot() {
        let r = validator().validate(4500.0, 4499.75, 4499.75, 4499.75, Side::Long, 0.0);
        assert!(r.is_confirmed());
        let r = validator().validate(4500.0, 4499.5, 4500.0, 4500.0, Side::Short, 0.0);
        assert!(r.is_confirmed());
    }

    #[test]
    fn fakeout_wick_is_rejected() {
        // Low pierces 8 ticks below the level with tolerance 5.
        let r = validator().validate(4500.50, 4497.75, 4500.25, 4499.75, Side::Long, 5.0);
        assert_eq!(r.verdict, BreakVerdict::WickTooDeep);
        assert_approx(r.overshoot_ticks, 8.0, DEFAULT_EPSILON);
    }

    #[test]
    fn no_close_beyond_level() {
        let r = validator().validate(4500.0, 4499.0, 4499.50, 4499.75, Side::Long, 5.0);
        assert_eq!(r.verdict, BreakVerdict::NoCloseBeyondLevel);
    }

    #[test]
    fn short_mirror() {
        let v = validator();
        assert!(v.validate(4501.0, 4498.0, 4499.0, 4500.0, Side::Short, 5.0).is_confirmed());
        assert_eq!(
            v.validate(4502.0, 4498.0, 4499.0, 4500.0, Side::Short, 5.0).verdict,
            BreakVerdict::WickTooDeep
        );
        assert_eq!(
            v.validate(4501.0, 4498.0, 4500.25, 4500.0, Side::Short, 5.0).verdict,
            BreakVerdict::NoCloseBeyondLevel
        );
    }
}
