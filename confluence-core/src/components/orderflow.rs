//! Order-flow confirmation count.
//!
//! Four independent confirmations:
//! 1. cumulative-delta trend agrees with the side
//! 2. |delta ratio| at or above the floor
//! 3. depth imbalance at or above the threshold
//! 4. bar volume at or above the floor
//!
//! Missing inputs never confirm. score = count / 4.

use serde::{Deserialize, Serialize};

use crate::config::OrderFlowParams;
use crate::domain::{MarketSnapshot, Side};

pub const CONFIRMATION_SOURCES: u32 = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationFlags {
    pub delta_trend: bool,
    pub delta_ratio: bool,
    pub depth_imbalance: bool,
    pub volume: bool,
}

impl ConfirmationFlags {
    pub fn count(&self) -> u32 {
        [self.delta_trend, self.delta_ratio, self.depth_imbalance, self.volume]
            .iter()
            .filter(|&&flag| flag)
            .count() as u32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFlowVerdict {
    pub score: f64,
    pub confirmations: u32,
    pub required: u32,
    pub valid: bool,
    pub flags: ConfirmationFlags,
}

#[derive(Debug, Clone)]
pub struct OrderFlowValidator {
    params: OrderFlowParams,
}

impl OrderFlowValidator {
    pub fn new(params: OrderFlowParams) -> Self {
        Self { params }
    }

    /// `delta_slope` is the raw slope of the recent cumulative-delta history.
    pub fn validate(
        &self,
        side: Side,
        snapshot: &MarketSnapshot,
        delta_slope: Option<f64>,
        required: u32,
    ) -> OrderFlowVerdict {
        let p = &self.params;
        let flags = ConfirmationFlags {
            delta_trend: delta_slope.is_some_and(|s| side.agrees_with(s)),
            delta_ratio: snapshot
                .order_flow
                .is_some_and(|of| of.delta_ratio.abs() >= p.delta_ratio_floor),
            depth_imbalance: snapshot
                .depth
                .as_ref()
                .and_then(|d| d.imbalance())
                .is_some_and(|imb| imb >= p.imbalance_threshold),
            volume: snapshot.volume.is_finite() && snapshot.volume >= p.volume_floor,
        };
        let confirmations = flags.count();

        OrderFlowVerdict {
            score: confirmations as f64 / CONFIRMATION_SOURCES as f64,
            confirmations,
            required,
            valid: confirmations >= required,
            flags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DepthBook, DepthLevel, OrderFlowStats, Pressure};
    use chrono::{TimeZone, Utc};

    fn snapshot(delta_ratio: Option<f64>, depth: Option<(f64, f64)>, volume: f64) -> MarketSnapshot {
        let mut s = MarketSnapshot::flat(Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap(), 4500.0);
        s.volume = volume;
        s.order_flow = delta_ratio.map(|dr| OrderFlowStats {
            delta_ratio: dr,
            cumulative_delta: 0.0,
            pressure: Pressure::Neutral,
        });
        s.depth = depth.map(|(bid, ask)| DepthBook {
            bids: vec![DepthLevel { price: 4499.75, size: bid }],
            asks: vec![DepthLevel { price: 4500.0, size: ask }],
        });
        s
    }

    fn validator() -> OrderFlowValidator {
        OrderFlowValidator::new(OrderFlowParams::default())
    }

    #[test]
    fn three_of_four() {
        let s = snapshot(Some(0.2), Some((300.0, 100.0)), 500.0);
        let v = validator().validate(Side::Long, &s, Some(0.0), 2);
        assert_eq!(v.confirmations, 3);
        assert_eq!(v.score, 0.75);
        assert!(v.valid);
        assert!(!v.flags.delta_trend);
    }

    #[test]
    fn delta_trend_must_agree_with_side() {
        let s = snapshot(None, None, 0.0);
        assert!(validator().validate(Side::Long, &s, Some(12.0), 1).flags.delta_trend);
        assert!(!validator().validate(Side::Short, &s, Some(12.0), 1).flags.delta_trend);
        assert!(validator().validate(Side::Short, &s, Some(-3.0), 1).flags.delta_trend);
    }

    #[test]
    fn negative_delta_ratio_counts_by_magnitude() {
        let s = snapshot(Some(-0.15), None, 0.0);
        assert!(validator().validate(Side::Short, &s, None, 1).flags.delta_ratio);
    }

    #[test]
    fn missing_inputs_do_not_confirm() {
        let s = snapshot(None, None, 0.0);
        let v = validator().validate(Side::Long, &s, None, 2);
        assert_eq!(v.confirmations, 0);
        assert_eq!(v.score, 0.0);
        assert!(!v.valid);
    }

    #[test]
    fn extra_requirement_can_fail_validation() {
        let s = snapshot(Some(0.2), None, 500.0);
        assert!(validator().validate(Side::Long, &s, None, 2).valid);
        assert!(!validator().validate(Side::Long, &s, None, 3).valid);
    }
}
