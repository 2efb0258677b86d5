//! Fixed-tick risk levels.
//!
//! The same tick distances apply in every regime.
//! For longs:  stop = entry − stop_ticks, targets = entry + target_ticks.
//! For shorts: stop = entry + stop_ticks, targets = entry − target_ticks.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RiskPolicy;
use crate::domain::{Instrument, Side, TickPolicy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLevels {
    pub side: Side,
    pub entry: f64,
    pub stop: f64,
    pub target1: f64,
    pub target2: f64,
    pub risk_ticks: f64,
    pub reward1_ticks: f64,
    pub reward2_ticks: f64,
    pub risk_amount: f64,
    pub reward1_amount: f64,
    pub reward2_amount: f64,
    /// Reward to target 1 over risk.
    pub reward_risk: f64,
    pub reward_risk_t2: f64,
}

/// A broken risk invariant.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum RiskViolation {
    #[error("entry price {0} is not usable")]
    InvalidEntry(f64),

    #[error("stop {stop} is on the wrong side of entry {entry}")]
    StopWrongSide { entry: f64, stop: f64 },

    #[error("target {target} at {price} is not beyond entry {entry}")]
    TargetWrongSide { target: u8, entry: f64, price: f64 },

    #[error("risk distance must be positive")]
    NonPositiveRisk,

    #[error("reward distance must be positive")]
    NonPositiveReward,

    #[error("reward:risk {ratio:.2} below minimum {minimum:.2}")]
    RatioBelowMinimum { ratio: f64, minimum: f64 },
}

#[derive(Debug, Clone)]
pub struct RiskLevelCalculator {
    policy: RiskPolicy,
    instrument: Instrument,
}

impl RiskLevelCalculator {
    pub fn new(policy: RiskPolicy, instrument: Instrument) -> Self {
        Self { policy, instrument }
    }

    pub fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    /// Levels around `entry`, every price rounded to the instrument tick.
    pub fn compute(&self, entry: f64, side: Side) -> RiskLevels {
        let inst = &self.instrument;
        let entry = inst.round_price(entry, TickPolicy::RoundNearest);
        let sign = side.sign();
        let offset = |ticks: f64| {
            inst.round_price(entry + sign * inst.ticks_to_price(ticks), TickPolicy::RoundNearest)
        };

        let stop = offset(-self.policy.stop_ticks);
        let target1 = offset(self.policy.target1_ticks);
        let target2 = offset(self.policy.target2_ticks);

        // Prices are tick-aligned, so distances are whole ticks.
        let risk_ticks = inst.ticks_between(entry, stop).round();
        let reward1_ticks = inst.ticks_between(target1, entry).round();
        let reward2_ticks = inst.ticks_between(target2, entry).round();
        let ratio = |reward: f64| if risk_ticks > 0.0 { reward / risk_ticks } else { 0.0 };

        RiskLevels {
            side,
            entry,
            stop,
            target1,
            target2,
            risk_ticks,
            reward1_ticks,
            reward2_ticks,
            risk_amount: inst.ticks_to_currency(risk_ticks),
            reward1_amount: inst.ticks_to_currency(reward1_ticks),
            reward2_amount: inst.ticks_to_currency(reward2_ticks),
            reward_risk: ratio(reward1_ticks),
            reward_risk_t2: ratio(reward2_ticks),
        }
    }

    /// Every violated invariant; empty when the levels are usable.
    pub fn validate(&self, levels: &RiskLevels) -> Vec<RiskViolation> {
        let mut violations = Vec::new();
        let entry = levels.entry;
        if !entry.is_finite() || entry <= 0.0 {
            violations.push(RiskViolation::InvalidEntry(entry));
            return violations;
        }

        let sign = levels.side.sign();
        if (entry - levels.stop) * sign <= 0.0 {
            violations.push(RiskViolation::StopWrongSide { entry, stop: levels.stop });
        }
        for (target, price) in [(1u8, levels.target1), (2u8, levels.target2)] {
            if (price - entry) * sign <= 0.0 {
                violations.push(RiskViolation::TargetWrongSide { target, entry, price });
            }
        }
        if levels.risk_ticks <= 0.0 {
            violations.push(RiskViolation::NonPositiveRisk);
        }
        if levels.reward1_ticks <= 0.0 {
            violations.push(RiskViolation::NonPositiveReward);
        }
        if levels.reward_risk < self.policy.min_reward_risk {
            violations.push(RiskViolation::RatioBelowMinimum {
                ratio: levels.reward_risk,
                minimum: self.policy.min_reward_risk,
            });
        }
        violations
    }
}
