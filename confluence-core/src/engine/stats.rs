//! Pipeline counters across decision calls.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::result::DecisionResult;
use super::trace::Stage;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub calls: u64,
    /// Calls that found a level candidate.
    pub triggers: u64,
    /// Calls that produced a trade.
    pub decisions: u64,
    /// Passes per stage.
    pub passed: BTreeMap<Stage, u64>,
    /// Rejections per stage.
    pub rejected: BTreeMap<Stage, u64>,
    pub pairs_accepted: u64,
    pub pairs_skipped: u64,
    pub total_latency_us: u64,
    pub max_latency_us: u64,
}

impl PipelineStats {
    pub fn record(&mut self, result: &DecisionResult) {
        self.calls += 1;
        for record in result.trace.records() {
            let bucket = if record.outcome.is_passed() { &mut self.passed } else { &mut self.rejected };
            *bucket.entry(record.stage).or_insert(0) += 1;
        }
        if result.candidate.is_some() {
            self.triggers += 1;
        }
        if result.is_trade() {
            self.decisions += 1;
        }
        self.total_latency_us += result.latency_us;
        self.max_latency_us = self.max_latency_us.max(result.latency_us);
    }

    pub fn record_pair(&mut self, accepted: bool) {
        if accepted {
            self.pairs_accepted += 1;
        } else {
            self.pairs_skipped += 1;
        }
    }

    pub fn passed_at(&self, stage: Stage) -> u64 {
        self.passed.get(&stage).copied().unwrap_or(0)
    }

    pub fn rejected_at(&self, stage: Stage) -> u64 {
        self.rejected.get(&stage).copied().unwrap_or(0)
    }

    /// Trades per trigger, in [0, 1].
    pub fn success_rate(&self) -> f64 {
        if self.triggers == 0 {
            0.0
        } else {
            self.decisions as f64 / self.triggers as f64
        }
    }

    pub fn mean_latency_us(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.total_latency_us as f64 / self.calls as f64
        }
    }
}
