//! DecisionResult — the immutable output of one decision call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::components::{
    BiasReading, LeadershipGate, LevelCandidate, OrderFlowVerdict, RegimeReading, RiskLevels,
    StructureScore, TrueBreakResult,
};
use crate::domain::{Action, ConfigHash};

use super::fusion::FusionScore;
use super::trace::{DecisionTrace, Stage};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub stage: Stage,
    pub reason: String,
}

/// Flat view of every score the call produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub level: Option<f64>,
    pub bias: Option<f64>,
    pub leadership: Option<f64>,
    pub order_flow: Option<f64>,
    pub structure: Option<f64>,
    pub raw: Option<f64>,
    pub effective: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub timestamp: DateTime<Utc>,
    pub action: Action,
    pub regime: RegimeReading,
    pub candidate: Option<LevelCandidate>,
    pub bias: Option<BiasReading>,
    pub leadership: Option<LeadershipGate>,
    pub order_flow: Option<OrderFlowVerdict>,
    pub structure: Option<StructureScore>,
    pub fusion: Option<FusionScore>,
    pub true_break: Option<TrueBreakResult>,
    pub risk: Option<RiskLevels>,
    pub rejection: Option<Rejection>,
    pub trace: DecisionTrace,
    pub config_hash: ConfigHash,
    pub latency_us: u64,
}

impl DecisionResult {
    pub(crate) fn empty(timestamp: DateTime<Utc>, regime: RegimeReading, config_hash: ConfigHash) -> Self {
        Self {
            timestamp,
            action: Action::None,
            regime,
            candidate: None,
            bias: None,
            leadership: None,
            order_flow: None,
            structure: None,
            fusion: None,
            true_break: None,
            risk: None,
            rejection: None,
            trace: DecisionTrace::default(),
            config_hash,
            latency_us: 0,
        }
    }

    pub fn is_trade(&self) -> bool {
        self.action.is_trade()
    }

    pub fn rejected_at(&self) -> Option<Stage> {
        self.rejection.as_ref().map(|r| r.stage)
    }

    pub fn scores(&self) -> ComponentScores {
        ComponentScores {
            level: self.candidate.as_ref().map(|c| c.score),
            bias: self.bias.as_ref().map(|b| b.score),
            leadership: self.leadership.as_ref().map(|g| g.ls),
            order_flow: self.order_flow.as_ref().map(|v| v.score),
            structure: self.structure.as_ref().map(|s| s.score),
            raw: self.fusion.as_ref().map(|f| f.raw),
            effective: self.fusion.as_ref().map(|f| f.effective),
        }
    }
}
