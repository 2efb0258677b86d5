//! Per-stage audit trail of one decision call.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    TriggerSearch,
    BiasGate,
    LeadershipGate,
    RegimeAdapt,
    OrderflowValidate,
    FuseAndThreshold,
    TrueBreakConfirm,
    RiskCompute,
    Done,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::TriggerSearch,
        Stage::BiasGate,
        Stage::LeadershipGate,
        Stage::RegimeAdapt,
        Stage::OrderflowValidate,
        Stage::FuseAndThreshold,
        Stage::TrueBreakConfirm,
        Stage::RiskCompute,
        Stage::Done,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::TriggerSearch => "TRIGGER_SEARCH",
            Stage::BiasGate => "BIAS_GATE",
            Stage::LeadershipGate => "LEADERSHIP_GATE",
            Stage::RegimeAdapt => "REGIME_ADAPT",
            Stage::OrderflowValidate => "ORDERFLOW_VALIDATE",
            Stage::FuseAndThreshold => "FUSE_AND_THRESHOLD",
            Stage::TrueBreakConfirm => "TRUE_BREAK_CONFIRM",
            Stage::RiskCompute => "RISK_COMPUTE",
            Stage::Done => "DONE",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum StageOutcome {
    Passed,
    Failed(String),
}

impl StageOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub outcome: StageOutcome,
    /// Numeric state of the stage at evaluation time.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub detail: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Ordered stage records; a failed record is always the last one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionTrace {
    records: Vec<StageRecord>,
}

/// Build a detail map from `(key, value)` pairs.
pub fn detail<const N: usize>(pairs: [(&str, f64); N]) -> BTreeMap<String, f64> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

impl DecisionTrace {
    pub fn pass(&mut self, stage: Stage, detail: BTreeMap<String, f64>) -> &mut StageRecord {
        self.push(stage, StageOutcome::Passed, detail)
    }

    pub fn fail(
        &mut self,
        stage: Stage,
        reason: impl Into<String>,
        detail: BTreeMap<String, f64>,
    ) -> &mut StageRecord {
        self.push(stage, StageOutcome::Failed(reason.into()), detail)
    }

    fn push(
        &mut self,
        stage: Stage,
        outcome: StageOutcome,
        detail: BTreeMap<String, f64>,
    ) -> &mut StageRecord {
        debug_assert!(
            self.rejected_at().is_none(),
            "no stage may follow a failed stage"
        );
        self.records.push(StageRecord { stage, outcome, detail, notes: Vec::new() });
        let last = self.records.len() - 1;
        &mut self.records[last]
    }

    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&StageRecord> {
        self.records.last()
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.records.iter().map(|r| r.stage).collect()
    }

    pub fn get(&self, stage: Stage) -> Option<&StageRecord> {
        self.records.iter().find(|r| r.stage == stage)
    }

    /// The stage that failed, if any.
    pub fn rejected_at(&self) -> Option<Stage> {
        self.records
            .last()
            .filter(|r| !r.outcome.is_passed())
            .map(|r| r.stage)
    }

    pub fn is_complete(&self) -> bool {
        self.records.last().is_some_and(|r| r.stage == Stage::Done && r.outcome.is_passed())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl fmt::Display for DecisionTrace {
    /// `[TRIGGER_SEARCH: passed, BIAS_GATE: failed]`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, r) in self.records.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let status = if r.outcome.is_passed() { "passed" } else { "failed" };
            write!(f, "{}: {status}", r.stage)?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_are_ordered() {
        let mut sorted = Stage::ALL;
        sorted.sort();
        assert_eq!(sorted, Stage::ALL);
    }

    #[test]
    fn stage_serde_name_matches_display() {
        for stage in Stage::ALL {
            assert_eq!(serde_json::to_string(&stage).unwrap(), format!("\"{stage}\""));
        }
    }

    #[test]
    fn failed_trace_display() {
        let mut trace = DecisionTrace::default();
        trace.fail(Stage::TriggerSearch, "no level within tolerance", BTreeMap::new());
        assert_eq!(trace.to_string(), "[TRIGGER_SEARCH: failed]");
        assert_eq!(trace.rejected_at(), Some(Stage::TriggerSearch));
        assert!(!trace.is_complete());
    }

    #[test]
    fn completed_trace() {
        let mut trace = DecisionTrace::default();
        trace.pass(Stage::TriggerSearch, detail([("score", 0.9)]));
        trace.pass(Stage::Done, BTreeMap::new()).notes.push("ok".into());
        assert!(trace.is_complete());
        assert_eq!(trace.rejected_at(), None);
        assert_eq!(trace.get(Stage::TriggerSearch).unwrap().detail["score"], 0.9);
        assert_eq!(trace.last().unwrap().notes, vec!["ok".to_string()]);
    }

    #[test]
    fn outcome_serializes_with_reason() {
        let json = serde_json::to_string(&StageOutcome::Failed("bias too weak".into())).unwrap();
        assert_eq!(json, r#"{"status":"failed","reason":"bias too weak"}"#);
        let json = serde_json::to_string(&StageOutcome::Passed).unwrap();
        assert_eq!(json, r#"{"status":"passed"}"#);
    }
}
