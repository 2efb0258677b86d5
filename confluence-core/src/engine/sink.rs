//! Audit sinks — where finished decisions are delivered.

use parking_lot::Mutex;

use super::result::DecisionResult;

/// Receives every `DecisionResult` the orchestrator produces.
///
/// Sinks must not block; the decision path calls them inline.
pub trait AuditSink: Send + Sync {
    /// Human-readable name (e.g., "tracing", "memory").
    fn name(&self) -> &str;

    fn record(&self, result: &DecisionResult);
}

/// Emits one structured `tracing` event per decision.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn name(&self) -> &str {
        "tracing"
    }

    fn record(&self, result: &DecisionResult) {
        let scores = result.scores();
        match &result.rejection {
            None => tracing::info!(
                action = %result.action,
                regime = %result.regime.regime,
                level = ?result.candidate.as_ref().map(|c| c.level.name.as_str()),
                effective = ?scores.effective,
                entry = ?result.risk.as_ref().map(|r| r.entry),
                stop = ?result.risk.as_ref().map(|r| r.stop),
                target1 = ?result.risk.as_ref().map(|r| r.target1),
                latency_us = result.latency_us,
                config = result.config_hash.short(),
                trace = %result.trace,
                "decision emitted"
            ),
            Some(rejection) => tracing::debug!(
                stage = %rejection.stage,
                reason = %rejection.reason,
                regime = %result.regime.regime,
                level = ?scores.level,
                latency_us = result.latency_us,
                trace = %result.trace,
                "decision rejected"
            ),
        }
    }
}

/// Keeps every decision in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<DecisionResult>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DecisionResult> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn drain(&self) -> Vec<DecisionResult> {
        std::mem::take(&mut *self.records.lock())
    }
}

impl AuditSink for MemoryAuditSink {
    fn name(&self) -> &str {
        "memory"
    }

    fn record(&self, result: &DecisionResult) {
        self.records.lock().push(result.clone());
    }
}

impl<S: AuditSink + ?Sized> AuditSink for std::sync::Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn record(&self, result: &DecisionResult) {
        (**self).record(result)
    }
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn name(&self) -> &str {
        "null"
    }

    fn record(&self, _result: &DecisionResult) {}
}
