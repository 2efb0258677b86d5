//! Decision engine — fusion, the gating state machine, and its outputs.
//!
//! The orchestrator owns one instance of every component and runs them in a
//! fixed order per decision call. Results carry a full stage trace and are
//! delivered to an [`AuditSink`].

pub mod fusion;
pub mod orchestrator;
pub mod result;
pub mod sink;
pub mod stats;
pub mod trace;

pub use fusion::{FusionInputs, FusionScore, SignalFusionEngine};
pub use orchestrator::DecisionOrchestrator;
pub use result::{ComponentScores, DecisionResult, Rejection};
pub use sink::{AuditSink, MemoryAuditSink, NullAuditSink, TracingAuditSink};
pub use stats::PipelineStats;
pub use trace::{detail, DecisionTrace, Stage, StageOutcome, StageRecord};
