//! Scoring and validation components.
//!
//! Each component is independent of the others and owns only the state it
//! needs. The orchestrator in `engine` sequences them.

pub mod bias;
pub mod leadership;
pub mod level_proximity;
pub mod orderflow;
pub mod regime;
pub mod risk;
pub mod structure;
pub mod true_break;

pub use bias::{BiasComponents, BiasGate, BiasReading};
pub use leadership::{
    evaluate_gate, Leg, LeadershipGate, LeadershipHandle, LeadershipSnapshot, LeadershipTracker,
    PairingError,
};
pub use level_proximity::{proximity_score, LevelCandidate, LevelProximityScorer};
pub use orderflow::{ConfirmationFlags, OrderFlowValidator, OrderFlowVerdict};
pub use regime::{RegimeAdapter, RegimeReading};
pub use risk::{RiskLevelCalculator, RiskLevels, RiskViolation};
pub use structure::{StructuralContextScorer, StructureScore};
pub use true_break::{BreakVerdict, TrueBreakResult, TrueBreakValidator};
