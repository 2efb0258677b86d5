//! Confluence Core — real-time multi-factor decision pipeline.
//!
//! Paired snapshots of a traded instrument and a leadership reference are
//! turned into a directional action with risk levels and a per-stage audit
//! trail:
//! - Domain types (snapshots, reference levels, sides, regimes, instruments)
//! - Streaming statistics (bounded windows, EWMA variance, rolling correlation)
//! - Independent scoring components (proximity, leadership, bias, order flow,
//!   structure, regime, true break, risk)
//! - Weighted fusion and the sequential gating orchestrator
//! - Validated TOML configuration fingerprinted with BLAKE3
//! - A seeded synthetic feed for replays and benchmarks

pub mod components;
pub mod config;
pub mod domain;
pub mod engine;
pub mod stats;
pub mod synthetic;

pub use config::{ConfigError, EngineConfig};
pub use engine::{DecisionOrchestrator, DecisionResult};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything that crosses the feed thread boundary
    /// is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::MarketSnapshot>();
        require_sync::<domain::MarketSnapshot>();
        require_send::<domain::FeedFrame>();
        require_sync::<domain::FeedFrame>();
        require_send::<domain::LevelSet>();
        require_sync::<domain::LevelSet>();
        require_send::<domain::Instrument>();
        require_sync::<domain::Instrument>();
        require_send::<domain::ConfigHash>();
        require_sync::<domain::ConfigHash>();

        // Configuration
        require_send::<config::EngineConfig>();
        require_sync::<config::EngineConfig>();

        // Components
        require_send::<components::LeadershipTracker>();
        require_sync::<components::LeadershipTracker>();
        require_send::<components::LeadershipHandle>();
        require_sync::<components::LeadershipHandle>();
        require_send::<components::BiasGate>();
        require_sync::<components::BiasGate>();
        require_send::<components::RiskLevelCalculator>();
        require_sync::<components::RiskLevelCalculator>();

        // Engine types
        require_send::<engine::DecisionOrchestrator>();
        require_sync::<engine::DecisionOrchestrator>();
        require_send::<engine::DecisionResult>();
        require_sync::<engine::DecisionResult>();
        require_send::<engine::PipelineStats>();
        require_sync::<engine::PipelineStats>();
        require_send::<engine::MemoryAuditSink>();
        require_sync::<engine::MemoryAuditSink>();

        // Synthetic feed
        require_send::<synthetic::SyntheticFeed>();
        require_sync::<synthetic::SyntheticFeed>();
    }
}
