//! Decision orchestrator — the gating state machine.
//!
//! TRIGGER_SEARCH → BIAS_GATE → LEADERSHIP_GATE → REGIME_ADAPT →
//! ORDERFLOW_VALIDATE → FUSE_AND_THRESHOLD → TRUE_BREAK_CONFIRM →
//! RISK_COMPUTE → DONE
//!
//! Every stage either passes (and records its state) or rejects, which ends
//! the call with action NONE. Evaluation reads tracker state but never
//! mutates it; state moves forward only through `ingest`.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::components::{
    BiasGate, LeadershipHandle, LeadershipSnapshot, LeadershipTracker, LevelProximityScorer,
    OrderFlowValidator, PairingError, RegimeAdapter, RiskLevelCalculator, StructuralContextScorer,
    TrueBreakValidator,
};
use crate::config::{ConfigError, EngineConfig};
use crate::domain::{ConfigHash, Freshness, LevelSet, MarketSnapshot, Side};

use super::fusion::{FusionInputs, SignalFusionEngine};
use super::result::{DecisionResult, Rejection};
use super::sink::{AuditSink, TracingAuditSink};
use super::stats::PipelineStats;
use super::trace::{detail, DecisionTrace, Stage};

fn reject(
    trace: &mut DecisionTrace,
    stage: Stage,
    reason: String,
    detail: BTreeMap<String, f64>,
) -> Rejection {
    trace.fail(stage, reason.clone(), detail);
    Rejection { stage, reason }
}

pub struct DecisionOrchestrator {
    config: EngineConfig,
    config_hash: ConfigHash,
    scorer: LevelProximityScorer,
    leadership: LeadershipHandle,
    bias: BiasGate,
    regime: RegimeAdapter,
    order_flow: OrderFlowValidator,
    structure: StructuralContextScorer,
    fusion: SignalFusionEngine,
    true_break: TrueBreakValidator,
    risk: RiskLevelCalculator,
    stats: PipelineStats,
    sink: Box<dyn AuditSink>,
}

impl std::fmt::Debug for DecisionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionOrchestrator")
            .field("config_hash", &self.config_hash)
            .field("stats", &self.stats)
            .field("sink", &self.sink.name())
            .finish()
    }
}

impl DecisionOrchestrator {
    /// Validate `config` and build every component with a fresh tracker.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let tracker = LeadershipTracker::new(config.leadership.clone());
        Self::with_leadership(config, LeadershipHandle::new(tracker))
    }

    /// Build around an existing (possibly shared) leadership tracker.
    pub fn with_leadership(
        config: EngineConfig,
        leadership: LeadershipHandle,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let tick = config.instrument.tick_size;
        Ok(Self {
            config_hash: config.config_hash(),
            scorer: LevelProximityScorer::new(config.tolerances.clone(), tick),
            leadership,
            bias: BiasGate::new(config.bias.clone()),
            regime: RegimeAdapter::new(config.breakpoints.clone(), config.regimes.clone()),
            order_flow: OrderFlowValidator::new(config.order_flow.clone()),
            structure: StructuralContextScorer::new(tick),
            fusion: SignalFusionEngine::from_config(&config),
            true_break: TrueBreakValidator::new(tick),
            risk: RiskLevelCalculator::new(config.risk.clone(), config.instrument.clone()),
            stats: PipelineStats::default(),
            sink: Box::new(TracingAuditSink),
            config,
        })
    }

    pub fn with_sink(mut self, sink: impl AuditSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn config_hash(&self) -> &ConfigHash {
        &self.config_hash
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn leadership(&self) -> &LeadershipHandle {
        &self.leadership
    }

    pub fn bias_gate(&self) -> &BiasGate {
        &self.bias
    }

    /// Continuous path: cache the primary bar for the bias gate and feed the
    /// pair to the leadership tracker. A rejected pair leaves tracker state
    /// untouched.
    pub fn ingest(
        &mut self,
        primary: &MarketSnapshot,
        secondary: &MarketSnapshot,
    ) -> Result<LeadershipSnapshot, PairingError> {
        self.bias.ingest(primary);
        let max_delay = Duration::milliseconds(self.config.leadership.max_pair_delay_ms);
        let outcome = self.leadership.update_from_paired_inputs(primary, secondary, max_delay);
        self.stats.record_pair(outcome.is_ok());
        if let Err(err) = &outcome {
            tracing::debug!(%err, "paired update skipped");
        }
        outcome
    }

    /// Evaluate, count and deliver to the audit sink.
    pub fn decide(
        &mut self,
        primary: &MarketSnapshot,
        levels: &LevelSet,
        now: DateTime<Utc>,
    ) -> DecisionResult {
        let result = self.evaluate(primary, levels, now);
        self.stats.record(&result);
        self.sink.record(&result);
        result
    }

    /// Ingest one pair, then decide on it.
    pub fn step(
        &mut self,
        primary: &MarketSnapshot,
        secondary: &MarketSnapshot,
        levels: &LevelSet,
    ) -> DecisionResult {
        // Skipped pairs are already logged and counted.
        let _ = self.ingest(primary, secondary);
        self.decide(primary, levels, primary.timestamp.max(secondary.timestamp))
    }

    /// Run the gate sequence once. Pure with respect to tracker state.
    pub fn evaluate(
        &self,
        primary: &MarketSnapshot,
        levels: &LevelSet,
        now: DateTime<Utc>,
    ) -> DecisionResult {
        let started = Instant::now();
        let regime = self.regime.classify(primary.volatility_index);
        let mut result = DecisionResult::empty(now, regime, self.config_hash.clone());

        match self.run_stages(primary, levels, now, &mut result) {
            Ok(side) => {
                result.action = side.into();
                result.trace.pass(Stage::Done, BTreeMap::new());
            }
            Err(rejection) => result.rejection = Some(rejection),
        }

        result.latency_us = started.elapsed().as_micros() as u64;
        result
    }

    fn run_stages(
        &self,
        primary: &MarketSnapshot,
        levels: &LevelSet,
        now: DateTime<Utc>,
        out: &mut DecisionResult,
    ) -> Result<Side, Rejection> {
        let regime = out.regime.regime;
        let thresholds = self.regime.thresholds(regime);

        // ── TRIGGER_SEARCH ──
        let Some(price) = primary.current_price() else {
            return Err(reject(
                &mut out.trace,
                Stage::TriggerSearch,
                "no usable current price".into(),
                BTreeMap::new(),
            ));
        };
        let Some(candidate) = self.scorer.score(price, levels) else {
            return Err(reject(
                &mut out.trace,
                Stage::TriggerSearch,
                format!("no level within tolerance of {price}"),
                detail([("price", price), ("levels", levels.len() as f64)]),
            ));
        };
        let side = candidate.side;
        let record = out.trace.pass(
            Stage::TriggerSearch,
            detail([
                ("price", price),
                ("level_price", candidate.level.price),
                ("distance_ticks", candidate.distance_ticks),
                ("tolerance_ticks", candidate.tolerance_ticks),
                ("score", candidate.score),
            ]),
        );
        record.notes.push(format!("{} → {side}", candidate.level.name));
        if let Some(age) = levels.age(now) {
            record.detail.insert("levels_age_secs".into(), age.num_seconds() as f64);
        }
        out.candidate = Some(candidate.clone());

        // ── BIAS_GATE ──
        let bias = self.bias.reading(now, thresholds.bias_factor);
        out.bias = Some(bias.clone());
        let bias_detail = detail([
            ("bias", bias.score),
            ("min_magnitude", thresholds.bias_min_magnitude),
            ("regime_factor", bias.regime_factor),
        ]);
        if !bias.permits(side, thresholds.bias_min_magnitude) {
            let reason = if bias.available {
                format!(
                    "bias {:.2} does not support {side} (needs |bias| ≥ {:.2})",
                    bias.score, thresholds.bias_min_magnitude
                )
            } else {
                "bias unavailable".to_string()
            };
            return Err(reject(&mut out.trace, Stage::BiasGate, reason, bias_detail));
        }
        let record = out.trace.pass(Stage::BiasGate, bias_detail);
        if bias.freshness != Freshness::Ok {
            record.notes.push(format!(
                "bias data {:?} ({} ms)",
                bias.freshness,
                bias.age_ms.unwrap_or_default()
            ));
        }

        // ── LEADERSHIP_GATE ──
        let gate = self.leadership.gate(side, regime, &thresholds.leadership);
        out.leadership = Some(gate.clone());
        let mut gate_detail = detail([
            ("ls", gate.ls),
            ("bonus", gate.bonus),
            ("extra_confirmations", gate.extra_confirmations as f64),
        ]);
        if let Some(corr) = gate.correlation {
            gate_detail.insert("correlation".into(), corr);
        }
        if !gate.allow {
            return Err(reject(&mut out.trace, Stage::LeadershipGate, gate.reason.clone(), gate_detail));
        }
        out.trace.pass(Stage::LeadershipGate, gate_detail).notes.push(gate.reason.clone());

        // ── REGIME_ADAPT ──
        let mut regime_detail = detail([
            ("score_multiplier", thresholds.score_multiplier),
            ("min_confirmations", thresholds.min_confirmations as f64),
            ("wick_tolerance_ticks", thresholds.wick_tolerance_ticks),
            ("structure_buffer_ticks", thresholds.structure_buffer_ticks),
        ]);
        if let Some(vix) = out.regime.volatility_index {
            regime_detail.insert("volatility_index".into(), vix);
        }
        let record = out.trace.pass(Stage::RegimeAdapt, regime_detail);
        record.notes.push(format!("regime {regime}"));
        if out.regime.defaulted {
            record.notes.push("volatility index unavailable, MID assumed".into());
        }

        // ── ORDERFLOW_VALIDATE ──
        let required = thresholds.min_confirmations + gate.extra_confirmations;
        let verdict = self.order_flow.validate(side, primary, self.bias.delta_slope(), required);
        out.order_flow = Some(verdict.clone());
        let of_detail = detail([
            ("confirmations", verdict.confirmations as f64),
            ("required", verdict.required as f64),
            ("score", verdict.score),
        ]);
        if !verdict.valid {
            return Err(reject(
                &mut out.trace,
                Stage::OrderflowValidate,
                format!("{}/{} order-flow confirmations", verdict.confirmations, verdict.required),
                of_detail,
            ));
        }
        out.trace.pass(Stage::OrderflowValidate, of_detail);

        // ── FUSE_AND_THRESHOLD ──
        let structure = self.structure.score(price, primary, thresholds.structure_buffer_ticks);
        let fusion = self.fusion.fuse(&FusionInputs {
            level: candidate.score,
            order_flow: verdict.score,
            structure: structure.score,
            bias: bias.score,
            regime_multiplier: thresholds.score_multiplier,
            leadership_bonus: gate.bonus,
        });
        let fuse_detail = detail([
            ("level", candidate.score),
            ("order_flow", verdict.score),
            ("structure", structure.score),
            ("raw", fusion.raw),
            ("effective", fusion.effective),
            ("threshold", fusion.threshold),
        ]);
        out.structure = Some(structure);
        out.fusion = Some(fusion.clone());
        if !fusion.passed {
            return Err(reject(
                &mut out.trace,
                Stage::FuseAndThreshold,
                format!("effective {:.4} below threshold {:.2}", fusion.effective, fusion.threshold),
                fuse_detail,
            ));
        }
        out.trace.pass(Stage::FuseAndThreshold, fuse_detail);

        // ── TRUE_BREAK_CONFIRM ──
        let brk = self.true_break.validate(
            primary.high,
            primary.low,
            primary.close,
            candidate.level.price,
            side,
            thresholds.wick_tolerance_ticks,
        );
        out.true_break = Some(brk.clone());
        let brk_detail = detail([
            ("overshoot_ticks", brk.overshoot_ticks),
            ("tolerance_ticks", brk.tolerance_ticks),
        ]);
        if !brk.is_confirmed() {
            return Err(reject(
                &mut out.trace,
                Stage::TrueBreakConfirm,
                format!("true break not confirmed: {:?}", brk.verdict),
                brk_detail,
            ));
        }
        out.trace.pass(Stage::TrueBreakConfirm, brk_detail);

        // ── RISK_COMPUTE ──
        let plan = self.risk.compute(price, side);
        let risk_detail = detail([
            ("entry", plan.entry),
            ("stop", plan.stop),
            ("target1", plan.target1),
            ("target2", plan.target2),
            ("risk_amount", plan.risk_amount),
            ("reward_risk", plan.reward_risk),
        ]);
        let violations = self.risk.validate(&plan);
        if !violations.is_empty() {
            let reason = violations.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("; ");
            return Err(reject(&mut out.trace, Stage::RiskCompute, reason, risk_detail));
        }
        out.trace.pass(Stage::RiskCompute, risk_detail);
        out.risk = Some(plan);

        Ok(side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Action, LevelCategory, LevelSide, ReferenceLevel};
    use crate::engine::sink::MemoryAuditSink;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn far_levels() -> LevelSet {
        LevelSet::new(vec![ReferenceLevel::new(
            "call_wall",
            4600.0,
            LevelCategory::GammaWall,
            LevelSide::Resistance,
        )])
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.weights.level = 0.9;
        assert!(matches!(
            DecisionOrchestrator::new(config),
            Err(ConfigError::WeightSum { .. })
        ));
    }

    #[test]
    fn invalid_leadership_params_are_errors_not_panics() {
        let cases: [fn(&mut EngineConfig); 5] = [
            |c| c.leadership.alpha = 0.0,
            |c| c.leadership.history_capacity[0] = 0,
            |c| c.leadership.min_correlation_samples = 1,
            |c| c.leadership.correlation_window = 0,
            |c| c.leadership.horizons_secs = [3, 30, u64::MAX],
        ];
        for (i, mutate) in cases.iter().enumerate() {
            let mut config = EngineConfig::default();
            mutate(&mut config);
            assert!(DecisionOrchestrator::new(config).is_err(), "case {i} accepted");
        }
    }

    #[test]
    fn no_level_in_range_rejects_at_trigger() {
        let orch = DecisionOrchestrator::new(EngineConfig::default()).unwrap();
        let snap = MarketSnapshot::flat(t(0), 4500.0);
        let r = orch.evaluate(&snap, &far_levels(), t(0));
        assert_eq!(r.action, Action::None);
        assert_eq!(r.rejected_at(), Some(Stage::TriggerSearch));
        assert_eq!(r.trace.to_string(), "[TRIGGER_SEARCH: failed]");
        assert!(r.candidate.is_none());
    }

    #[test]
    fn missing_bias_inputs_reject_at_bias_gate() {
        let orch = DecisionOrchestrator::new(EngineConfig::default()).unwrap();
        let snap = MarketSnapshot::flat(t(0), 4500.0);
        let levels = LevelSet::new(vec![ReferenceLevel::new(
            "put_support",
            4499.75,
            LevelCategory::GammaWall,
            LevelSide::Support,
        )]);
        let r = orch.evaluate(&snap, &levels, t(0));
        assert_eq!(r.rejected_at(), Some(Stage::BiasGate));
        assert_eq!(r.rejection.unwrap().reason, "bias unavailable");
        assert_eq!(r.trace.stages(), vec![Stage::TriggerSearch, Stage::BiasGate]);
    }

    #[test]
    fn missing_volatility_index_defaults_to_mid() {
        let orch = DecisionOrchestrator::new(EngineConfig::default()).unwrap();
        let r = orch.evaluate(&MarketSnapshot::flat(t(0), 4500.0), &far_levels(), t(0));
        assert!(r.regime.defaulted);
        assert_eq!(r.regime.regime, crate::domain::Regime::Mid);
    }

    #[test]
    fn decide_updates_stats_and_sink() {
        let sink = Arc::new(MemoryAuditSink::new());
        let mut orch = DecisionOrchestrator::new(EngineConfig::default())
            .unwrap()
            .with_sink(Arc::clone(&sink));
        let snap = MarketSnapshot::flat(t(0), 4500.0);
        orch.decide(&snap, &far_levels(), t(0));
        orch.decide(&snap, &far_levels(), t(1));
        assert_eq!(sink.len(), 2);
        assert_eq!(orch.stats().calls, 2);
        assert_eq!(orch.stats().rejected_at(Stage::TriggerSearch), 2);
        assert_eq!(orch.stats().triggers, 0);
        assert_eq!(orch.stats().success_rate(), 0.0);
    }

    #[test]
    fn ingest_counts_skipped_pairs() {
        let mut orch = DecisionOrchestrator::new(EngineConfig::default()).unwrap();
        let a = MarketSnapshot::flat(t(0), 4500.0);
        let b = MarketSnapshot::flat(t(1), 15600.0);
        assert!(matches!(orch.ingest(&a, &b), Err(PairingError::ClockSkewExceeded { .. })));
        let b = MarketSnapshot::flat(t(0), 15600.0);
        assert!(orch.ingest(&a, &b).is_ok());
        assert_eq!(orch.stats().pairs_skipped, 1);
        assert_eq!(orch.stats().pairs_accepted, 1);
        assert_eq!(orch.leadership().lock().updates(), 1);
    }
}
