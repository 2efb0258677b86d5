//! Engine configuration — one validated, strongly typed bundle.
//!
//! Every section has defaults, so a TOML file only needs the keys it
//! overrides. `validate()` runs once at construction; a config that fails
//! it never reaches the decision path.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::domain::{ConfigHash, Instrument, LevelCategory, Regime};

/// Tolerance for the fusion weights summing to one.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Fusion weights must sum to 1.0 (got {sum:.4})")]
    WeightSum { sum: f64 },

    #[error("Regime breakpoints must be strictly increasing (got {low_mid}, {mid_high}, {high_extreme})")]
    UnorderedBreakpoints { low_mid: f64, mid_high: f64, high_extreme: f64 },

    #[error("{field} must be non-negative (got {value})")]
    Negative { field: String, value: f64 },

    #[error("{field} must be positive (got {value})")]
    NonPositive { field: String, value: f64 },

    #[error("{field} must be finite")]
    NonFinite { field: String },

    #[error("{field} must lie in (0, 1] (got {value})")]
    InvalidSmoothing { field: String, value: f64 },

    #[error("{field} must be non-empty")]
    EmptyWindow { field: String },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

// ─── Fusion ─────────────────────────────────────────────────────────

/// Weights of the three fused scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    pub level: f64,
    pub order_flow: f64,
    pub structure: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self { level: 0.55, order_flow: 0.30, structure: 0.15 }
    }
}

impl FusionWeights {
    pub fn sum(&self) -> f64 {
        self.level + self.order_flow + self.structure
    }
}

// ─── Regimes ────────────────────────────────────────────────────────

/// Volatility-index breakpoints: `< low_mid` → LOW, `< mid_high` → MID,
/// `< high_extreme` → HIGH, otherwise EXTREME.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeBreakpoints {
    pub low_mid: f64,
    pub mid_high: f64,
    pub high_extreme: f64,
}

impl Default for RegimeBreakpoints {
    fn default() -> Self {
        Self { low_mid: 15.0, mid_high: 22.0, high_extreme: 35.0 }
    }
}

impl RegimeBreakpoints {
    pub fn classify(&self, volatility_index: f64) -> Regime {
        if volatility_index < self.low_mid {
            Regime::Low
        } else if volatility_index < self.mid_high {
            Regime::Mid
        } else if volatility_index < self.high_extreme {
            Regime::High
        } else {
            Regime::Extreme
        }
    }
}

/// Leadership gate magnitudes for one regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadershipGateParams {
    /// Below this rolling correlation the leadership gate is bypassed.
    pub correlation_floor: f64,
    /// |LS| at or above this, against the trade, blocks it outright.
    pub hard_block: f64,
    /// |LS| at or above this, with the trade, earns the bonus multiplier.
    pub bonus_threshold: f64,
}

/// Everything that varies with the volatility regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeThresholds {
    pub score_multiplier: f64,
    pub min_confirmations: u32,
    pub wick_tolerance_ticks: f64,
    pub structure_buffer_ticks: f64,
    pub bias_min_magnitude: f64,
    pub bias_factor: f64,
    pub leadership: LeadershipGateParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeTable {
    pub low: RegimeThresholds,
    pub mid: RegimeThresholds,
    pub high: RegimeThresholds,
    pub extreme: RegimeThresholds,
}

impl Default for RegimeTable {
    fn default() -> Self {
        let calm_gate =
            |floor: f64| LeadershipGateParams { correlation_floor: floor, hard_block: 1.00, bonus_threshold: 0.50 };
        let tight_gate =
            |floor: f64| LeadershipGateParams { correlation_floor: floor, hard_block: 1.25, bonus_threshold: 0.75 };
        Self {
            low: RegimeThresholds {
                score_multiplier: 1.05,
                min_confirmations: 2,
                wick_tolerance_ticks: 3.0,
                structure_buffer_ticks: 1.0,
                bias_min_magnitude: 0.20,
                bias_factor: 0.95,
                leadership: calm_gate(0.30),
            },
            mid: RegimeThresholds {
                score_multiplier: 1.00,
                min_confirmations: 2,
                wick_tolerance_ticks: 5.0,
                structure_buffer_ticks: 1.0,
                bias_min_magnitude: 0.20,
                bias_factor: 1.00,
                leadership: calm_gate(0.30),
            },
            high: RegimeThresholds {
                score_multiplier: 0.90,
                min_confirmations: 3,
                wick_tolerance_ticks: 7.0,
                structure_buffer_ticks: 2.0,
                bias_min_magnitude: 0.25,
                bias_factor: 0.95,
                leadership: tight_gate(0.45),
            },
            extreme: RegimeThresholds {
                score_multiplier: 0.85,
                min_confirmations: 3,
                wick_tolerance_ticks: 7.0,
                structure_buffer_ticks: 3.0,
                bias_min_magnitude: 0.30,
                bias_factor: 0.85,
                leadership: tight_gate(0.60),
            },
        }
    }
}

impl RegimeTable {
    pub fn get(&self, regime: Regime) -> &RegimeThresholds {
        match regime {
            Regime::Low => &self.low,
            Regime::Mid => &self.mid,
            Regime::High => &self.high,
            Regime::Extreme => &self.extreme,
        }
    }
}

// ─── Levels ─────────────────────────────────────────────────────────

/// Proximity tolerance in ticks per level category. Zero disables a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelTolerances {
    pub gamma_wall: f64,
    pub high_volume: f64,
    pub other: f64,
}

impl Default for LevelTolerances {
    fn default() -> Self {
        Self { gamma_wall: 10.0, high_volume: 10.0, other: 10.0 }
    }
}

impl LevelTolerances {
    pub fn get(&self, category: LevelCategory) -> f64 {
        match category {
            LevelCategory::GammaWall => self.gamma_wall,
            LevelCategory::HighVolume => self.high_volume,
            LevelCategory::Other => self.other,
        }
    }
}

// ─── Leadership ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadershipParams {
    /// Short, medium and long horizons in seconds.
    pub horizons_secs: [u64; 3],
    /// Return-history capacity per horizon.
    pub history_capacity: [usize; 3],
    /// Blend of the per-horizon leadership values.
    pub horizon_weights: [f64; 3],
    /// EMA factor for both the variance and the leadership score.
    pub alpha: f64,
    pub initial_beta: f64,
    pub beta_min: f64,
    pub beta_max: f64,
    pub z_clip: f64,
    pub ls_clip: f64,
    pub correlation_window: usize,
    pub min_correlation_samples: usize,
    pub max_pair_delay_ms: i64,
    pub bonus_multiplier: f64,
}

impl Default for LeadershipParams {
    fn default() -> Self {
        Self {
            horizons_secs: [3, 30, 300],
            history_capacity: [120, 600, 3600],
            horizon_weights: [0.6, 0.3, 0.1],
            alpha: 0.2,
            initial_beta: 1.3,
            beta_min: 0.8,
            beta_max: 1.6,
            z_clip: 3.0,
            ls_clip: 2.0,
            correlation_window: 300,
            min_correlation_samples: 10,
            max_pair_delay_ms: 200,
            bonus_multiplier: 1.05,
        }
    }
}

// ─── Bias ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiasParams {
    pub history_len: usize,
    pub old_after_ms: i64,
    pub stale_after_ms: i64,
    /// |bias| at or above this earns `bonus_multiplier` in fusion.
    pub bonus_magnitude: f64,
    pub bonus_multiplier: f64,
}

impl Default for BiasParams {
    fn default() -> Self {
        Self {
            history_len: 16,
            old_after_ms: 2100,
            stale_after_ms: 5000,
            bonus_magnitude: 0.35,
            bonus_multiplier: 1.05,
        }
    }
}

// ─── Order flow ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderFlowParams {
    pub delta_ratio_floor: f64,
    pub imbalance_threshold: f64,
    pub volume_floor: f64,
}

impl Default for OrderFlowParams {
    fn default() -> Self {
        Self { delta_ratio_floor: 0.10, imbalance_threshold: 0.10, volume_floor: 100.0 }
    }
}

// ─── Risk ───────────────────────────────────────────────────────────

/// Fixed-tick stop/target policy, identical in every regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskPolicy {
    pub stop_ticks: f64,
    pub target1_ticks: f64,
    pub target2_ticks: f64,
    pub min_reward_risk: f64,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self { stop_ticks: 7.0, target1_ticks: 14.0, target2_ticks: 21.0, min_reward_risk: 1.5 }
    }
}

// ─── Engine ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub instrument: Instrument,
    pub entry_threshold: f64,
    pub weights: FusionWeights,
    pub breakpoints: RegimeBreakpoints,
    pub regimes: RegimeTable,
    pub tolerances: LevelTolerances,
    pub leadership: LeadershipParams,
    pub bias: BiasParams,
    pub order_flow: OrderFlowParams,
    pub risk: RiskPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instrument: Instrument::es(),
            entry_threshold: 0.30,
            weights: FusionWeights::default(),
            breakpoints: RegimeBreakpoints::default(),
            regimes: RegimeTable::default(),
            tolerances: LevelTolerances::default(),
            leadership: LeadershipParams::default(),
            bias: BiasParams::default(),
            order_flow: OrderFlowParams::default(),
            risk: RiskPolicy::default(),
        }
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFinite { field: field.to_string() });
    }
    if value < 0.0 {
        return Err(ConfigError::Negative { field: field.to_string(), value });
    }
    Ok(())
}

fn positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFinite { field: field.to_string() });
    }
    if value <= 0.0 {
        return Err(ConfigError::NonPositive { field: field.to_string(), value });
    }
    Ok(())
}

fn smoothing(field: &str, value: f64) -> Result<(), ConfigError> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(ConfigError::InvalidSmoothing { field: field.to_string(), value });
    }
    Ok(())
}

/// Longest leadership horizon accepted: one day.
pub const MAX_HORIZON_SECS: u64 = 86_400;

fn non_empty(field: &str, len: usize) -> Result<(), ConfigError> {
    if len == 0 {
        return Err(ConfigError::EmptyWindow { field: field.to_string() });
    }
    Ok(())
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Deterministic fingerprint of every parameter.
    pub fn config_hash(&self) -> ConfigHash {
        let json = serde_json::to_string(self).expect("EngineConfig must serialize");
        ConfigHash::from_bytes(json.as_bytes())
    }

    pub fn thresholds(&self, regime: Regime) -> &RegimeThresholds {
        self.regimes.get(regime)
    }

    /// Fail-fast structural validation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("instrument.tick_size", self.instrument.tick_size)?;
        positive("instrument.tick_value", self.instrument.tick_value)?;
        non_negative("entry_threshold", self.entry_threshold)?;

        let w = &self.weights;
        non_negative("weights.level", w.level)?;
        non_negative("weights.order_flow", w.order_flow)?;
        non_negative("weights.structure", w.structure)?;
        let sum = w.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum { sum });
        }

        let b = &self.breakpoints;
        for (field, v) in [
            ("breakpoints.low_mid", b.low_mid),
            ("breakpoints.mid_high", b.mid_high),
            ("breakpoints.high_extreme", b.high_extreme),
        ] {
            non_negative(field, v)?;
        }
        if !(b.low_mid < b.mid_high && b.mid_high < b.high_extreme) {
            return Err(ConfigError::UnorderedBreakpoints {
                low_mid: b.low_mid,
                mid_high: b.mid_high,
                high_extreme: b.high_extreme,
            });
        }

        for regime in Regime::ALL {
            let t = self.regimes.get(regime);
            let name = regime.as_str().to_lowercase();
            positive(&format!("regimes.{name}.score_multiplier"), t.score_multiplier)?;
            non_negative(&format!("regimes.{name}.wick_tolerance_ticks"), t.wick_tolerance_ticks)?;
            non_negative(
                &format!("regimes.{name}.structure_buffer_ticks"),
                t.structure_buffer_ticks,
            )?;
            non_negative(&format!("regimes.{name}.bias_min_magnitude"), t.bias_min_magnitude)?;
            positive(&format!("regimes.{name}.bias_factor"), t.bias_factor)?;
            non_negative(
                &format!("regimes.{name}.leadership.correlation_floor"),
                t.leadership.correlation_floor,
            )?;
            non_negative(&format!("regimes.{name}.leadership.hard_block"), t.leadership.hard_block)?;
            non_negative(
                &format!("regimes.{name}.leadership.bonus_threshold"),
                t.leadership.bonus_threshold,
            )?;
        }

        non_negative("tolerances.gamma_wall", self.tolerances.gamma_wall)?;
        non_negative("tolerances.high_volume", self.tolerances.high_volume)?;
        non_negative("tolerances.other", self.tolerances.other)?;

        let l = &self.leadership;
        let [h0, h1, h2] = l.horizons_secs;
        if !(h0 > 0 && h0 < h1 && h1 < h2) {
            return Err(ConfigError::Invalid(format!(
                "leadership.horizons_secs must be positive and strictly increasing (got {:?})",
                l.horizons_secs
            )));
        }
        if h2 > MAX_HORIZON_SECS {
            return Err(ConfigError::Invalid(format!(
                "leadership.horizons_secs may not exceed {MAX_HORIZON_SECS} (got {h2})"
            )));
        }
        for (i, cap) in l.history_capacity.iter().enumerate() {
            non_empty(&format!("leadership.history_capacity[{i}]"), *cap)?;
        }
        for (i, weight) in l.horizon_weights.iter().enumerate() {
            non_negative(&format!("leadership.horizon_weights[{i}]"), *weight)?;
        }
        smoothing("leadership.alpha", l.alpha)?;
        positive("leadership.beta_min", l.beta_min)?;
        if l.beta_min > l.beta_max {
            return Err(ConfigError::Invalid(format!(
                "leadership.beta_min ({}) exceeds beta_max ({})",
                l.beta_min, l.beta_max
            )));
        }
        if !(l.beta_min..=l.beta_max).contains(&l.initial_beta) {
            return Err(ConfigError::Invalid(format!(
                "leadership.initial_beta ({}) outside [{}, {}]",
                l.initial_beta, l.beta_min, l.beta_max
            )));
        }
        positive("leadership.z_clip", l.z_clip)?;
        positive("leadership.ls_clip", l.ls_clip)?;
        non_empty("leadership.correlation_window", l.correlation_window)?;
        if l.min_correlation_samples < 2 || l.min_correlation_samples > l.correlation_window {
            return Err(ConfigError::Invalid(format!(
                "leadership.min_correlation_samples ({}) must be in [2, correlation_window]",
                l.min_correlation_samples
            )));
        }
        non_negative("leadership.max_pair_delay_ms", l.max_pair_delay_ms as f64)?;
        positive("leadership.bonus_multiplier", l.bonus_multiplier)?;

        let bias = &self.bias;
        non_empty("bias.history_len", bias.history_len)?;
        non_negative("bias.old_after_ms", bias.old_after_ms as f64)?;
        if bias.stale_after_ms < bias.old_after_ms {
            return Err(ConfigError::Invalid(format!(
                "bias.stale_after_ms ({}) is below old_after_ms ({})",
                bias.stale_after_ms, bias.old_after_ms
            )));
        }
        non_negative("bias.bonus_magnitude", bias.bonus_magnitude)?;
        positive("bias.bonus_multiplier", bias.bonus_multiplier)?;

        non_negative("order_flow.delta_ratio_floor", self.order_flow.delta_ratio_floor)?;
        non_negative("order_flow.imbalance_threshold", self.order_flow.imbalance_threshold)?;
        non_negative("order_flow.volume_floor", self.order_flow.volume_floor)?;

        let r = &self.risk;
        positive("risk.stop_ticks", r.stop_ticks)?;
        positive("risk.target1_ticks", r.target1_ticks)?;
        positive("risk.target2_ticks", r.target2_ticks)?;
        non_negative("risk.min_reward_risk", r.min_reward_risk)?;

        Ok(())
    }
}
