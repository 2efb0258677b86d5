//! Signal fusion — weighted blend of the component scores.
//!
//! raw       = w_level·level + w_of·order_flow + w_structure·structure
//! effective = raw × regime multiplier × bias multiplier × leadership bonus
//!
//! The bias multiplier applies once |bias| reaches the configured magnitude.

use serde::{Deserialize, Serialize};

use crate::config::{BiasParams, EngineConfig, FusionWeights};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionInputs {
    pub level: f64,
    pub order_flow: f64,
    pub structure: f64,
    pub bias: f64,
    pub regime_multiplier: f64,
    pub leadership_bonus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionScore {
    pub raw: f64,
    pub effective: f64,
    pub regime_multiplier: f64,
    pub bias_multiplier: f64,
    pub leadership_bonus: f64,
    pub threshold: f64,
    pub passed: bool,
}

#[derive(Debug, Clone)]
pub struct SignalFusionEngine {
    weights: FusionWeights,
    entry_threshold: f64,
    bias_bonus_magnitude: f64,
    bias_bonus_multiplier: f64,
}

impl SignalFusionEngine {
    pub fn new(weights: FusionWeights, entry_threshold: f64, bias: &BiasParams) -> Self {
        Self {
            weights,
            entry_threshold,
            bias_bonus_magnitude: bias.bonus_magnitude,
            bias_bonus_multiplier: bias.bonus_multiplier,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.weights.clone(), config.entry_threshold, &config.bias)
    }

    pub fn entry_threshold(&self) -> f64 {
        self.entry_threshold
    }

    pub fn raw(&self, level: f64, order_flow: f64, structure: f64) -> f64 {
        self.weights.level * level + self.weights.order_flow * order_flow + self.weights.structure * structure
    }

    pub fn bias_multiplier(&self, bias: f64) -> f64 {
        if bias.abs() >= self.bias_bonus_magnitude {
            self.bias_bonus_multiplier
        } else {
            1.0
        }
    }

    pub fn fuse(&self, inputs: &FusionInputs) -> FusionScore {
        let raw = self.raw(inputs.level, inputs.order_flow, inputs.structure);
        let bias_multiplier = self.bias_multiplier(inputs.bias);
        let effective = raw * inputs.regime_multiplier * bias_multiplier * inputs.leadership_bonus;
        FusionScore {
            raw,
            effective,
            regime_multiplier: inputs.regime_multiplier,
            bias_multiplier,
            leadership_bonus: inputs.leadership_bonus,
            threshold: self.entry_threshold,
            passed: effective >= self.entry_threshold,
        }
    }
}
