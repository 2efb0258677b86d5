//! Structural context — penalizes entries crowded against VWAP or profile anchors.
//!
//! Baseline 0.5, minus 0.15 for each anchor (VWAP, VAH, VAL, POC) within the
//! regime buffer of price, clamped to [0, 1]. Folds into fusion only.

use serde::{Deserialize, Serialize};

use crate::domain::MarketSnapshot;

pub const STRUCTURE_BASELINE: f64 = 0.5;
pub const ANCHOR_PENALTY: f64 = 0.15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureScore {
    pub score: f64,
    /// Names of the anchors found inside the buffer.
    pub crowded_by: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct StructuralContextScorer {
    tick_size: f64,
}

impl StructuralContextScorer {
    pub fn new(tick_size: f64) -> Self {
        assert!(tick_size > 0.0, "tick_size must be positive");
        Self { tick_size }
    }

    pub fn score(&self, price: f64, snapshot: &MarketSnapshot, buffer_ticks: f64) -> StructureScore {
        let anchors = [
            ("vwap", snapshot.vwap.map(|v| v.vwap)),
            ("value_area_high", snapshot.value_area.map(|va| va.high)),
            ("value_area_low", snapshot.value_area.map(|va| va.low)),
            ("point_of_control", snapshot.value_area.and_then(|va| va.poc)),
        ];
        let buffer = buffer_ticks * self.tick_size + 1e-9;

        let mut score = STRUCTURE_BASELINE;
        let mut crowded_by = Vec::new();
        for (name, anchor) in anchors {
            let Some(anchor) = anchor.filter(|a| a.is_finite()) else {
                continue;
            };
            if (price - anchor).abs() <= buffer {
                score -= ANCHOR_PENALTY;
                crowded_by.push(name.to_string());
            }
        }

        StructureScore { score: score.clamp(0.0, 1.0), crowded_by }
    }
}
