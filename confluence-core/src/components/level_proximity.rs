//! Level proximity — how close price sits to the nearest reference level.
//!
//! score = max(0, 1 − distance_ticks / tolerance_ticks), per level category.
//! The best strictly positive score wins; ties keep the first level seen.

use serde::{Deserialize, Serialize};

use crate::config::LevelTolerances;
use crate::domain::{LevelSet, ReferenceLevel, Side};

/// The level that triggered a candidate trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelCandidate {
    pub level: ReferenceLevel,
    pub score: f64,
    pub side: Side,
    pub distance_ticks: f64,
    pub tolerance_ticks: f64,
}

/// Proximity score for a distance and tolerance (both in ticks).
pub fn proximity_score(distance_ticks: f64, tolerance_ticks: f64) -> f64 {
    if tolerance_ticks <= 0.0 || !distance_ticks.is_finite() {
        return 0.0;
    }
    (1.0 - distance_ticks / tolerance_ticks).max(0.0)
}

#[derive(Debug, Clone)]
pub struct LevelProximityScorer {
    tolerances: LevelTolerances,
    tick_size: f64,
}

impl LevelProximityScorer {
    pub fn new(tolerances: LevelTolerances, tick_size: f64) -> Self {
        assert!(tick_size > 0.0, "tick_size must be positive");
        Self { tolerances, tick_size }
    }

    /// Best candidate for `price` among `levels`, or `None` when nothing is in range.
    pub fn score(&self, price: f64, levels: &LevelSet) -> Option<LevelCandidate> {
        if !price.is_finite() || price <= 0.0 {
            return None;
        }

        let mut best: Option<LevelCandidate> = None;
        for level in levels.iter() {
            if !level.price.is_finite() || level.price <= 0.0 {
                continue;
            }
            let tolerance = self.tolerances.get(level.category);
            let distance_ticks = (price - level.price).abs() / self.tick_size;
            if distance_ticks > tolerance {
                continue;
            }
            let score = proximity_score(distance_ticks, tolerance);
            if score <= 0.0 {
                continue;
            }
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(LevelCandidate {
                    level: level.clone(),
                    score,
                    side: level.implied_side(price),
                    distance_ticks,
                    tolerance_ticks: tolerance,
                });
            }
        }
        best
    }
}
