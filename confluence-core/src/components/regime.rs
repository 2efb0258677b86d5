//! Regime adapter — volatility reading to regime and threshold bundle.

use serde::{Deserialize, Serialize};

use crate::config::{RegimeBreakpoints, RegimeTable, RegimeThresholds};
use crate::domain::Regime;

/// Outcome of a regime lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeReading {
    pub regime: Regime,
    pub volatility_index: Option<f64>,
    /// True when the reading was missing or unusable and MID was assumed.
    pub defaulted: bool,
}

#[derive(Debug, Clone)]
pub struct RegimeAdapter {
    breakpoints: RegimeBreakpoints,
    table: RegimeTable,
}

impl RegimeAdapter {
    pub fn new(breakpoints: RegimeBreakpoints, table: RegimeTable) -> Self {
        Self { breakpoints, table }
    }

    pub fn classify(&self, volatility_index: Option<f64>) -> RegimeReading {
        match volatility_index.filter(|v| v.is_finite()) {
            Some(v) => RegimeReading {
                regime: self.breakpoints.classify(v),
                volatility_index: Some(v),
                defaulted: false,
            },
            None => {
                tracing::debug!(?volatility_index, "volatility index unavailable, assuming MID");
                RegimeReading { regime: Regime::Mid, volatility_index: None, defaulted: true }
            }
        }
    }

    pub fn thresholds(&self, regime: Regime) -> &RegimeThresholds {
        self.table.get(regime)
    }

    /// Classify and return the matching threshold bundle.
    pub fn adapt(&self, volatility_index: Option<f64>) -> (RegimeReading, &RegimeThresholds) {
        let reading = self.classify(volatility_index);
        let thresholds = self.table.get(reading.regime);
        (reading, thresholds)
    }
}
