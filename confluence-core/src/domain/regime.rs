//! Volatility regime classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete volatility regime derived from a volatility-index reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Regime {
    Low,
    Mid,
    High,
    Extreme,
}

impl Regime {
    pub const ALL: [Regime; 4] = [Regime::Low, Regime::Mid, Regime::High, Regime::Extreme];

    /// HIGH and EXTREME tighten the leadership and order-flow requirements.
    pub fn is_elevated(self) -> bool {
        matches!(self, Regime::High | Regime::Extreme)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Regime::Low => "LOW",
            Regime::Mid => "MID",
            Regime::High => "HIGH",
            Regime::Extreme => "EXTREME",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
