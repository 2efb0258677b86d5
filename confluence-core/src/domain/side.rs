//! Trade direction and the three-way decision outcome.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a candidate trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1.0 for long, -1.0 for short.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }

    /// True when `value` points the same way as this side (zero agrees with neither).
    pub fn agrees_with(self, value: f64) -> bool {
        value * self.sign() > 0.0
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// Final action emitted by the decision pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Long,
    Short,
    None,
}

impl Action {
    pub fn side(self) -> Option<Side> {
        match self {
            Action::Long => Some(Side::Long),
            Action::Short => Some(Side::Short),
            Action::None => None,
        }
    }

    pub fn is_trade(self) -> bool {
        self != Action::None
    }
}

impl From<Side> for Action {
    fn from(side: Side) -> Self {
        match side {
            Side::Long => Action::Long,
            Side::Short => Action::Short,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Long => write!(f, "LONG"),
            Action::Short => write!(f, "SHORT"),
            Action::None => write!(f, "NONE"),
        }
    }
}
