//! Reference levels supplied by the level provider.
//!
//! Each level carries an explicit category (which tolerance applies) and an
//! explicit side tag (which direction a touch implies). A `LevelSet` is one
//! refresh cycle's worth of levels and is immutable once built.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::side::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelCategory {
    GammaWall,
    HighVolume,
    Other,
}

/// Provider-assigned role of a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelSide {
    Support,
    Resistance,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLevel {
    pub name: String,
    pub price: f64,
    pub category: LevelCategory,
    #[serde(default)]
    pub side: LevelSide,
}

impl ReferenceLevel {
    pub fn new(
        name: impl Into<String>,
        price: f64,
        category: LevelCategory,
        side: LevelSide,
    ) -> Self {
        Self { name: name.into(), price, category, side }
    }

    /// Trade direction implied by touching this level at `price`.
    ///
    /// Support fades down-moves (long), resistance fades up-moves (short).
    /// Neutral levels are read off the approach: below the level → long.
    pub fn implied_side(&self, price: f64) -> Side {
        match self.side {
            LevelSide::Support => Side::Long,
            LevelSide::Resistance => Side::Short,
            LevelSide::Neutral => {
                if price < self.price {
                    Side::Long
                } else {
                    Side::Short
                }
            }
        }
    }
}

/// All levels of one refresh cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelSet {
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
    #[serde(default, rename = "level")]
    pub levels: Vec<ReferenceLevel>,
}

impl LevelSet {
    pub fn new(levels: Vec<ReferenceLevel>) -> Self {
        Self { as_of: None, levels }
    }

    pub fn with_as_of(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = Some(as_of);
        self
    }

    /// Parse a level file:
    ///
    /// ```toml
    /// as_of = "2024-03-01T14:00:00Z"
    ///
    /// [[level]]
    /// name = "put_support_1"
    /// price = 4499.75
    /// category = "gamma_wall"
    /// side = "support"
    /// ```
    pub fn from_toml_str(s: &str) -> Result<Self, LevelSetError> {
        let set: LevelSet = toml::from_str(s)?;
        for level in &set.levels {
            if !level.price.is_finite() {
                return Err(LevelSetError::NonFinitePrice { name: level.name.clone() });
            }
        }
        Ok(set)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, LevelSetError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Age of the set relative to `now`, when the provider stamped it.
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.as_of.map(|as_of| now - as_of)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceLevel> {
        self.levels.iter()
    }
}

#[derive(Debug, Error)]
pub enum LevelSetError {
    #[error("Failed to read level file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse level file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Level '{name}' has a non-finite price")]
    NonFinitePrice { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_tags_decide_side() {
        let support = ReferenceLevel::new("s", 4500.0, LevelCategory::GammaWall, LevelSide::Support);
        let resistance =
            ReferenceLevel::new("r", 4500.0, LevelCategory::GammaWall, LevelSide::Resistance);
        // Tag wins regardless of approach direction.
        assert_eq!(support.implied_side(4510.0), Side::Long);
        assert_eq!(resistance.implied_side(4490.0), Side::Short);
    }

    #[test]
    fn neutral_level_uses_approach() {
        let level = ReferenceLevel::new("hvl", 4500.0, LevelCategory::HighVolume, LevelSide::Neutral);
        assert_eq!(level.implied_side(4499.0), Side::Long);
        assert_eq!(level.implied_side(4501.0), Side::Short);
        assert_eq!(level.implied_side(4500.0), Side::Short);
    }

    #[test]
    fn parses_level_file() {
        let toml = r#"
as_of = "2024-03-01T14:00:00Z"

[[level]]
name = "put_support_1"
price = 4499.75
category = "gamma_wall"
side = "support"

[[level]]
name = "hvl"
price = 4520.0
category = "high_volume"
"#;
        let set = LevelSet::from_toml_str(toml).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.levels[0].side, LevelSide::Support);
        assert_eq!(set.levels[1].side, LevelSide::Neutral);
        assert!(set.as_of.is_some());
    }

    #[test]
    fn rejects_unknown_category() {
        let toml = r#"
[[level]]
name = "x"
price = 1.0
category = "mystery"
"#;
        assert!(matches!(LevelSet::from_toml_str(toml), Err(LevelSetError::Parse(_))));
    }
}
