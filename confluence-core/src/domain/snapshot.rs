//! MarketSnapshot — one synchronized observation of a single instrument.
//!
//! Snapshots are produced by the feed collaborator and never mutated here.
//! Every optional field may be absent; consumers treat absence as
//! "no information" rather than an error.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Session VWAP with its first standard-deviation band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VwapBands {
    pub vwap: f64,
    #[serde(default)]
    pub upper_1: Option<f64>,
    #[serde(default)]
    pub lower_1: Option<f64>,
}

/// Volume-profile value area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueArea {
    pub high: f64,
    pub low: f64,
    #[serde(default)]
    pub poc: Option<f64>,
}

/// Aggressor pressure reported by the order-flow feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pressure {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

/// Per-bar order-flow statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderFlowStats {
    /// (ask volume − bid volume) / total volume for the bar.
    pub delta_ratio: f64,
    /// Session cumulative delta.
    pub cumulative_delta: f64,
    #[serde(default)]
    pub pressure: Pressure,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: f64,
    pub size: f64,
}

/// Top-of-book depth ladder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepthBook {
    #[serde(default)]
    pub bids: Vec<DepthLevel>,
    #[serde(default)]
    pub asks: Vec<DepthLevel>,
}

impl DepthBook {
    pub fn bid_size(&self) -> f64 {
        self.bids.iter().map(|l| l.size.max(0.0)).sum()
    }

    pub fn ask_size(&self) -> f64 {
        self.asks.iter().map(|l| l.size.max(0.0)).sum()
    }

    /// |Σbid − Σask| / max(Σbid, Σask); `None` for an empty book.
    pub fn imbalance(&self) -> Option<f64> {
        let bid = self.bid_size();
        let ask = self.ask_size();
        let denom = bid.max(ask);
        if denom <= 0.0 {
            return None;
        }
        Some((bid - ask).abs() / denom)
    }
}

/// One synchronized market observation for a single instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub last_trade: Option<f64>,
    #[serde(default)]
    pub bid: Option<f64>,
    #[serde(default)]
    pub ask: Option<f64>,
    #[serde(default)]
    pub vwap: Option<VwapBands>,
    #[serde(default)]
    pub value_area: Option<ValueArea>,
    #[serde(default)]
    pub order_flow: Option<OrderFlowStats>,
    #[serde(default)]
    pub depth: Option<DepthBook>,
    #[serde(default)]
    pub volatility_index: Option<f64>,
}

fn usable(price: f64) -> Option<f64> {
    (price.is_finite() && price > 0.0).then_some(price)
}

impl MarketSnapshot {
    /// Flat bar at `price` with every optional field absent.
    pub fn flat(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self {
            timestamp,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 0.0,
            last_trade: None,
            bid: None,
            ask: None,
            vwap: None,
            value_area: None,
            order_flow: None,
            depth: None,
            volatility_index: None,
        }
    }

    pub fn mid(&self) -> Option<f64> {
        let bid = usable(self.bid?)?;
        let ask = usable(self.ask?)?;
        Some((bid + ask) / 2.0)
    }

    /// Price used for cross-instrument statistics: close, else mid-quote, else last trade.
    pub fn representative_price(&self) -> Option<f64> {
        usable(self.close)
            .or_else(|| self.mid())
            .or_else(|| self.last_trade.and_then(usable))
    }

    /// Price used for entries: last trade, else close.
    pub fn current_price(&self) -> Option<f64> {
        self.last_trade.and_then(usable).or_else(|| usable(self.close))
    }

    /// Basic OHLC sanity check: high >= low, high >= open/close, low <= open/close.
    pub fn is_sane(&self) -> bool {
        let all_finite = [self.open, self.high, self.low, self.close]
            .iter()
            .all(|v| v.is_finite());
        all_finite
            && self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.close > 0.0
    }
}

/// One paired observation of the traded instrument and its leadership reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedFrame {
    pub primary: MarketSnapshot,
    pub secondary: MarketSnapshot,
}

impl FeedFrame {
    pub fn new(primary: MarketSnapshot, secondary: MarketSnapshot) -> Self {
        Self { primary, secondary }
    }

    /// Later of the two leg timestamps.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.primary.timestamp.max(self.secondary.timestamp)
    }
}

/// Age class of a cached reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Freshness {
    Ok,
    Old,
    Stale,
}

impl Freshness {
    /// `Stale` at or beyond `stale_after`, `Old` at or beyond `old_after`, else `Ok`.
    pub fn classify(age: Duration, old_after: Duration, stale_after: Duration) -> Self {
        if age >= stale_after {
            Freshness::Stale
        } else if age >= old_after {
            Freshness::Old
        } else {
            Freshness::Ok
        }
    }

    pub fn is_ok(self) -> bool {
        self == Freshness::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap()
    }

    #[test]
    fn representative_price_prefers_close() {
        let mut snap = MarketSnapshot::flat(ts(), 4500.0);
        snap.bid = Some(4499.75);
        snap.ask = Some(4500.25);
        snap.last_trade = Some(4500.5);
        assert_eq!(snap.representative_price(), Some(4500.0));

        snap.close = f64::NAN;
        assert_eq!(snap.representative_price(), Some(4500.0));

        snap.bid = None;
        assert_eq!(snap.representative_price(), Some(4500.5));

        snap.last_trade = None;
        assert_eq!(snap.representative_price(), None);
    }

    #[test]
    fn current_price_prefers_last_trade() {
        let mut snap = MarketSnapshot::flat(ts(), 4500.25);
        assert_eq!(snap.current_price(), Some(4500.25));
        snap.last_trade = Some(4500.0);
        assert_eq!(snap.current_price(), Some(4500.0));
    }

    #[test]
    fn depth_imbalance() {
        let book = DepthBook {
            bids: vec![DepthLevel { price: 4499.75, size: 300.0 }],
            asks: vec![DepthLevel { price: 4500.0, size: 100.0 }],
        };
        let imb = book.imbalance().unwrap();
        assert!((imb - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(DepthBook::default().imbalance(), None);
    }

    #[test]
    fn sanity_check() {
        let mut snap = MarketSnapshot::flat(ts(), 4500.0);
        assert!(snap.is_sane());
        snap.low = 4501.0;
        assert!(!snap.is_sane());
    }

    #[test]
    fn freshness_boundaries() {
        let old = Duration::milliseconds(2100);
        let stale = Duration::milliseconds(5000);
        assert_eq!(Freshness::classify(Duration::milliseconds(0), old, stale), Freshness::Ok);
        assert_eq!(Freshness::classify(Duration::milliseconds(2099), old, stale), Freshness::Ok);
        assert_eq!(Freshness::classify(Duration::milliseconds(2100), old, stale), Freshness::Old);
        assert_eq!(Freshness::classify(Duration::milliseconds(5000), old, stale), Freshness::Stale);
    }

    #[test]
    fn snapshot_deserializes_with_missing_optionals() {
        let json = r#"{"timestamp":"2024-03-01T14:30:00Z","open":1.0,"high":2.0,"low":0.5,"close":1.5}"#;
        let snap: MarketSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.close, 1.5);
        assert!(snap.order_flow.is_none());
        assert_eq!(snap.volume, 0.0);
    }
}
