use serde::{Deserialize, Serialize};

/// Tick rounding direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TickPolicy {
    RoundNearest,
    RoundDown,
    RoundUp,
}

/// Traded contract metadata: tick size and the currency value of one tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instrument {
    pub symbol: String,
    pub tick_size: f64,
    pub tick_value: f64,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, tick_size: f64, tick_value: f64) -> Self {
        Self { symbol: symbol.into(), tick_size, tick_value }
    }

    /// E-mini S&P 500: 0.25 points per tick, $12.50 per tick.
    pub fn es() -> Self {
        Self::new("ES", 0.25, 12.5)
    }

    /// Snap a price onto the tick grid.
    pub fn round_price(&self, price: f64, policy: TickPolicy) -> f64 {
        let ticks = price / self.tick_size;
        let rounded_ticks = match policy {
            TickPolicy::RoundNearest => ticks.round(),
            TickPolicy::RoundDown => ticks.floor(),
            TickPolicy::RoundUp => ticks.ceil(),
        };
        rounded_ticks * self.tick_size
    }

    /// Absolute distance between two prices, in ticks.
    pub fn ticks_between(&self, a: f64, b: f64) -> f64 {
        (a - b).abs() / self.tick_size
    }

    /// Price offset covered by `ticks` ticks.
    pub fn ticks_to_price(&self, ticks: f64) -> f64 {
        ticks * self.tick_size
    }

    /// Currency value of `ticks` ticks for one contract.
    pub fn ticks_to_currency(&self, ticks: f64) -> f64 {
        ticks * self.tick_value
    }
}

impl Default for Instrument {
    fn default() -> Self {
        Self::es()
    }
}
