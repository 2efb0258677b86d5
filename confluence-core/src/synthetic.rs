//! Seeded synthetic paired feed.
//!
//! A master seed is expanded into one sub-seed per stream (shared market
//! factor, primary noise, secondary noise, order flow) via BLAKE3. Each stream
//! is reproducible on its own, so changing one generator parameter does not
//! reshuffle the others.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::{
    DepthBook, DepthLevel, FeedFrame, Instrument, MarketSnapshot, OrderFlowStats, Pressure,
    TickPolicy, ValueArea, VwapBands,
};

/// Derive a stream sub-seed from the master seed.
pub fn sub_seed(master_seed: u64, stream: &str) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&master_seed.to_le_bytes());
    hasher.update(stream.as_bytes());
    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

fn rng_for(master_seed: u64, stream: &str) -> StdRng {
    StdRng::seed_from_u64(sub_seed(master_seed, stream))
}

/// Box–Muller standard normal draw.
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticParams {
    pub start: DateTime<Utc>,
    pub interval_ms: i64,
    pub primary_start: f64,
    pub secondary_start: f64,
    /// Per-step volatility of the shared factor, as a fraction of price.
    pub common_vol: f64,
    /// Per-step volatility of each leg's own noise.
    pub idiosyncratic_vol: f64,
    /// Secondary sensitivity to the shared factor.
    pub beta: f64,
    /// Per-step drift applied to the secondary leg only.
    pub secondary_drift: f64,
    pub volatility_index: Option<f64>,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            // 2024-03-01 14:30:00 UTC
            start: DateTime::from_timestamp(1_709_303_400, 0).unwrap_or_default(),
            interval_ms: 1000,
            primary_start: 4500.0,
            secondary_start: 15600.0,
            common_vol: 0.0002,
            idiosyncratic_vol: 0.00005,
            beta: 1.3,
            secondary_drift: 0.0,
            volatility_index: Some(18.0),
        }
    }
}

/// Infinite iterator of paired frames; bound it with `take`.
#[derive(Debug, Clone)]
pub struct SyntheticFeed {
    params: SyntheticParams,
    instrument: Instrument,
    common: StdRng,
    primary_noise: StdRng,
    secondary_noise: StdRng,
    flow: StdRng,
    index: i64,
    primary: f64,
    secondary: f64,
    cumulative_delta: f64,
    // Running sums for the session VWAP and its one-sigma band.
    pv: f64,
    p2v: f64,
    v: f64,
}

impl SyntheticFeed {
    pub fn new(seed: u64, params: SyntheticParams, instrument: Instrument) -> Self {
        assert!(params.interval_ms > 0, "interval must be positive");
        assert!(
            params.primary_start > 0.0 && params.secondary_start > 0.0,
            "start prices must be positive"
        );
        Self {
            primary: params.primary_start,
            secondary: params.secondary_start,
            common: rng_for(seed, "common"),
            primary_noise: rng_for(seed, "primary"),
            secondary_noise: rng_for(seed, "secondary"),
            flow: rng_for(seed, "flow"),
            index: 0,
            cumulative_delta: 0.0,
            pv: 0.0,
            p2v: 0.0,
            v: 0.0,
            params,
            instrument,
        }
    }

    fn round(&self, price: f64) -> f64 {
        self.instrument.round_price(price, TickPolicy::RoundNearest)
    }

    /// Value area snapped outward onto the tick grid.
    fn value_area(&self, anchor: f64) -> ValueArea {
        ValueArea {
            high: self.instrument.round_price(anchor * 1.002, TickPolicy::RoundUp),
            low: self.instrument.round_price(anchor * 0.998, TickPolicy::RoundDown),
            poc: Some(self.round(anchor)),
        }
    }

    fn bar(&mut self, timestamp: DateTime<Utc>, open: f64, close: f64) -> MarketSnapshot {
        let tick = self.instrument.tick_size;
        let up_wick = self.flow.gen_range(0..=2) as f64 * tick;
        let down_wick = self.flow.gen_range(0..=2) as f64 * tick;
        let mut snap = MarketSnapshot::flat(timestamp, close);
        snap.open = open;
        snap.high = open.max(close) + up_wick;
        snap.low = open.min(close) - down_wick;
        snap.last_trade = Some(close);
        snap.bid = Some(close - tick);
        snap.ask = Some(close + tick);
        snap
    }

    fn decorate_primary(&mut self, snap: &mut MarketSnapshot, step_return: f64) {
        let volume = self.flow.gen_range(50.0..800.0_f64).round();
        let delta_ratio =
            (step_return.signum() * 0.2 + 0.15 * standard_normal(&mut self.flow)).clamp(-1.0, 1.0);
        self.cumulative_delta += delta_ratio * volume;
        let pressure = if delta_ratio > 0.1 {
            Pressure::Bullish
        } else if delta_ratio < -0.1 {
            Pressure::Bearish
        } else {
            Pressure::Neutral
        };

        let typical = (snap.high + snap.low + snap.close) / 3.0;
        self.pv += typical * volume;
        self.p2v += typical * typical * volume;
        self.v += volume;
        let vwap = self.pv / self.v;
        let sigma = (self.p2v / self.v - vwap * vwap).max(0.0).sqrt();

        let anchor = self.params.primary_start;
        snap.volume = volume;
        snap.vwap = Some(VwapBands {
            vwap,
            upper_1: Some(vwap + sigma),
            lower_1: Some(vwap - sigma),
        });
        snap.value_area = Some(self.value_area(anchor));
        snap.order_flow = Some(OrderFlowStats {
            delta_ratio,
            cumulative_delta: self.cumulative_delta,
            pressure,
        });
        let tick = self.instrument.tick_size;
        snap.depth = Some(DepthBook {
            bids: vec![DepthLevel {
                price: snap.close - tick,
                size: self.flow.gen_range(50.0..400.0_f64).round(),
            }],
            asks: vec![DepthLevel {
                price: snap.close + tick,
                size: self.flow.gen_range(50.0..400.0_f64).round(),
            }],
        });
        snap.volatility_index = self.params.volatility_index;
    }
}

impl Iterator for SyntheticFeed {
    type Item = FeedFrame;

    fn next(&mut self) -> Option<FeedFrame> {
        let timestamp =
            self.params.start + Duration::milliseconds(self.params.interval_ms * self.index);
        self.index += 1;

        let shock = self.params.common_vol * standard_normal(&mut self.common);
        let own_primary = self.params.idiosyncratic_vol * standard_normal(&mut self.primary_noise);
        let own_secondary =
            self.params.idiosyncratic_vol * standard_normal(&mut self.secondary_noise);

        let primary_open = self.round(self.primary);
        let secondary_open = self.round(self.secondary);
        self.primary *= 1.0 + shock + own_primary;
        self.secondary *= 1.0 + self.params.beta * shock + own_secondary + self.params.secondary_drift;
        let primary_close = self.round(self.primary);
        let secondary_close = self.round(self.secondary);

        let mut primary = self.bar(timestamp, primary_open, primary_close);
        self.decorate_primary(&mut primary, shock + own_primary);
        let secondary = self.bar(timestamp, secondary_open, secondary_close);

        Some(FeedFrame::new(primary, secondary))
    }
}
