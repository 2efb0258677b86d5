//! Bias gate — short-horizon directional bias of the traded instrument.
//!
//! Four sub-scores in [0, 1]:
//! - order flow: 0.7·(pressure bullish) + 0.3·clip01((delta_ratio − 0.08) / 0.42)
//! - VWAP position: clip01(0.5 + 0.5·tanh((close − vwap) / band))
//! - value area: above VAH 0.9, below VAL 0.2, inside 0.6, unknown 0.5
//! - cumulative-delta trend: OLS slope / (|mean|·0.05 + 50), 0.5 below 3 samples
//!
//! Weighted 0.35 / 0.25 / 0.20 / 0.20, scaled by the regime factor, then
//! mapped to [-1, 1] as (s − 0.5)·2.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::BiasParams;
use crate::domain::{Freshness, MarketSnapshot, OrderFlowStats, Pressure, Side, ValueArea, VwapBands};
use crate::stats::{clip01, least_squares_slope, BoundedWindow};

const W_ORDER_FLOW: f64 = 0.35;
const W_VWAP: f64 = 0.25;
const W_VALUE_AREA: f64 = 0.20;
const W_CUM_DELTA: f64 = 0.20;

/// Delta ratio where the order-flow bonus starts, and where it saturates.
const DELTA_RATIO_START: f64 = 0.08;
const DELTA_RATIO_FULL: f64 = 0.50;

/// VWAP band fallback as a fraction of VWAP.
const FALLBACK_BAND_FRACTION: f64 = 0.002;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BiasComponents {
    pub order_flow: f64,
    pub vwap: f64,
    pub value_area: f64,
    pub cum_delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasReading {
    /// Directional bias in [-1, 1].
    pub score: f64,
    /// Weighted score in [0, 1] before rescaling.
    pub raw: f64,
    pub components: BiasComponents,
    pub regime_factor: f64,
    pub freshness: Freshness,
    pub age_ms: Option<i64>,
    /// False when required inputs were missing; `score` is then neutral.
    pub available: bool,
}

impl BiasReading {
    pub fn unavailable() -> Self {
        Self {
            score: 0.0,
            raw: 0.5,
            components: BiasComponents::default(),
            regime_factor: 1.0,
            freshness: Freshness::Ok,
            age_ms: None,
            available: false,
        }
    }

    /// LONG needs `score ≥ +min`, SHORT needs `score ≤ −min`.
    pub fn permits(&self, side: Side, min_magnitude: f64) -> bool {
        match side {
            Side::Long => self.score >= min_magnitude,
            Side::Short => self.score <= -min_magnitude,
        }
    }
}

/// Latest bar fields the bias is computed from.
#[derive(Debug, Clone)]
struct BarCache {
    timestamp: DateTime<Utc>,
    close: Option<f64>,
    vwap: Option<VwapBands>,
    value_area: Option<ValueArea>,
    order_flow: Option<OrderFlowStats>,
}

#[derive(Debug, Clone)]
pub struct BiasGate {
    params: BiasParams,
    bar: Option<BarCache>,
    cum_delta: BoundedWindow<(DateTime<Utc>, f64)>,
}

impl BiasGate {
    pub fn new(params: BiasParams) -> Self {
        let cum_delta = BoundedWindow::new(params.history_len);
        Self { params, bar: None, cum_delta }
    }

    /// Cache the fields of the latest bar. Older bars are ignored.
    pub fn ingest(&mut self, snapshot: &MarketSnapshot) {
        if let Some(bar) = &self.bar {
            if snapshot.timestamp < bar.timestamp {
                return;
            }
        }
        self.bar = Some(BarCache {
            timestamp: snapshot.timestamp,
            close: Some(snapshot.close).filter(|c| c.is_finite() && *c > 0.0),
            vwap: snapshot.vwap,
            value_area: snapshot.value_area,
            order_flow: snapshot.order_flow,
        });
        if let Some(of) = snapshot.order_flow {
            self.push_cum_delta(snapshot.timestamp, of.cumulative_delta);
        }
    }

    fn push_cum_delta(&mut self, ts: DateTime<Utc>, value: f64) {
        if !value.is_finite() {
            return;
        }
        let last_ts = self.cum_delta.latest().map(|&(last_ts, _)| last_ts);
        match last_ts {
            Some(last) if ts == last => self.cum_delta.replace_last((ts, value)),
            Some(last) if ts < last => {}
            _ => self.cum_delta.push((ts, value)),
        }
    }

    pub fn cum_delta_len(&self) -> usize {
        self.cum_delta.len()
    }

    /// Raw OLS slope of the cumulative-delta history.
    pub fn delta_slope(&self) -> Option<f64> {
        if self.cum_delta.len() < 3 {
            return None;
        }
        least_squares_slope(self.cum_delta.iter().map(|&(_, v)| v))
    }

    fn cum_delta_score(&self) -> f64 {
        let Some(slope) = self.delta_slope() else {
            return 0.5;
        };
        let n = self.cum_delta.len() as f64;
        let mean = self.cum_delta.iter().map(|&(_, v)| v).sum::<f64>() / n;
        clip01(slope / (mean.abs() * 0.05 + 50.0))
    }

    /// Compute the bias at `now`, scaled by the regime factor.
    pub fn reading(&self, now: DateTime<Utc>, regime_factor: f64) -> BiasReading {
        let Some(bar) = &self.bar else {
            tracing::debug!("bias unavailable: no bar cached");
            return BiasReading::unavailable();
        };
        let vwap = bar.vwap.filter(|v| v.vwap.is_finite());
        let close = bar.close.or(vwap.map(|v| v.vwap));
        let (Some(close), Some(vwap), Some(of)) = (close, vwap, bar.order_flow) else {
            tracing::debug!(
                has_close = bar.close.is_some(),
                has_vwap = bar.vwap.is_some(),
                has_order_flow = bar.order_flow.is_some(),
                "bias unavailable: missing inputs"
            );
            return BiasReading::unavailable();
        };

        let of_core = if of.pressure == Pressure::Bullish { 1.0 } else { 0.0 };
        let of_bonus =
            clip01((of.delta_ratio - DELTA_RATIO_START) / (DELTA_RATIO_FULL - DELTA_RATIO_START));
        let order_flow = 0.7 * of_core + 0.3 * of_bonus;

        let band = match vwap.upper_1 {
            Some(up1) if up1.is_finite() => (up1 - vwap.vwap).abs(),
            _ => vwap.vwap.abs() * FALLBACK_BAND_FRACTION,
        }
        .max(1e-9);
        let vwap_score = clip01(0.5 + 0.5 * ((close - vwap.vwap) / band).tanh());

        let value_area = match bar.value_area {
            Some(va) if close > va.high => 0.9,
            Some(va) if close < va.low => 0.2,
            Some(_) => 0.6,
            None => 0.5,
        };

        let cum_delta = self.cum_delta_score();

        let weighted = W_ORDER_FLOW * order_flow
            + W_VWAP * vwap_score
            + W_VALUE_AREA * value_area
            + W_CUM_DELTA * cum_delta;
        let raw = clip01(weighted * regime_factor);

        let age = now - bar.timestamp;
        let freshness = Freshness::classify(
            age,
            Duration::milliseconds(self.params.old_after_ms),
            Duration::milliseconds(self.params.stale_after_ms),
        );
        if !freshness.is_ok() {
            tracing::warn!(?freshness, age_ms = age.num_milliseconds(), raw, "bias computed from aged bar");
        }

        BiasReading {
            score: (raw - 0.5) * 2.0,
            raw,
            components: BiasComponents { order_flow, vwap: vwap_score, value_area, cum_delta },
            regime_factor,
            freshness,
            age_ms: Some(age.num_milliseconds()),
            available: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{assert_approx, DEFAULT_EPSILON};
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn bar(ts: DateTime<Utc>, close: f64, pressure: Pressure, delta_ratio: f64, cum: f64) -> MarketSnapshot {
        let mut s = MarketSnapshot::flat(ts, close);
        s.vwap = Some(VwapBands { vwap: 4498.0, upper_1: Some(4500.0), lower_1: Some(4496.0) });
        s.value_area = Some(ValueArea { high: 4510.0, low: 4490.0, poc: None });
        s.order_flow = Some(OrderFlowStats { delta_ratio, cumulative_delta: cum, pressure });
        s
    }

    #[test]
    fn unavailable_without_inputs() {
        let gate = BiasGate::new(BiasParams::default());
        let r = gate.reading(t(0), 1.0);
        assert!(!r.available);
        assert_eq!(r.score, 0.0);

        let mut gate = BiasGate::new(BiasParams::default());
        gate.ingest(&MarketSnapshot::flat(t(0), 4500.0));
        assert!(!gate.reading(t(0), 1.0).available);
    }

    #[test]
    fn known_bullish_reading() {
        let mut gate = BiasGate::new(BiasParams::default());
        for s in 0..5 {
            gate.ingest(&bar(t(s), 4500.25, Pressure::Bullish, 0.20, 1000.0));
        }
        let r = gate.reading(t(4), 1.0);
        assert!(r.available);
        assert_approx(r.components.order_flow, 0.7 + 0.3 * (0.12 / 0.42), DEFAULT_EPSILON);
        assert_approx(r.components.vwap, 0.5 + 0.5 * 1.125_f64.tanh(), DEFAULT_EPSILON);
        assert_eq!(r.components.value_area, 0.6);
        // Flat cumulative delta → zero slope → zero trend score.
        assert_eq!(r.components.cum_delta, 0.0);
        assert!(r.score > 0.20 && r.score < 0.35, "score={}", r.score);
        assert!(r.permits(Side::Long, 0.20));
        assert!(!r.permits(Side::Short, 0.20));
        assert_eq!(r.freshness, Freshness::Ok);
    }

    #[test]
    fn bearish_reading_is_negative() {
        let mut gate = BiasGate::new(BiasParams::default());
        let mut s = bar(t(0), 4485.0, Pressure::Bearish, -0.3, -500.0);
        s.vwap = Some(VwapBands { vwap: 4498.0, upper_1: Some(4500.0), lower_1: Some(4496.0) });
        gate.ingest(&s);
        let r = gate.reading(t(0), 1.0);
        assert!(r.score < -0.3, "score={}", r.score);
        assert!(r.permits(Side::Short, 0.20));
    }

    #[test]
    fn short_history_uses_neutral_trend() {
        let mut gate = BiasGate::new(BiasParams::default());
        gate.ingest(&bar(t(0), 4500.25, Pressure::Bullish, 0.20, 1000.0));
        gate.ingest(&bar(t(1), 4500.25, Pressure::Bullish, 0.20, 1200.0));
        assert_eq!(gate.reading(t(1), 1.0).components.cum_delta, 0.5);
        assert!(gate.delta_slope().is_none());
    }

    #[test]
    fn same_bar_replaces_cum_delta() {
        let mut gate = BiasGate::new(BiasParams::default());
        gate.ingest(&bar(t(0), 4500.0, Pressure::Neutral, 0.0, 10.0));
        gate.ingest(&bar(t(0), 4500.0, Pressure::Neutral, 0.0, 20.0));
        assert_eq!(gate.cum_delta_len(), 1);
        gate.ingest(&bar(t(1), 4500.0, Pressure::Neutral, 0.0, 30.0));
        // Out-of-order bar is ignored.
        gate.ingest(&bar(t(0), 4500.0, Pressure::Neutral, 0.0, 99.0));
        assert_eq!(gate.cum_delta_len(), 2);
    }

    #[test]
    fn cum_delta_history_is_bounded() {
        let mut gate = BiasGate::new(BiasParams::default());
        for s in 0..40 {
            gate.ingest(&bar(t(s), 4500.0, Pressure::Neutral, 0.0, s as f64 * 100.0));
        }
        assert_eq!(gate.cum_delta_len(), 16);
        assert!(gate.delta_slope().unwrap() > 0.0);
    }

    #[test]
    fn staleness_is_informational() {
        let mut gate = BiasGate::new(BiasParams::default());
        gate.ingest(&bar(t(0), 4500.25, Pressure::Bullish, 0.20, 1000.0));
        let fresh = gate.reading(t(2), 1.0);
        let old = gate.reading(t(3), 1.0);
        let stale = gate.reading(t(6), 1.0);
        assert_eq!(fresh.freshness, Freshness::Ok);
        assert_eq!(old.freshness, Freshness::Old);
        assert_eq!(stale.freshness, Freshness::Stale);
        assert_eq!(stale.score, fresh.score);
        assert!(stale.available);
    }

    #[test]
    fn regime_factor_scales_raw_score() {
        let mut gate = BiasGate::new(BiasParams::default());
        gate.ingest(&bar(t(0), 4500.25, Pressure::Bullish, 0.20, 1000.0));
        let full = gate.reading(t(0), 1.0);
        let damped = gate.reading(t(0), 0.85);
        assert_approx(damped.raw, full.raw * 0.85, DEFAULT_EPSILON);
    }

    #[test]
    fn missing_upper_band_uses_fallback_width() {
        let mut gate = BiasGate::new(BiasParams::default());
        let mut s = bar(t(0), 4500.25, Pressure::Bullish, 0.20, 1000.0);
        s.vwap = Some(VwapBands { vwap: 4498.0, upper_1: None, lower_1: None });
        gate.ingest(&s);
        let z: f64 = 2.25 / (4498.0 * 0.002);
        assert_approx(gate.reading(t(0), 1.0).components.vwap, 0.5 + 0.5 * z.tanh(), DEFAULT_EPSILON);
    }
}
