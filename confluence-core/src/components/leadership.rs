//! Cross-instrument leadership from volatility-adjusted Z-momentum.
//!
//! The secondary instrument "leads" when its short-horizon momentum runs
//! ahead of the beta-scaled momentum of the traded primary:
//!
//!   LS_h = z_secondary(h) − beta·z_primary(h)
//!   LS   = 0.6·LS_short + 0.3·LS_medium + 0.1·LS_long
//!
//! LS is EMA-smoothed and clamped to ±2. Positive LS favours longs on the
//! primary, negative LS favours shorts. A rolling correlation of the paired
//! medium-horizon returns decides whether the reading is trustworthy at all.
//!
//! State is created once and mutated in place by a single writer; share it
//! through `LeadershipHandle`.

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{LeadershipGateParams, LeadershipParams};
use crate::domain::{MarketSnapshot, Regime, Side};
use crate::stats::{clip_abs, HorizonState, RollingCorrelation};

/// |LS| at or below this has no direction.
const NEUTRAL_LS: f64 = 1e-9;

/// Primary sigma below this leaves beta unchanged.
const MIN_SIGMA: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leg {
    Primary,
    Secondary,
}

/// Why a paired update was skipped. Always transient.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PairingError {
    #[error("{leg:?} leg has no usable price")]
    MissingPrice { leg: Leg },

    #[error("{leg:?} price {price} is not usable")]
    InvalidPrice { leg: Leg, price: f64 },

    #[error("clock skew {skew_ms}ms exceeds {max_ms}ms")]
    ClockSkewExceeded { skew_ms: i64, max_ms: i64 },

    #[error("timestamp {got} is earlier than last accepted {last}")]
    OutOfOrder { last: DateTime<Utc>, got: DateTime<Utc> },
}

/// Published state after one accepted update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadershipSnapshot {
    pub timestamp: DateTime<Utc>,
    pub ls: f64,
    pub beta: f64,
    /// Short, medium, long.
    pub z_primary: [f64; 3],
    pub z_secondary: [f64; 3],
    pub correlation: Option<f64>,
}

/// Outcome of the leadership gate for one side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadershipGate {
    pub allow: bool,
    pub hard_block: bool,
    pub bypassed: bool,
    pub bonus: f64,
    pub extra_confirmations: u32,
    pub ls: f64,
    pub correlation: Option<f64>,
    pub reason: String,
}

/// Gate decision from a leadership score and correlation.
pub fn evaluate_gate(
    ls: f64,
    correlation: Option<f64>,
    side: Side,
    regime: Regime,
    params: &LeadershipGateParams,
    bonus_multiplier: f64,
) -> LeadershipGate {
    if let Some(corr) = correlation {
        if corr < params.correlation_floor {
            return LeadershipGate {
                allow: true,
                hard_block: false,
                bypassed: true,
                bonus: 1.0,
                extra_confirmations: 0,
                ls,
                correlation,
                reason: format!(
                    "leadership ignored — low correlation ({corr:.2} < {:.2})",
                    params.correlation_floor
                ),
            };
        }
    }

    let magnitude = ls.abs();
    let with_side = side.agrees_with(ls);
    let neutral = magnitude <= NEUTRAL_LS;
    let hard_block = magnitude >= params.hard_block && !with_side && !neutral;
    let allow = !hard_block && (with_side || neutral);
    let bonus = if with_side && magnitude >= params.bonus_threshold {
        bonus_multiplier
    } else {
        1.0
    };
    let extra_confirmations = u32::from(regime.is_elevated() && magnitude < params.bonus_threshold);

    let reason = if hard_block {
        format!("LS={ls:.2} hard-blocks {side} (|LS| ≥ {:.2})", params.hard_block)
    } else if !allow {
        format!("LS={ls:.2} opposes {side}")
    } else {
        format!(
            "LS={ls:.2} regime={regime} (bonus at {:.2}, hard at {:.2})",
            params.bonus_threshold, params.hard_block
        )
    };

    LeadershipGate {
        allow,
        hard_block,
        bypassed: false,
        bonus,
        extra_confirmations,
        ls,
        correlation,
        reason,
    }
}

#[derive(Debug, Clone)]
pub struct LeadershipTracker {
    params: LeadershipParams,
    primary: [HorizonState; 3],
    secondary: [HorizonState; 3],
    beta: f64,
    ls_ema: Option<f64>,
    correlation: RollingCorrelation,
    last_update: Option<DateTime<Utc>>,
    updates: u64,
}

fn horizon_set(params: &LeadershipParams) -> [HorizonState; 3] {
    std::array::from_fn(|i| {
        HorizonState::new(
            Duration::seconds(params.horizons_secs[i] as i64),
            params.history_capacity[i],
            params.alpha,
            params.z_clip,
        )
    })
}

fn check_price(leg: Leg, price: f64) -> Result<(), PairingError> {
    if price.is_finite() && price > 0.0 {
        Ok(())
    } else {
        Err(PairingError::InvalidPrice { leg, price })
    }
}

impl LeadershipTracker {
    pub fn new(params: LeadershipParams) -> Self {
        Self {
            primary: horizon_set(&params),
            secondary: horizon_set(&params),
            beta: params.initial_beta,
            ls_ema: None,
            correlation: RollingCorrelation::new(
                params.correlation_window,
                params.min_correlation_samples,
            ),
            last_update: None,
            updates: 0,
            params,
        }
    }

    pub fn params(&self) -> &LeadershipParams {
        &self.params
    }

    /// Feed one synchronized price pair.
    pub fn update(
        &mut self,
        timestamp: DateTime<Utc>,
        price_primary: f64,
        price_secondary: f64,
    ) -> Result<LeadershipSnapshot, PairingError> {
        check_price(Leg::Primary, price_primary)?;
        check_price(Leg::Secondary, price_secondary)?;
        if let Some(last) = self.last_update {
            if timestamp < last {
                return Err(PairingError::OutOfOrder { last, got: timestamp });
            }
        }

        let mut medium = (None, None);
        for (i, (p, s)) in self.primary.iter_mut().zip(self.secondary.iter_mut()).enumerate() {
            let rp = p.update(timestamp, price_primary);
            let rs = s.update(timestamp, price_secondary);
            if i == 1 {
                medium = (rp, rs);
            }
        }
        if let (Some(rp), Some(rs)) = medium {
            self.correlation.push(rp, rs);
        }

        if let (Some(sp), Some(ss)) = (self.primary[2].sigma(), self.secondary[2].sigma()) {
            if sp > MIN_SIGMA && ss > 0.0 {
                self.beta = (ss / sp).clamp(self.params.beta_min, self.params.beta_max);
            }
        }

        let z_primary: [f64; 3] = std::array::from_fn(|i| self.primary[i].z());
        let z_secondary: [f64; 3] = std::array::from_fn(|i| self.secondary[i].z());
        let ls_raw: f64 = (0..3)
            .map(|i| self.params.horizon_weights[i] * (z_secondary[i] - self.beta * z_primary[i]))
            .sum();

        let alpha = self.params.alpha;
        let smoothed = match self.ls_ema {
            Some(prev) => alpha * ls_raw + (1.0 - alpha) * prev,
            None => ls_raw,
        };
        let ls = clip_abs(smoothed, self.params.ls_clip);
        self.ls_ema = Some(ls);
        self.last_update = Some(timestamp);
        self.updates += 1;

        Ok(LeadershipSnapshot {
            timestamp,
            ls,
            beta: self.beta,
            z_primary,
            z_secondary,
            correlation: self.correlation.value(),
        })
    }

    /// Pair two snapshots and update when they are close enough in time.
    ///
    /// Uses the later of the two timestamps.
    pub fn update_from_paired_inputs(
        &mut self,
        primary: &MarketSnapshot,
        secondary: &MarketSnapshot,
        max_delay: Duration,
    ) -> Result<LeadershipSnapshot, PairingError> {
        let price_primary =
            primary.representative_price().ok_or(PairingError::MissingPrice { leg: Leg::Primary })?;
        let price_secondary = secondary
            .representative_price()
            .ok_or(PairingError::MissingPrice { leg: Leg::Secondary })?;

        let skew = (primary.timestamp - secondary.timestamp).abs();
        if skew > max_delay {
            return Err(PairingError::ClockSkewExceeded {
                skew_ms: skew.num_milliseconds(),
                max_ms: max_delay.num_milliseconds(),
            });
        }

        let timestamp = primary.timestamp.max(secondary.timestamp);
        self.update(timestamp, price_primary, price_secondary)
    }

    /// Smoothed leadership score; 0 before the first update.
    pub fn ls(&self) -> f64 {
        self.ls_ema.unwrap_or(0.0)
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn correlation(&self) -> Option<f64> {
        self.correlation.value()
    }

    pub fn correlation_samples(&self) -> usize {
        self.correlation.len()
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// Current state without feeding a new pair.
    pub fn snapshot(&self) -> Option<LeadershipSnapshot> {
        let timestamp = self.last_update?;
        Some(LeadershipSnapshot {
            timestamp,
            ls: self.ls(),
            beta: self.beta,
            z_primary: std::array::from_fn(|i| self.primary[i].z()),
            z_secondary: std::array::from_fn(|i| self.secondary[i].z()),
            correlation: self.correlation(),
        })
    }

    /// Largest return-history length across all horizons and both legs.
    pub fn max_history_len(&self) -> usize {
        self.primary
            .iter()
            .chain(self.secondary.iter())
            .map(|h| h.returns_len())
            .max()
            .unwrap_or(0)
    }

    pub fn gate(&self, side: Side, regime: Regime, params: &LeadershipGateParams) -> LeadershipGate {
        evaluate_gate(
            self.ls(),
            self.correlation(),
            side,
            regime,
            params,
            self.params.bonus_multiplier,
        )
    }
}

/// Shared, single-writer access to one tracker.
#[derive(Debug, Clone)]
pub struct LeadershipHandle {
    inner: Arc<Mutex<LeadershipTracker>>,
}

impl LeadershipHandle {
    pub fn new(tracker: LeadershipTracker) -> Self {
        Self { inner: Arc::new(Mutex::new(tracker)) }
    }

    pub fn lock(&self) -> MutexGuard<'_, LeadershipTracker> {
        self.inner.lock()
    }

    pub fn update(
        &self,
        timestamp: DateTime<Utc>,
        price_primary: f64,
        price_secondary: f64,
    ) -> Result<LeadershipSnapshot, PairingError> {
        self.inner.lock().update(timestamp, price_primary, price_secondary)
    }

    pub fn update_from_paired_inputs(
        &self,
        primary: &MarketSnapshot,
        secondary: &MarketSnapshot,
        max_delay: Duration,
    ) -> Result<LeadershipSnapshot, PairingError> {
        self.inner.lock().update_from_paired_inputs(primary, secondary, max_delay)
    }

    pub fn gate(&self, side: Side, regime: Regime, params: &LeadershipGateParams) -> LeadershipGate {
        self.inner.lock().gate(side, regime, params)
    }

    pub fn snapshot(&self) -> Option<LeadershipSnapshot> {
        self.inner.lock().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegimeTable;
    use crate::stats::{assert_approx, DEFAULT_EPSILON};
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn tracker() -> LeadershipTracker {
        LeadershipTracker::new(LeadershipParams::default())
    }

    fn mid_gate() -> LeadershipGateParams {
        RegimeTable::default().mid.leadership
    }

    fn high_gate() -> LeadershipGateParams {
        RegimeTable::default().high.leadership
    }

    #[test]
    fn constant_prices_give_zero_ls() {
        let mut tr = tracker();
        for s in 0..400 {
            tr.update(t(s), 4500.0, 15600.0).unwrap();
        }
        assert_eq!(tr.ls(), 0.0);
        // Both legs flat → correlation defined but zero.
        assert_eq!(tr.correlation(), Some(0.0));
        assert_eq!(tr.beta(), 1.3);
    }

    #[test]
    fn secondary_drift_gives_positive_ls() {
        let mut tr = tracker();
        for s in 0..120 {
            tr.update(t(s), 4500.0, 15600.0 + s as f64 * 2.0).unwrap();
        }
        let ls = tr.ls();
        assert!(ls > 0.0 && ls <= 2.0, "ls={ls}");
    }

    #[test]
    fn primary_drift_gives_negative_ls() {
        let mut tr = tracker();
        for s in 0..120 {
            tr.update(t(s), 4500.0 + s as f64 * 0.5, 15600.0).unwrap();
        }
        assert!(tr.ls() < 0.0);
    }

    #[test]
    fn rejects_bad_prices_and_time_reversal() {
        let mut tr = tracker();
        assert!(matches!(
            tr.update(t(0), f64::NAN, 1.0),
            Err(PairingError::InvalidPrice { leg: Leg::Primary, .. })
        ));
        assert!(matches!(
            tr.update(t(0), 1.0, 0.0),
            Err(PairingError::InvalidPrice { leg: Leg::Secondary, .. })
        ));
        tr.update(t(10), 4500.0, 15600.0).unwrap();
        assert!(matches!(tr.update(t(5), 4500.0, 15600.0), Err(PairingError::OutOfOrder { .. })));
        assert_eq!(tr.updates(), 1);
    }

    #[test]
    fn paired_inputs_reject_clock_skew() {
        let mut tr = tracker();
        let a = MarketSnapshot::flat(t(0), 4500.0);
        let mut b = MarketSnapshot::flat(t(0), 15600.0);
        b.timestamp = t(0) + Duration::milliseconds(250);
        let err = tr
            .update_from_paired_inputs(&a, &b, Duration::milliseconds(200))
            .unwrap_err();
        assert_eq!(err, PairingError::ClockSkewExceeded { skew_ms: 250, max_ms: 200 });
        assert_eq!(tr.updates(), 0);

        b.timestamp = t(0) + Duration::milliseconds(150);
        let snap = tr
            .update_from_paired_inputs(&a, &b, Duration::milliseconds(200))
            .unwrap();
        assert_eq!(snap.timestamp, b.timestamp);
    }

    #[test]
    fn paired_inputs_reject_missing_price() {
        let mut tr = tracker();
        let a = MarketSnapshot::flat(t(0), 4500.0);
        let mut b = MarketSnapshot::flat(t(0), 15600.0);
        b.close = 0.0;
        assert_eq!(
            tr.update_from_paired_inputs(&a, &b, Duration::milliseconds(200)).unwrap_err(),
            PairingError::MissingPrice { leg: Leg::Secondary }
        );
    }

    #[test]
    fn gate_bypasses_on_low_correlation() {
        let g = evaluate_gate(-1.8, Some(0.10), Side::Long, Regime::Mid, &mid_gate(), 1.05);
        assert!(g.allow);
        assert!(g.bypassed);
        assert!(!g.hard_block);
        assert_eq!(g.bonus, 1.0);
        assert_eq!(g.extra_confirmations, 0);
        assert!(g.reason.starts_with("leadership ignored — low correlation"));
    }

    #[test]
    fn undefined_correlation_does_not_bypass() {
        let g = evaluate_gate(-1.8, None, Side::Long, Regime::Mid, &mid_gate(), 1.05);
        assert!(!g.bypassed);
        assert!(g.hard_block);
        assert!(!g.allow);
    }

    #[test]
    fn hard_block_against_side() {
        let g = evaluate_gate(1.1, Some(0.8), Side::Short, Regime::Mid, &mid_gate(), 1.05);
        assert!(g.hard_block);
        assert!(!g.allow);
        // Same magnitude is below the elevated-regime hard threshold.
        let g = evaluate_gate(1.1, Some(0.8), Side::Short, Regime::High, &high_gate(), 1.05);
        assert!(!g.hard_block);
        assert!(!g.allow);
    }

    #[test]
    fn aligned_strong_ls_earns_bonus() {
        let g = evaluate_gate(0.6, Some(0.8), Side::Long, Regime::Mid, &mid_gate(), 1.05);
        assert!(g.allow);
        assert_eq!(g.bonus, 1.05);
        assert_eq!(g.extra_confirmations, 0);

        let g = evaluate_gate(-0.8, Some(0.8), Side::Short, Regime::High, &high_gate(), 1.05);
        assert!(g.allow);
        assert_eq!(g.bonus, 1.05);
    }

    #[test]
    fn weak_ls_in_elevated_regime_needs_extra_confirmation() {
        let g = evaluate_gate(0.3, Some(0.8), Side::Long, Regime::High, &high_gate(), 1.05);
        assert!(g.allow);
        assert_eq!(g.bonus, 1.0);
        assert_eq!(g.extra_confirmations, 1);

        let g = evaluate_gate(0.3, Some(0.8), Side::Long, Regime::Mid, &mid_gate(), 1.05);
        assert_eq!(g.extra_confirmations, 0);
    }

    #[test]
    fn neutral_ls_allows_both_sides() {
        for side in [Side::Long, Side::Short] {
            let g = evaluate_gate(0.0, Some(0.8), side, Regime::Mid, &mid_gate(), 1.05);
            assert!(g.allow);
            assert_eq!(g.bonus, 1.0);
        }
    }

    #[test]
    fn gate_is_deterministic() {
        let mut tr = tracker();
        for s in 0..90 {
            tr.update(t(s), 4500.0 + (s % 7) as f64 * 0.25, 15600.0 + s as f64).unwrap();
        }
        let a = tr.gate(Side::Long, Regime::High, &high_gate());
        let b = tr.gate(Side::Long, Regime::High, &high_gate());
        assert_eq!(a, b);
    }

    #[test]
    fn handle_shares_state() {
        let handle = LeadershipHandle::new(tracker());
        let writer = handle.clone();
        for s in 0..60 {
            writer.update(t(s), 4500.0, 15600.0 + s as f64).unwrap();
        }
        let snap = handle.snapshot().unwrap();
        assert_eq!(snap.timestamp, t(59));
        assert_approx(snap.ls, handle.lock().ls(), DEFAULT_EPSILON);
    }

    #[test]
    fn histories_stay_bounded() {
        let params = LeadershipParams {
            history_capacity: [4, 4, 4],
            correlation_window: 5,
            min_correlation_samples: 2,
            ..LeadershipParams::default()
        };
        let mut tr = LeadershipTracker::new(params);
        for s in 0..500 {
            tr.update(t(s), 4500.0 + (s % 3) as f64, 15600.0 + (s % 5) as f64).unwrap();
        }
        assert!(tr.max_history_len() <= 4);
        assert!(tr.correlation_samples() <= 5);
    }
}
