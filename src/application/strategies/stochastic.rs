use serde::{Deserialize, Serialize};

use super::indicators::{highest_high, lowest_low};
use super::{TechnicalStrategy, names};
use crate::domain::market::candle::Candle;
use crate::domain::trading::signal::{Signal, SignalDirection};

/// Stochastic oscillator: %K turning against %D inside an extreme zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StochasticStrategy {
    pub k_period: usize,
    pub d_period: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub base_strength: f64,
    pub depth_weight: f64,
    pub cross_bonus: f64,
}

impl Default for StochasticStrategy {
    fn default() -> Self {
        Self {
            k_period: 14,
            d_period: 3,
            oversold: 20.0,
            overbought: 80.0,
            base_strength: 40.0,
            depth_weight: 40.0,
            cross_bonus: 20.0,
        }
    }
}

impl StochasticStrategy {
    /// %K for the bar at `idx`. `None` on a flat range.
    fn percent_k(&self, candles: &[Candle], idx: usize) -> Option<f64> {
        let window = &candles[idx + 1 - self.k_period..=idx];
        let high = highest_high(window);
        let low = lowest_low(window);
        let range = high - low;
        (range > 0.0).then(|| (candles[idx].close - low) / range * 100.0)
    }
}

impl TechnicalStrategy for StochasticStrategy {
    fn name(&self) -> &'static str {
        names::STOCHASTIC
    }

    fn min_candles(&self) -> usize {
        self.k_period + self.d_period
    }

    fn evaluate(&self, candles: &[Candle]) -> Signal {
        if candles.len() < self.min_candles()
            || self.k_period == 0
            || self.d_period == 0
            || self.oversold <= 0.0
            || self.overbought >= 100.0
        {
            return Signal::neutral();
        }

        // %K for the last d+1 bars: enough for the current and previous %D.
        let last = candles.len() - 1;
        let first = last - self.d_period;
        let ks: Option<Vec<f64>> = (first..=last)
            .map(|idx| self.percent_k(candles, idx))
            .collect();
        let Some(ks) = ks else {
            return Signal::neutral();
        };

        let d = self.d_period as f64;
        let k = ks[ks.len() - 1];
        let prev_k = ks[ks.len() - 2];
        let d_now = ks[1..].iter().sum::<f64>() / d;
        let d_prev = ks[..ks.len() - 1].iter().sum::<f64>() / d;

        let (direction, depth, fresh_cross) = if k < self.oversold && k > d_now {
            (
                SignalDirection::Buy,
                (self.oversold - k) / self.oversold,
                prev_k <= d_prev,
            )
        } else if k > self.overbought && k < d_now {
            (
                SignalDirection::Sell,
                (k - self.overbought) / (100.0 - self.overbought),
                prev_k >= d_prev,
            )
        } else {
            return Signal::neutral().with_meta("k", k).with_meta("d", d_now);
        };

        let bonus = if fresh_cross { self.cross_bonus } else { 0.0 };
        let strength = self.base_strength + depth * self.depth_weight + bonus;

        Signal::new(direction, strength)
            .with_meta("k", k)
            .with_meta("d", d_now)
    }
}
