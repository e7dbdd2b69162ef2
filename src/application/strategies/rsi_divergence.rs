use serde::{Deserialize, Serialize};

use super::indicators::{closes, rsi_series};
use super::{TechnicalStrategy, names};
use crate::domain::market::candle::Candle;
use crate::domain::trading::signal::Signal;

/// Price/RSI divergence over a short lookback, falling back to plain
/// oversold/overbought zones.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiDivergenceStrategy {
    pub period: usize,
    pub lookback: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub divergence_base: f64,
    /// Strength points per RSI point of divergence.
    pub divergence_scale: f64,
}

impl Default for RsiDivergenceStrategy {
    fn default() -> Self {
        Self {
            period: 14,
            lookback: 10,
            oversold: 30.0,
            overbought: 70.0,
            divergence_base: 50.0,
            divergence_scale: 2.5,
        }
    }
}

impl TechnicalStrategy for RsiDivergenceStrategy {
    fn name(&self) -> &'static str {
        names::RSI_DIVERGENCE
    }

    fn min_candles(&self) -> usize {
        self.period + self.lookback + 1
    }

    fn evaluate(&self, candles: &[Candle]) -> Signal {
        if candles.len() < self.min_candles() || self.period == 0 || self.lookback == 0 {
            return Signal::neutral();
        }

        let closes = closes(candles);
        let rsi = rsi_series(&closes, self.period);
        let last = closes.len() - 1;
        let Some(current_rsi) = rsi[last] else {
            return Signal::neutral();
        };
        let close = closes[last];

        // Window of prior bars, all past the RSI warm-up.
        let start = last - self.lookback;
        let (mut low_idx, mut high_idx) = (start, start);
        for i in start..last {
            if closes[i] < closes[low_idx] {
                low_idx = i;
            }
            if closes[i] > closes[high_idx] {
                high_idx = i;
            }
        }

        if let Some(rsi_at_low) = rsi[low_idx]
            && close < closes[low_idx]
            && current_rsi > rsi_at_low
        {
            let strength = self.divergence_base + (current_rsi - rsi_at_low) * self.divergence_scale;
            return Signal::buy(strength)
                .with_meta("rsi", current_rsi)
                .with_meta("bullish_divergence", 1.0);
        }

        if let Some(rsi_at_high) = rsi[high_idx]
            && close > closes[high_idx]
            && current_rsi < rsi_at_high
        {
            let strength = self.divergence_base + (rsi_at_high - current_rsi) * self.divergence_scale;
            return Signal::sell(strength)
                .with_meta("rsi", current_rsi)
                .with_meta("bearish_divergence", 1.0);
        }

        if current_rsi < self.oversold && self.oversold > 0.0 {
            let strength = (self.oversold - current_rsi) / self.oversold * 100.0;
            return Signal::buy(strength).with_meta("rsi", current_rsi);
        }
        if current_rsi > self.overbought && self.overbought < 100.0 {
            let strength = (current_rsi - self.overbought) / (100.0 - self.overbought) * 100.0;
            return Signal::sell(strength).with_meta("rsi", current_rsi);
        }

        Signal::neutral()
    }
}
