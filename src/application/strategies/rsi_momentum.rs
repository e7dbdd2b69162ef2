use serde::{Deserialize, Serialize};

use super::indicators::{closes, rate_of_change, rsi_series};
use super::{TechnicalStrategy, names};
use crate::domain::market::candle::Candle;
use crate::domain::trading::signal::{Signal, SignalDirection};

/// RSI on the trending side of 50 confirmed by rate of change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiMomentumStrategy {
    pub rsi_period: usize,
    pub momentum_period: usize,
    /// Rate of change (percent) that earns the full momentum component.
    pub max_roc_pct: f64,
}

impl Default for RsiMomentumStrategy {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            momentum_period: 10,
            max_roc_pct: 5.0,
        }
    }
}

impl TechnicalStrategy for RsiMomentumStrategy {
    fn name(&self) -> &'static str {
        names::RSI_MOMENTUM
    }

    fn min_candles(&self) -> usize {
        self.rsi_period.max(self.momentum_period) + 1
    }

    fn evaluate(&self, candles: &[Candle]) -> Signal {
        if candles.len() < self.min_candles() || self.max_roc_pct <= 0.0 {
            return Signal::neutral();
        }

        let closes = closes(candles);
        let Some(Some(rsi)) = rsi_series(&closes, self.rsi_period).last().copied() else {
            return Signal::neutral();
        };
        let Some(roc) = rate_of_change(&closes, self.momentum_period) else {
            return Signal::neutral();
        };

        let direction = if rsi > 50.0 && rsi < 70.0 && roc > 0.0 {
            SignalDirection::Buy
        } else if rsi < 50.0 && rsi > 30.0 && roc < 0.0 {
            SignalDirection::Sell
        } else {
            return Signal::neutral().with_meta("rsi", rsi).with_meta("roc", roc);
        };

        let rsi_component = (rsi - 50.0).abs() / 20.0 * 50.0;
        let roc_component = (roc.abs() / self.max_roc_pct * 50.0).min(50.0);

        Signal::new(direction, (rsi_component + roc_component).min(100.0))
            .with_meta("rsi", rsi)
            .with_meta("roc", roc)
    }
}
