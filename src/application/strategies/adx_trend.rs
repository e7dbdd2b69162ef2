use serde::{Deserialize, Serialize};

use super::indicators::{DirectionalIndex, WilderAdx};
use super::{TechnicalStrategy, names};
use crate::domain::market::candle::Candle;
use crate::domain::trading::signal::{Signal, SignalDirection};

/// Trend strength from ADX, direction from the dominant DI line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdxTrendStrategy {
    pub period: usize,
    pub threshold: f64,
    /// ADX at or above this maps to full strength.
    pub strength_cap: f64,
    pub rising_bonus: f64,
}

impl Default for AdxTrendStrategy {
    fn default() -> Self {
        Self {
            period: 14,
            threshold: 25.0,
            strength_cap: 75.0,
            rising_bonus: 10.0,
        }
    }
}

impl TechnicalStrategy for AdxTrendStrategy {
    fn name(&self) -> &'static str {
        names::ADX_TREND
    }

    fn min_candles(&self) -> usize {
        2 * self.period + 1
    }

    fn evaluate(&self, candles: &[Candle]) -> Signal {
        if candles.len() < self.min_candles()
            || self.period == 0
            || self.strength_cap <= self.threshold
        {
            return Signal::neutral();
        }

        let mut adx = WilderAdx::new(self.period);
        let readings: Vec<DirectionalIndex> = candles
            .iter()
            .filter_map(|c| adx.next(c.high, c.low, c.close))
            .collect();
        let [.., previous, current] = readings.as_slice() else {
            return Signal::neutral();
        };

        if current.adx < self.threshold {
            return Signal::neutral();
        }
        let direction = if current.plus_di > current.minus_di {
            SignalDirection::Buy
        } else if current.plus_di < current.minus_di {
            SignalDirection::Sell
        } else {
            return Signal::neutral();
        };

        let scaled = (current.adx.min(self.strength_cap) - self.threshold)
            / (self.strength_cap - self.threshold)
            * 100.0;
        let bonus = if current.adx > previous.adx {
            self.rising_bonus
        } else {
            0.0
        };

        tracing::trace!(
            "ADX Trend: adx={:.2} +di={:.2} -di={:.2}",
            current.adx,
            current.plus_di,
            current.minus_di
        );

        Signal::new(direction, (scaled + bonus).min(100.0))
            .with_meta("adx", current.adx)
            .with_meta("plus_di", current.plus_di)
            .with_meta("minus_di", current.minus_di)
    }
}
