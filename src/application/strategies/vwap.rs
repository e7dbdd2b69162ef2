use serde::{Deserialize, Serialize};

use super::{TechnicalStrategy, names};
use crate::domain::market::candle::Candle;
use crate::domain::trading::signal::{Signal, SignalDirection};

/// Rolling VWAP crossings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VwapStrategy {
    pub period: usize,
    pub base_strength: f64,
    /// Deviation from VWAP (percent) that maps to full strength.
    pub max_deviation_pct: f64,
}

impl Default for VwapStrategy {
    fn default() -> Self {
        Self {
            period: 20,
            base_strength: 50.0,
            max_deviation_pct: 1.0,
        }
    }
}

/// VWAP of typical price over `window`. Missing volume counts as zero.
fn vwap(window: &[Candle]) -> Option<f64> {
    let (weighted, volume) = window.iter().fold((0.0, 0.0), |(w, v), c| {
        let vol = c.volume.unwrap_or(0.0);
        (w + c.typical_price() * vol, v + vol)
    });
    (volume > 0.0).then(|| weighted / volume)
}

impl TechnicalStrategy for VwapStrategy {
    fn name(&self) -> &'static str {
        names::VWAP
    }

    fn min_candles(&self) -> usize {
        self.period + 1
    }

    fn evaluate(&self, candles: &[Candle]) -> Signal {
        if candles.len() < self.min_candles() || self.period == 0 || self.max_deviation_pct <= 0.0 {
            return Signal::neutral();
        }

        let n = candles.len();
        let (Some(current), Some(previous)) = (
            vwap(&candles[n - self.period..]),
            vwap(&candles[n - 1 - self.period..n - 1]),
        ) else {
            return Signal::neutral();
        };

        let close = candles[n - 1].close;
        let prev_close = candles[n - 2].close;

        let direction = if prev_close <= previous && close > current {
            SignalDirection::Buy
        } else if prev_close >= previous && close < current {
            SignalDirection::Sell
        } else {
            return Signal::neutral();
        };

        let deviation_pct = (close - current).abs() / current * 100.0;
        let strength = (self.base_strength
            + deviation_pct / self.max_deviation_pct * (100.0 - self.base_strength))
            .min(100.0);

        Signal::new(direction, strength).with_meta("vwap", current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::strategies::indicators::test_support::*;

    fn series(tail: &[f64]) -> Vec<f64> {
        let mut closes = vec![100.0; 20];
        closes.extend_from_slice(tail);
        closes
    }

    #[test]
    fn test_upward_cross_is_buy() {
        let candles = with_volume(candles_from_closes(&series(&[99.0, 102.0]), 0.0), 1000.0);
        let signal = VwapStrategy::default().evaluate(&candles);
        assert_eq!(signal.direction(), SignalDirection::Buy);
        assert!(signal.strength() > 50.0);
    }

    #[test]
    fn test_downward_cross_is_sell() {
        let candles = with_volume(candles_from_closes(&series(&[101.0, 98.0]), 0.0), 1000.0);
        let signal = VwapStrategy::default().evaluate(&candles);
        assert_eq!(signal.direction(), SignalDirection::Sell);
    }

    #[test]
    fn test_missing_volume_is_neutral() {
        let candles = candles_from_closes(&series(&[99.0, 102.0]), 0.0);
        assert!(VwapStrategy::default().evaluate(&candles).is_neutral());
    }
}
