use serde::{Deserialize, Serialize};
use ta::Next;
use ta::indicators::{
    MovingAverageConvergenceDivergence, MovingAverageConvergenceDivergenceOutput,
};

use super::indicators::{CROSS_TOLERANCE, closes};
use super::{TechnicalStrategy, names};
use crate::domain::market::candle::Candle;
use crate::domain::trading::signal::{Signal, SignalDirection};

/// MACD histogram zero-line crossings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdStrategy {
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
    pub base_strength: f64,
    /// Histogram size (percent of price) that maps to full strength.
    pub max_histogram_pct: f64,
}

impl Default for MacdStrategy {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
            base_strength: 50.0,
            max_histogram_pct: 0.5,
        }
    }
}

impl TechnicalStrategy for MacdStrategy {
    fn name(&self) -> &'static str {
        names::MACD
    }

    fn min_candles(&self) -> usize {
        self.slow_period + self.signal_period
    }

    fn evaluate(&self, candles: &[Candle]) -> Signal {
        if candles.len() < self.min_candles().max(2)
            || self.fast_period == 0
            || self.fast_period >= self.slow_period
            || self.signal_period == 0
            || self.max_histogram_pct <= 0.0
        {
            return Signal::neutral();
        }

        let Ok(mut macd) = MovingAverageConvergenceDivergence::new(
            self.fast_period,
            self.slow_period,
            self.signal_period,
        ) else {
            return Signal::neutral();
        };
        let closes = closes(candles);
        let outputs: Vec<MovingAverageConvergenceDivergenceOutput> =
            closes.iter().map(|&close| macd.next(close)).collect();

        let n = closes.len();
        let current = &outputs[n - 1];
        let histogram = current.histogram;
        let prev_histogram = outputs[n - 2].histogram;
        let tolerance = closes[n - 1].abs() * CROSS_TOLERANCE;

        let direction = if prev_histogram <= tolerance && histogram > tolerance {
            SignalDirection::Buy
        } else if prev_histogram >= -tolerance && histogram < -tolerance {
            SignalDirection::Sell
        } else {
            return Signal::neutral().with_meta("histogram", histogram);
        };

        let close = closes[n - 1];
        if close <= 0.0 {
            return Signal::neutral();
        }
        let histogram_pct = histogram.abs() / close * 100.0;
        let strength = (self.base_strength
            + histogram_pct / self.max_histogram_pct * (100.0 - self.base_strength))
            .min(100.0);

        Signal::new(direction, strength)
            .with_meta("macd", current.macd)
            .with_meta("signal", current.signal)
            .with_meta("histogram", histogram)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::strategies::indicators::test_support::*;

    fn flat_then(tail: &[f64]) -> Vec<Candle> {
        let mut closes = vec![100.0; 40];
        closes.extend_from_slice(tail);
        candles_from_closes(&closes, 0.5)
    }

    #[test]
    fn test_histogram_turning_positive_is_buy() {
        let signal = MacdStrategy::default().evaluate(&flat_then(&[105.0]));
        assert_eq!(signal.direction(), SignalDirection::Buy);
        assert!(signal.metadata["histogram"] > 0.0);
    }

    #[test]
    fn test_histogram_turning_negative_is_sell() {
        let signal = MacdStrategy::default().evaluate(&flat_then(&[95.0]));
        assert_eq!(signal.direction(), SignalDirection::Sell);
    }

    #[test]
    fn test_no_new_cross_is_neutral() {
        let strategy = MacdStrategy::default();
        assert!(strategy.evaluate(&flat_then(&[])).is_neutral());
        assert!(strategy.evaluate(&flat_then(&[105.0, 106.0])).is_neutral());
    }

    #[test]
    fn test_insufficient_data() {
        let candles = candles_from_closes(&[100.0; 34], 0.5);
        assert!(MacdStrategy::default().evaluate(&candles).is_neutral());
    }
}
