use serde::{Deserialize, Serialize};

use super::{TechnicalStrategy, names};
use crate::domain::market::candle::Candle;
use crate::domain::trading::signal::{Signal, SignalDirection};

/// Retracement level with its strength weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FibLevel {
    pub ratio: f64,
    pub weight: f64,
}

/// Proximity to a Fibonacci retracement of the last swing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FibonacciStrategy {
    pub lookback: usize,
    pub levels: Vec<FibLevel>,
    /// Distance to a level, in percent of price, that still counts as "at" the level.
    pub tolerance_pct: f64,
}

impl Default for FibonacciStrategy {
    fn default() -> Self {
        let levels = [(0.236, 45.0), (0.382, 60.0), (0.5, 70.0), (0.618, 80.0), (0.786, 55.0)]
            .into_iter()
            .map(|(ratio, weight)| FibLevel { ratio, weight })
            .collect();
        Self {
            lookback: 50,
            levels,
            tolerance_pct: 0.5,
        }
    }
}

impl TechnicalStrategy for FibonacciStrategy {
    fn name(&self) -> &'static str {
        names::FIBONACCI
    }

    fn min_candles(&self) -> usize {
        self.lookback.max(2)
    }

    fn evaluate(&self, candles: &[Candle]) -> Signal {
        if candles.len() < self.min_candles() {
            return Signal::neutral();
        }

        let window = &candles[candles.len() - self.min_candles()..];
        let (mut high_idx, mut low_idx) = (0, 0);
        for (i, c) in window.iter().enumerate() {
            if c.high > window[high_idx].high {
                high_idx = i;
            }
            if c.low < window[low_idx].low {
                low_idx = i;
            }
        }
        let swing_high = window[high_idx].high;
        let swing_low = window[low_idx].low;
        let range = swing_high - swing_low;
        if range <= 0.0 || high_idx == low_idx {
            return Signal::neutral();
        }

        let close = window[window.len() - 1].close;
        let tolerance = close * self.tolerance_pct / 100.0;
        if tolerance <= 0.0 {
            return Signal::neutral();
        }

        let uptrend = high_idx > low_idx;
        let nearest = self
            .levels
            .iter()
            .map(|level| {
                let price = if uptrend {
                    swing_high - range * level.ratio
                } else {
                    swing_low + range * level.ratio
                };
                (level, price, (close - price).abs())
            })
            .filter(|(_, _, distance)| *distance <= tolerance)
            .min_by(|a, b| a.2.total_cmp(&b.2));

        let Some((level, price, distance)) = nearest else {
            return Signal::neutral();
        };

        let direction = if uptrend {
            SignalDirection::Buy
        } else {
            SignalDirection::Sell
        };
        let strength = level.weight * (1.0 - 0.5 * distance / tolerance);

        Signal::new(direction, strength)
            .with_meta("level_ratio", level.ratio)
            .with_meta("level_price", price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::strategies::indicators::test_support::*;

    fn rally_then_pullback(to: f64) -> Vec<Candle> {
        // 100 -> 200 over 41 bars, then drift down to `to`.
        let mut closes = linear(100.0, 2.5, 41);
        let step = (to - 200.0) / 9.0;
        closes.extend((1..=9).map(|i| 200.0 + step * i as f64));
        candles_from_closes(&closes, 0.0)
    }

    #[test]
    fn test_golden_ratio_pullback_in_uptrend() {
        let signal = FibonacciStrategy::default().evaluate(&rally_then_pullback(138.2));
        assert_eq!(signal.direction(), SignalDirection::Buy);
        assert_eq!(signal.metadata.get("level_ratio"), Some(&0.618));
        assert!(signal.strength() > 79.0);
    }

    #[test]
    fn test_between_levels_is_neutral() {
        // 0.5 sits at 150, 0.382 at 161.8
        assert!(FibonacciStrategy::default().evaluate(&rally_then_pullback(156.0)).is_neutral());
    }

    #[test]
    fn test_flat_window_is_neutral() {
        let candles = candles_from_closes(&[100.0; 50], 0.0);
        assert!(FibonacciStrategy::default().evaluate(&candles).is_neutral());
    }
}
