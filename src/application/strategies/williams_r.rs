use serde::{Deserialize, Serialize};

use super::indicators::{highest_high, lowest_low};
use super::{TechnicalStrategy, names};
use crate::domain::market::candle::Candle;
use crate::domain::trading::signal::Signal;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WilliamsRStrategy {
    pub period: usize,
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for WilliamsRStrategy {
    fn default() -> Self {
        Self {
            period: 14,
            oversold: -80.0,
            overbought: -20.0,
        }
    }
}

impl TechnicalStrategy for WilliamsRStrategy {
    fn name(&self) -> &'static str {
        names::WILLIAMS_R
    }

    fn min_candles(&self) -> usize {
        self.period.max(1)
    }

    fn evaluate(&self, candles: &[Candle]) -> Signal {
        if candles.len() < self.min_candles() || self.period == 0 {
            return Signal::neutral();
        }

        let window = &candles[candles.len() - self.period..];
        let high = highest_high(window);
        let low = lowest_low(window);
        let range = high - low;
        if range <= 0.0 {
            return Signal::neutral();
        }

        let close = window[window.len() - 1].close;
        let r = (high - close) / range * -100.0;

        let signal = if r < self.oversold {
            let zone = self.oversold + 100.0;
            Signal::buy((self.oversold - r) / zone * 100.0)
        } else if r > self.overbought {
            let zone = -self.overbought;
            Signal::sell((r - self.overbought) / zone * 100.0)
        } else {
            Signal::neutral()
        };
        signal.with_meta("williams_r", r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::strategies::indicators::test_support::*;
    use crate::domain::trading::signal::SignalDirection;

    #[test]
    fn test_close_at_low_is_full_buy() {
        let candles = candles_from_closes(&linear(120.0, -1.0, 14), 0.0);
        let signal = WilliamsRStrategy::default().evaluate(&candles);
        assert_eq!(signal.direction(), SignalDirection::Buy);
        assert_eq!(signal.strength(), 100.0);
    }

    #[test]
    fn test_close_at_high_is_full_sell() {
        let candles = candles_from_closes(&linear(100.0, 1.0, 14), 0.0);
        let signal = WilliamsRStrategy::default().evaluate(&candles);
        assert_eq!(signal.direction(), SignalDirection::Sell);
        assert_eq!(signal.strength(), 100.0);
    }

    #[test]
    fn test_mid_range_is_neutral() {
        let mut closes = linear(100.0, 1.0, 13);
        closes.push(106.0);
        let candles = candles_from_closes(&closes, 0.0);
        assert!(WilliamsRStrategy::default().evaluate(&candles).is_neutral());
    }
}
