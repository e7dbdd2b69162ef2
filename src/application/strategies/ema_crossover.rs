use serde::{Deserialize, Serialize};

use super::indicators::{CROSS_TOLERANCE, closes, ema_series};
use super::{TechnicalStrategy, names};
use crate::domain::market::candle::Candle;
use crate::domain::trading::signal::{Signal, SignalDirection};

/// Short/long EMA crossover. Signals only on the bar where the cross happens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmaCrossoverStrategy {
    pub short_period: usize,
    pub long_period: usize,
    pub base_strength: f64,
    /// Spread (percent of the long EMA) that maps to full strength.
    pub max_spread_pct: f64,
}

impl Default for EmaCrossoverStrategy {
    fn default() -> Self {
        Self {
            short_period: 9,
            long_period: 21,
            base_strength: 50.0,
            max_spread_pct: 1.0,
        }
    }
}

impl TechnicalStrategy for EmaCrossoverStrategy {
    fn name(&self) -> &'static str {
        names::EMA_CROSSOVER
    }

    fn min_candles(&self) -> usize {
        self.long_period.max(2)
    }

    fn evaluate(&self, candles: &[Candle]) -> Signal {
        if candles.len() < self.min_candles()
            || self.short_period == 0
            || self.short_period >= self.long_period
            || self.max_spread_pct <= 0.0
        {
            return Signal::neutral();
        }

        let closes = closes(candles);
        let short = ema_series(&closes, self.short_period);
        let long = ema_series(&closes, self.long_period);
        let n = closes.len();
        if short.len() != n || long.len() != n {
            return Signal::neutral();
        }
        let (cur_short, cur_long) = (short[n - 1], long[n - 1]);
        let prev_gap = short[n - 2] - long[n - 2];
        let gap = cur_short - cur_long;
        // Rounding noise on a flat series is not a cross.
        let tolerance = cur_long.abs() * CROSS_TOLERANCE;

        let direction = if prev_gap <= tolerance && gap > tolerance {
            SignalDirection::Buy
        } else if prev_gap >= -tolerance && gap < -tolerance {
            SignalDirection::Sell
        } else {
            return Signal::neutral();
        };
        if cur_long <= 0.0 {
            return Signal::neutral();
        }

        let spread_pct = (cur_short - cur_long).abs() / cur_long * 100.0;
        let strength = (self.base_strength
            + spread_pct / self.max_spread_pct * (100.0 - self.base_strength))
            .min(100.0);

        tracing::trace!(
            "EMA Crossover: {} cross (short={:.4}, long={:.4}, spread={:.3}%)",
            direction,
            cur_short,
            cur_long,
            spread_pct
        );

        Signal::new(direction, strength)
            .with_meta("ema_short", cur_short)
            .with_meta("ema_long", cur_long)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::strategies::indicators::test_support::*;

    fn flat_then(tail: &[f64]) -> Vec<Candle> {
        let mut closes = vec![100.0; 20];
        closes.extend_from_slice(tail);
        candles_from_closes(&closes, 0.0)
    }

    #[test]
    fn test_flat_series_below_min_length_is_neutral() {
        let candles = flat_then(&[]);
        assert_eq!(candles.len(), 20);
        assert!(EmaCrossoverStrategy::default().evaluate(&candles).is_neutral());
    }

    #[test]
    fn test_cross_fires_on_jump_bar_only() {
        let strategy = EmaCrossoverStrategy::default();

        let at_cross = flat_then(&[110.0]);
        let signal = strategy.evaluate(&at_cross);
        assert_eq!(signal.direction(), SignalDirection::Buy);
        assert!(signal.strength() > 50.0);

        // The short EMA is already above the long one, so no new cross.
        let after = flat_then(&[110.0, 112.0]);
        assert!(strategy.evaluate(&after).is_neutral());
    }

    #[test]
    fn test_bearish_cross() {
        let signal = EmaCrossoverStrategy::default().evaluate(&flat_then(&[99.0]));
        assert_eq!(signal.direction(), SignalDirection::Sell);
        // spread is small, so strength stays near the base
        assert!(signal.strength() > 50.0 && signal.strength() < 60.0);
    }

    #[test]
    fn test_invalid_periods_are_neutral() {
        let strategy = EmaCrossoverStrategy {
            short_period: 21,
            long_period: 9,
            ..Default::default()
        };
        assert!(strategy.evaluate(&flat_then(&[110.0])).is_neutral());
    }
}
