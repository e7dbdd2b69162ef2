use serde::{Deserialize, Serialize};

use super::{TechnicalStrategy, names};
use crate::domain::market::candle::Candle;
use crate::domain::trading::signal::{Signal, SignalDirection};

/// Breakouts through the most recent confirmed Williams fractal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FractalsStrategy {
    /// Bars required on each side of a fractal.
    pub wing: usize,
    pub lookback: usize,
    pub base_strength: f64,
    /// Breakout (percent) that earns the full bonus.
    pub max_breakout_pct: f64,
}

impl Default for FractalsStrategy {
    fn default() -> Self {
        Self {
            wing: 2,
            lookback: 30,
            base_strength: 40.0,
            max_breakout_pct: 2.0,
        }
    }
}

impl FractalsStrategy {
    /// Most recent fractal confirmed strictly before the last bar.
    fn latest_fractal(&self, candles: &[Candle], value: impl Fn(&Candle) -> f64, up: bool) -> Option<f64> {
        let n = candles.len();
        let newest = n.checked_sub(2 + self.wing)?;
        let oldest = self.wing.max(n.saturating_sub(self.lookback));
        (oldest..=newest).rev().find_map(|i| {
            let pivot = value(&candles[i]);
            let is_fractal = (i - self.wing..=i + self.wing)
                .filter(|&j| j != i)
                .all(|j| {
                    let other = value(&candles[j]);
                    if up { pivot > other } else { pivot < other }
                });
            is_fractal.then_some(pivot)
        })
    }
}

impl TechnicalStrategy for FractalsStrategy {
    fn name(&self) -> &'static str {
        names::FRACTALS
    }

    fn min_candles(&self) -> usize {
        2 * self.wing + 2
    }

    fn evaluate(&self, candles: &[Candle]) -> Signal {
        if candles.len() < self.min_candles() || self.wing == 0 || self.max_breakout_pct <= 0.0 {
            return Signal::neutral();
        }

        let n = candles.len();
        let close = candles[n - 1].close;
        let prev_close = candles[n - 2].close;

        let up_level = self.latest_fractal(candles, |c| c.high, true);
        let down_level = self.latest_fractal(candles, |c| c.low, false);

        let bullish = up_level.filter(|&level| prev_close <= level && close > level && level > 0.0);
        let bearish = down_level.filter(|&level| prev_close >= level && close < level && level > 0.0);

        let (direction, level) = match (bullish, bearish) {
            (Some(level), None) => (SignalDirection::Buy, level),
            (None, Some(level)) => (SignalDirection::Sell, level),
            _ => return Signal::neutral(),
        };

        let breakout_pct = (close - level).abs() / level * 100.0;
        let strength = (self.base_strength
            + breakout_pct / self.max_breakout_pct * (100.0 - self.base_strength))
            .min(100.0);

        Signal::new(direction, strength).with_meta("fractal_level", level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bars(highs_lows_closes: &[(f64, f64, f64)]) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        highs_lows_closes
            .iter()
            .enumerate()
            .map(|(i, &(h, l, c))| Candle::new(start + Duration::hours(i as i64), c, h, l, c))
            .collect()
    }

    #[test]
    fn test_break_above_up_fractal() {
        let candles = bars(&[
            (101.0, 99.0, 100.0),
            (102.0, 99.5, 101.0),
            (110.0, 100.0, 105.0),
            (103.0, 99.6, 102.0),
            (102.5, 99.8, 101.0),
            (108.0, 100.0, 105.0),
            (113.0, 104.0, 112.0),
        ]);
        let signal = FractalsStrategy::default().evaluate(&candles);
        assert_eq!(signal.direction(), SignalDirection::Buy);
        assert_eq!(signal.metadata.get("fractal_level"), Some(&110.0));
        // 1.82% breakout
        assert!(signal.strength() > 90.0 && signal.strength() < 100.0);
    }

    #[test]
    fn test_stale_breakout_is_neutral() {
        let candles = bars(&[
            (101.0, 99.0, 100.0),
            (102.0, 99.5, 101.0),
            (110.0, 100.0, 105.0),
            (103.0, 99.6, 102.0),
            (102.5, 99.8, 101.0),
            (113.0, 104.0, 111.0),
            (114.0, 105.0, 112.0),
        ]);
        assert!(FractalsStrategy::default().evaluate(&candles).is_neutral());
    }

    #[test]
    fn test_break_below_down_fractal() {
        let candles = bars(&[
            (101.0, 99.0, 100.0),
            (100.5, 98.0, 99.0),
            (99.0, 90.0, 95.0),
            (100.0, 97.0, 98.0),
            (100.5, 97.5, 99.0),
            (99.0, 92.0, 95.0),
            (93.0, 88.0, 89.0),
        ]);
        let signal = FractalsStrategy::default().evaluate(&candles);
        assert_eq!(signal.direction(), SignalDirection::Sell);
    }

    #[test]
    fn test_insufficient_data() {
        let candles = bars(&[(101.0, 99.0, 100.0); 5]);
        assert!(FractalsStrategy::default().evaluate(&candles).is_neutral());
    }
}
