use serde::{Deserialize, Serialize};

use super::indicators::{highest_high, lowest_low};
use super::{TechnicalStrategy, names};
use crate::domain::market::candle::Candle;
use crate::domain::trading::signal::{Signal, SignalDirection};

/// Close beyond the prior range, confirmed by volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeBreakoutStrategy {
    pub lookback: usize,
    pub volume_multiplier: f64,
    pub base_strength: f64,
    pub breakout_weight: f64,
    /// Breakout (percent) that earns the full breakout weight.
    pub max_breakout_pct: f64,
    pub volume_bonus: f64,
}

impl Default for RangeBreakoutStrategy {
    fn default() -> Self {
        Self {
            lookback: 20,
            volume_multiplier: 1.5,
            base_strength: 30.0,
            breakout_weight: 30.0,
            max_breakout_pct: 2.0,
            volume_bonus: 40.0,
        }
    }
}

impl RangeBreakoutStrategy {
    fn volume_confirmed(&self, prior: &[Candle], current: &Candle) -> bool {
        let Some(volume) = current.volume else {
            return false;
        };
        let volumes: Vec<f64> = prior.iter().filter_map(|c| c.volume).collect();
        if volumes.is_empty() {
            return false;
        }
        let average = volumes.iter().sum::<f64>() / volumes.len() as f64;
        average > 0.0 && volume >= average * self.volume_multiplier
    }
}

impl TechnicalStrategy for RangeBreakoutStrategy {
    fn name(&self) -> &'static str {
        names::RANGE_BREAKOUT
    }

    fn min_candles(&self) -> usize {
        self.lookback + 1
    }

    fn evaluate(&self, candles: &[Candle]) -> Signal {
        if candles.len() < self.min_candles() || self.lookback == 0 || self.max_breakout_pct <= 0.0 {
            return Signal::neutral();
        }

        let n = candles.len();
        let prior = &candles[n - 1 - self.lookback..n - 1];
        let current = &candles[n - 1];
        let range_high = highest_high(prior);
        let range_low = lowest_low(prior);

        let (direction, level) = if current.close > range_high {
            (SignalDirection::Buy, range_high)
        } else if current.close < range_low {
            (SignalDirection::Sell, range_low)
        } else {
            return Signal::neutral();
        };
        if level <= 0.0 {
            return Signal::neutral();
        }

        let breakout_pct = (current.close - level).abs() / level * 100.0;
        let breakout_score =
            (breakout_pct / self.max_breakout_pct * self.breakout_weight).min(self.breakout_weight);
        let confirmed = self.volume_confirmed(prior, current);
        let bonus = if confirmed { self.volume_bonus } else { 0.0 };

        Signal::new(direction, self.base_strength + breakout_score + bonus)
            .with_meta("range_high", range_high)
            .with_meta("range_low", range_low)
            .with_meta("volume_confirmed", if confirmed { 1.0 } else { 0.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::strategies::indicators::test_support::*;
    use chrono::{Duration, TimeZone, Utc};

    fn ranging(last_close: f64, last_volume: Option<f64>) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut candles: Vec<Candle> = (0..20)
            .map(|i| {
                Candle::new(start + Duration::hours(i), 100.0, 101.0, 99.0, 100.0)
                    .with_volume(1000.0)
            })
            .collect();
        let mut last = Candle::new(start + Duration::hours(20), 100.0, last_close, 99.5, last_close);
        last.volume = last_volume;
        candles.push(last);
        candles
    }

    #[test]
    fn test_volume_confirmed_breakout_is_stronger() {
        let strategy = RangeBreakoutStrategy::default();
        let confirmed = strategy.evaluate(&ranging(103.0, Some(2000.0)));
        let unconfirmed = strategy.evaluate(&ranging(103.0, None));

        assert_eq!(confirmed.direction(), SignalDirection::Buy);
        assert_eq!(unconfirmed.direction(), SignalDirection::Buy);
        assert!((confirmed.strength() - unconfirmed.strength() - 40.0).abs() < 1e-9);
        assert!(unconfirmed.strength() > 55.0 && unconfirmed.strength() < 60.0);
    }

    #[test]
    fn test_inside_range_is_neutral() {
        assert!(RangeBreakoutStrategy::default().evaluate(&ranging(100.5, Some(5000.0))).is_neutral());
    }

    #[test]
    fn test_breakdown_is_sell() {
        let candles = candles_from_closes(&[100.0; 20], 1.0);
        let mut candles = with_volume(candles, 1000.0);
        let last = candles[19];
        candles.push(Candle::new(last.time, 100.0, 100.0, 95.0, 96.0));
        let signal = RangeBreakoutStrategy::default().evaluate(&candles);
        assert_eq!(signal.direction(), SignalDirection::Sell);
        assert_eq!(signal.metadata.get("volume_confirmed"), Some(&0.0));
    }
}
