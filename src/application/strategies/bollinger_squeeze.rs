use serde::{Deserialize, Serialize};
use ta::Next;
use ta::indicators::BollingerBands;

use super::{TechnicalStrategy, names};
use crate::domain::market::candle::Candle;
use crate::domain::trading::signal::{Signal, SignalDirection};

/// Band breakout, boosted when it follows a volatility squeeze.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BollingerSqueezeStrategy {
    pub period: usize,
    pub multiplier: f64,
    pub squeeze_lookback: usize,
    /// Previous bandwidth within this fraction of the lookback minimum counts as a squeeze.
    pub squeeze_tolerance: f64,
    pub base_strength: f64,
    pub squeeze_bonus: f64,
}

impl Default for BollingerSqueezeStrategy {
    fn default() -> Self {
        Self {
            period: 20,
            multiplier: 2.0,
            squeeze_lookback: 20,
            squeeze_tolerance: 0.1,
            base_strength: 40.0,
            squeeze_bonus: 30.0,
        }
    }
}

struct Band {
    average: f64,
    upper: f64,
    lower: f64,
}

impl Band {
    fn bandwidth(&self) -> Option<f64> {
        let width = self.upper - self.lower;
        (self.average > 0.0 && width.is_finite()).then(|| width / self.average)
    }
}

impl TechnicalStrategy for BollingerSqueezeStrategy {
    fn name(&self) -> &'static str {
        names::BOLLINGER_SQUEEZE
    }

    fn min_candles(&self) -> usize {
        self.period + self.squeeze_lookback
    }

    fn evaluate(&self, candles: &[Candle]) -> Signal {
        if candles.len() < self.min_candles() || self.squeeze_lookback == 0 {
            return Signal::neutral();
        }
        let Ok(mut bb) = BollingerBands::new(self.period, self.multiplier) else {
            return Signal::neutral();
        };

        let bands: Vec<Band> = candles
            .iter()
            .map(|c| {
                let out = bb.next(c.close);
                Band {
                    average: out.average,
                    upper: out.upper,
                    lower: out.lower,
                }
            })
            .collect();

        let last = candles.len() - 1;
        let current = &bands[last];
        let width = current.upper - current.lower;
        if !width.is_finite() || width <= 0.0 {
            return Signal::neutral();
        }

        let close = candles[last].close;
        let (direction, penetration) = if close > current.upper {
            (SignalDirection::Buy, (close - current.upper) / width)
        } else if close < current.lower {
            (SignalDirection::Sell, (current.lower - close) / width)
        } else {
            return Signal::neutral();
        };

        // Only bars with a full band window take part in the squeeze test.
        let window_start = last - self.squeeze_lookback;
        let min_bandwidth = bands[window_start..last]
            .iter()
            .filter_map(Band::bandwidth)
            .fold(f64::INFINITY, f64::min);
        let squeeze = match bands[last - 1].bandwidth() {
            Some(prev) if min_bandwidth.is_finite() => {
                prev <= min_bandwidth * (1.0 + self.squeeze_tolerance)
            }
            _ => false,
        };

        let bonus = if squeeze { self.squeeze_bonus } else { 0.0 };
        let strength = (self.base_strength + penetration * 100.0 + bonus).min(100.0);

        Signal::new(direction, strength)
            .with_meta("upper", current.upper)
            .with_meta("lower", current.lower)
            .with_meta("squeeze", if squeeze { 1.0 } else { 0.0 })
    }
}
