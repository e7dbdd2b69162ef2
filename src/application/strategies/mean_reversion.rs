use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Distribution};
use ta::Next;
use ta::indicators::SimpleMovingAverage;

use super::{TechnicalStrategy, names};
use crate::domain::market::candle::Candle;
use crate::domain::trading::signal::{Signal, SignalDirection};

/// Fades moves away from the simple moving average.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeanReversionStrategy {
    pub period: usize,
    /// Deviation (percent) at or inside which no signal is produced.
    pub entry_deviation_pct: f64,
    /// Deviation (percent) that maps to full strength.
    pub max_deviation_pct: f64,
}

impl Default for MeanReversionStrategy {
    fn default() -> Self {
        Self {
            period: 20,
            entry_deviation_pct: 2.0,
            max_deviation_pct: 5.0,
        }
    }
}

impl MeanReversionStrategy {
    fn z_score(window: &[f64], close: f64) -> Option<f64> {
        let data = Data::new(window.to_vec());
        let mean = data.mean()?;
        let std_dev = data.std_dev()?;
        if std_dev == 0.0 {
            return None;
        }
        Some((close - mean) / std_dev)
    }
}

impl TechnicalStrategy for MeanReversionStrategy {
    fn name(&self) -> &'static str {
        names::MEAN_REVERSION
    }

    fn min_candles(&self) -> usize {
        self.period.max(1)
    }

    fn evaluate(&self, candles: &[Candle]) -> Signal {
        if candles.len() < self.min_candles() || self.max_deviation_pct <= 0.0 {
            return Signal::neutral();
        }
        let Ok(mut sma) = SimpleMovingAverage::new(self.period) else {
            return Signal::neutral();
        };

        let window: Vec<f64> = candles[candles.len() - self.period..]
            .iter()
            .map(|c| c.close)
            .collect();
        let mean = window.iter().fold(0.0, |_, &close| sma.next(close));
        if mean <= 0.0 {
            return Signal::neutral();
        }

        let close = window[window.len() - 1];
        let deviation_pct = (close - mean) / mean * 100.0;
        if deviation_pct.abs() <= self.entry_deviation_pct {
            return Signal::neutral();
        }

        let direction = if deviation_pct < 0.0 {
            SignalDirection::Buy
        } else {
            SignalDirection::Sell
        };
        let strength = (deviation_pct.abs() / self.max_deviation_pct * 100.0).min(100.0);

        let mut signal = Signal::new(direction, strength)
            .with_meta("sma", mean)
            .with_meta("deviation_pct", deviation_pct);
        if let Some(z) = Self::z_score(&window, close) {
            signal = signal.with_meta("z_score", z);
        }
        signal
    }
}
