use serde::{Deserialize, Serialize};

use super::{TechnicalStrategy, names};
use crate::domain::market::candle::Candle;
use crate::domain::trading::signal::Signal;

/// Commodity Channel Index extremes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CciStrategy {
    pub period: usize,
    pub constant: f64,
    pub threshold: f64,
}

impl Default for CciStrategy {
    fn default() -> Self {
        Self {
            period: 20,
            constant: 0.015,
            threshold: 100.0,
        }
    }
}

impl TechnicalStrategy for CciStrategy {
    fn name(&self) -> &'static str {
        names::CCI
    }

    fn min_candles(&self) -> usize {
        self.period.max(1)
    }

    fn evaluate(&self, candles: &[Candle]) -> Signal {
        if candles.len() < self.min_candles() || self.period == 0 || self.constant <= 0.0 {
            return Signal::neutral();
        }

        let typical: Vec<f64> = candles[candles.len() - self.period..]
            .iter()
            .map(Candle::typical_price)
            .collect();
        let n = typical.len() as f64;
        let mean = typical.iter().sum::<f64>() / n;
        let mean_deviation = typical.iter().map(|tp| (tp - mean).abs()).sum::<f64>() / n;
        if mean_deviation == 0.0 {
            return Signal::neutral();
        }

        let current = typical[typical.len() - 1];
        let cci = (current - mean) / (self.constant * mean_deviation);

        let signal = if cci < -self.threshold {
            Signal::buy(cci.abs() - self.threshold)
        } else if cci > self.threshold {
            Signal::sell(cci - self.threshold)
        } else {
            Signal::neutral()
        };
        signal.with_meta("cci", cci)
    }
}
