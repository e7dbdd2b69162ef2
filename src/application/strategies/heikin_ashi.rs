use serde::{Deserialize, Serialize};

use super::{TechnicalStrategy, names};
use crate::domain::market::candle::Candle;
use crate::domain::trading::signal::{Signal, SignalDirection};

/// Heikin Ashi colour runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeikinAshiStrategy {
    pub min_candles: usize,
    pub reversal_strength: f64,
    pub trend_base: f64,
    pub per_candle: f64,
    pub trend_cap: f64,
    pub no_wick_bonus: f64,
}

impl Default for HeikinAshiStrategy {
    fn default() -> Self {
        Self {
            min_candles: 5,
            reversal_strength: 50.0,
            trend_base: 20.0,
            per_candle: 10.0,
            trend_cap: 80.0,
            no_wick_bonus: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct HaCandle {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

impl HaCandle {
    fn direction(&self) -> SignalDirection {
        if self.close > self.open {
            SignalDirection::Buy
        } else if self.close < self.open {
            SignalDirection::Sell
        } else {
            SignalDirection::Neutral
        }
    }
}

fn heikin_ashi(candles: &[Candle]) -> Vec<HaCandle> {
    let mut out: Vec<HaCandle> = Vec::with_capacity(candles.len());
    for c in candles {
        let close = (c.open + c.high + c.low + c.close) / 4.0;
        let open = match out.last() {
            Some(prev) => (prev.open + prev.close) / 2.0,
            None => (c.open + c.close) / 2.0,
        };
        out.push(HaCandle {
            open,
            high: c.high.max(open).max(close),
            low: c.low.min(open).min(close),
            close,
        });
    }
    out
}

impl TechnicalStrategy for HeikinAshiStrategy {
    fn name(&self) -> &'static str {
        names::HEIKIN_ASHI
    }

    fn min_candles(&self) -> usize {
        self.min_candles.max(2)
    }

    fn evaluate(&self, candles: &[Candle]) -> Signal {
        if candles.len() < self.min_candles() {
            return Signal::neutral();
        }

        let ha = heikin_ashi(candles);
        let Some(current) = ha.last() else {
            return Signal::neutral();
        };
        let direction = current.direction();
        if direction == SignalDirection::Neutral {
            return Signal::neutral();
        }

        let run = ha
            .iter()
            .rev()
            .take_while(|c| c.direction() == direction)
            .count();

        let mut strength = if run == 1 {
            self.reversal_strength
        } else {
            (self.trend_base + self.per_candle * run as f64).min(self.trend_cap)
        };

        let no_opposing_wick = match direction {
            SignalDirection::Buy => current.low >= current.open,
            _ => current.high <= current.open,
        };
        if no_opposing_wick {
            strength += self.no_wick_bonus;
        }

        Signal::new(direction, strength).with_meta("run_length", run as f64)
    }
}
