use serde::{Deserialize, Serialize};

use super::indicators::atr_series;
use super::{TechnicalStrategy, names};
use crate::domain::market::candle::Candle;
use crate::domain::trading::signal::{Signal, SignalDirection};

/// ATR-band trend follower.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupertrendStrategy {
    pub atr_period: usize,
    pub multiplier: f64,
    pub flip_strength: f64,
}

impl Default for SupertrendStrategy {
    fn default() -> Self {
        Self {
            atr_period: 10,
            multiplier: 3.0,
            flip_strength: 75.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Trend {
    Up,
    Down,
}

struct SupertrendState {
    trend: Trend,
    final_upper: f64,
    final_lower: f64,
    flipped: bool,
    atr: f64,
}

impl SupertrendStrategy {
    fn run(&self, candles: &[Candle]) -> Option<SupertrendState> {
        let atr = atr_series(candles, self.atr_period);
        let first = self.atr_period.checked_sub(1)?;
        let seed_atr = atr.get(first).copied().flatten()?;

        let hl2 = |c: &Candle| (c.high + c.low) / 2.0;
        let mut state = SupertrendState {
            trend: Trend::Up,
            final_upper: hl2(&candles[first]) + self.multiplier * seed_atr,
            final_lower: hl2(&candles[first]) - self.multiplier * seed_atr,
            flipped: false,
            atr: seed_atr,
        };

        for i in (first + 1)..candles.len() {
            let current_atr = atr[i]?;
            let candle = &candles[i];
            let prev_close = candles[i - 1].close;
            let basic_upper = hl2(candle) + self.multiplier * current_atr;
            let basic_lower = hl2(candle) - self.multiplier * current_atr;

            let final_upper = if basic_upper < state.final_upper || prev_close > state.final_upper {
                basic_upper
            } else {
                state.final_upper
            };
            let final_lower = if basic_lower > state.final_lower || prev_close < state.final_lower {
                basic_lower
            } else {
                state.final_lower
            };

            let trend = match state.trend {
                Trend::Up if candle.close < state.final_lower => Trend::Down,
                Trend::Down if candle.close > state.final_upper => Trend::Up,
                unchanged => unchanged,
            };

            state = SupertrendState {
                flipped: trend != state.trend,
                trend,
                final_upper,
                final_lower,
                atr: current_atr,
            };
        }
        Some(state)
    }
}

impl TechnicalStrategy for SupertrendStrategy {
    fn name(&self) -> &'static str {
        names::SUPERTREND
    }

    fn min_candles(&self) -> usize {
        self.atr_period + 2
    }

    fn evaluate(&self, candles: &[Candle]) -> Signal {
        if candles.len() < self.min_candles() || self.atr_period == 0 {
            return Signal::neutral();
        }
        let Some(state) = self.run(candles) else {
            return Signal::neutral();
        };
        if state.atr <= 0.0 {
            return Signal::neutral();
        }

        let close = candles[candles.len() - 1].close;
        let (direction, line) = match state.trend {
            Trend::Up => (SignalDirection::Buy, state.final_lower),
            Trend::Down => (SignalDirection::Sell, state.final_upper),
        };
        let distance = (close - line).abs();
        if distance == 0.0 {
            return Signal::neutral();
        }

        let atr_multiple = distance / state.atr;
        let strength = if state.flipped {
            self.flip_strength + (atr_multiple * 10.0).min(25.0)
        } else {
            (atr_multiple * 20.0).min(50.0)
        };

        Signal::new(direction, strength)
            .with_meta("supertrend", line)
            .with_meta("flipped", if state.flipped { 1.0 } else { 0.0 })
    }
}
