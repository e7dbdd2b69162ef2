use serde::{Deserialize, Serialize};

use super::{TechnicalStrategy, names};
use crate::domain::market::candle::Candle;
use crate::domain::trading::signal::{Signal, SignalDirection};

/// Wilder's Parabolic SAR.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParabolicSarStrategy {
    pub af_start: f64,
    pub af_step: f64,
    pub af_max: f64,
    pub flip_strength: f64,
    pub trend_strength: f64,
}

impl Default for ParabolicSarStrategy {
    fn default() -> Self {
        Self {
            af_start: 0.02,
            af_step: 0.02,
            af_max: 0.2,
            flip_strength: 60.0,
            trend_strength: 20.0,
        }
    }
}

struct SarState {
    uptrend: bool,
    sar: f64,
    flipped: bool,
}

impl ParabolicSarStrategy {
    fn run(&self, candles: &[Candle]) -> SarState {
        let mut uptrend = candles[1].close >= candles[0].close;
        let (mut sar, mut extreme) = if uptrend {
            (candles[0].low, candles[0].high.max(candles[1].high))
        } else {
            (candles[0].high, candles[0].low.min(candles[1].low))
        };
        let mut af = self.af_start;
        let mut flipped = false;

        for i in 2..candles.len() {
            let bar = &candles[i];
            let mut next = sar + af * (extreme - sar);
            flipped = false;

            if uptrend {
                next = next.min(candles[i - 1].low).min(candles[i - 2].low);
                if bar.low < next {
                    uptrend = false;
                    flipped = true;
                    next = extreme;
                    extreme = bar.low;
                    af = self.af_start;
                } else if bar.high > extreme {
                    extreme = bar.high;
                    af = (af + self.af_step).min(self.af_max);
                }
            } else {
                next = next.max(candles[i - 1].high).max(candles[i - 2].high);
                if bar.high > next {
                    uptrend = true;
                    flipped = true;
                    next = extreme;
                    extreme = bar.high;
                    af = self.af_start;
                } else if bar.low < extreme {
                    extreme = bar.low;
                    af = (af + self.af_step).min(self.af_max);
                }
            }
            sar = next;
        }

        SarState {
            uptrend,
            sar,
            flipped,
        }
    }
}

impl TechnicalStrategy for ParabolicSarStrategy {
    fn name(&self) -> &'static str {
        names::PARABOLIC_SAR
    }

    fn min_candles(&self) -> usize {
        5
    }

    fn evaluate(&self, candles: &[Candle]) -> Signal {
        if candles.len() < self.min_candles() {
            return Signal::neutral();
        }

        let state = self.run(candles);
        let close = candles[candles.len() - 1].close;
        let distance = (close - state.sar).abs();
        if distance == 0.0 || close <= 0.0 {
            return Signal::neutral();
        }

        let direction = if state.uptrend {
            SignalDirection::Buy
        } else {
            SignalDirection::Sell
        };
        let base = if state.flipped {
            self.flip_strength
        } else {
            self.trend_strength
        };
        let distance_pct = distance / close * 100.0;
        let strength = base + (distance_pct / 2.0 * 40.0).min(40.0);

        Signal::new(direction, strength)
            .with_meta("sar", state.sar)
            .with_meta("flipped", if state.flipped { 1.0 } else { 0.0 })
    }
}
