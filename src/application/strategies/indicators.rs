//! Numeric building blocks shared by the strategy battery.
//!
//! Series helpers return one entry per input bar; entries before an
//! indicator's warm-up are `None`. EMA, true range and rate of change come
//! from `ta`; RSI, ATR and ADX use Wilder's `1/n` smoothing, which `ta`'s
//! EMA-based versions do not provide.

use ta::Next;
use ta::indicators::{ExponentialMovingAverage, RateOfChange, TrueRange};

use crate::domain::market::candle::Candle;

/// Gap, relative to price, below which two lines count as touching.
pub const CROSS_TOLERANCE: f64 = 1e-9;

pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// EMA seeded with the first value. Empty for a zero period.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let Ok(mut ema) = ExponentialMovingAverage::new(period) else {
        return Vec::new();
    };
    values.iter().map(|&value| ema.next(value)).collect()
}

/// Wilder RSI. First value at index `period`.
pub fn rsi_series(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = Some(rsi_from_averages(avg_gain, avg_loss));

    let n = period as f64;
    for i in (period + 1)..closes.len() {
        let change = closes[i] - closes[i - 1];
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };
        avg_gain = (avg_gain * (n - 1.0) + gain) / n;
        avg_loss = (avg_loss * (n - 1.0) + loss) / n;
        out[i] = Some(rsi_from_averages(avg_gain, avg_loss));
    }
    out
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

/// True range per bar; the first bar uses its own high-low span.
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    let mut tr = TrueRange::new();
    candles.iter().map(|c| tr.next(c)).collect()
}

/// Wilder ATR. First value at index `period - 1` (simple mean of the first TRs).
pub fn atr_series(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; candles.len()];
    if period == 0 || candles.len() < period {
        return out;
    }
    let tr = true_range(candles);
    let mut atr = tr[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(atr);
    let n = period as f64;
    for i in period..candles.len() {
        atr = (atr * (n - 1.0) + tr[i]) / n;
        out[i] = Some(atr);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalIndex {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

/// Incremental ADX using Wilder's smoothing.
///
/// Accumulates the first `period` TR/DM values as a plain sum, then applies
/// `smooth - smooth / n + value`. ADX starts as the first DX and is then
/// Wilder-averaged.
pub struct WilderAdx {
    period: usize,
    prev: Option<(f64, f64, f64)>,
    tr_sum: f64,
    plus_dm_sum: f64,
    minus_dm_sum: f64,
    tr_smooth: f64,
    plus_dm_smooth: f64,
    minus_dm_smooth: f64,
    adx_smooth: f64,
    count: usize,
}

impl WilderAdx {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev: None,
            tr_sum: 0.0,
            plus_dm_sum: 0.0,
            minus_dm_sum: 0.0,
            tr_smooth: 0.0,
            plus_dm_smooth: 0.0,
            minus_dm_smooth: 0.0,
            adx_smooth: 0.0,
            count: 0,
        }
    }

    pub fn next(&mut self, high: f64, low: f64, close: f64) -> Option<DirectionalIndex> {
        let Some((prev_high, prev_low, prev_close)) = self.prev.replace((high, low, close)) else {
            return None;
        };
        if self.period == 0 {
            return None;
        }

        let tr = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());
        let up_move = high - prev_high;
        let down_move = prev_low - low;
        let plus_dm = if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        };
        let minus_dm = if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        };

        self.count += 1;
        let n = self.period as f64;

        if self.count <= self.period {
            self.tr_sum += tr;
            self.plus_dm_sum += plus_dm;
            self.minus_dm_sum += minus_dm;
            if self.count < self.period {
                return None;
            }
            self.tr_smooth = self.tr_sum;
            self.plus_dm_smooth = self.plus_dm_sum;
            self.minus_dm_smooth = self.minus_dm_sum;
        } else {
            self.tr_smooth = self.tr_smooth - (self.tr_smooth / n) + tr;
            self.plus_dm_smooth = self.plus_dm_smooth - (self.plus_dm_smooth / n) + plus_dm;
            self.minus_dm_smooth = self.minus_dm_smooth - (self.minus_dm_smooth / n) + minus_dm;
        }

        // A zero-range window carries the previous ADX forward.
        if self.tr_smooth <= 0.0 {
            return Some(DirectionalIndex {
                adx: self.adx_smooth,
                plus_di: 0.0,
                minus_di: 0.0,
            });
        }

        let plus_di = 100.0 * self.plus_dm_smooth / self.tr_smooth;
        let minus_di = 100.0 * self.minus_dm_smooth / self.tr_smooth;
        let sum_di = plus_di + minus_di;
        let dx = if sum_di > 0.0 {
            100.0 * (plus_di - minus_di).abs() / sum_di
        } else {
            0.0
        };

        self.adx_smooth = if self.count == self.period {
            dx
        } else {
            (self.adx_smooth * (n - 1.0) + dx) / n
        };

        Some(DirectionalIndex {
            adx: self.adx_smooth,
            plus_di,
            minus_di,
        })
    }
}

pub fn highest_high(candles: &[Candle]) -> f64 {
    candles.iter().map(|c| c.high).fold(f64::MIN, f64::max)
}

pub fn lowest_low(candles: &[Candle]) -> f64 {
    candles.iter().map(|c| c.low).fold(f64::MAX, f64::min)
}

/// Percent change of the last value over `period` bars.
pub fn rate_of_change(values: &[f64], period: usize) -> Option<f64> {
    if values.len() <= period {
        return None;
    }
    let mut roc = RateOfChange::new(period).ok()?;
    let last = values.iter().fold(0.0, |_, &value| roc.next(value));
    last.is_finite().then_some(last)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::market::candle::Candle;
    use chrono::{Duration, TimeZone, Utc};

    /// Candles with `high = close + spread`, `low = close - spread`, open at previous close.
    pub fn candles_from_closes(closes: &[f64], spread: f64) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let open = if i == 0 { close } else { closes[i - 1] };
                Candle::new(
                    start + Duration::minutes(i as i64),
                    open,
                    close.max(open) + spread,
                    close.min(open) - spread,
                    close,
                )
            })
            .collect()
    }

    pub fn with_volume(candles: Vec<Candle>, volume: f64) -> Vec<Candle> {
        candles.into_iter().map(|c| c.with_volume(volume)).collect()
    }

    pub fn linear(start: f64, step: f64, len: usize) -> Vec<f64> {
        (0..len).map(|i| start + step * i as f64).collect()
    }
}
