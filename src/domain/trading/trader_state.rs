use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::errors::EngineError;
use crate::domain::trading::position::{Position, TradeRecord};
use crate::domain::trading::types::ExitReason;

/// Per-calendar-day trade counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub trades: u32,
    pub wins: u32,
    pub losses: u32,
    pub profit: Decimal,
}

impl DailyStats {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            trades: 0,
            wins: 0,
            losses: 0,
            profit: Decimal::ZERO,
        }
    }

    fn record(&mut self, trade: &TradeRecord) {
        self.trades += 1;
        if trade.is_win() {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
        self.profit += trade.profit_loss;
    }
}

impl Default for DailyStats {
    fn default() -> Self {
        Self::new(Utc::now().date_naive())
    }
}

/// Outcome of archiving a position.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub record: TradeRecord,
    /// Previous day's stats when this close rolled the calendar day.
    pub flushed_stats: Option<DailyStats>,
}

/// Session-wide trading state: open positions, history, balance and daily stats.
///
/// Mutated only by the trader session, under its write lock. Every method
/// that changes more than one field does so without intermediate failure
/// points, so a caller either sees the whole transition or none of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraderState {
    pub open_positions: HashMap<String, Position>,
    pub trade_history: Vec<TradeRecord>,
    pub current_balance: Decimal,
    pub start_balance: Decimal,
    pub daily_stats: DailyStats,
}

impl Default for TraderState {
    fn default() -> Self {
        Self::new(Decimal::ZERO, Utc::now().date_naive())
    }
}

impl TraderState {
    pub fn new(start_balance: Decimal, today: NaiveDate) -> Self {
        Self {
            open_positions: HashMap::new(),
            trade_history: Vec::new(),
            current_balance: start_balance,
            start_balance,
            daily_stats: DailyStats::new(today),
        }
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.open_positions.get(symbol)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.open_positions.contains_key(symbol)
    }

    /// Register a new position. A second position for the same symbol is a contract failure.
    pub fn open_position(&mut self, position: Position) -> Result<(), EngineError> {
        if let Some(existing) = self.open_positions.get(&position.symbol) {
            return Err(EngineError::InvariantViolation(format!(
                "second open position for {} (existing {}, attempted {})",
                position.symbol, existing.id, position.id
            )));
        }
        self.open_positions.insert(position.symbol.clone(), position);
        Ok(())
    }

    /// Archive the open position `position_id` of `symbol`.
    ///
    /// Removal, history append, balance and daily stats change together.
    pub fn close_position(
        &mut self,
        symbol: &str,
        position_id: &str,
        exit_price: Decimal,
        exit_time: DateTime<Utc>,
        reason: ExitReason,
    ) -> Result<ClosedTrade, EngineError> {
        match self.open_positions.get(symbol) {
            Some(existing) if existing.id == position_id => {}
            Some(existing) => {
                return Err(EngineError::InvariantViolation(format!(
                    "close of {} targeted position {} but {} is open",
                    symbol, position_id, existing.id
                )));
            }
            None => {
                return Err(EngineError::InvariantViolation(format!(
                    "close of {} requested but no position is open",
                    symbol
                )));
            }
        }

        let flushed_stats = self.roll_daily_stats(exit_time.date_naive());
        let position = self
            .open_positions
            .remove(symbol)
            .ok_or_else(|| EngineError::InvariantViolation(format!("{} vanished", symbol)))?;
        let record = position.close(exit_price, exit_time, reason);

        self.current_balance += record.profit_loss;
        self.daily_stats.record(&record);
        self.trade_history.push(record.clone());

        Ok(ClosedTrade {
            record,
            flushed_stats,
        })
    }

    /// Start a new stats day when `today` is past the tracked date.
    ///
    /// Returns the finished day's stats exactly once per transition.
    pub fn roll_daily_stats(&mut self, today: NaiveDate) -> Option<DailyStats> {
        if today <= self.daily_stats.date {
            return None;
        }
        Some(std::mem::replace(
            &mut self.daily_stats,
            DailyStats::new(today),
        ))
    }

    /// Closed-trade win rate for `strategy`: `(rate, sample_size)`.
    pub fn strategy_win_rate(&self, strategy: &str) -> Option<(f64, usize)> {
        let (wins, total) = self
            .trade_history
            .iter()
            .filter(|t| t.strategy == strategy)
            .fold((0usize, 0usize), |(wins, total), t| {
                (wins + usize::from(t.is_win()), total + 1)
            });
        if total == 0 {
            return None;
        }
        Some((wins as f64 / total as f64, total))
    }

    /// Back to a fresh session at the original starting balance.
    pub fn reset(&mut self, today: NaiveDate) {
        *self = Self::new(self.start_balance, today);
    }
}
