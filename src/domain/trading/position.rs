use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::trading::types::{ExitReason, Side, TradeStatus};

/// An open, unrealized trade. At most one exists per symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Identifier shared with the trade record this position turns into.
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub entry_price: Decimal,
    pub entry_time: DateTime<Utc>,
    pub size: Decimal,
    /// Strategy credited with the entry (side is carried separately in `side`).
    pub strategy_label: String,
    pub stop_loss_price: Option<Decimal>,
    pub take_profit_price: Option<Decimal>,
}

impl Position {
    /// Directional return in percent: long `(exit - entry) / entry`, short `(entry - exit) / entry`.
    pub fn profit_loss_percent(&self, exit_price: Decimal) -> Decimal {
        if self.entry_price.is_zero() {
            return Decimal::ZERO;
        }
        let move_amount = match self.side {
            Side::Long => exit_price - self.entry_price,
            Side::Short => self.entry_price - exit_price,
        };
        move_amount * Decimal::ONE_HUNDRED / self.entry_price
    }

    pub fn profit_loss(&self, exit_price: Decimal) -> Decimal {
        match self.side {
            Side::Long => (exit_price - self.entry_price) * self.size,
            Side::Short => (self.entry_price - exit_price) * self.size,
        }
    }

    /// Record emitted when the position is opened.
    pub fn to_open_record(&self) -> TradeRecord {
        TradeRecord {
            id: self.id.clone(),
            symbol: self.symbol.clone(),
            side: self.side,
            entry_price: self.entry_price,
            exit_price: None,
            size: self.size,
            entry_time: self.entry_time,
            exit_time: None,
            profit_loss: Decimal::ZERO,
            profit_loss_percent: Decimal::ZERO,
            strategy: self.strategy_label.clone(),
            exit_reason: None,
            status: TradeStatus::Open,
        }
    }

    /// Consume the position into its immutable closed record.
    pub fn close(
        self,
        exit_price: Decimal,
        exit_time: DateTime<Utc>,
        reason: ExitReason,
    ) -> TradeRecord {
        let profit_loss = self.profit_loss(exit_price);
        let profit_loss_percent = self.profit_loss_percent(exit_price);
        TradeRecord {
            id: self.id,
            symbol: self.symbol,
            side: self.side,
            entry_price: self.entry_price,
            exit_price: Some(exit_price),
            size: self.size,
            entry_time: self.entry_time,
            exit_time: Some(exit_time),
            profit_loss,
            profit_loss_percent,
            strategy: self.strategy_label,
            exit_reason: Some(reason),
            status: TradeStatus::Closed,
        }
    }
}

/// Trade outcome. Closed records are append-only history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub entry_price: Decimal,
    pub exit_price: Option<Decimal>,
    pub size: Decimal,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub profit_loss: Decimal,
    pub profit_loss_percent: Decimal,
    pub strategy: String,
    #[serde(default)]
    pub exit_reason: Option<ExitReason>,
    pub status: TradeStatus,
}

impl TradeRecord {
    pub fn is_win(&self) -> bool {
        self.status == TradeStatus::Closed && self.profit_loss > Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(side: Side, entry: Decimal) -> Position {
        Position {
            id: "t-1".to_string(),
            symbol: "ETH/USDT".to_string(),
            side,
            entry_price: entry,
            entry_time: Utc::now(),
            size: dec!(2),
            strategy_label: "EMA Crossover".to_string(),
            stop_loss_price: None,
            take_profit_price: None,
        }
    }

    #[test]
    fn test_long_profit_percent_is_exact() {
        let record = position(Side::Long, dec!(100)).close(
            dec!(110),
            Utc::now(),
            ExitReason::TakeProfit,
        );
        assert_eq!(record.profit_loss_percent, dec!(10));
        assert_eq!(record.profit_loss, dec!(20));
        assert_eq!(record.status, TradeStatus::Closed);
        assert!(record.is_win());
    }

    #[test]
    fn test_short_profit_percent_is_exact() {
        let record = position(Side::Short, dec!(100)).close(
            dec!(90),
            Utc::now(),
            ExitReason::OpposingSignal,
        );
        assert_eq!(record.profit_loss_percent, dec!(10));
        assert_eq!(record.profit_loss, dec!(20));
    }

    #[test]
    fn test_short_loss() {
        let record =
            position(Side::Short, dec!(100)).close(dec!(105), Utc::now(), ExitReason::StopLoss);
        assert_eq!(record.profit_loss_percent, dec!(-5));
        assert!(!record.is_win());
    }

    #[test]
    fn test_open_record_has_no_exit() {
        let record = position(Side::Long, dec!(100)).to_open_record();
        assert_eq!(record.status, TradeStatus::Open);
        assert!(record.exit_price.is_none());
        assert!(!record.is_win());
    }
}
