use crate::domain::ports::{Notifier, TradeEvent};
use async_trait::async_trait;
use tracing::{info, warn};

/// Writes trade events to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &TradeEvent) -> anyhow::Result<()> {
        match event {
            TradeEvent::PositionOpened(trade) => info!(
                "Notifier [{}]: opened {} {} @ {} ({})",
                trade.symbol, trade.side, trade.size, trade.entry_price, trade.strategy
            ),
            TradeEvent::PositionClosed(trade) => info!(
                "Notifier [{}]: closed {} P&L {} ({}%) reason={}",
                trade.symbol,
                trade.side,
                trade.profit_loss,
                trade.profit_loss_percent.round_dp(2),
                trade
                    .exit_reason
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "-".to_string())
            ),
            TradeEvent::DailyReport(stats) => info!(
                "Notifier: daily report {} trades={} wins={} losses={} profit={}",
                stats.date, stats.trades, stats.wins, stats.losses, stats.profit
            ),
            TradeEvent::CycleFailed { symbol, error } => {
                warn!("Notifier [{}]: cycle failed: {}", symbol, error)
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trading::trader_state::DailyStats;

    #[tokio::test]
    async fn test_every_event_is_accepted() {
        let notifier = LogNotifier;
        let report = TradeEvent::DailyReport(DailyStats::default());
        assert!(notifier.notify(&report).await.is_ok());
        let failed = TradeEvent::CycleFailed {
            symbol: "BTC".to_string(),
            error: "timeout".to_string(),
        };
        assert!(notifier.notify(&failed).await.is_ok());
    }
}
