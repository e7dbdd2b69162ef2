use crate::domain::errors::EngineError;
use crate::domain::market::candle::Candle;
use crate::domain::market::macro_context::MacroModifiers;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::trading::position::TradeRecord;
use crate::domain::trading::trader_state::DailyStats;
use crate::domain::trading::types::{OrderAck, OrderRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[async_trait]
pub trait MarketDataService: Send + Sync {
    /// Most recent `limit` candles, ascending. Errors or short responses are `DataUnavailable`.
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, EngineError>;

    /// Latest traded price. Fails with `PriceUnavailable`.
    async fn get_current_price(&self, symbol: &str) -> Result<Decimal, EngineError>;
}

#[async_trait]
pub trait ExecutionService: Send + Sync {
    /// Fails with `OrderRejected`.
    async fn place_order(&self, order: OrderRequest) -> Result<OrderAck, EngineError>;
}

/// Events pushed to the notification collaborator.
#[derive(Debug, Clone)]
pub enum TradeEvent {
    PositionOpened(TradeRecord),
    PositionClosed(TradeRecord),
    DailyReport(DailyStats),
    CycleFailed { symbol: String, error: String },
}

/// Fire-and-forget delivery; failures are logged by the caller and never block a cycle.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &TradeEvent) -> anyhow::Result<()>;
}

/// Source of macro/regime modifiers. Absence of a provider is valid.
#[async_trait]
pub trait MacroSignalProvider: Send + Sync {
    async fn fetch_modifiers(&self) -> anyhow::Result<MacroModifiers>;
}

/// Wall-clock source; swapped for a manual clock in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
