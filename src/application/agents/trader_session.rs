use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::analyst::Analyst;
use crate::application::risk_management::position_manager::{
    EntryDecision, ExitInput, PositionManager,
};
use crate::domain::errors::EngineError;
use crate::domain::market::candle::Candle;
use crate::domain::market::macro_context::MacroModifiers;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::{
    Clock, ExecutionService, MarketDataService, Notifier, SystemClock, TradeEvent,
};
use crate::domain::trading::position::TradeRecord;
use crate::domain::trading::signal::NamedSignalSet;
use crate::domain::trading::trader_state::TraderState;
use crate::domain::trading::types::{OrderRequest, OrderType, TradeStatus};
use crate::infrastructure::observability::Metrics;

/// What a tick trades and on which candles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub symbols: Vec<String>,
    pub timeframe: Timeframe,
    pub candle_limit: usize,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["BTC/USDT".to_string()],
            timeframe: Timeframe::OneHour,
            candle_limit: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolError {
    pub symbol: String,
    pub error: EngineError,
}

/// Outcome of one tick over all symbols.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Opened and closed trade records, in per-symbol order.
    pub new_trades: Vec<TradeRecord>,
    pub errors: Vec<SymbolError>,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn closed_trades(&self) -> impl Iterator<Item = &TradeRecord> {
        self.new_trades
            .iter()
            .filter(|t| t.status == TradeStatus::Closed)
    }
}

/// Drives the analyst and position manager over a set of symbols and owns
/// the session's [`TraderState`].
pub struct TraderSession {
    analyst: Analyst,
    market_data: Arc<dyn MarketDataService>,
    execution: Arc<dyn ExecutionService>,
    position_manager: PositionManager,
    state: RwLock<TraderState>,
    symbol_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    notifier: Option<Arc<dyn Notifier>>,
    metrics: Option<Metrics>,
    clock: Arc<dyn Clock>,
    call_timeout: Duration,
}

impl TraderSession {
    pub fn new(
        analyst: Analyst,
        market_data: Arc<dyn MarketDataService>,
        execution: Arc<dyn ExecutionService>,
        position_manager: PositionManager,
        initial_state: TraderState,
    ) -> Self {
        Self {
            analyst,
            market_data,
            execution,
            position_manager,
            state: RwLock::new(initial_state),
            symbol_locks: Mutex::new(HashMap::new()),
            notifier: None,
            metrics: None,
            clock: Arc::new(SystemClock),
            call_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn analyst(&self) -> &Analyst {
        &self.analyst
    }

    /// Snapshot of the current state.
    pub async fn get_state(&self) -> TraderState {
        self.state.read().await.clone()
    }

    /// Drop positions, history and stats; keep the starting balance.
    pub async fn reset_state(&self) {
        let today = self.clock.now().date_naive();
        let mut state = self.state.write().await;
        state.reset(today);
        info!("TraderSession: state reset (balance {})", state.current_balance);
    }

    /// Run one cycle for every configured symbol.
    ///
    /// Never fails: per-symbol errors are collected in the report and the
    /// remaining symbols complete.
    pub async fn tick(&self, config: &TradingConfig) -> TickReport {
        self.roll_daily_stats().await;

        let modifiers = self.analyst.fetch_modifiers().await;
        if let (Some(metrics), Some(fear)) = (
            &self.metrics,
            modifiers.as_ref().and_then(|m| m.fear_index),
        ) {
            metrics.fear_index.set(f64::from(fear));
        }

        let cycles = config
            .symbols
            .iter()
            .map(|symbol| self.run_symbol(symbol, config, modifiers.as_ref()));
        let results = join_all(cycles).await;

        let mut report = TickReport::default();
        for (symbol, result) in config.symbols.iter().zip(results) {
            match result {
                Ok(trades) => report.new_trades.extend(trades),
                Err(e) => {
                    if e.is_invariant_violation() {
                        error!("TraderSession [{}]: {}", symbol, e);
                    } else {
                        warn!("TraderSession [{}]: cycle failed: {}", symbol, e);
                    }
                    if let Some(metrics) = &self.metrics {
                        metrics.inc_cycle_errors(e.kind());
                    }
                    self.notify(TradeEvent::CycleFailed {
                        symbol: symbol.clone(),
                        error: e.to_string(),
                    });
                    report.errors.push(SymbolError {
                        symbol: symbol.clone(),
                        error: e,
                    });
                }
            }
        }

        self.publish_gauges().await;
        debug!(
            "TraderSession: tick done ({} trades, {} errors)",
            report.new_trades.len(),
            report.errors.len()
        );
        report
    }

    async fn roll_daily_stats(&self) {
        let today = self.clock.now().date_naive();
        let flushed = self.state.write().await.roll_daily_stats(today);
        if let Some(stats) = flushed {
            info!(
                "TraderSession: day {} closed with {} trades, P&L {}",
                stats.date, stats.trades, stats.profit
            );
            self.notify(TradeEvent::DailyReport(stats));
        }
    }

    async fn symbol_lock(&self, symbol: &str) -> Arc<Mutex<()>> {
        let mut locks = self.symbol_locks.lock().await;
        locks
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn run_symbol(
        &self,
        symbol: &str,
        config: &TradingConfig,
        modifiers: Option<&MacroModifiers>,
    ) -> Result<Vec<TradeRecord>, EngineError> {
        let lock = self.symbol_lock(symbol).await;
        let _guard = lock.lock().await;

        let evaluation = self
            .analyst
            .analyze(symbol, config.timeframe, config.candle_limit, modifiers)
            .await?;
        self.count_signals(&evaluation.signals);

        let price = self
            .guarded(
                format!("get_current_price({})", symbol),
                self.market_data.get_current_price(symbol),
            )
            .await?;
        let combined = &evaluation.combined;

        let open = self.state.read().await.position(symbol).cloned();
        if let Some(position) = open {
            let input = exit_input(evaluation.last_candle(), position.entry_time, price);
            let Some(exit) = self
                .position_manager
                .evaluate_exit(&position, combined, &input)
            else {
                return Ok(Vec::new());
            };

            let order = OrderRequest {
                symbol: symbol.to_string(),
                side: position.side.exit_order_side(),
                order_type: OrderType::Market,
                quantity: position.size,
                price: exit.exit_price,
            };
            self.place(order).await?;

            let exit_time = self.clock.now();
            let closed = self.state.write().await.close_position(
                symbol,
                &position.id,
                exit.exit_price,
                exit_time,
                exit.reason,
            )?;

            info!(
                "TraderSession [{}]: closed {} on {} at {} (P&L {} / {}%)",
                symbol,
                closed.record.side,
                exit.reason,
                exit.exit_price,
                closed.record.profit_loss,
                closed.record.profit_loss_percent.round_dp(2)
            );
            if let Some(metrics) = &self.metrics {
                let outcome = if closed.record.is_win() { "win" } else { "loss" };
                metrics.inc_trades(&closed.record.side.to_string(), outcome);
            }
            if let Some(stats) = closed.flushed_stats {
                self.notify(TradeEvent::DailyReport(stats));
            }
            self.notify(TradeEvent::PositionClosed(closed.record.clone()));
            // No re-entry in the cycle that closed the position.
            return Ok(vec![closed.record]);
        }

        let macro_risk = modifiers.map(|m| m.risk_level()).unwrap_or_default();
        let decision = {
            let state = self.state.read().await;
            self.position_manager
                .evaluate_entry(symbol, combined, macro_risk, &state, price)
        };
        let plan = match decision {
            EntryDecision::Enter(plan) => plan,
            EntryDecision::Skip(reason) => {
                debug!("TraderSession [{}]: no entry ({:?})", symbol, reason);
                return Ok(Vec::new());
            }
        };

        self.place(plan.order_request(symbol)).await?;

        let position = plan.into_position(
            symbol,
            uuid::Uuid::new_v4().to_string(),
            self.clock.now(),
        );
        let record = position.to_open_record();
        self.state.write().await.open_position(position)?;

        info!(
            "TraderSession [{}]: opened {} {} @ {} via {}",
            symbol, record.side, record.size, record.entry_price, record.strategy
        );
        self.notify(TradeEvent::PositionOpened(record.clone()));
        Ok(vec![record])
    }

    async fn place(&self, order: OrderRequest) -> Result<(), EngineError> {
        let side = order.side.to_string();
        let operation = format!("place_order({})", order.symbol);
        let result = self
            .guarded(operation, self.execution.place_order(order))
            .await;
        if let Some(metrics) = &self.metrics {
            let status = if result.is_ok() { "filled" } else { "rejected" };
            metrics.inc_orders(&side, status);
        }
        let ack = result?;
        debug!("TraderSession: order {} acknowledged", ack.order_id);
        Ok(())
    }

    /// Bound an external call by the session timeout.
    async fn guarded<T, F>(&self, operation: String, call: F) -> Result<T, EngineError>
    where
        F: Future<Output = Result<T, EngineError>>,
    {
        match timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout {
                operation,
                duration_ms: self.call_timeout.as_millis() as u64,
            }),
        }
    }

    fn count_signals(&self, signals: &NamedSignalSet) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        for (name, signal) in signals.iter().filter(|(_, s)| !s.is_neutral()) {
            metrics.inc_signals(name, &signal.direction().to_string());
        }
    }

    async fn publish_gauges(&self) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        let state = self.state.read().await;
        metrics
            .balance
            .set(state.current_balance.to_f64().unwrap_or(0.0));
        metrics.open_positions.set(state.open_positions.len() as f64);
        metrics
            .daily_pnl
            .set(state.daily_stats.profit.to_f64().unwrap_or(0.0));
    }

    fn notify(&self, event: TradeEvent) {
        let Some(notifier) = self.notifier.clone() else {
            return;
        };
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&event).await {
                warn!("TraderSession: notification failed: {:#}", e);
            }
        });
    }
}

/// Exit inputs from the latest bar, widened to include the live price.
///
/// Only a bar that opened after entry counts; its extremes could not have
/// touched a position that did not exist yet.
fn exit_input(bar: Option<&Candle>, entry_time: DateTime<Utc>, price: Decimal) -> ExitInput {
    let (high, low) = bar
        .filter(|c| c.time > entry_time)
        .and_then(|c| Some((Decimal::from_f64(c.high)?, Decimal::from_f64(c.low)?)))
        .unwrap_or((price, price));
    ExitInput {
        close: price,
        bar_high: high.max(price),
        bar_low: low.min(price),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn entry_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn bar_at(hours_after_entry: i64, high: f64, low: f64) -> Candle {
        Candle::new(
            entry_time() + chrono::Duration::hours(hours_after_entry),
            100.0,
            high,
            low,
            100.0,
        )
    }

    #[test]
    fn test_exit_input_includes_live_price() {
        let bar = bar_at(1, 105.0, 98.0);
        let input = exit_input(Some(&bar), entry_time(), dec!(110));
        assert_eq!(input.close, dec!(110));
        assert_eq!(input.bar_high, dec!(110));
        assert_eq!(input.bar_low, dec!(98));
    }

    #[test]
    fn test_exit_input_without_bar_uses_price() {
        let input = exit_input(None, entry_time(), dec!(50));
        assert_eq!(input.bar_high, dec!(50));
        assert_eq!(input.bar_low, dec!(50));
    }

    #[test]
    fn test_exit_input_ignores_bars_up_to_entry() {
        for hours in [-1, 0] {
            let bar = bar_at(hours, 101.0, 95.0);
            let input = exit_input(Some(&bar), entry_time(), dec!(100));
            assert_eq!(input.bar_high, dec!(100));
            assert_eq!(input.bar_low, dec!(100));
        }
    }

    #[test]
    fn test_report_filters_closed_trades() {
        let report = TickReport::default();
        assert!(report.is_clean());
        assert_eq!(report.closed_trades().count(), 0);
    }
}
