#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use confluence::application::agents::analyst::Analyst;
use confluence::application::agents::trader_session::{TraderSession, TradingConfig};
use confluence::application::risk_management::position_manager::{PositionManager, RiskConfig};
use confluence::application::strategies::{
    SignalAggregator, StrategyBattery, TechnicalStrategy,
};
use confluence::domain::market::candle::Candle;
use confluence::domain::market::timeframe::Timeframe;
use confluence::domain::ports::{Notifier, TradeEvent};
use confluence::domain::trading::signal::Signal;
use confluence::domain::trading::trader_state::TraderState;
use confluence::domain::market::macro_context::MacroModifiers;
use confluence::infrastructure::mock::{
    ManualClock, MockExecutionService, MockMarketDataService, StaticMacroProvider,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};

pub const SCRIPTED: &str = "Scripted";

/// Strategy whose output the test sets directly. Alone in a battery, the
/// combined strength equals the scripted strength.
#[derive(Clone, Default)]
pub struct ScriptedStrategy {
    signal: Arc<Mutex<Signal>>,
}

impl ScriptedStrategy {
    pub fn set(&self, signal: Signal) {
        *self.signal.lock().unwrap() = signal;
    }
}

impl TechnicalStrategy for ScriptedStrategy {
    fn name(&self) -> &'static str {
        SCRIPTED
    }

    fn min_candles(&self) -> usize {
        1
    }

    fn evaluate(&self, _candles: &[Candle]) -> Signal {
        self.signal.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<TradeEvent>>,
}

impl RecordingNotifier {
    pub fn daily_reports(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, TradeEvent::DailyReport(_)))
            .count()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &TradeEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
}

/// One hourly candle.
pub fn bar(hour: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle::new(start_time() + Duration::hours(hour), open, high, low, close)
}

/// Candles from closes: open is the previous close, no wicks.
pub fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
    let mut previous = closes.first().copied().unwrap_or_default();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = previous;
            previous = close;
            bar(i as i64, open, open.max(close), open.min(close), close)
        })
        .collect()
}

pub struct Harness {
    pub session: TraderSession,
    pub strategy: ScriptedStrategy,
    pub market: Arc<MockMarketDataService>,
    pub execution: Arc<MockExecutionService>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub trading: TradingConfig,
}

impl Harness {
    pub async fn new(symbols: &[&str]) -> Self {
        Self::with_risk(symbols, RiskConfig::default()).await
    }

    pub async fn with_risk(symbols: &[&str], risk: RiskConfig) -> Self {
        Self::build(symbols, risk, None).await
    }

    pub async fn with_macro(symbols: &[&str], modifiers: MacroModifiers) -> Self {
        Self::build(symbols, RiskConfig::default(), Some(modifiers)).await
    }

    async fn build(symbols: &[&str], risk: RiskConfig, modifiers: Option<MacroModifiers>) -> Self {
        let strategy = ScriptedStrategy::default();
        let market = Arc::new(MockMarketDataService::new());
        let execution = Arc::new(MockExecutionService::new());
        let clock = Arc::new(ManualClock::new(start_time()));
        let notifier = Arc::new(RecordingNotifier::default());

        for symbol in symbols {
            market.set_closes(symbol, &[100.0; 30]).await;
            market.set_price(symbol, dec!(100)).await;
        }

        let battery = StrategyBattery::new(vec![Arc::new(strategy.clone())]);
        let mut analyst = Analyst::new(market.clone(), battery, SignalAggregator::default());
        if let Some(modifiers) = modifiers {
            analyst = analyst.with_macro_provider(Arc::new(StaticMacroProvider::new(modifiers)));
        }
        let session = TraderSession::new(
            analyst,
            market.clone(),
            execution.clone(),
            PositionManager::new(risk),
            TraderState::new(dec!(10000), start_time().date_naive()),
        )
        .with_clock(clock.clone())
        .with_notifier(notifier.clone());

        let trading = TradingConfig {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            timeframe: Timeframe::OneHour,
            candle_limit: 50,
        };

        Self {
            session,
            strategy,
            market,
            execution,
            clock,
            notifier,
            trading,
        }
    }

    pub async fn set_price(&self, symbol: &str, price: Decimal) {
        self.market.set_price(symbol, price).await;
    }

    /// Wait for spawned notifications to land.
    pub async fn settle(&self) {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}
