use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::application::strategies::{SignalAggregator, StrategyBattery};
use crate::domain::errors::EngineError;
use crate::domain::market::candle::Candle;
use crate::domain::market::macro_context::MacroModifiers;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::{MacroSignalProvider, MarketDataService};
use crate::domain::trading::signal::{CombinedSignal, NamedSignalSet};

/// Everything produced by one analysis pass over a symbol.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub candles: Vec<Candle>,
    pub signals: NamedSignalSet,
    pub combined: CombinedSignal,
}

impl Evaluation {
    pub fn last_candle(&self) -> Option<&Candle> {
        self.candles.last()
    }
}

/// Fetches candles, runs the strategy battery and aggregates the result.
pub struct Analyst {
    market_data: Arc<dyn MarketDataService>,
    macro_provider: Option<Arc<dyn MacroSignalProvider>>,
    battery: StrategyBattery,
    aggregator: SignalAggregator,
    candle_limit: usize,
    call_timeout: Duration,
}

impl Analyst {
    pub fn new(
        market_data: Arc<dyn MarketDataService>,
        battery: StrategyBattery,
        aggregator: SignalAggregator,
    ) -> Self {
        Self {
            market_data,
            macro_provider: None,
            battery,
            aggregator,
            candle_limit: 200,
            call_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_macro_provider(mut self, provider: Arc<dyn MacroSignalProvider>) -> Self {
        self.macro_provider = Some(provider);
        self
    }

    pub fn with_candle_limit(mut self, limit: usize) -> Self {
        self.candle_limit = limit;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn battery(&self) -> &StrategyBattery {
        &self.battery
    }

    /// Combined decision for `symbol` on `timeframe`.
    pub async fn evaluate(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<CombinedSignal, EngineError> {
        let modifiers = self.fetch_modifiers().await;
        let evaluation = self
            .analyze(symbol, timeframe, self.candle_limit, modifiers.as_ref())
            .await?;
        Ok(evaluation.combined)
    }

    /// Full analysis with caller-supplied macro modifiers.
    pub async fn analyze(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
        modifiers: Option<&MacroModifiers>,
    ) -> Result<Evaluation, EngineError> {
        let candles = timeout(
            self.call_timeout,
            self.market_data.fetch_candles(symbol, timeframe, limit),
        )
        .await
        .map_err(|_| EngineError::Timeout {
            operation: format!("fetch_candles({})", symbol),
            duration_ms: self.call_timeout.as_millis() as u64,
        })??;

        if candles.is_empty() {
            return Err(EngineError::data_unavailable(symbol, "no candles returned"));
        }
        if candles.len() < self.battery.max_min_candles() {
            debug!(
                "Analyst [{}]: only {} candles, some strategies will stay neutral",
                symbol,
                candles.len()
            );
        }

        let signals = self.battery.evaluate(&candles);
        let combined = self.aggregator.combine(&signals, modifiers);

        info!(
            "Analyst [{}]: {} strength={:.1} (buy={:.1}, sell={:.1}, dominant={})",
            symbol,
            combined.direction,
            combined.strength,
            combined.buy_score,
            combined.sell_score,
            combined.dominant_strategy.as_deref().unwrap_or("-")
        );

        Ok(Evaluation {
            candles,
            signals,
            combined,
        })
    }

    /// Current macro modifiers. Provider failures degrade to `None`.
    pub async fn fetch_modifiers(&self) -> Option<MacroModifiers> {
        let provider = self.macro_provider.as_ref()?;
        match timeout(self.call_timeout, provider.fetch_modifiers()).await {
            Ok(Ok(modifiers)) => Some(modifiers),
            Ok(Err(e)) => {
                warn!("Analyst: macro provider failed, continuing without modifiers: {:#}", e);
                None
            }
            Err(_) => {
                warn!(
                    "Analyst: macro provider timed out after {}ms",
                    self.call_timeout.as_millis()
                );
                None
            }
        }
    }
}
