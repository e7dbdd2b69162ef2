use crate::domain::errors::EngineError;
use crate::domain::market::candle::Candle;
use crate::domain::market::macro_context::MacroModifiers;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::{Clock, ExecutionService, MacroSignalProvider, MarketDataService};
use crate::domain::trading::types::{OrderAck, OrderRequest};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Seeded random-walk candle generator for headless runs.
struct RandomWalk {
    rng: StdRng,
    volatility: f64,
    timeframe: Timeframe,
}

impl RandomWalk {
    fn base_price(symbol: &str) -> f64 {
        if symbol.contains("BTC") {
            96000.0
        } else if symbol.contains("ETH") {
            3400.0
        } else if symbol.contains("AVAX") {
            40.0
        } else {
            150.0
        }
    }

    fn next_candle(&mut self, previous: Option<&Candle>, symbol: &str) -> Candle {
        let (open, time) = match previous {
            Some(c) => (c.close, c.time + self.timeframe.duration()),
            None => (
                Self::base_price(symbol),
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
                    .single()
                    .unwrap_or_default(),
            ),
        };
        let change = self.rng.random_range(-1.0..1.0) * self.volatility;
        let close = (open * (1.0 + change)).max(0.01);
        let wick = open * self.volatility * self.rng.random_range(0.0..0.5);
        let volume = self.rng.random_range(500.0..1500.0);
        Candle::new(time, open, open.max(close) + wick, open.min(close) - wick, close)
            .with_volume(volume)
    }
}

/// Scripted market data with per-symbol failure injection.
///
/// Symbols without scripted candles are served from a seeded random walk
/// when one is configured; each fetch then appends one fresh candle.
#[derive(Clone, Default)]
pub struct MockMarketDataService {
    candles: Arc<RwLock<HashMap<String, Vec<Candle>>>>,
    prices: Arc<RwLock<HashMap<String, Decimal>>>,
    failing_candles: Arc<RwLock<HashSet<String>>>,
    failing_prices: Arc<RwLock<HashSet<String>>>,
    random_walk: Option<Arc<RwLock<RandomWalk>>>,
}

impl MockMarketDataService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Random-walk feed, reproducible for a given `seed`.
    pub fn with_random_walk(seed: u64, volatility: f64, timeframe: Timeframe) -> Self {
        Self {
            random_walk: Some(Arc::new(RwLock::new(RandomWalk {
                rng: StdRng::seed_from_u64(seed),
                volatility,
                timeframe,
            }))),
            ..Self::default()
        }
    }

    pub async fn set_candles(&self, symbol: &str, candles: Vec<Candle>) {
        self.candles.write().await.insert(symbol.to_string(), candles);
    }

    /// Hourly candles from closes: open is the previous close, wicks 0.5 beyond the body.
    pub async fn set_closes(&self, symbol: &str, closes: &[f64]) {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default();
        let mut previous = closes.first().copied().unwrap_or_default();
        let candles = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let open = previous;
                previous = close;
                Candle::new(
                    start + Duration::hours(i as i64),
                    open,
                    open.max(close) + 0.5,
                    open.min(close) - 0.5,
                    close,
                )
                .with_volume(1000.0)
            })
            .collect();
        self.set_candles(symbol, candles).await;
    }

    pub async fn push_candle(&self, symbol: &str, candle: Candle) {
        self.candles
            .write()
            .await
            .entry(symbol.to_string())
            .or_default()
            .push(candle);
    }

    /// Overrides the last-close price for `symbol`.
    pub async fn set_price(&self, symbol: &str, price: Decimal) {
        self.prices.write().await.insert(symbol.to_string(), price);
    }

    pub async fn fail_candles(&self, symbol: &str) {
        self.failing_candles.write().await.insert(symbol.to_string());
    }

    pub async fn fail_price(&self, symbol: &str) {
        self.failing_prices.write().await.insert(symbol.to_string());
    }

    pub async fn clear_failures(&self) {
        self.failing_candles.write().await.clear();
        self.failing_prices.write().await.clear();
    }

    async fn advance_walk(&self, symbol: &str, limit: usize) {
        let Some(walk) = &self.random_walk else {
            return;
        };
        let mut walk = walk.write().await;
        let mut candles = self.candles.write().await;
        let series = candles.entry(symbol.to_string()).or_default();
        let target = if series.is_empty() { limit.max(1) } else { series.len() + 1 };
        while series.len() < target {
            let next = walk.next_candle(series.last(), symbol);
            series.push(next);
        }
    }
}

#[async_trait]
impl MarketDataService for MockMarketDataService {
    async fn fetch_candles(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, EngineError> {
        if self.failing_candles.read().await.contains(symbol) {
            return Err(EngineError::data_unavailable(symbol, "injected failure"));
        }
        self.advance_walk(symbol, limit).await;

        let candles = self.candles.read().await;
        let series = candles
            .get(symbol)
            .ok_or_else(|| EngineError::data_unavailable(symbol, "unknown symbol"))?;
        let start = series.len().saturating_sub(limit);
        debug!(
            "MockMarketDataService [{}]: serving {} candles",
            symbol,
            series.len() - start
        );
        Ok(series[start..].to_vec())
    }

    async fn get_current_price(&self, symbol: &str) -> Result<Decimal, EngineError> {
        if self.failing_prices.read().await.contains(symbol) {
            return Err(EngineError::price_unavailable(symbol, "injected failure"));
        }
        if let Some(price) = self.prices.read().await.get(symbol) {
            return Ok(*price);
        }
        let candles = self.candles.read().await;
        candles
            .get(symbol)
            .and_then(|series| series.last())
            .and_then(|c| Decimal::from_f64(c.close))
            .map(|p| p.round_dp(8))
            .ok_or_else(|| EngineError::price_unavailable(symbol, "no price"))
    }
}

/// Records orders and acknowledges them with fresh ids unless told to reject.
#[derive(Clone, Default)]
pub struct MockExecutionService {
    orders: Arc<RwLock<Vec<OrderRequest>>>,
    reject: Arc<AtomicBool>,
}

impl MockExecutionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub async fn orders(&self) -> Vec<OrderRequest> {
        self.orders.read().await.clone()
    }
}

#[async_trait]
impl ExecutionService for MockExecutionService {
    async fn place_order(&self, order: OrderRequest) -> Result<OrderAck, EngineError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(EngineError::order_rejected(&order.symbol, "rejected by mock"));
        }
        let order_id = uuid::Uuid::new_v4().to_string();
        info!(
            "MockExecution: {} {} {} @ {} -> {}",
            order.side, order.quantity, order.symbol, order.price, order_id
        );
        self.orders.write().await.push(order);
        Ok(OrderAck { order_id })
    }
}

/// Deterministic macro provider.
#[derive(Default)]
pub struct StaticMacroProvider {
    modifiers: RwLock<MacroModifiers>,
    fail: AtomicBool,
}

impl StaticMacroProvider {
    pub fn new(modifiers: MacroModifiers) -> Self {
        Self {
            modifiers: RwLock::new(modifiers),
            fail: AtomicBool::new(false),
        }
    }

    pub async fn set(&self, modifiers: MacroModifiers) {
        *self.modifiers.write().await = modifiers;
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MacroSignalProvider for StaticMacroProvider {
    async fn fetch_modifiers(&self) -> anyhow::Result<MacroModifiers> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("static macro provider set to fail");
        }
        Ok(self.modifiers.read().await.clone())
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        self.millis.store(time.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}
