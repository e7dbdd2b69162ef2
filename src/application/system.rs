use crate::application::agents::analyst::Analyst;
use crate::application::agents::trader_session::{TickReport, TraderSession, TradingConfig};
use crate::application::risk_management::position_manager::PositionManager;
use crate::application::strategies::{SignalAggregator, StrategyBattery};
use crate::config::{Config, MacroProviderKind, Mode};
use crate::domain::ports::{ExecutionService, MarketDataService};
use crate::domain::trading::trader_state::TraderState;
use crate::infrastructure::csv_market_data::CsvMarketDataService;
use crate::infrastructure::mock::{MockExecutionService, MockMarketDataService};
use crate::infrastructure::notifier::LogNotifier;
use crate::infrastructure::observability::{Metrics, MetricsReporter};
use crate::infrastructure::persistence::StateStore;
use crate::infrastructure::sentiment::AlternativeMeMacroProvider;
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// Fully wired session plus its persistence and reporting.
pub struct Application {
    pub session: TraderSession,
    pub trading: TradingConfig,
    pub metrics: Metrics,
    reporter: MetricsReporter,
    store: Option<StateStore>,
}

impl Application {
    pub async fn build(config: Config) -> Result<Self> {
        info!("Building confluence session (Mode: {:?})...", config.session.mode);

        // 1. Market data and execution
        let market_data: Arc<dyn MarketDataService> = match config.session.mode {
            Mode::Mock => {
                info!(
                    "Using mock random-walk data (seed {}, volatility {})",
                    config.session.mock_seed, config.session.mock_volatility
                );
                Arc::new(MockMarketDataService::with_random_walk(
                    config.session.mock_seed,
                    config.session.mock_volatility,
                    config.session.timeframe,
                ))
            }
            Mode::Csv => {
                info!("Replaying CSV data from {:?}", config.session.csv_data_dir);
                Arc::new(CsvMarketDataService::new(config.session.csv_data_dir.clone()))
            }
        };
        let execution: Arc<dyn ExecutionService> = Arc::new(MockExecutionService::new());

        // 2. Analysis pipeline
        let battery = StrategyBattery::from_config(&config.strategy.to_strategy_config());
        let aggregator = SignalAggregator::new(config.strategy.aggregator_config()?);
        let mut analyst = Analyst::new(market_data.clone(), battery, aggregator)
            .with_candle_limit(config.session.candle_limit)
            .with_call_timeout(config.call_timeout());
        if config.session.macro_provider == MacroProviderKind::AlternativeMe {
            info!("Macro modifiers from alternative.me Fear & Greed index");
            analyst = analyst.with_macro_provider(Arc::new(AlternativeMeMacroProvider::new()));
        }

        // 3. State
        let store = config.session.state_file.clone().map(StateStore::new);
        let restored = match &store {
            Some(store) => store.load().context("Failed to restore trader state")?,
            None => None,
        };
        let initial_state = restored.unwrap_or_else(|| {
            TraderState::new(config.risk.start_balance, Utc::now().date_naive())
        });

        // 4. Session
        let metrics = Metrics::new().context("Failed to create metrics registry")?;
        let session = TraderSession::new(
            analyst,
            market_data,
            execution,
            PositionManager::new(config.risk.to_risk_config()),
            initial_state,
        )
        .with_notifier(Arc::new(LogNotifier))
        .with_metrics(metrics.clone())
        .with_call_timeout(config.call_timeout());

        Ok(Self {
            session,
            trading: config.trading_config(),
            reporter: MetricsReporter::new(metrics.clone()),
            metrics,
            store,
        })
    }

    /// One tick, then persist and report. Persistence failures are logged.
    pub async fn run_tick(&self) -> TickReport {
        let report = self.session.tick(&self.trading).await;
        let state = self.session.get_state().await;

        if let Some(store) = &self.store
            && let Err(e) = store.save(&state)
        {
            warn!("Failed to persist trader state: {:#}", e);
        }
        self.reporter.report(&state);
        report
    }

    /// Final snapshot on shutdown.
    pub async fn shutdown(&self) -> Result<()> {
        let state = self.session.get_state().await;
        if let Some(store) = &self.store {
            store.save(&state)?;
            info!("State saved to {:?}", store.path());
        }
        self.reporter.report(&state);
        Ok(())
    }
}
