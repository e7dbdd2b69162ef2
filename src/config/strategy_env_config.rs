//! Indicator periods and the aggregator weight table.

use super::EnvLookup;
use crate::application::strategies::{AggregatorConfig, StrategyConfig};
use anyhow::{Context, Result};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct StrategyEnvConfig {
    pub ema_short_period: usize,
    pub ema_long_period: usize,
    pub rsi_period: usize,
    pub bollinger_period: usize,
    pub bollinger_multiplier: f64,
    pub adx_period: usize,
    pub adx_threshold: f64,
    pub atr_period: usize,
    pub supertrend_multiplier: f64,
    pub macd_fast_period: usize,
    pub macd_slow_period: usize,
    pub macd_signal_period: usize,
    pub stochastic_k_period: usize,
    pub cci_period: usize,
    pub williams_period: usize,
    pub mean_reversion_period: usize,
    pub aggregator_config_file: Option<PathBuf>,
}

impl StrategyEnvConfig {
    pub fn from_lookup(env: &EnvLookup) -> Result<Self> {
        let defaults = StrategyConfig::default();

        let config = Self {
            ema_short_period: env.parse("EMA_SHORT_PERIOD", defaults.ema_crossover.short_period)?,
            ema_long_period: env.parse("EMA_LONG_PERIOD", defaults.ema_crossover.long_period)?,
            rsi_period: env.parse("RSI_PERIOD", defaults.rsi_divergence.period)?,
            bollinger_period: env.parse("BB_PERIOD", defaults.bollinger_squeeze.period)?,
            bollinger_multiplier: env
                .parse("BB_MULTIPLIER", defaults.bollinger_squeeze.multiplier)?,
            adx_period: env.parse("ADX_PERIOD", defaults.adx_trend.period)?,
            adx_threshold: env.parse("ADX_THRESHOLD", defaults.adx_trend.threshold)?,
            atr_period: env.parse("ATR_PERIOD", defaults.supertrend.atr_period)?,
            supertrend_multiplier: env
                .parse("SUPERTREND_MULTIPLIER", defaults.supertrend.multiplier)?,
            macd_fast_period: env.parse("MACD_FAST_PERIOD", defaults.macd.fast_period)?,
            macd_slow_period: env.parse("MACD_SLOW_PERIOD", defaults.macd.slow_period)?,
            macd_signal_period: env.parse("MACD_SIGNAL_PERIOD", defaults.macd.signal_period)?,
            stochastic_k_period: env.parse("STOCH_K_PERIOD", defaults.stochastic.k_period)?,
            cci_period: env.parse("CCI_PERIOD", defaults.cci.period)?,
            williams_period: env.parse("WILLIAMS_R_PERIOD", defaults.williams_r.period)?,
            mean_reversion_period: env
                .parse("MEAN_REVERSION_PERIOD", defaults.mean_reversion.period)?,
            aggregator_config_file: env
                .get("AGGREGATOR_CONFIG_FILE")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.ema_short_period >= self.ema_long_period {
            anyhow::bail!(
                "EMA_SHORT_PERIOD ({}) must be below EMA_LONG_PERIOD ({})",
                self.ema_short_period,
                self.ema_long_period
            );
        }
        if self.macd_fast_period >= self.macd_slow_period {
            anyhow::bail!(
                "MACD_FAST_PERIOD ({}) must be below MACD_SLOW_PERIOD ({})",
                self.macd_fast_period,
                self.macd_slow_period
            );
        }
        let periods = [
            ("RSI_PERIOD", self.rsi_period),
            ("BB_PERIOD", self.bollinger_period),
            ("ADX_PERIOD", self.adx_period),
            ("ATR_PERIOD", self.atr_period),
            ("MACD_SIGNAL_PERIOD", self.macd_signal_period),
            ("STOCH_K_PERIOD", self.stochastic_k_period),
            ("CCI_PERIOD", self.cci_period),
            ("WILLIAMS_R_PERIOD", self.williams_period),
            ("MEAN_REVERSION_PERIOD", self.mean_reversion_period),
        ];
        if let Some((key, _)) = periods.iter().find(|(_, p)| *p < 2) {
            anyhow::bail!("{} must be at least 2", key);
        }
        Ok(())
    }

    /// Default strategy parameters with the configured periods applied.
    pub fn to_strategy_config(&self) -> StrategyConfig {
        let mut config = StrategyConfig::default();
        config.ema_crossover.short_period = self.ema_short_period;
        config.ema_crossover.long_period = self.ema_long_period;
        config.rsi_divergence.period = self.rsi_period;
        config.rsi_momentum.rsi_period = self.rsi_period;
        config.bollinger_squeeze.period = self.bollinger_period;
        config.bollinger_squeeze.multiplier = self.bollinger_multiplier;
        config.adx_trend.period = self.adx_period;
        config.adx_trend.threshold = self.adx_threshold;
        config.supertrend.atr_period = self.atr_period;
        config.supertrend.multiplier = self.supertrend_multiplier;
        config.macd.fast_period = self.macd_fast_period;
        config.macd.slow_period = self.macd_slow_period;
        config.macd.signal_period = self.macd_signal_period;
        config.stochastic.k_period = self.stochastic_k_period;
        config.cci.period = self.cci_period;
        config.williams_r.period = self.williams_period;
        config.mean_reversion.period = self.mean_reversion_period;
        config
    }

    /// Aggregator weights from `AGGREGATOR_CONFIG_FILE`, or the built-in table.
    pub fn aggregator_config(&self) -> Result<AggregatorConfig> {
        match &self.aggregator_config_file {
            Some(path) => AggregatorConfig::load(path)
                .with_context(|| format!("Failed to load aggregator config {:?}", path)),
            None => Ok(AggregatorConfig::default()),
        }
    }
}
