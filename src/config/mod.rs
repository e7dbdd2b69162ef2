//! Configuration loaded from environment variables (and `.env` via dotenvy in
//! the binary), organized by concern: Session, Risk and Strategy.

mod risk_env_config;
mod session_env_config;
mod strategy_env_config;

pub use risk_env_config::RiskEnvConfig;
pub use session_env_config::{MacroProviderKind, Mode, SessionEnvConfig};
pub use strategy_env_config::StrategyEnvConfig;

use crate::application::agents::trader_session::TradingConfig;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Variable source: the process environment, or a fixed table in tests.
#[derive(Debug, Clone, Default)]
pub struct EnvLookup {
    fixed: Option<HashMap<String, String>>,
}

impl EnvLookup {
    pub fn process() -> Self {
        Self { fixed: None }
    }

    /// Table with no variables set; every lookup falls back to its default.
    pub fn empty() -> Self {
        Self {
            fixed: Some(HashMap::new()),
        }
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            fixed: Some(
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match &self.fixed {
            Some(map) => map.get(key).cloned(),
            None => env::var(key).ok(),
        }
    }

    pub fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    pub fn parse<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .context(format!("Failed to parse {}", key)),
            None => Ok(default),
        }
    }

    /// Unparseable values fall back to `default`.
    pub fn parse_bool(&self, key: &str, default: bool) -> bool {
        self.get(key)
            .and_then(|v| v.trim().to_lowercase().parse::<bool>().ok())
            .unwrap_or(default)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub session: SessionEnvConfig,
    pub risk: RiskEnvConfig,
    pub strategy: StrategyEnvConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&EnvLookup::process())
    }

    pub fn from_lookup(env: &EnvLookup) -> Result<Self> {
        Ok(Self {
            session: SessionEnvConfig::from_lookup(env).context("Invalid session configuration")?,
            risk: RiskEnvConfig::from_lookup(env).context("Invalid risk configuration")?,
            strategy: StrategyEnvConfig::from_lookup(env)
                .context("Invalid strategy configuration")?,
        })
    }

    pub fn trading_config(&self) -> TradingConfig {
        TradingConfig {
            symbols: self.session.symbols.clone(),
            timeframe: self.session.timeframe,
            candle_limit: self.session.candle_limit,
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.session.call_timeout_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.session.tick_interval_seconds.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(&EnvLookup::empty()).unwrap();
        let trading = config.trading_config();
        assert_eq!(trading.symbols, vec!["BTC/USDT".to_string()]);
        assert_eq!(trading.candle_limit, 200);
        assert_eq!(config.call_timeout(), Duration::from_secs(10));
        assert_eq!(config.tick_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_lookup_helpers() {
        let env = EnvLookup::from_pairs(&[("A", " 7 "), ("B", "TRUE"), ("C", "maybe")]);
        assert_eq!(env.parse("A", 0u32).unwrap(), 7);
        assert_eq!(env.parse("MISSING", 3u32).unwrap(), 3);
        assert!(env.parse_bool("B", false));
        assert!(env.parse_bool("C", true));
        assert_eq!(env.string("MISSING", "x"), "x");
    }

    #[test]
    fn test_errors_name_the_section() {
        let env = EnvLookup::from_pairs(&[("STOP_LOSS_PCT", "two")]);
        let err = Config::from_lookup(&env).unwrap_err();
        assert!(format!("{:#}", err).contains("STOP_LOSS_PCT"));
    }
}
