//! Session wiring parsed from environment variables: data source, symbols,
//! timing and persistence.

use super::EnvLookup;
use crate::domain::market::timeframe::Timeframe;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// Where candles and prices come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Seeded random walk.
    Mock,
    /// Replay of `<CSV_DATA_DIR>/<SYMBOL>.csv`.
    Csv,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(Mode::Mock),
            "csv" => Ok(Mode::Csv),
            _ => anyhow::bail!("Invalid MODE: {}. Must be 'mock' or 'csv'", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroProviderKind {
    None,
    AlternativeMe,
}

impl FromStr for MacroProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "none" | "off" => Ok(MacroProviderKind::None),
            "alternative_me" | "alternative.me" | "fear_greed" => {
                Ok(MacroProviderKind::AlternativeMe)
            }
            _ => anyhow::bail!(
                "Invalid MACRO_PROVIDER: {}. Must be 'none' or 'alternative_me'",
                s
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionEnvConfig {
    pub mode: Mode,
    pub symbols: Vec<String>,
    pub timeframe: Timeframe,
    pub candle_limit: usize,
    pub tick_interval_seconds: u64,
    pub call_timeout_ms: u64,
    pub state_file: Option<PathBuf>,
    pub csv_data_dir: PathBuf,
    pub macro_provider: MacroProviderKind,
    pub mock_seed: u64,
    pub mock_volatility: f64,
}

impl SessionEnvConfig {
    pub fn from_lookup(env: &EnvLookup) -> Result<Self> {
        let mode = Mode::from_str(&env.string("MODE", "mock"))?;

        let symbols: Vec<String> = env
            .string("SYMBOLS", "BTC/USDT")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if symbols.is_empty() {
            anyhow::bail!("SYMBOLS must name at least one symbol");
        }

        let timeframe = Timeframe::from_str(&env.string("TIMEFRAME", "1h"))
            .context("Failed to parse TIMEFRAME")?;

        let candle_limit = env.parse("CANDLE_LIMIT", 200usize)?;
        if candle_limit == 0 {
            anyhow::bail!("CANDLE_LIMIT must be positive");
        }

        let state_file = env.get("STATE_FILE").filter(|s| !s.is_empty()).map(PathBuf::from);

        Ok(Self {
            mode,
            symbols,
            timeframe,
            candle_limit,
            tick_interval_seconds: env.parse("TICK_INTERVAL_SECONDS", 60u64)?,
            call_timeout_ms: env.parse("CALL_TIMEOUT_MS", 10_000u64)?,
            state_file,
            csv_data_dir: PathBuf::from(env.string("CSV_DATA_DIR", "data")),
            macro_provider: MacroProviderKind::from_str(&env.string("MACRO_PROVIDER", "none"))?,
            mock_seed: env.parse("MOCK_SEED", 42u64)?,
            mock_volatility: env.parse("MOCK_VOLATILITY", 0.01f64)?,
        })
    }
}
