use crate::domain::errors::EngineError;
use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::MarketDataService;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{info, warn};

struct Replay {
    candles: Vec<Candle>,
    cursor: usize,
}

/// Replays `<dir>/<SYMBOL>.csv` one candle per fetch.
///
/// Rows are `time,open,high,low,close,volume` with RFC 3339 times; volume
/// may be empty. `/` in a symbol maps to `_` in the file name.
pub struct CsvMarketDataService {
    dir: PathBuf,
    replays: RwLock<HashMap<String, Replay>>,
}

impl CsvMarketDataService {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            replays: RwLock::new(HashMap::new()),
        }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol.replace('/', "_")))
    }

    /// Parse a candle file, sorting ascending by time.
    pub fn load_file(path: &Path) -> Result<Vec<Candle>> {
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let mut rdr = csv::Reader::from_reader(BufReader::new(file));
        let mut candles = Vec::new();
        for (line, result) in rdr.deserialize().enumerate() {
            let candle: Candle =
                result.with_context(|| format!("Bad candle row {} in {:?}", line + 2, path))?;
            candles.push(candle);
        }
        candles.sort_by_key(|c| c.time);
        Ok(candles)
    }

    async fn ensure_loaded(&self, symbol: &str, limit: usize) -> Result<(), EngineError> {
        if self.replays.read().await.contains_key(symbol) {
            return Ok(());
        }
        let path = self.path_for(symbol);
        let candles = Self::load_file(&path)
            .map_err(|e| EngineError::data_unavailable(symbol, format!("{:#}", e)))?;
        if candles.is_empty() {
            return Err(EngineError::data_unavailable(symbol, "empty candle file"));
        }
        info!(
            "CsvMarketData [{}]: loaded {} candles from {:?}",
            symbol,
            candles.len(),
            path
        );
        // First fetch starts with a full window, later fetches add one bar each.
        let cursor = limit.clamp(1, candles.len()) - 1;
        self.replays
            .write()
            .await
            .entry(symbol.to_string())
            .or_insert(Replay { candles, cursor });
        Ok(())
    }
}

#[async_trait]
impl MarketDataService for CsvMarketDataService {
    async fn fetch_candles(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, EngineError> {
        self.ensure_loaded(symbol, limit).await?;
        let mut replays = self.replays.write().await;
        let replay = replays
            .get_mut(symbol)
            .ok_or_else(|| EngineError::data_unavailable(symbol, "not loaded"))?;

        if replay.cursor < replay.candles.len() {
            replay.cursor += 1;
        } else {
            warn!("CsvMarketData [{}]: replay exhausted, repeating last window", symbol);
        }
        let end = replay.cursor;
        let start = end.saturating_sub(limit);
        Ok(replay.candles[start..end].to_vec())
    }

    async fn get_current_price(&self, symbol: &str) -> Result<Decimal, EngineError> {
        let replays = self.replays.read().await;
        replays
            .get(symbol)
            .and_then(|r| r.candles.get(r.cursor.checked_sub(1)?))
            .and_then(|c| Decimal::from_f64(c.close))
            .ok_or_else(|| EngineError::price_unavailable(symbol, "replay not started"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &Path, name: &str, rows: usize) {
        let mut file = File::create(dir.join(name)).unwrap();
        writeln!(file, "time,open,high,low,close,volume").unwrap();
        for i in 0..rows {
            let close = 100.0 + i as f64;
            writeln!(
                file,
                "2024-01-01T{:02}:00:00Z,{},{},{},{},",
                i,
                close - 0.5,
                close + 1.0,
                close - 1.0,
                close
            )
            .unwrap();
        }
    }

    #[tokio::test]
    async fn test_replay_advances_one_bar_per_fetch() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "BTC_USDT.csv", 5);
        let service = CsvMarketDataService::new(dir.path());

        let first = service
            .fetch_candles("BTC/USDT", Timeframe::OneHour, 3)
            .await
            .unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first[2].close, 102.0);
        assert!(first[0].volume.is_none());
        assert_eq!(
            service.get_current_price("BTC/USDT").await.unwrap(),
            Decimal::from(102)
        );

        let second = service
            .fetch_candles("BTC/USDT", Timeframe::OneHour, 3)
            .await
            .unwrap();
        assert_eq!(second[2].close, 103.0);
    }

    #[tokio::test]
    async fn test_missing_file_is_data_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let service = CsvMarketDataService::new(dir.path());
        let err = service
            .fetch_candles("DOGE", Timeframe::OneHour, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::DataUnavailable { .. }));
        assert!(service.get_current_price("DOGE").await.is_err());
    }
}
