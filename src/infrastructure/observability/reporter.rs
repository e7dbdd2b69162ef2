//! Structured JSON session snapshots written to the log.

use crate::domain::trading::trader_state::TraderState;
use crate::infrastructure::observability::metrics::Metrics;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub balance: f64,
    pub start_balance: f64,
    pub closed_trades: usize,
    pub positions: Vec<PositionSnapshot>,
    pub daily: DailySnapshot,
}

#[derive(Debug, Serialize)]
pub struct PositionSnapshot {
    pub symbol: String,
    pub side: String,
    pub size: f64,
    pub entry_price: f64,
    pub strategy: String,
}

#[derive(Debug, Serialize)]
pub struct DailySnapshot {
    pub date: String,
    pub trades: u32,
    pub wins: u32,
    pub losses: u32,
    pub profit: f64,
}

pub struct MetricsReporter {
    metrics: Metrics,
    start_time: Instant,
}

impl MetricsReporter {
    pub fn new(metrics: Metrics) -> Self {
        Self {
            metrics,
            start_time: Instant::now(),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn snapshot(&self, state: &TraderState) -> SessionSnapshot {
        let mut positions: Vec<PositionSnapshot> = state
            .open_positions
            .values()
            .map(|p| PositionSnapshot {
                symbol: p.symbol.clone(),
                side: p.side.to_string(),
                size: p.size.to_f64().unwrap_or(0.0),
                entry_price: p.entry_price.to_f64().unwrap_or(0.0),
                strategy: p.strategy_label.clone(),
            })
            .collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        SessionSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            balance: state.current_balance.to_f64().unwrap_or(0.0),
            start_balance: state.start_balance.to_f64().unwrap_or(0.0),
            closed_trades: state.trade_history.len(),
            positions,
            daily: DailySnapshot {
                date: state.daily_stats.date.to_string(),
                trades: state.daily_stats.trades,
                wins: state.daily_stats.wins,
                losses: state.daily_stats.losses,
                profit: state.daily_stats.profit.to_f64().unwrap_or(0.0),
            },
        }
    }

    /// Log a JSON snapshot with a `METRICS_JSON:` prefix for log shippers.
    pub fn report(&self, state: &TraderState) {
        let snapshot = self.snapshot(state);
        match serde_json::to_string(&snapshot) {
            Ok(json) => {
                info!("METRICS_JSON:{}", json);
                info!(
                    "Balance: {:.2} | Positions: {} | Closed trades: {} | Uptime: {}s",
                    snapshot.balance,
                    snapshot.positions.len(),
                    snapshot.closed_trades,
                    snapshot.uptime_seconds
                );
            }
            Err(e) => warn!("Failed to serialize metrics snapshot: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_snapshot_reflects_state() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        let reporter = MetricsReporter::new(metrics);
        let state = TraderState::new(dec!(2500), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());

        let snapshot = reporter.snapshot(&state);
        assert_eq!(snapshot.balance, 2500.0);
        assert!(snapshot.positions.is_empty());
        assert_eq!(snapshot.daily.date, "2024-02-01");

        let json = serde_json::to_string(&snapshot).expect("Failed to serialize");
        assert!(json.contains("\"start_balance\":2500.0"));
    }
}
