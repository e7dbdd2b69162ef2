//! Prometheus metrics for the trading session.
//!
//! All metrics use the `confluence_` prefix.

use prometheus::{
    CounterVec, Gauge, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Realized balance
    pub balance: GenericGauge<AtomicF64>,
    /// Number of open positions
    pub open_positions: GenericGauge<AtomicF64>,
    /// Realized P&L of the current day
    pub daily_pnl: GenericGauge<AtomicF64>,
    /// Latest Fear & Greed reading
    pub fear_index: GenericGauge<AtomicF64>,
    /// Closed trades by side and outcome
    pub trades_total: CounterVec,
    /// Orders by side and status
    pub orders_total: CounterVec,
    /// Failed symbol cycles by error kind
    pub cycle_errors_total: CounterVec,
    /// Strategy signals by strategy and direction
    pub signals_total: CounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let balance = Gauge::with_opts(Opts::new("confluence_balance", "Realized balance"))?;
        registry.register(Box::new(balance.clone()))?;

        let open_positions = Gauge::with_opts(Opts::new(
            "confluence_open_positions",
            "Number of open positions",
        ))?;
        registry.register(Box::new(open_positions.clone()))?;

        let daily_pnl = Gauge::with_opts(Opts::new(
            "confluence_daily_pnl",
            "Realized P&L of the current day",
        ))?;
        registry.register(Box::new(daily_pnl.clone()))?;

        let fear_index = Gauge::with_opts(Opts::new(
            "confluence_fear_index",
            "Latest Fear & Greed index reading",
        ))?;
        registry.register(Box::new(fear_index.clone()))?;

        let trades_total = CounterVec::new(
            Opts::new("confluence_trades_total", "Closed trades"),
            &["side", "outcome"],
        )?;
        registry.register(Box::new(trades_total.clone()))?;

        let orders_total = CounterVec::new(
            Opts::new("confluence_orders_total", "Orders sent to execution"),
            &["side", "status"],
        )?;
        registry.register(Box::new(orders_total.clone()))?;

        let cycle_errors_total = CounterVec::new(
            Opts::new("confluence_cycle_errors_total", "Failed symbol cycles"),
            &["kind"],
        )?;
        registry.register(Box::new(cycle_errors_total.clone()))?;

        let signals_total = CounterVec::new(
            Opts::new("confluence_signals_total", "Non-neutral strategy signals"),
            &["strategy", "direction"],
        )?;
        registry.register(Box::new(signals_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            balance,
            open_positions,
            daily_pnl,
            fear_index,
            trades_total,
            orders_total,
            cycle_errors_total,
            signals_total,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_trades(&self, side: &str, outcome: &str) {
        self.trades_total.with_label_values(&[side, outcome]).inc();
    }

    pub fn inc_orders(&self, side: &str, status: &str) {
        self.orders_total.with_label_values(&[side, status]).inc();
    }

    pub fn inc_cycle_errors(&self, kind: &str) {
        self.cycle_errors_total.with_label_values(&[kind]).inc();
    }

    pub fn inc_signals(&self, strategy: &str, direction: &str) {
        self.signals_total
            .with_label_values(&[strategy, direction])
            .inc();
    }
}
