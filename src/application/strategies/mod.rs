pub mod adx_trend;
pub mod bollinger_squeeze;
pub mod cci;
pub mod ema_crossover;
pub mod fibonacci;
pub mod fractals;
pub mod heikin_ashi;
pub mod indicators;
pub mod macd;
pub mod mean_reversion;
pub mod parabolic_sar;
pub mod range_breakout;
pub mod rsi_divergence;
pub mod rsi_momentum;
pub mod signal_aggregator;
pub mod stochastic;
pub mod supertrend;
pub mod vwap;
pub mod williams_r;

pub use adx_trend::AdxTrendStrategy;
pub use bollinger_squeeze::BollingerSqueezeStrategy;
pub use cci::CciStrategy;
pub use ema_crossover::EmaCrossoverStrategy;
pub use fibonacci::FibonacciStrategy;
pub use fractals::FractalsStrategy;
pub use heikin_ashi::HeikinAshiStrategy;
pub use macd::MacdStrategy;
pub use mean_reversion::MeanReversionStrategy;
pub use parabolic_sar::ParabolicSarStrategy;
pub use range_breakout::RangeBreakoutStrategy;
pub use rsi_divergence::RsiDivergenceStrategy;
pub use rsi_momentum::RsiMomentumStrategy;
pub use signal_aggregator::{AggregatorConfig, SignalAggregator};
pub use stochastic::StochasticStrategy;
pub use supertrend::SupertrendStrategy;
pub use vwap::VwapStrategy;
pub use williams_r::WilliamsRStrategy;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::market::candle::Candle;
use crate::domain::trading::signal::{NamedSignalSet, Signal};

/// Strategy names as they appear in signal sets and trade records.
pub mod names {
    pub const MEAN_REVERSION: &str = "Mean Reversion";
    pub const EMA_CROSSOVER: &str = "EMA Crossover";
    pub const RSI_DIVERGENCE: &str = "RSI Divergence";
    pub const BOLLINGER_SQUEEZE: &str = "Bollinger Squeeze";
    pub const ADX_TREND: &str = "ADX Trend";
    pub const SUPERTREND: &str = "Supertrend";
    pub const HEIKIN_ASHI: &str = "Heikin Ashi";
    pub const FIBONACCI: &str = "Fibonacci";
    pub const FRACTALS: &str = "Fractals";
    pub const CCI: &str = "CCI";
    pub const STOCHASTIC: &str = "Stochastic";
    pub const WILLIAMS_R: &str = "Williams %R";
    pub const PARABOLIC_SAR: &str = "Parabolic SAR";
    pub const VWAP: &str = "VWAP";
    pub const RANGE_BREAKOUT: &str = "Range Breakout";
    pub const RSI_MOMENTUM: &str = "RSI Momentum";
    pub const MACD: &str = "MACD";
}

/// A pure technical indicator turning a candle series into a [`Signal`].
///
/// Implementations must be deterministic and must return a neutral signal
/// when `candles.len() < self.min_candles()`.
pub trait TechnicalStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Shortest series that can produce a non-neutral signal.
    fn min_candles(&self) -> usize;

    fn evaluate(&self, candles: &[Candle]) -> Signal;
}

/// Parameters of every strategy in the battery.
///
/// Missing sections fall back to each strategy's defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub mean_reversion: MeanReversionStrategy,
    pub ema_crossover: EmaCrossoverStrategy,
    pub rsi_divergence: RsiDivergenceStrategy,
    pub bollinger_squeeze: BollingerSqueezeStrategy,
    pub adx_trend: AdxTrendStrategy,
    pub supertrend: SupertrendStrategy,
    pub heikin_ashi: HeikinAshiStrategy,
    pub fibonacci: FibonacciStrategy,
    pub fractals: FractalsStrategy,
    pub cci: CciStrategy,
    pub stochastic: StochasticStrategy,
    pub williams_r: WilliamsRStrategy,
    pub parabolic_sar: ParabolicSarStrategy,
    pub vwap: VwapStrategy,
    pub range_breakout: RangeBreakoutStrategy,
    pub rsi_momentum: RsiMomentumStrategy,
    pub macd: MacdStrategy,
}

/// The full set of indicators evaluated each cycle.
#[derive(Clone)]
pub struct StrategyBattery {
    strategies: Vec<Arc<dyn TechnicalStrategy>>,
}

impl StrategyBattery {
    pub fn new(strategies: Vec<Arc<dyn TechnicalStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn from_config(config: &StrategyConfig) -> Self {
        Self::new(vec![
            Arc::new(config.mean_reversion.clone()),
            Arc::new(config.ema_crossover.clone()),
            Arc::new(config.rsi_divergence.clone()),
            Arc::new(config.bollinger_squeeze.clone()),
            Arc::new(config.adx_trend.clone()),
            Arc::new(config.supertrend.clone()),
            Arc::new(config.heikin_ashi.clone()),
            Arc::new(config.fibonacci.clone()),
            Arc::new(config.fractals.clone()),
            Arc::new(config.cci.clone()),
            Arc::new(config.stochastic.clone()),
            Arc::new(config.williams_r.clone()),
            Arc::new(config.parabolic_sar.clone()),
            Arc::new(config.vwap.clone()),
            Arc::new(config.range_breakout.clone()),
            Arc::new(config.rsi_momentum.clone()),
            Arc::new(config.macd.clone()),
        ])
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Longest warm-up among the strategies.
    pub fn max_min_candles(&self) -> usize {
        self.strategies
            .iter()
            .map(|s| s.min_candles())
            .max()
            .unwrap_or(0)
    }

    /// Run every strategy over the same series.
    pub fn evaluate(&self, candles: &[Candle]) -> NamedSignalSet {
        let results: Vec<(String, Signal)> = self
            .strategies
            .par_iter()
            .map(|strategy| (strategy.name().to_string(), strategy.evaluate(candles)))
            .collect();
        results.into_iter().collect()
    }
}

impl Default for StrategyBattery {
    fn default() -> Self {
        Self::from_config(&StrategyConfig::default())
    }
}

impl std::fmt::Debug for StrategyBattery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyBattery")
            .field("strategies", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::indicators::test_support::*;
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_battery_has_seventeen_unique_names() {
        let battery = StrategyBattery::default();
        assert_eq!(battery.len(), 17);
        let unique: HashSet<_> = battery.names().into_iter().collect();
        assert_eq!(unique.len(), 17);
        assert!(unique.contains(names::WILLIAMS_R));
    }

    #[test]
    fn test_evaluate_returns_one_signal_per_strategy() {
        let battery = StrategyBattery::default();
        let candles = with_volume(candles_from_closes(&linear(100.0, 0.5, 80), 0.3), 1000.0);
        let signals = battery.evaluate(&candles);
        assert_eq!(signals.len(), 17);
    }

    #[test]
    fn test_empty_series_is_all_neutral() {
        let signals = StrategyBattery::default().evaluate(&[]);
        assert!(signals.values().all(|s| s.is_neutral() && s.strength() == 0.0));
    }

    #[test]
    fn test_config_sections_are_optional() {
        let config: StrategyConfig = toml::from_str("[ema_crossover]\nshort_period = 5\n").unwrap();
        assert_eq!(config.ema_crossover.short_period, 5);
        assert_eq!(config.ema_crossover.long_period, 21);
        assert_eq!(config.macd.slow_period, 26);
    }
}
