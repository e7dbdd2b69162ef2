use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::names;
use crate::domain::market::macro_context::{DollarTrend, MacroModifiers, MacroRiskLevel};
use crate::domain::trading::signal::{
    CombinedSignal, MAX_STRENGTH, NamedSignalSet, SignalDirection,
};

/// Multipliers applied to the raw side scores for each macro input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacroFactors {
    pub fear_threshold: u8,
    pub greed_threshold: u8,
    pub fear_buy: f64,
    pub fear_sell: f64,
    pub greed_buy: f64,
    pub greed_sell: f64,
    /// Applied to buys when the dollar is rising, to sells when it is falling.
    pub dollar_headwind: f64,
    /// Applied to sells when the dollar is rising, to buys when it is falling.
    pub dollar_tailwind: f64,
    pub vix_high: f64,
    pub vix_high_factor: f64,
    pub vix_extreme: f64,
    pub vix_extreme_factor: f64,
    pub elevated_risk_buy: f64,
    pub extreme_risk_buy: f64,
}

impl Default for MacroFactors {
    fn default() -> Self {
        Self {
            fear_threshold: 25,
            greed_threshold: 75,
            fear_buy: 0.8,
            fear_sell: 1.2,
            greed_buy: 1.1,
            greed_sell: 0.9,
            dollar_headwind: 0.9,
            dollar_tailwind: 1.1,
            vix_high: 30.0,
            vix_high_factor: 0.85,
            vix_extreme: 40.0,
            vix_extreme_factor: 0.7,
            elevated_risk_buy: 0.9,
            extreme_risk_buy: 0.8,
        }
    }
}

impl MacroFactors {
    /// `(buy_factor, sell_factor)` for the given modifiers.
    pub fn side_factors(&self, modifiers: &MacroModifiers) -> (f64, f64) {
        let mut buy = 1.0;
        let mut sell = 1.0;

        if let Some(fear) = modifiers.fear_index {
            if fear <= self.fear_threshold {
                buy *= self.fear_buy;
                sell *= self.fear_sell;
            } else if fear >= self.greed_threshold {
                buy *= self.greed_buy;
                sell *= self.greed_sell;
            }
        }

        match modifiers.dxy_trend {
            Some(DollarTrend::Rising) => {
                buy *= self.dollar_headwind;
                sell *= self.dollar_tailwind;
            }
            Some(DollarTrend::Falling) => {
                buy *= self.dollar_tailwind;
                sell *= self.dollar_headwind;
            }
            Some(DollarTrend::Flat) | None => {}
        }

        if let Some(vix) = modifiers.vix {
            let factor = if vix > self.vix_extreme {
                self.vix_extreme_factor
            } else if vix > self.vix_high {
                self.vix_high_factor
            } else {
                1.0
            };
            buy *= factor;
            sell *= factor;
        }

        match modifiers.risk_level() {
            MacroRiskLevel::Elevated => buy *= self.elevated_risk_buy,
            MacroRiskLevel::Extreme => buy *= self.extreme_risk_buy,
            MacroRiskLevel::Low | MacroRiskLevel::Normal => {}
        }

        (buy, sell)
    }
}

/// Weight table and decision threshold for combining strategy signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub weights: BTreeMap<String, f64>,
    /// Weight of strategies missing from `weights`.
    pub default_weight: f64,
    /// Normalized score the winning side must reach.
    pub min_threshold: f64,
    pub macro_factors: MacroFactors,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        let weights = [
            (names::EMA_CROSSOVER, 1.2),
            (names::SUPERTREND, 1.2),
            (names::MACD, 1.1),
            (names::ADX_TREND, 1.1),
            (names::RSI_DIVERGENCE, 1.0),
            (names::RSI_MOMENTUM, 1.0),
            (names::BOLLINGER_SQUEEZE, 1.0),
            (names::RANGE_BREAKOUT, 1.0),
            (names::HEIKIN_ASHI, 0.9),
            (names::PARABOLIC_SAR, 0.9),
            (names::VWAP, 0.9),
            (names::MEAN_REVERSION, 0.8),
            (names::FRACTALS, 0.8),
            (names::CCI, 0.8),
            (names::STOCHASTIC, 0.8),
            (names::FIBONACCI, 0.7),
            (names::WILLIAMS_R, 0.7),
        ]
        .into_iter()
        .map(|(name, weight)| (name.to_string(), weight))
        .collect();

        Self {
            weights,
            default_weight: 0.5,
            min_threshold: 30.0,
            macro_factors: MacroFactors::default(),
        }
    }
}

impl AggregatorConfig {
    pub fn weight_for(&self, name: &str) -> f64 {
        self.weights
            .get(name)
            .copied()
            .unwrap_or(self.default_weight)
    }

    /// Parse a TOML document. Listed weights override the defaults one by one.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        #[derive(Deserialize, Default)]
        #[serde(default)]
        struct Overrides {
            weights: BTreeMap<String, f64>,
            default_weight: Option<f64>,
            min_threshold: Option<f64>,
            macro_factors: Option<MacroFactors>,
        }

        let overrides: Overrides =
            toml::from_str(content).context("Failed to parse aggregator config")?;
        let mut config = Self::default();
        config.weights.extend(overrides.weights);
        if let Some(weight) = overrides.default_weight {
            config.default_weight = weight;
        }
        if let Some(threshold) = overrides.min_threshold {
            config.min_threshold = threshold;
        }
        if let Some(factors) = overrides.macro_factors {
            config.macro_factors = factors;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read aggregator config {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some((name, weight)) = self.weights.iter().find(|(_, w)| !w.is_finite() || **w < 0.0) {
            bail!("Invalid weight {} for strategy '{}'", weight, name);
        }
        if !self.default_weight.is_finite() || self.default_weight < 0.0 {
            bail!("Invalid default_weight {}", self.default_weight);
        }
        if !(0.0..=MAX_STRENGTH).contains(&self.min_threshold) {
            bail!("min_threshold must be within 0..=100, got {}", self.min_threshold);
        }
        Ok(())
    }
}

/// Weighted vote over a [`NamedSignalSet`].
#[derive(Debug, Clone, Default)]
pub struct SignalAggregator {
    config: AggregatorConfig,
}

impl SignalAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn combine(
        &self,
        signals: &NamedSignalSet,
        modifiers: Option<&MacroModifiers>,
    ) -> CombinedSignal {
        let mut buy_raw = 0.0;
        let mut sell_raw = 0.0;
        let mut total_weight = 0.0;
        let mut top_buy: Option<(&str, f64)> = None;
        let mut top_sell: Option<(&str, f64)> = None;

        for (name, signal) in signals {
            let weight = self.config.weight_for(name);
            total_weight += weight;
            let contribution = signal.strength() * weight;
            let (score, top) = match signal.direction() {
                SignalDirection::Buy => (&mut buy_raw, &mut top_buy),
                SignalDirection::Sell => (&mut sell_raw, &mut top_sell),
                SignalDirection::Neutral => continue,
            };
            *score += contribution;
            if top.is_none_or(|(_, best)| contribution > best) {
                *top = Some((name.as_str(), contribution));
            }
        }

        if total_weight <= 0.0 {
            return CombinedSignal::neutral(0.0, 0.0);
        }

        let (buy_factor, sell_factor) = modifiers
            .map(|m| self.config.macro_factors.side_factors(m))
            .unwrap_or((1.0, 1.0));

        let buy_score = (buy_raw * buy_factor / total_weight).clamp(0.0, MAX_STRENGTH);
        let sell_score = (sell_raw * sell_factor / total_weight).clamp(0.0, MAX_STRENGTH);

        let (direction, strength, dominant) = if buy_score > sell_score {
            (SignalDirection::Buy, buy_score, top_buy)
        } else if sell_score > buy_score {
            (SignalDirection::Sell, sell_score, top_sell)
        } else {
            (SignalDirection::Neutral, 0.0, None)
        };

        let mut combined = if direction == SignalDirection::Neutral
            || strength < self.config.min_threshold
            || strength <= 0.0
        {
            CombinedSignal::neutral(buy_score, sell_score)
        } else {
            CombinedSignal {
                direction,
                strength,
                buy_score,
                sell_score,
                dominant_strategy: dominant.map(|(name, _)| name.to_string()),
                metadata: BTreeMap::new(),
            }
        };

        combined.metadata.insert("total_weight".to_string(), total_weight);
        combined.metadata.insert("buy_factor".to_string(), buy_factor);
        combined.metadata.insert("sell_factor".to_string(), sell_factor);
        combined
    }
}
