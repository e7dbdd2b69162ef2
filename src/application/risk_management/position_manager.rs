use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::sizing_engine::{SizingConfig, SizingEngine};
use super::win_rate_provider::profit_probability;
use crate::domain::market::macro_context::MacroRiskLevel;
use crate::domain::risk::risk_level::{EntryThresholds, RiskLevel};
use crate::domain::trading::position::Position;
use crate::domain::trading::signal::CombinedSignal;
use crate::domain::trading::trader_state::TraderState;
use crate::domain::trading::types::{ExitReason, OrderRequest, OrderType, Side};

/// Entry gates, protective stops and sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub risk_level: RiskLevel,
    pub thresholds: EntryThresholds,
    pub min_win_probability: f64,
    /// Combined strength at which the probability gate is waived.
    pub high_confidence_strength: f64,
    /// Closed trades needed before a strategy's own win rate is trusted.
    pub min_trades_for_history: usize,
    pub stop_loss_pct: Decimal,
    pub take_profit_pct: Decimal,
    pub stop_loss_enabled: bool,
    pub take_profit_enabled: bool,
    /// Opposing combined strength that closes an open position.
    pub opposing_exit_strength: f64,
    pub sizing: SizingConfig,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_level: RiskLevel::Medium,
            thresholds: EntryThresholds::default(),
            min_win_probability: 0.55,
            high_confidence_strength: 80.0,
            min_trades_for_history: 5,
            stop_loss_pct: dec!(2),
            take_profit_pct: dec!(4),
            stop_loss_enabled: true,
            take_profit_enabled: true,
            opposing_exit_strength: 40.0,
            sizing: SizingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryPlan {
    pub side: Side,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub stop_loss_price: Option<Decimal>,
    pub take_profit_price: Option<Decimal>,
    pub strategy_label: String,
    pub probability: f64,
}

impl EntryPlan {
    pub fn order_request(&self, symbol: &str) -> OrderRequest {
        OrderRequest {
            symbol: symbol.to_string(),
            side: self.side.entry_order_side(),
            order_type: OrderType::Market,
            quantity: self.size,
            price: self.entry_price,
        }
    }

    pub fn into_position(self, symbol: &str, id: String, entry_time: DateTime<Utc>) -> Position {
        Position {
            id,
            symbol: symbol.to_string(),
            side: self.side,
            entry_price: self.entry_price,
            entry_time,
            size: self.size,
            strategy_label: self.strategy_label,
            stop_loss_price: self.stop_loss_price,
            take_profit_price: self.take_profit_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    PositionOpen,
    NeutralSignal,
    BelowThreshold { strength: f64, required: f64 },
    LowProbability { probability: f64, required: f64 },
    ZeroSize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryDecision {
    Enter(EntryPlan),
    Skip(SkipReason),
}

/// Bar data an exit is checked against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitInput {
    /// Latest close; exit price for signal-driven exits.
    pub close: Decimal,
    pub bar_high: Decimal,
    pub bar_low: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitDecision {
    pub reason: ExitReason,
    pub exit_price: Decimal,
}

/// Decides when positions open and close. Holds no state of its own.
#[derive(Debug, Clone, Default)]
pub struct PositionManager {
    config: RiskConfig,
}

impl PositionManager {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn evaluate_entry(
        &self,
        symbol: &str,
        combined: &CombinedSignal,
        macro_risk: MacroRiskLevel,
        state: &TraderState,
        price: Decimal,
    ) -> EntryDecision {
        if state.has_position(symbol) {
            return EntryDecision::Skip(SkipReason::PositionOpen);
        }
        let Some(side) = Side::from_signal(combined.direction) else {
            return EntryDecision::Skip(SkipReason::NeutralSignal);
        };

        let required = self
            .config
            .thresholds
            .required_strength(self.config.risk_level, macro_risk);
        if combined.strength < required {
            debug!(
                "PositionManager [{}]: {} strength {:.1} below threshold {:.1}",
                symbol, combined.direction, combined.strength, required
            );
            return EntryDecision::Skip(SkipReason::BelowThreshold {
                strength: combined.strength,
                required,
            });
        }

        let probability =
            profit_probability(state, combined, self.config.min_trades_for_history);
        let high_confidence = combined.strength >= self.config.high_confidence_strength;
        if probability < self.config.min_win_probability && !high_confidence {
            debug!(
                "PositionManager [{}]: profit probability {:.2} below {:.2}",
                symbol, probability, self.config.min_win_probability
            );
            return EntryDecision::Skip(SkipReason::LowProbability {
                probability,
                required: self.config.min_win_probability,
            });
        }

        let size = SizingEngine::calculate_quantity(
            &self.config.sizing,
            state.start_balance,
            state.current_balance,
            price,
            symbol,
        );
        if size <= Decimal::ZERO {
            return EntryDecision::Skip(SkipReason::ZeroSize);
        }

        let (stop_loss_price, take_profit_price) = self.protective_prices(side, price);
        let strategy_label = combined
            .dominant_strategy
            .clone()
            .unwrap_or_else(|| "Confluence".to_string());

        info!(
            "PositionManager [{}]: entry approved {} {} @ {} (strength={:.1}, p={:.2}, via {})",
            symbol, side, size, price, combined.strength, probability, strategy_label
        );

        EntryDecision::Enter(EntryPlan {
            side,
            size,
            entry_price: price,
            stop_loss_price,
            take_profit_price,
            strategy_label,
            probability,
        })
    }

    fn protective_prices(&self, side: Side, price: Decimal) -> (Option<Decimal>, Option<Decimal>) {
        let sl = self.config.stop_loss_pct / Decimal::ONE_HUNDRED;
        let tp = self.config.take_profit_pct / Decimal::ONE_HUNDRED;
        let (stop_loss, take_profit) = match side {
            Side::Long => (price * (Decimal::ONE - sl), price * (Decimal::ONE + tp)),
            Side::Short => (price * (Decimal::ONE + sl), price * (Decimal::ONE - tp)),
        };
        (
            self.config.stop_loss_enabled.then_some(stop_loss),
            self.config.take_profit_enabled.then_some(take_profit),
        )
    }

    /// First exit trigger that fires, in order: stop-loss, take-profit, opposing signal.
    pub fn evaluate_exit(
        &self,
        position: &Position,
        combined: &CombinedSignal,
        input: &ExitInput,
    ) -> Option<ExitDecision> {
        if let Some(stop) = position.stop_loss_price {
            let hit = match position.side {
                Side::Long => input.bar_low <= stop,
                Side::Short => input.bar_high >= stop,
            };
            if hit {
                return Some(ExitDecision {
                    reason: ExitReason::StopLoss,
                    exit_price: stop,
                });
            }
        }

        if let Some(target) = position.take_profit_price {
            let hit = match position.side {
                Side::Long => input.bar_high >= target,
                Side::Short => input.bar_low <= target,
            };
            if hit {
                return Some(ExitDecision {
                    reason: ExitReason::TakeProfit,
                    exit_price: target,
                });
            }
        }

        if combined.direction == position.side.opposing_direction()
            && combined.strength >= self.config.opposing_exit_strength
        {
            return Some(ExitDecision {
                reason: ExitReason::OpposingSignal,
                exit_price: input.close,
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trading::signal::SignalDirection;
    use crate::domain::trading::types::ExitReason;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn combined(direction: SignalDirection, strength: f64) -> CombinedSignal {
        CombinedSignal {
            direction,
            strength,
            buy_score: 0.0,
            sell_score: 0.0,
            dominant_strategy: Some("Supertrend".to_string()),
            metadata: BTreeMap::new(),
        }
    }

    fn state() -> TraderState {
        TraderState::new(dec!(10000), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
    }

    fn position(side: Side, entry: Decimal) -> Position {
        let manager = PositionManager::default();
        let (sl, tp) = manager.protective_prices(side, entry);
        Position {
            id: "p-1".to_string(),
            symbol: "BTC".to_string(),
            side,
            entry_price: entry,
            entry_time: Utc::now(),
            size: dec!(1),
            strategy_label: "Supertrend".to_string(),
            stop_loss_price: sl,
            take_profit_price: tp,
        }
    }

    fn bar(close: Decimal, high: Decimal, low: Decimal) -> ExitInput {
        ExitInput {
            close,
            bar_high: high,
            bar_low: low,
        }
    }

    #[test]
    fn test_strong_sell_opens_short_with_stops() {
        let manager = PositionManager::default();
        let decision = manager.evaluate_entry(
            "BTC",
            &combined(SignalDirection::Sell, 80.0),
            MacroRiskLevel::Normal,
            &state(),
            dec!(100),
        );
        let EntryDecision::Enter(plan) = decision else {
            panic!("expected entry, got {:?}", decision);
        };
        assert_eq!(plan.side, Side::Short);
        assert_eq!(plan.size, dec!(1));
        assert_eq!(plan.stop_loss_price, Some(dec!(102)));
        assert_eq!(plan.take_profit_price, Some(dec!(96)));
    }

    #[test]
    fn test_below_threshold_is_skipped() {
        let manager = PositionManager::default();
        let decision = manager.evaluate_entry(
            "BTC",
            &combined(SignalDirection::Buy, 64.9),
            MacroRiskLevel::Normal,
            &state(),
            dec!(100),
        );
        assert!(matches!(
            decision,
            EntryDecision::Skip(SkipReason::BelowThreshold { .. })
        ));
    }

    #[test]
    fn test_macro_escalation_raises_bar() {
        let manager = PositionManager::default();
        let decision = manager.evaluate_entry(
            "BTC",
            &combined(SignalDirection::Buy, 72.0),
            MacroRiskLevel::Extreme,
            &state(),
            dec!(100),
        );
        assert!(matches!(
            decision,
            EntryDecision::Skip(SkipReason::BelowThreshold { required, .. }) if required == 75.0
        ));
    }

    #[test]
    fn test_poor_track_record_blocks_unless_high_confidence() {
        let manager = PositionManager::default();
        let mut state = state();
        for _ in 0..5 {
            state.open_position(position(Side::Long, dec!(100))).unwrap();
            state
                .close_position("BTC", "p-1", dec!(99), Utc::now(), ExitReason::StopLoss)
                .unwrap();
        }

        let decision = manager.evaluate_entry(
            "BTC",
            &combined(SignalDirection::Buy, 70.0),
            MacroRiskLevel::Normal,
            &state,
            dec!(100),
        );
        assert!(matches!(
            decision,
            EntryDecision::Skip(SkipReason::LowProbability { probability, .. }) if probability == 0.0
        ));

        let decision = manager.evaluate_entry(
            "BTC",
            &combined(SignalDirection::Buy, 85.0),
            MacroRiskLevel::Normal,
            &state,
            dec!(100),
        );
        assert!(matches!(decision, EntryDecision::Enter(_)));
    }

    #[test]
    fn test_existing_position_blocks_entry() {
        let manager = PositionManager::default();
        let mut state = state();
        state.open_position(position(Side::Long, dec!(100))).unwrap();
        let decision = manager.evaluate_entry(
            "BTC",
            &combined(SignalDirection::Buy, 95.0),
            MacroRiskLevel::Normal,
            &state,
            dec!(100),
        );
        assert_eq!(decision, EntryDecision::Skip(SkipReason::PositionOpen));
    }

    #[test]
    fn test_stop_loss_wins_when_both_breach() {
        let manager = PositionManager::default();
        let long = position(Side::Long, dec!(100));
        let exit = manager
            .evaluate_exit(
                &long,
                &combined(SignalDirection::Neutral, 0.0),
                &bar(dec!(100), dec!(105), dec!(97)),
            )
            .unwrap();
        assert_eq!(exit.reason, ExitReason::StopLoss);
        assert_eq!(exit.exit_price, dec!(98));
    }

    #[test]
    fn test_take_profit_exits_at_target() {
        let manager = PositionManager::default();
        let short = position(Side::Short, dec!(100));
        let exit = manager
            .evaluate_exit(
                &short,
                &combined(SignalDirection::Buy, 90.0),
                &bar(dec!(96.5), dec!(99), dec!(95)),
            )
            .unwrap();
        assert_eq!(exit.reason, ExitReason::TakeProfit);
        assert_eq!(exit.exit_price, dec!(96));
    }

    #[test]
    fn test_opposing_signal_exits_at_close() {
        let manager = PositionManager::default();
        let long = position(Side::Long, dec!(100));
        let input = bar(dec!(101), dec!(101.5), dec!(100.5));

        let weak = manager.evaluate_exit(&long, &combined(SignalDirection::Sell, 39.9), &input);
        assert!(weak.is_none());

        let exit = manager
            .evaluate_exit(&long, &combined(SignalDirection::Sell, 40.0), &input)
            .unwrap();
        assert_eq!(exit.reason, ExitReason::OpposingSignal);
        assert_eq!(exit.exit_price, dec!(101));
    }

    #[test]
    fn test_disabled_stops_are_absent() {
        let manager = PositionManager::new(RiskConfig {
            stop_loss_enabled: false,
            take_profit_enabled: false,
            ..Default::default()
        });
        let (sl, tp) = manager.protective_prices(Side::Long, dec!(100));
        assert!(sl.is_none() && tp.is_none());
    }
}
