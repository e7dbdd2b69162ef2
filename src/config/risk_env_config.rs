//! Risk parameters parsed from environment variables.

use super::EnvLookup;
use crate::application::risk_management::position_manager::RiskConfig;
use crate::domain::risk::risk_level::RiskLevel;
use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct RiskEnvConfig {
    pub risk_level: RiskLevel,
    pub start_balance: Decimal,
    pub risk_per_trade_fraction: Decimal,
    pub stop_loss_pct: Decimal,
    pub take_profit_pct: Decimal,
    pub stop_loss_enabled: bool,
    pub take_profit_enabled: bool,
    pub min_win_probability: f64,
    pub opposing_exit_strength: f64,
}

impl RiskEnvConfig {
    pub fn from_lookup(env: &EnvLookup) -> Result<Self> {
        let risk_level = RiskLevel::from_str(&env.string("RISK_LEVEL", "medium"))?;

        let start_balance: Decimal = env.parse("START_BALANCE", dec!(10000))?;
        if start_balance <= Decimal::ZERO {
            anyhow::bail!("START_BALANCE must be positive, got {}", start_balance);
        }

        let risk_per_trade_fraction: Decimal = env.parse("RISK_PER_TRADE_FRACTION", dec!(0.01))?;
        if risk_per_trade_fraction <= Decimal::ZERO || risk_per_trade_fraction > Decimal::ONE {
            anyhow::bail!(
                "RISK_PER_TRADE_FRACTION must be in (0, 1], got {}",
                risk_per_trade_fraction
            );
        }

        let min_win_probability: f64 = env.parse("MIN_WIN_PROBABILITY", 0.55)?;
        if !(0.0..=1.0).contains(&min_win_probability) {
            anyhow::bail!("MIN_WIN_PROBABILITY must be in [0, 1], got {}", min_win_probability);
        }

        Ok(Self {
            risk_level,
            start_balance,
            risk_per_trade_fraction,
            stop_loss_pct: env.parse("STOP_LOSS_PCT", dec!(2))?,
            take_profit_pct: env.parse("TAKE_PROFIT_PCT", dec!(4))?,
            stop_loss_enabled: env.parse_bool("STOP_LOSS_ENABLED", true),
            take_profit_enabled: env.parse_bool("TAKE_PROFIT_ENABLED", true),
            min_win_probability,
            opposing_exit_strength: env.parse("OPPOSING_EXIT_STRENGTH", 40.0)?,
        })
    }

    pub fn to_risk_config(&self) -> RiskConfig {
        let mut config = RiskConfig {
            risk_level: self.risk_level,
            min_win_probability: self.min_win_probability,
            stop_loss_pct: self.stop_loss_pct,
            take_profit_pct: self.take_profit_pct,
            stop_loss_enabled: self.stop_loss_enabled,
            take_profit_enabled: self.take_profit_enabled,
            opposing_exit_strength: self.opposing_exit_strength,
            ..RiskConfig::default()
        };
        config.sizing.risk_per_trade_fraction = self.risk_per_trade_fraction;
        config
    }
}
