use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    /// Share of the starting balance risked per trade while not in profit.
    pub risk_per_trade_fraction: Decimal,
    /// Share of accumulated profit risked per trade once in profit.
    pub profit_fraction: Decimal,
    /// Decimal places kept in the order size (truncated, never rounded up).
    pub size_decimals: u32,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            risk_per_trade_fraction: dec!(0.01),
            profit_fraction: dec!(0.5),
            size_decimals: 6,
        }
    }
}

pub struct SizingEngine;

impl SizingEngine {
    /// Capital committed to the next trade.
    ///
    /// In profit: a share of the profit. Otherwise: a share of the starting
    /// balance. Never more than the current balance.
    pub fn risk_capital(
        config: &SizingConfig,
        start_balance: Decimal,
        current_balance: Decimal,
    ) -> Decimal {
        let capital = if current_balance > start_balance {
            (current_balance - start_balance) * config.profit_fraction
        } else {
            start_balance * config.risk_per_trade_fraction
        };
        capital.min(current_balance).max(Decimal::ZERO)
    }

    /// Order size for `price`. Zero when nothing can be bought.
    pub fn calculate_quantity(
        config: &SizingConfig,
        start_balance: Decimal,
        current_balance: Decimal,
        price: Decimal,
        symbol: &str,
    ) -> Decimal {
        if price <= Decimal::ZERO || current_balance <= Decimal::ZERO {
            debug!(
                "SizingEngine [{}]: cannot size (balance={}, price={})",
                symbol, current_balance, price
            );
            return Decimal::ZERO;
        }

        let capital = Self::risk_capital(config, start_balance, current_balance);
        let quantity = (capital / price)
            .round_dp_with_strategy(config.size_decimals, RoundingStrategy::ToZero);

        debug!(
            "SizingEngine [{}]: {} units (${} / ${} per unit)",
            symbol, quantity, capital, price
        );
        quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_in_profit_risks_fraction_of_start() {
        let config = SizingConfig::default();
        let qty = SizingEngine::calculate_quantity(&config, dec!(10000), dec!(9500), dec!(50), "BTC");
        // 10000 * 0.01 / 50
        assert_eq!(qty, dec!(2));
    }

    #[test]
    fn test_in_profit_risks_half_the_profit() {
        let config = SizingConfig::default();
        let capital = SizingEngine::risk_capital(&config, dec!(1000), dec!(1400));
        assert_eq!(capital, dec!(200));
    }

    #[test]
    fn test_capped_at_current_balance() {
        let config = SizingConfig {
            risk_per_trade_fraction: dec!(0.5),
            ..Default::default()
        };
        let capital = SizingEngine::risk_capital(&config, dec!(1000), dec!(100));
        assert_eq!(capital, dec!(100));
    }

    #[test]
    fn test_size_is_truncated_to_six_places() {
        let config = SizingConfig::default();
        let qty = SizingEngine::calculate_quantity(&config, dec!(1000), dec!(1000), dec!(3), "ETH");
        assert_eq!(qty, dec!(3.333333));
    }

    #[test]
    fn test_zero_price_or_balance_gives_zero() {
        let config = SizingConfig::default();
        assert_eq!(
            SizingEngine::calculate_quantity(&config, dec!(1000), dec!(1000), Decimal::ZERO, "X"),
            Decimal::ZERO
        );
        assert_eq!(
            SizingEngine::calculate_quantity(&config, dec!(1000), Decimal::ZERO, dec!(10), "X"),
            Decimal::ZERO
        );
    }
}
