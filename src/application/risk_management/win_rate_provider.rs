use crate::domain::trading::signal::{CombinedSignal, MAX_STRENGTH};
use crate::domain::trading::trader_state::TraderState;

/// Source of per-strategy closed-trade win rates.
pub trait WinRateProvider: Send + Sync {
    /// `(win_rate, sample_size)` for `strategy`, if any trade of it has closed.
    fn win_rate(&self, strategy: &str) -> Option<(f64, usize)>;
}

impl WinRateProvider for TraderState {
    fn win_rate(&self, strategy: &str) -> Option<(f64, usize)> {
        self.strategy_win_rate(strategy)
    }
}

/// Fixed win rate, for tests and dry runs.
pub struct StaticWinRateProvider {
    win_rate: f64,
    sample_size: usize,
}

impl StaticWinRateProvider {
    pub fn new(win_rate: f64, sample_size: usize) -> Self {
        Self {
            win_rate,
            sample_size,
        }
    }
}

impl WinRateProvider for StaticWinRateProvider {
    fn win_rate(&self, _strategy: &str) -> Option<(f64, usize)> {
        Some((self.win_rate, self.sample_size))
    }
}

/// Estimated chance that an entry on `combined` ends in profit.
///
/// Uses the dominant strategy's track record once it has `min_trades`
/// closed trades; before that, the combined strength scaled to 0..1.
pub fn profit_probability(
    provider: &dyn WinRateProvider,
    combined: &CombinedSignal,
    min_trades: usize,
) -> f64 {
    let historical = combined
        .dominant_strategy
        .as_deref()
        .and_then(|strategy| provider.win_rate(strategy))
        .filter(|(_, samples)| *samples >= min_trades);

    match historical {
        Some((rate, _)) => rate.clamp(0.0, 1.0),
        None => (combined.strength / MAX_STRENGTH).clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trading::signal::SignalDirection;
    use std::collections::BTreeMap;

    fn combined(strength: f64) -> CombinedSignal {
        CombinedSignal {
            direction: SignalDirection::Buy,
            strength,
            buy_score: strength,
            sell_score: 0.0,
            dominant_strategy: Some("MACD".to_string()),
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn test_falls_back_to_strength_without_history() {
        let provider = StaticWinRateProvider::new(0.9, 4);
        assert!((profit_probability(&provider, &combined(62.0), 5) - 0.62).abs() < 1e-12);
    }

    #[test]
    fn test_uses_history_once_sample_is_large_enough() {
        let provider = StaticWinRateProvider::new(0.4, 5);
        assert_eq!(profit_probability(&provider, &combined(90.0), 5), 0.4);
    }

    #[test]
    fn test_no_dominant_strategy_uses_strength() {
        let provider = StaticWinRateProvider::new(0.1, 100);
        let mut signal = combined(70.0);
        signal.dominant_strategy = None;
        assert!((profit_probability(&provider, &signal, 5) - 0.7).abs() < 1e-12);
    }
}
