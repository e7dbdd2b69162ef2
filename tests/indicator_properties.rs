//! Property tests for the indicator battery and the aggregator.

mod common;

use chrono::Duration;
use common::start_time;
use confluence::application::strategies::{SignalAggregator, StrategyBattery};
use confluence::domain::market::candle::Candle;
use confluence::domain::market::macro_context::{DollarTrend, MacroModifiers, MacroRiskLevel};
use confluence::domain::trading::signal::{NamedSignalSet, Signal, SignalDirection};
use proptest::prelude::*;

// ── Generators ───────────────────────────────────────────────────────

/// Positive OHLC series built from bounded percentage steps.
fn arb_candles(len: impl Into<prop::collection::SizeRange>) -> impl Strategy<Value = Vec<Candle>> {
    prop::collection::vec((-3.0..3.0_f64, 0.0..1.5_f64, 0.0..1.5_f64, 10.0..5000.0_f64), len)
        .prop_map(|steps| {
            let mut close = 100.0;
            steps
                .into_iter()
                .enumerate()
                .map(|(i, (step, up, down, volume))| {
                    let open = close;
                    close = (close * (1.0 + step / 100.0)).max(0.01);
                    let high = open.max(close) * (1.0 + up / 100.0);
                    let low = open.min(close) * (1.0 - down / 100.0);
                    Candle::new(start_time() + Duration::hours(i as i64), open, high, low, close)
                        .with_volume(volume)
                })
                .collect()
        })
}

fn arb_signal() -> impl Strategy<Value = Signal> {
    prop_oneof![
        Just(Signal::neutral()),
        (0.0..=100.0_f64).prop_map(Signal::buy),
        (0.0..=100.0_f64).prop_map(Signal::sell),
    ]
}

fn arb_signal_set() -> impl Strategy<Value = NamedSignalSet> {
    let names = StrategyBattery::default().names();
    prop::collection::vec(arb_signal(), names.len()).prop_map(move |signals| {
        names
            .iter()
            .map(|name| name.to_string())
            .zip(signals)
            .collect()
    })
}

fn arb_modifiers() -> impl Strategy<Value = MacroModifiers> {
    (
        prop::option::of(0u8..=100),
        prop::option::of(prop_oneof![
            Just(DollarTrend::Rising),
            Just(DollarTrend::Flat),
            Just(DollarTrend::Falling)
        ]),
        prop::option::of(5.0..60.0_f64),
        prop::option::of(prop_oneof![
            Just(MacroRiskLevel::Low),
            Just(MacroRiskLevel::Normal),
            Just(MacroRiskLevel::Elevated),
            Just(MacroRiskLevel::Extreme)
        ]),
    )
        .prop_map(|(fear_index, dxy_trend, vix, risk_level)| MacroModifiers {
            fear_index,
            dxy_trend,
            vix,
            risk_level,
        })
}

// ── Strategies ───────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every strategy keeps strength in range and ties neutrality to zero strength.
    #[test]
    fn strategy_signals_are_well_formed(candles in arb_candles(1..120)) {
        let signals = StrategyBattery::default().evaluate(&candles);
        prop_assert_eq!(signals.len(), 17);
        for (name, signal) in &signals {
            prop_assert!(
                (0.0..=100.0).contains(&signal.strength()),
                "{} strength {}", name, signal.strength()
            );
            prop_assert_eq!(
                signal.is_neutral(),
                signal.strength() == 0.0,
                "{} direction/strength mismatch", name
            );
        }
    }

    /// Below its warm-up length a strategy has nothing to say.
    #[test]
    fn short_history_is_neutral(candles in arb_candles(1..120)) {
        let battery = StrategyBattery::default();
        let signals = battery.evaluate(&candles);
        let config = confluence::application::strategies::StrategyConfig::default();
        let warmups = warmups(&config);
        for (name, min) in warmups {
            if candles.len() < min {
                prop_assert!(signals[name].is_neutral(), "{} fired on {} candles", name, candles.len());
            }
        }
    }

    /// Evaluation is a pure function of the series.
    #[test]
    fn strategies_are_deterministic(candles in arb_candles(30..90)) {
        let battery = StrategyBattery::default();
        prop_assert_eq!(battery.evaluate(&candles), battery.evaluate(&candles));
    }
}

fn warmups(
    config: &confluence::application::strategies::StrategyConfig,
) -> Vec<(&'static str, usize)> {
    use confluence::application::strategies::TechnicalStrategy;
    let strategies: Vec<&dyn TechnicalStrategy> = vec![
        &config.mean_reversion,
        &config.ema_crossover,
        &config.rsi_divergence,
        &config.bollinger_squeeze,
        &config.adx_trend,
        &config.supertrend,
        &config.heikin_ashi,
        &config.fibonacci,
        &config.fractals,
        &config.cci,
        &config.stochastic,
        &config.williams_r,
        &config.parabolic_sar,
        &config.vwap,
        &config.range_breakout,
        &config.rsi_momentum,
        &config.macd,
    ];
    strategies
        .into_iter()
        .map(|s| (s.name(), s.min_candles()))
        .collect()
}

// ── Aggregator ───────────────────────────────────────────────────────

proptest! {
    /// Combined output respects the threshold rule and its own score breakdown.
    #[test]
    fn combined_signal_follows_scores(
        signals in arb_signal_set(),
        modifiers in prop::option::of(arb_modifiers()),
    ) {
        let aggregator = SignalAggregator::default();
        let threshold = aggregator.config().min_threshold;
        let combined = aggregator.combine(&signals, modifiers.as_ref());

        prop_assert!((0.0..=100.0).contains(&combined.buy_score));
        prop_assert!((0.0..=100.0).contains(&combined.sell_score));
        match combined.direction {
            SignalDirection::Buy => {
                prop_assert!(combined.buy_score > combined.sell_score);
                prop_assert_eq!(combined.strength, combined.buy_score);
                prop_assert!(combined.strength >= threshold);
                prop_assert!(combined.dominant_strategy.is_some());
            }
            SignalDirection::Sell => {
                prop_assert!(combined.sell_score > combined.buy_score);
                prop_assert_eq!(combined.strength, combined.sell_score);
                prop_assert!(combined.strength >= threshold);
                prop_assert!(combined.dominant_strategy.is_some());
            }
            SignalDirection::Neutral => {
                prop_assert_eq!(combined.strength, 0.0);
                let best = combined.buy_score.max(combined.sell_score);
                prop_assert!(combined.buy_score == combined.sell_score || best < threshold);
            }
        }
    }

    /// Same inputs, same decision.
    #[test]
    fn aggregation_is_idempotent(
        signals in arb_signal_set(),
        modifiers in prop::option::of(arb_modifiers()),
    ) {
        let aggregator = SignalAggregator::default();
        let first = aggregator.combine(&signals, modifiers.as_ref());
        let second = aggregator.combine(&signals, modifiers.as_ref());
        prop_assert_eq!(first, second);
    }

    /// An all-neutral battery never produces a direction.
    #[test]
    fn neutral_battery_stays_neutral(modifiers in prop::option::of(arb_modifiers())) {
        let signals: NamedSignalSet = StrategyBattery::default()
            .names()
            .into_iter()
            .map(|name| (name.to_string(), Signal::neutral()))
            .collect();
        let combined = SignalAggregator::default().combine(&signals, modifiers.as_ref());
        prop_assert_eq!(combined.direction, SignalDirection::Neutral);
    }
}
