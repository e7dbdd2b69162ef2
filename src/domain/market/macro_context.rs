use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentClassification {
    ExtremeFear,
    Fear,
    Neutral,
    Greed,
    ExtremeGreed,
}

impl fmt::Display for SentimentClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExtremeFear => write!(f, "Extreme Fear"),
            Self::Fear => write!(f, "Fear"),
            Self::Neutral => write!(f, "Neutral"),
            Self::Greed => write!(f, "Greed"),
            Self::ExtremeGreed => write!(f, "Extreme Greed"),
        }
    }
}

impl SentimentClassification {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=24 => Self::ExtremeFear,
            25..=44 => Self::Fear,
            45..=55 => Self::Neutral,
            56..=75 => Self::Greed,
            _ => Self::ExtremeGreed,
        }
    }
}

/// Direction of the US dollar index over the provider's reference window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DollarTrend {
    Rising,
    Flat,
    Falling,
}

/// Regime-level risk flag published by the macro provider.
///
/// Anything above `Normal` escalates the entry threshold and damps buy scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum MacroRiskLevel {
    Low,
    #[default]
    Normal,
    Elevated,
    Extreme,
}

/// Optional external regime inputs for the aggregator and entry gate.
///
/// Every field is optional: a provider that only knows the fear index
/// leaves the rest unset and the corresponding adjustments are skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroModifiers {
    /// Fear & Greed index, 0 (extreme fear) to 100 (extreme greed).
    pub fear_index: Option<u8>,
    pub dxy_trend: Option<DollarTrend>,
    pub vix: Option<f64>,
    pub risk_level: Option<MacroRiskLevel>,
}

impl MacroModifiers {
    pub fn sentiment(&self) -> Option<SentimentClassification> {
        self.fear_index.map(SentimentClassification::from_score)
    }

    pub fn risk_level(&self) -> MacroRiskLevel {
        self.risk_level.unwrap_or_default()
    }
}
