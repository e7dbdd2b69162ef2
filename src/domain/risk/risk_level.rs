use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::market::macro_context::MacroRiskLevel;

/// Operator-selected risk setting.
///
/// Higher settings demand stronger aggregated signals before a position is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

/// Minimum combined strength to enter, per risk level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryThresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    /// Added on top when the macro provider flags an elevated regime.
    pub elevated_escalation: f64,
    /// Added on top when the macro provider flags an extreme regime.
    pub extreme_escalation: f64,
}

impl Default for EntryThresholds {
    fn default() -> Self {
        Self {
            low: 50.0,
            medium: 65.0,
            high: 75.0,
            elevated_escalation: 5.0,
            extreme_escalation: 10.0,
        }
    }
}

impl EntryThresholds {
    /// Required strength for `level`, escalated by the macro regime.
    pub fn required_strength(&self, level: RiskLevel, macro_risk: MacroRiskLevel) -> f64 {
        let base = match level {
            RiskLevel::Low => self.low,
            RiskLevel::Medium => self.medium,
            RiskLevel::High => self.high,
        };
        let escalation = match macro_risk {
            MacroRiskLevel::Low | MacroRiskLevel::Normal => 0.0,
            MacroRiskLevel::Elevated => self.elevated_escalation,
            MacroRiskLevel::Extreme => self.extreme_escalation,
        };
        base + escalation
    }
}

impl FromStr for RiskLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" | "med" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            _ => bail!("Invalid RISK_LEVEL: {}. Must be 'low', 'medium' or 'high'", s),
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_thresholds() {
        let t = EntryThresholds::default();
        assert_eq!(t.required_strength(RiskLevel::Low, MacroRiskLevel::Normal), 50.0);
        assert_eq!(t.required_strength(RiskLevel::Medium, MacroRiskLevel::Normal), 65.0);
        assert_eq!(t.required_strength(RiskLevel::High, MacroRiskLevel::Low), 75.0);
    }

    #[test]
    fn test_macro_escalation() {
        let t = EntryThresholds::default();
        assert_eq!(t.required_strength(RiskLevel::Medium, MacroRiskLevel::Elevated), 70.0);
        assert_eq!(t.required_strength(RiskLevel::High, MacroRiskLevel::Extreme), 85.0);
    }

    #[test]
    fn test_parse() {
        assert_eq!("LOW".parse::<RiskLevel>().unwrap(), RiskLevel::Low);
        assert_eq!("medium".parse::<RiskLevel>().unwrap(), RiskLevel::Medium);
        assert!("reckless".parse::<RiskLevel>().is_err());
    }
}
