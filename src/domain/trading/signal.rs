use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Upper bound of every strength value.
pub const MAX_STRENGTH: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalDirection {
    Buy,
    Sell,
    Neutral,
}

impl SignalDirection {
    pub fn opposite(&self) -> Self {
        match self {
            SignalDirection::Buy => SignalDirection::Sell,
            SignalDirection::Sell => SignalDirection::Buy,
            SignalDirection::Neutral => SignalDirection::Neutral,
        }
    }
}

impl fmt::Display for SignalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalDirection::Buy => write!(f, "BUY"),
            SignalDirection::Sell => write!(f, "SELL"),
            SignalDirection::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Output of one strategy: a direction and a 0-100 strength.
///
/// Constructed only through [`Signal::new`] / [`Signal::neutral`], which keep
/// `direction == Neutral <=> strength == 0` and clamp strength to 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    direction: SignalDirection,
    strength: f64,
    /// Diagnostic values only; never read by decision logic.
    #[serde(default)]
    pub metadata: BTreeMap<String, f64>,
}

impl Signal {
    pub fn new(direction: SignalDirection, strength: f64) -> Self {
        if direction == SignalDirection::Neutral || !strength.is_finite() || strength <= 0.0 {
            return Self::neutral();
        }
        Self {
            direction,
            strength: strength.min(MAX_STRENGTH),
            metadata: BTreeMap::new(),
        }
    }

    pub fn buy(strength: f64) -> Self {
        Self::new(SignalDirection::Buy, strength)
    }

    pub fn sell(strength: f64) -> Self {
        Self::new(SignalDirection::Sell, strength)
    }

    pub fn neutral() -> Self {
        Self {
            direction: SignalDirection::Neutral,
            strength: 0.0,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a diagnostic value. Non-finite values are dropped.
    pub fn with_meta(mut self, key: &str, value: f64) -> Self {
        if value.is_finite() {
            self.metadata.insert(key.to_string(), value);
        }
        self
    }

    pub fn direction(&self) -> SignalDirection {
        self.direction
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    pub fn is_neutral(&self) -> bool {
        self.direction == SignalDirection::Neutral
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Strategy name -> signal for one evaluation of the battery.
pub type NamedSignalSet = BTreeMap<String, Signal>;

/// Aggregated decision plus the per-side score breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedSignal {
    pub direction: SignalDirection,
    pub strength: f64,
    pub buy_score: f64,
    pub sell_score: f64,
    /// Strategy with the largest weighted contribution on the winning side.
    pub dominant_strategy: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, f64>,
}

impl CombinedSignal {
    pub fn neutral(buy_score: f64, sell_score: f64) -> Self {
        Self {
            direction: SignalDirection::Neutral,
            strength: 0.0,
            buy_score,
            sell_score,
            dominant_strategy: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.direction == SignalDirection::Neutral
    }
}
