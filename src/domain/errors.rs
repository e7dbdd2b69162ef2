use thiserror::Error;

/// Errors raised by the trading core and its collaborators.
///
/// Indicator code never produces these: insufficient history degrades to a
/// neutral signal. Only the orchestration layer (candle fetch, price fetch,
/// order placement, state transitions) reports them.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("Market data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("Price unavailable for {symbol}: {reason}")]
    PriceUnavailable { symbol: String, reason: String },

    #[error("Order rejected for {symbol}: {reason}")]
    OrderRejected { symbol: String, reason: String },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("{operation} timed out after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },
}

impl EngineError {
    pub fn data_unavailable(symbol: &str, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }

    pub fn price_unavailable(symbol: &str, reason: impl Into<String>) -> Self {
        Self::PriceUnavailable {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }

    pub fn order_rejected(symbol: &str, reason: impl Into<String>) -> Self {
        Self::OrderRejected {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DataUnavailable { .. } => "data_unavailable",
            Self::PriceUnavailable { .. } => "price_unavailable",
            Self::OrderRejected { .. } => "order_rejected",
            Self::InvariantViolation(_) => "invariant_violation",
            Self::Timeout { .. } => "timeout",
        }
    }

    /// Programming-contract failures; everything else is retried on the next cycle.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_formatting() {
        let err = EngineError::order_rejected("BTC/USDT", "insufficient margin");
        let msg = err.to_string();
        assert!(msg.contains("BTC/USDT"));
        assert!(msg.contains("insufficient margin"));
    }

    #[test]
    fn test_timeout_formatting() {
        let err = EngineError::Timeout {
            operation: "fetch_candles".to_string(),
            duration_ms: 5000,
        };
        assert_eq!(err.to_string(), "fetch_candles timed out after 5000ms");
        assert!(!err.is_invariant_violation());
        assert_eq!(err.kind(), "timeout");
        assert!(EngineError::InvariantViolation("dup".into()).is_invariant_violation());
    }
}
