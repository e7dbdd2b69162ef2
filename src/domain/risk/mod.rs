// Risk management domain
pub mod risk_level;
