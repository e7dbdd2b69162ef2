// Analyst and trader session
pub mod agents;

// Entry/exit gates, sizing and profit probability
pub mod risk_management;

// Indicator strategies and signal aggregation
pub mod strategies;

// Wiring from configuration to a running session
pub mod system;
