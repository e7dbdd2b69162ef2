// Candles, timeframes and macro regime inputs
pub mod market;

// Collaborator interfaces
pub mod ports;

// Risk classification
pub mod risk;

// Core trading domain
pub mod trading;

// Domain-specific error types
pub mod errors;
