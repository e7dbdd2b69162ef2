// Core trading domain entities and value objects
pub mod position;
pub mod signal;
pub mod trader_state;
pub mod types;
