// Entry/exit decisions, sizing and profit probability
pub mod position_manager;
pub mod sizing_engine;
pub mod win_rate_provider;
