// Signal analysis and the trading loop
pub mod analyst;
pub mod trader_session;
