pub mod core;
pub mod csv_market_data;
pub mod mock;
pub mod notifier;
pub mod observability;
pub mod persistence;
pub mod sentiment;

pub use csv_market_data::CsvMarketDataService;
pub use mock::{ManualClock, MockExecutionService, MockMarketDataService, StaticMacroProvider};
pub use notifier::LogNotifier;
