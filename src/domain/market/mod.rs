pub mod candle;
pub mod macro_context;
pub mod timeframe;
