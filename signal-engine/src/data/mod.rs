//! Market data module
//!
//! OHLC candle parsing and close-price history.

pub mod candle;

pub use candle::*;
