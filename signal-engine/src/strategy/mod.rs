//! Strategy module
//!
//! Trade decision types and the threshold/RSI decision policy.

pub mod policy;
pub mod signal;

pub use policy::*;
pub use signal::*;
