//! Configuration module

pub mod params;

pub use params::*;
