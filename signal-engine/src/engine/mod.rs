//! Engine module
//!
//! Cycle orchestration, engine state and the event channel.

pub mod events;
pub mod orchestrator;
pub mod state;

pub use events::*;
pub use orchestrator::*;
pub use state::*;
