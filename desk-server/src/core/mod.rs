//! Core module: engine configuration and shared state.
//!
//! - [`Config`] loads settings from the environment.
//! - [`StayPolicy`] carries the business policy knobs.
//! - [`EngineState`] wires configuration to the running engine.

pub mod config;
pub mod state;

pub use config::{ChangeDayBilling, Config, StayPolicy};
pub use state::EngineState;
