//! Shared domain types for the front-desk engine.
//!
//! Everything that crosses the boundary between the engine and its
//! collaborators lives here: commands, events, stay snapshots, and the
//! room / pricing-rule catalog models. All types are serde-serializable
//! so they can be persisted and replayed verbatim.

pub mod models;
pub mod stay;
pub mod util;
