//! Pricing Rule Resolver Module
//!
//! Resolves the nightly rate for a stay from the room's base price
//! and the active pricing rule set. Exactly one rule applies per
//! resolution; rules never stack.

mod resolver;

pub use resolver::*;
