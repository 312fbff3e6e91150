//! Catalog models: rooms and pricing rules.

pub mod price_rule;
pub mod room;

pub use price_rule::{DiscountType, PricingRule};
pub use room::{Room, RoomStatus};
