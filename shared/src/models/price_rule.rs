//! Pricing rule model.
//!
//! Rules are read-only to the stay engine; an external rule manager
//! owns their lifecycle. Resolution picks exactly one rule per stay
//! (highest priority, ties broken by most recent creation). Rules do
//! not stack.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How a rule's discount is computed from the nightly base price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `discount_value` percent of the base price.
    Percentage,
    /// `discount_value` as an absolute amount per night.
    Fixed,
}

/// A discount rule against a room type (or all types).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingRule {
    pub id: String,
    pub name: String,
    /// None applies to every room type.
    pub room_type_id: Option<String>,
    /// Higher wins; ties broken by `created_at`, newest first.
    pub priority: i32,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    /// Rule is applicable only when the stay range falls inside the
    /// validity window: `start_date <= check_in` and
    /// `end_date >= check_out`.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: i64,
}

impl PricingRule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        priority: i32,
        discount_type: DiscountType,
        discount_value: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            room_type_id: None,
            priority,
            discount_type,
            discount_value,
            start_date: None,
            end_date: None,
            is_active: true,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}
