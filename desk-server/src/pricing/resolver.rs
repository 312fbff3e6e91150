//! Pricing rule resolution
//!
//! Filters the rule set down to the rules applicable to a room type
//! and stay range, picks the single winner (highest priority, ties
//! broken by most recent creation) and applies its discount to the
//! nightly base price, clamped to `[0, base_price]`.

use crate::stays::money::{to_decimal, to_f64};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::models::{DiscountType, PricingRule};

/// Outcome of one price resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPrice {
    /// Nightly rate after the applied rule, rounded to 2 decimals.
    pub final_price: f64,
    /// Nightly rate before any rule.
    pub base_price: f64,
    /// `base_price - final_price`; zero when no rule applied.
    pub discount: f64,
    pub applied_rule_id: Option<String>,
    pub applied_rule_name: Option<String>,
}

impl ResolvedPrice {
    fn unchanged(base_price: f64) -> Self {
        Self {
            final_price: base_price,
            base_price,
            discount: 0.0,
            applied_rule_id: None,
            applied_rule_name: None,
        }
    }
}

/// Check if a rule applies to a room type and stay range.
///
/// A rule applies when it is active, its `room_type_id` is unset or
/// matches, and the stay range falls inside its validity window:
/// `start_date <= check_in` and `end_date >= check_out`. An unset
/// window bound is unconstrained.
pub fn rule_applies(
    rule: &PricingRule,
    room_type_id: &str,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> bool {
    if !rule.is_active {
        return false;
    }
    if let Some(target) = &rule.room_type_id
        && target != room_type_id
    {
        return false;
    }
    if let Some(start) = rule.start_date
        && start > check_in
    {
        return false;
    }
    if let Some(end) = rule.end_date
        && end < check_out
    {
        return false;
    }
    true
}

/// Resolve the nightly rate for a stay.
///
/// Exactly one rule wins: the applicable rule with the highest
/// `priority`, ties broken by the greatest `created_at`. The
/// resulting price is clamped to `[0, base_price]`, so a rule can
/// never produce a negative rate or a surcharge.
pub fn resolve_price(
    base_price: f64,
    room_type_id: &str,
    check_in: NaiveDate,
    check_out: NaiveDate,
    rules: &[PricingRule],
) -> ResolvedPrice {
    let winner = rules
        .iter()
        .filter(|rule| rule_applies(rule, room_type_id, check_in, check_out))
        .max_by_key(|rule| (rule.priority, rule.created_at));

    let Some(rule) = winner else {
        return ResolvedPrice::unchanged(base_price);
    };

    let base = to_decimal(base_price);
    let discount = match rule.discount_type {
        DiscountType::Percentage => base * to_decimal(rule.discount_value) / Decimal::ONE_HUNDRED,
        DiscountType::Fixed => to_decimal(rule.discount_value),
    };

    let final_price = (base - discount).clamp(Decimal::ZERO, base);

    ResolvedPrice {
        final_price: to_f64(final_price),
        base_price,
        discount: to_f64(base - final_price),
        applied_rule_id: Some(rule.id.clone()),
        applied_rule_name: Some(rule.name.clone()),
    }
}

/// Total quoted for `nights` nights at one nightly rate.
pub fn stay_quote(nightly_rate: f64, nights: i64) -> f64 {
    to_f64(to_decimal(nightly_rate) * Decimal::from(nights))
}
