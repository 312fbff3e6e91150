//! Money calculation utilities using rust_decimal for precision
//!
//! All ledger arithmetic is done in `Decimal` internally, then
//! converted back to `f64` (2 decimal places, half-up) for storage
//! and serialization. [`recompute_invoice`] is the only writer of the
//! derived ledger fields: per-line totals, subtotal, tax, total and
//! invoice status.

use crate::stays::traits::StayError;
use rust_decimal::prelude::*;
use shared::stay::{
    InvoiceLineItem, InvoiceState, InvoiceStatus, LineItemInput, PaymentInput, PaymentRecord,
    PaymentStatus, RefundRecord,
};

/// Rounding for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Default tax rate in percent, applied to line items without an
/// explicit `tax_rate` override.
pub const DEFAULT_TAX_RATE_PERCENT: f64 = 16.0;

/// Maximum allowed unit price per line item
const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per line item
const MAX_QUANTITY: i32 = 9999;
/// Maximum allowed payment amount
const MAX_PAYMENT_AMOUNT: f64 = 1_000_000.0;
/// Maximum entries accepted in one split payment batch
pub const MAX_SPLIT_ENTRIES: usize = 4;

/// Validate that a f64 value is finite (not NaN, not Infinity)
#[inline]
fn require_finite(value: f64, field_name: &str) -> Result<(), StayError> {
    if !value.is_finite() {
        return Err(StayError::Validation(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    Ok(())
}

/// Validate a LineItemInput before processing
pub fn validate_line_item(item: &LineItemInput) -> Result<(), StayError> {
    require_finite(item.unit_price, "unit_price")?;
    if item.unit_price < 0.0 {
        return Err(StayError::Validation(format!(
            "unit_price must be non-negative, got {}",
            item.unit_price
        )));
    }
    if item.unit_price > MAX_PRICE {
        return Err(StayError::Validation(format!(
            "unit_price exceeds maximum allowed ({}), got {}",
            MAX_PRICE, item.unit_price
        )));
    }

    if item.quantity <= 0 {
        return Err(StayError::Validation(format!(
            "quantity must be positive, got {}",
            item.quantity
        )));
    }
    if item.quantity > MAX_QUANTITY {
        return Err(StayError::Validation(format!(
            "quantity exceeds maximum allowed ({}), got {}",
            MAX_QUANTITY, item.quantity
        )));
    }

    if let Some(rate) = item.tax_rate {
        require_finite(rate, "tax_rate")?;
        if !(0.0..=100.0).contains(&rate) {
            return Err(StayError::Validation(format!(
                "tax_rate must be between 0 and 100, got {}",
                rate
            )));
        }
    }

    Ok(())
}

/// Validate a PaymentInput before processing
pub fn validate_payment(payment: &PaymentInput) -> Result<(), StayError> {
    require_finite(payment.amount, "payment amount")?;
    if payment.amount <= 0.0 {
        return Err(StayError::InvalidAmount);
    }
    if payment.amount > MAX_PAYMENT_AMOUNT {
        return Err(StayError::Validation(format!(
            "payment amount exceeds maximum allowed ({}), got {}",
            MAX_PAYMENT_AMOUNT, payment.amount
        )));
    }
    if payment.method.trim().is_empty() {
        return Err(StayError::Validation(
            "payment method must not be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validate a split payment batch: entry count and each entry.
/// The batch sum check against the invoice happens at the action.
pub fn validate_split_batch(entries: &[PaymentInput]) -> Result<(), StayError> {
    if entries.is_empty() {
        return Err(StayError::Validation(
            "split payment batch must not be empty".to_string(),
        ));
    }
    if entries.len() > MAX_SPLIT_ENTRIES {
        return Err(StayError::Validation(format!(
            "split payment batch exceeds maximum of {} entries, got {}",
            MAX_SPLIT_ENTRIES,
            entries.len()
        )));
    }
    for entry in entries {
        validate_payment(entry)?;
    }
    Ok(())
}

/// Validate a refund amount before processing
pub fn validate_refund_amount(amount: f64) -> Result<(), StayError> {
    require_finite(amount, "refund amount")?;
    if amount <= 0.0 {
        return Err(StayError::InvalidAmount);
    }
    if amount > MAX_PAYMENT_AMOUNT {
        return Err(StayError::Validation(format!(
            "refund amount exceeds maximum allowed ({}), got {}",
            MAX_PAYMENT_AMOUNT, amount
        )));
    }
    Ok(())
}

/// Validate an invoice-level discount against the current charges.
/// The discount may not exceed `subtotal + tax_amount`.
pub fn validate_discount(amount: f64, invoice: &InvoiceState) -> Result<(), StayError> {
    require_finite(amount, "discount amount")?;
    if amount < 0.0 {
        return Err(StayError::Validation(format!(
            "discount amount must be non-negative, got {}",
            amount
        )));
    }
    let charges = to_decimal(invoice.subtotal) + to_decimal(invoice.tax_amount);
    if to_decimal(amount) > charges + MONEY_TOLERANCE {
        return Err(StayError::Validation(format!(
            "discount amount {} exceeds invoice charges {}",
            amount,
            to_f64(charges)
        )));
    }
    Ok(())
}

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Line total with precise decimal arithmetic
///
/// Formula: unit_price * quantity
pub fn line_total(item: &InvoiceLineItem) -> Decimal {
    let unit_price = to_decimal(item.unit_price);
    let quantity = Decimal::from(item.quantity);
    (unit_price * quantity)
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Per-line tax, added on top of the line total (tax-exclusive prices)
///
/// Formula: line_total * tax_rate / 100, where the rate is the item's
/// own `tax_rate` or the fixed 16% default.
pub fn line_tax(item: &InvoiceLineItem) -> Decimal {
    let rate = to_decimal(item.tax_rate.unwrap_or(DEFAULT_TAX_RATE_PERCENT));
    if rate <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (line_total(item) * rate / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Set the derived fields (`total_price`, `tax_amount`) on a line item
pub fn fill_line_item(item: &mut InvoiceLineItem) {
    item.total_price = to_f64(line_total(item));
    item.tax_amount = to_f64(line_tax(item));
}

/// Sum of payments currently in `Completed` status.
///
/// This is the overpayment guard basis: a partially refunded payment
/// still counts in full; a fully refunded one has moved to `Refunded`
/// and freed its amount.
pub fn sum_completed_payments(payments: &[PaymentRecord]) -> f64 {
    let total: Decimal = payments
        .iter()
        .filter(|p| p.is_completed())
        .map(|p| to_decimal(p.amount))
        .sum();
    to_f64(total)
}

/// Money captured from the guest: Completed plus Refunded payments.
/// A refunded payment was captured; its refunds subtract separately.
fn sum_collected(payments: &[PaymentRecord]) -> Decimal {
    payments
        .iter()
        .filter(|p| matches!(p.status, PaymentStatus::Completed | PaymentStatus::Refunded))
        .map(|p| to_decimal(p.amount))
        .sum()
}

fn sum_completed_refunds(refunds: &[RefundRecord]) -> Decimal {
    refunds
        .iter()
        .filter(|r| r.is_completed())
        .map(|r| to_decimal(r.amount))
        .sum()
}

/// Net amount the guest has effectively paid: captured payments minus
/// completed refunds, floored at zero. Drives invoice status.
pub fn net_paid(payments: &[PaymentRecord], refunds: &[RefundRecord]) -> f64 {
    to_f64(net_paid_decimal(payments, refunds))
}

fn net_paid_decimal(payments: &[PaymentRecord], refunds: &[RefundRecord]) -> Decimal {
    (sum_collected(payments) - sum_completed_refunds(refunds)).max(Decimal::ZERO)
}

/// Unpaid remainder of an invoice against its completed payments
pub fn remaining_balance(invoice: &InvoiceState, payments: &[PaymentRecord]) -> f64 {
    let total = to_decimal(invoice.total_amount);
    let paid = to_decimal(sum_completed_payments(payments));
    to_f64((total - paid).max(Decimal::ZERO))
}

/// Sum of non-rejected refunds against one payment.
/// This is the excess-refund guard basis: pending and approved
/// refunds already reserve their amount.
pub fn sum_refunds_against(payment_id: &str, refunds: &[RefundRecord]) -> f64 {
    let total: Decimal = refunds
        .iter()
        .filter(|r| r.payment_id == payment_id && r.counts_against_payment())
        .map(|r| to_decimal(r.amount))
        .sum();
    to_f64(total)
}

/// Sum of completed refunds against one payment
pub fn completed_refunds_against(payment_id: &str, refunds: &[RefundRecord]) -> f64 {
    let total: Decimal = refunds
        .iter()
        .filter(|r| r.payment_id == payment_id && r.is_completed())
        .map(|r| to_decimal(r.amount))
        .sum();
    to_f64(total)
}

/// Recompute the invoice ledger from its line items and the stay's
/// payment/refund records. Returns the net paid amount.
///
/// Derives, in order:
/// - each line's `total_price` and `tax_amount`
/// - `subtotal = Σ total_price`, `tax_amount = Σ` per-line tax
/// - `total_amount = subtotal + tax_amount - discount_amount`,
///   floored at zero
/// - `status`: Draft until finalized; then Paid when net paid covers
///   the total, otherwise PartiallyPaid/Pending. Overdue is sticky
///   until fully paid.
pub fn recompute_invoice(
    invoice: &mut InvoiceState,
    payments: &[PaymentRecord],
    refunds: &[RefundRecord],
) -> f64 {
    let mut subtotal = Decimal::ZERO;
    let mut total_tax = Decimal::ZERO;

    for item in &mut invoice.line_items {
        let item_total = line_total(item);
        let item_tax = line_tax(item);
        item.total_price = to_f64(item_total);
        item.tax_amount = to_f64(item_tax);
        subtotal += item_total;
        total_tax += item_tax;
    }

    let discount = to_decimal(invoice.discount_amount);
    let total = (subtotal + total_tax - discount).max(Decimal::ZERO);

    invoice.subtotal = to_f64(subtotal);
    invoice.tax_amount = to_f64(total_tax);
    invoice.total_amount = to_f64(total);

    let paid = net_paid_decimal(payments, refunds);

    invoice.status = if !invoice.is_finalized() {
        InvoiceStatus::Draft
    } else if paid >= total - MONEY_TOLERANCE {
        InvoiceStatus::Paid
    } else if invoice.status == InvoiceStatus::Overdue {
        // Sticky until fully paid.
        InvoiceStatus::Overdue
    } else if paid > MONEY_TOLERANCE {
        InvoiceStatus::PartiallyPaid
    } else {
        InvoiceStatus::Pending
    };

    to_f64(paid)
}

/// Check if payment is sufficient (with small tolerance for edge cases)
///
/// Returns true if paid >= required - 0.01
pub fn is_payment_sufficient(paid: f64, required: f64) -> bool {
    let paid_dec = to_decimal(paid);
    let required_dec = to_decimal(required);
    paid_dec >= required_dec - MONEY_TOLERANCE
}

/// Compare two monetary values for equality (within 0.01 tolerance)
pub fn money_eq(a: f64, b: f64) -> bool {
    let diff = (to_decimal(a) - to_decimal(b)).abs();
    diff < MONEY_TOLERANCE
}
