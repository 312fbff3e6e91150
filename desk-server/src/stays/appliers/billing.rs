//! Appliers for invoice structure events: finalization, line item
//! changes, discounts, overdue marking and the ledger recompute.
//!
//! Structural appliers never derive totals. Every command that touches
//! the ledger also emits an `InvoiceRecomputed` event, and only that
//! applier writes the derived fields. Replay therefore reproduces the
//! exact totals the live recompute produced.

use crate::stays::traits::EventApplier;
use shared::stay::{EventPayload, InvoiceStatus, StayEvent, StaySnapshot};

/// InvoiceFinalized applier
pub struct InvoiceFinalizedApplier;

impl EventApplier for InvoiceFinalizedApplier {
    fn apply(&self, snapshot: &mut StaySnapshot, event: &StayEvent) {
        if let EventPayload::InvoiceFinalized {
            invoice_id: _,
            line_items,
            due_date,
        } = &event.payload
        {
            if let Some(invoice) = snapshot.invoice.as_mut() {
                invoice.line_items.extend(line_items.iter().cloned());
                invoice.due_date = Some(*due_date);
                invoice.finalized_at = Some(event.timestamp);
            }

            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
            snapshot.update_checksum();
        }
    }
}

/// LineItemAdded applier
pub struct LineItemAddedApplier;

impl EventApplier for LineItemAddedApplier {
    fn apply(&self, snapshot: &mut StaySnapshot, event: &StayEvent) {
        if let EventPayload::LineItemAdded {
            invoice_id: _,
            item,
        } = &event.payload
        {
            if let Some(invoice) = snapshot.invoice.as_mut() {
                invoice.line_items.push(item.clone());
            }

            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
            snapshot.update_checksum();
        }
    }
}

/// LineItemRemoved applier
pub struct LineItemRemovedApplier;

impl EventApplier for LineItemRemovedApplier {
    fn apply(&self, snapshot: &mut StaySnapshot, event: &StayEvent) {
        if let EventPayload::LineItemRemoved {
            invoice_id: _,
            line_item_id,
        } = &event.payload
        {
            if let Some(invoice) = snapshot.invoice.as_mut() {
                invoice
                    .line_items
                    .retain(|item| item.line_item_id != *line_item_id);
            }

            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
            snapshot.update_checksum();
        }
    }
}

/// InvoiceDiscountApplied applier
pub struct InvoiceDiscountAppliedApplier;

impl EventApplier for InvoiceDiscountAppliedApplier {
    fn apply(&self, snapshot: &mut StaySnapshot, event: &StayEvent) {
        if let EventPayload::InvoiceDiscountApplied {
            invoice_id: _,
            discount_amount,
        } = &event.payload
        {
            if let Some(invoice) = snapshot.invoice.as_mut() {
                invoice.discount_amount = *discount_amount;
            }

            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
            snapshot.update_checksum();
        }
    }
}

/// InvoiceMarkedOverdue applier
pub struct InvoiceMarkedOverdueApplier;

impl EventApplier for InvoiceMarkedOverdueApplier {
    fn apply(&self, snapshot: &mut StaySnapshot, event: &StayEvent) {
        if let EventPayload::InvoiceMarkedOverdue { invoice_id: _ } = &event.payload {
            if let Some(invoice) = snapshot.invoice.as_mut() {
                invoice.status = InvoiceStatus::Overdue;
            }

            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
            snapshot.update_checksum();
        }
    }
}

/// InvoiceRecomputed applier
///
/// The single writer of the derived ledger fields.
pub struct InvoiceRecomputedApplier;

impl EventApplier for InvoiceRecomputedApplier {
    fn apply(&self, snapshot: &mut StaySnapshot, event: &StayEvent) {
        if let EventPayload::InvoiceRecomputed {
            invoice_id: _,
            subtotal,
            tax_amount,
            discount_amount,
            total_amount,
            total_paid: _,
            status,
        } = &event.payload
        {
            if let Some(invoice) = snapshot.invoice.as_mut() {
                invoice.subtotal = *subtotal;
                invoice.tax_amount = *tax_amount;
                invoice.discount_amount = *discount_amount;
                invoice.total_amount = *total_amount;
                invoice.status = *status;
            }

            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
            snapshot.update_checksum();
        }
    }
}
