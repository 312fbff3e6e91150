//! FinalizeInvoice command handler
//!
//! Billing-side finalization, independent of check-out: freezes the
//! due date and moves the ledger out of draft. Check-out finalizes
//! implicitly; this handler covers invoices closed by the billing
//! desk (e.g. a no-show charged a cancellation fee).

use async_trait::async_trait;
use chrono::Days;

use crate::stays::money::recompute_invoice;
use crate::stays::traits::{CommandContext, CommandHandler, CommandMetadata, StayError};
use crate::utils::date_of_millis;
use shared::stay::{EventPayload, StayEvent, StayEventType};

/// FinalizeInvoice action
#[derive(Debug, Clone)]
pub struct FinalizeInvoiceAction {
    pub invoice_id: String,
    /// Days until the finalized invoice falls due, injected by StayManager.
    pub invoice_due_days: i64,
}

#[async_trait]
impl CommandHandler for FinalizeInvoiceAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<StayEvent>, StayError> {
        // 1. Resolve the owning stay
        let stay_id = ctx
            .find_stay_for_billing_ref(&self.invoice_id)?
            .ok_or_else(|| StayError::InvoiceNotFound(self.invoice_id.clone()))?;
        let snapshot = ctx.load_snapshot(&stay_id)?;
        let invoice = snapshot
            .invoice
            .as_ref()
            .filter(|inv| inv.invoice_id == self.invoice_id)
            .ok_or_else(|| StayError::InvoiceNotFound(self.invoice_id.clone()))?;

        // 2. Finalization is one-way
        if invoice.is_finalized() {
            return Err(StayError::InvalidTransition(
                "invoice is already finalized".to_string(),
            ));
        }

        let due_date = date_of_millis(metadata.timestamp)
            .checked_add_days(Days::new(self.invoice_due_days.max(0) as u64))
            .ok_or_else(|| StayError::Validation("date overflow".to_string()))?;

        // 3. Project the finalized ledger for the recompute payload
        let mut projected = invoice.clone();
        projected.finalized_at = Some(metadata.timestamp);
        projected.due_date = Some(due_date);
        let total_paid = recompute_invoice(&mut projected, &snapshot.payments, &snapshot.refunds);

        let seq = ctx.next_sequence();
        let finalized = StayEvent::new(
            seq,
            stay_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            metadata.timestamp,
            Some(metadata.client_timestamp),
            StayEventType::InvoiceFinalized,
            EventPayload::InvoiceFinalized {
                invoice_id: projected.invoice_id.clone(),
                line_items: vec![],
                due_date,
            },
        );

        let seq = ctx.next_sequence();
        let recomputed = StayEvent::new(
            seq,
            stay_id,
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            metadata.timestamp,
            Some(metadata.client_timestamp),
            StayEventType::InvoiceRecomputed,
            EventPayload::InvoiceRecomputed {
                invoice_id: projected.invoice_id.clone(),
                subtotal: projected.subtotal,
                tax_amount: projected.tax_amount,
                discount_amount: projected.discount_amount,
                total_amount: projected.total_amount,
                total_paid,
                status: projected.status,
            },
        );

        Ok(vec![finalized, recomputed])
    }
}
