//! ApplyInvoiceDiscount command handler
//!
//! Sets the invoice-level discount. The discount is a single standing
//! amount (reapplying replaces it, not stacks it) and may never exceed
//! the invoice's charges.

use async_trait::async_trait;

use crate::stays::money::{recompute_invoice, validate_discount};
use crate::stays::traits::{CommandContext, CommandHandler, CommandMetadata, StayError};
use shared::stay::{EventPayload, StayEvent, StayEventType};

/// ApplyInvoiceDiscount action
#[derive(Debug, Clone)]
pub struct ApplyInvoiceDiscountAction {
    pub invoice_id: String,
    pub discount_amount: f64,
}

#[async_trait]
impl CommandHandler for ApplyInvoiceDiscountAction {
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

        // 2. The discount must fit inside the current charges
        validate_discount(self.discount_amount, invoice)?;

        // 3. Project the discounted ledger
        let mut projected = invoice.clone();
        projected.discount_amount = self.discount_amount;
        let total_paid = recompute_invoice(&mut projected, &snapshot.payments, &snapshot.refunds);

        let seq = ctx.next_sequence();
        let applied = StayEvent::new(
            seq,
            stay_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            metadata.timestamp,
            Some(metadata.client_timestamp),
            StayEventType::InvoiceDiscountApplied,
            EventPayload::InvoiceDiscountApplied {
                invoice_id: projected.invoice_id.clone(),
                discount_amount: self.discount_amount,
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

        Ok(vec![applied, recomputed])
    }
}
