//! RemoveLineItem command handler

use async_trait::async_trait;

use crate::stays::money::recompute_invoice;
use crate::stays::traits::{CommandContext, CommandHandler, CommandMetadata, StayError};
use shared::stay::{EventPayload, StayEvent, StayEventType};

/// RemoveLineItem action
#[derive(Debug, Clone)]
pub struct RemoveLineItemAction {
    pub invoice_id: String,
    pub line_item_id: String,
}

#[async_trait]
impl CommandHandler for RemoveLineItemAction {
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

        // 2. The line must exist on this invoice
        if !invoice
            .line_items
            .iter()
            .any(|item| item.line_item_id == self.line_item_id)
        {
            return Err(StayError::Validation(format!(
                "line item {} not found on invoice {}",
                self.line_item_id, self.invoice_id
            )));
        }

        // 3. Project the ledger without it
        let mut projected = invoice.clone();
        projected
            .line_items
            .retain(|item| item.line_item_id != self.line_item_id);
        let total_paid = recompute_invoice(&mut projected, &snapshot.payments, &snapshot.refunds);

        let seq = ctx.next_sequence();
        let removed = StayEvent::new(
            seq,
            stay_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            metadata.timestamp,
            Some(metadata.client_timestamp),
            StayEventType::LineItemRemoved,
            EventPayload::LineItemRemoved {
                invoice_id: projected.invoice_id.clone(),
                line_item_id: self.line_item_id.clone(),
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

        Ok(vec![removed, recomputed])
    }
}
