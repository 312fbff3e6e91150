//! AddLineItem command handler
//!
//! Posts a charge onto a stay's invoice and recomputes the ledger.
//! Late charges are accepted after finalization; the recompute keeps
//! the stored totals honest either way.

use async_trait::async_trait;
use validator::Validate;

use crate::stays::money::{fill_line_item, recompute_invoice, validate_line_item};
use crate::stays::traits::{CommandContext, CommandHandler, CommandMetadata, StayError};
use shared::stay::types::LineItemInput;
use shared::stay::{EventPayload, InvoiceLineItem, StayEvent, StayEventType};

/// AddLineItem action
#[derive(Debug, Clone)]
pub struct AddLineItemAction {
    pub invoice_id: String,
    pub item: LineItemInput,
}

#[async_trait]
impl CommandHandler for AddLineItemAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<StayEvent>, StayError> {
        // 1. Validate the charge
        self.item
            .validate()
            .map_err(|e| StayError::Validation(e.to_string()))?;
        validate_line_item(&self.item)?;

        // 2. Resolve the owning stay
        let stay_id = ctx
            .find_stay_for_billing_ref(&self.invoice_id)?
            .ok_or_else(|| StayError::InvoiceNotFound(self.invoice_id.clone()))?;
        let snapshot = ctx.load_snapshot(&stay_id)?;
        let invoice = snapshot
            .invoice
            .as_ref()
            .filter(|inv| inv.invoice_id == self.invoice_id)
            .ok_or_else(|| StayError::InvoiceNotFound(self.invoice_id.clone()))?;

        // 3. Price the line and project the recomputed ledger
        let mut item = InvoiceLineItem {
            line_item_id: uuid::Uuid::new_v4().to_string(),
            description: self.item.description.clone(),
            quantity: self.item.quantity,
            unit_price: self.item.unit_price,
            total_price: 0.0,
            tax_rate: self.item.tax_rate,
            tax_amount: 0.0,
            room_id: None,
        };
        fill_line_item(&mut item);

        let mut projected = invoice.clone();
        projected.line_items.push(item.clone());
        let total_paid = recompute_invoice(&mut projected, &snapshot.payments, &snapshot.refunds);

        let seq = ctx.next_sequence();
        let added = StayEvent::new(
            seq,
            stay_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            metadata.timestamp,
            Some(metadata.client_timestamp),
            StayEventType::LineItemAdded,
            EventPayload::LineItemAdded {
                invoice_id: projected.invoice_id.clone(),
                item,
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

        Ok(vec![added, recomputed])
    }
}
