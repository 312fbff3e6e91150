//! MarkInvoiceOverdue command handler
//!
//! Flips a past-due invoice to overdue. The date crossing itself is
//! detected by an external scheduler sweep; this handler only accepts
//! or rejects the claim against the invoice's own due date.

use async_trait::async_trait;

use crate::stays::traits::{CommandContext, CommandHandler, CommandMetadata, StayError};
use crate::utils::date_of_millis;
use shared::stay::{EventPayload, InvoiceStatus, StayEvent, StayEventType};

/// MarkInvoiceOverdue action
#[derive(Debug, Clone)]
pub struct MarkInvoiceOverdueAction {
    pub invoice_id: String,
}

#[async_trait]
impl CommandHandler for MarkInvoiceOverdueAction {
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

        // 2. The invoice must actually be past due
        if invoice.status == InvoiceStatus::Overdue {
            return Err(StayError::InvalidTransition(
                "invoice is already overdue".to_string(),
            ));
        }
        let today = date_of_millis(metadata.timestamp);
        if !invoice.is_overdue(today) {
            return Err(StayError::InvalidTransition(format!(
                "invoice {} is not past due",
                self.invoice_id
            )));
        }

        let seq = ctx.next_sequence();
        let marked = StayEvent::new(
            seq,
            stay_id,
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            metadata.timestamp,
            Some(metadata.client_timestamp),
            StayEventType::InvoiceMarkedOverdue,
            EventPayload::InvoiceMarkedOverdue {
                invoice_id: self.invoice_id.clone(),
            },
        );

        Ok(vec![marked])
    }
}
