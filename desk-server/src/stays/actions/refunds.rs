//! Refund workflow handlers
//!
//! Refunds move through three stages, each a distinct actor's call:
//! the requester opens a pending refund, an approver resolves it to
//! approved (or rejects it), and a processor completes it once the
//! money has actually moved. No stage may be skipped. Pending and
//! approved refunds already count against the payment's refundable
//! amount so parallel requests cannot oversubscribe it; only the
//! completed stage touches the invoice ledger.

use async_trait::async_trait;

use crate::stays::money::{
    completed_refunds_against, recompute_invoice, sum_refunds_against, to_decimal,
    validate_refund_amount, MONEY_TOLERANCE,
};
use crate::stays::traits::{CommandContext, CommandHandler, CommandMetadata, StayError};
use shared::stay::types::{PaymentStatus, RefundRecord, RefundStatus};
use shared::stay::{EventPayload, StayEvent, StayEventType};

/// RequestRefund action
#[derive(Debug, Clone)]
pub struct RequestRefundAction {
    pub payment_id: String,
    pub amount: f64,
    pub reason: String,
    /// Payout method; defaults to the original payment's method.
    pub method: Option<String>,
}

/// ApproveRefund action
#[derive(Debug, Clone)]
pub struct ApproveRefundAction {
    pub refund_id: String,
}

/// RejectRefund action
#[derive(Debug, Clone)]
pub struct RejectRefundAction {
    pub refund_id: String,
    pub reason: String,
}

/// CompleteRefund action
#[derive(Debug, Clone)]
pub struct CompleteRefundAction {
    pub refund_id: String,
    pub transaction_ref: Option<String>,
}

#[async_trait]
impl CommandHandler for RequestRefundAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<StayEvent>, StayError> {
        // 1. Validate the amount
        validate_refund_amount(self.amount)?;

        // 2. Resolve the payment being refunded
        let stay_id = ctx
            .find_stay_for_billing_ref(&self.payment_id)?
            .ok_or_else(|| StayError::PaymentNotFound(self.payment_id.clone()))?;
        let snapshot = ctx.load_snapshot(&stay_id)?;
        let payment = snapshot
            .payments
            .iter()
            .find(|p| p.payment_id == self.payment_id)
            .ok_or_else(|| StayError::PaymentNotFound(self.payment_id.clone()))?;

        if payment.status != PaymentStatus::Completed {
            return Err(StayError::InvalidTransition(format!(
                "cannot refund a payment with status {:?}",
                payment.status
            )));
        }

        // 3. Pending and approved refunds reserve their amounts too
        let reserved = to_decimal(sum_refunds_against(&self.payment_id, &snapshot.refunds));
        if reserved + to_decimal(self.amount) > to_decimal(payment.amount) + MONEY_TOLERANCE {
            return Err(StayError::ExcessRefund(format!(
                "refund of {} exceeds the refundable remainder of payment {}",
                self.amount, self.payment_id
            )));
        }

        let refund = RefundRecord {
            refund_id: uuid::Uuid::new_v4().to_string(),
            payment_id: self.payment_id.clone(),
            amount: self.amount,
            reason: self.reason.clone(),
            method: self.method.clone().unwrap_or_else(|| payment.method.clone()),
            status: RefundStatus::Pending,
            requested_at: metadata.timestamp,
            resolved_at: None,
            completed_at: None,
            transaction_ref: None,
            reject_reason: None,
        };

        let seq = ctx.next_sequence();
        let requested = StayEvent::new(
            seq,
            stay_id,
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            metadata.timestamp,
            Some(metadata.client_timestamp),
            StayEventType::RefundRequested,
            EventPayload::RefundRequested { refund },
        );

        Ok(vec![requested])
    }
}

#[async_trait]
impl CommandHandler for ApproveRefundAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<StayEvent>, StayError> {
        let stay_id = ctx
            .find_stay_for_billing_ref(&self.refund_id)?
            .ok_or_else(|| StayError::RefundNotFound(self.refund_id.clone()))?;
        let snapshot = ctx.load_snapshot(&stay_id)?;
        let refund = snapshot
            .refunds
            .iter()
            .find(|r| r.refund_id == self.refund_id)
            .ok_or_else(|| StayError::RefundNotFound(self.refund_id.clone()))?;

        if refund.status != RefundStatus::Pending {
            return Err(StayError::InvalidTransition(format!(
                "cannot approve a refund with status {:?}",
                refund.status
            )));
        }

        let seq = ctx.next_sequence();
        let approved = StayEvent::new(
            seq,
            stay_id,
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            metadata.timestamp,
            Some(metadata.client_timestamp),
            StayEventType::RefundApproved,
            EventPayload::RefundApproved {
                refund_id: self.refund_id.clone(),
            },
        );

        Ok(vec![approved])
    }
}

#[async_trait]
impl CommandHandler for RejectRefundAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<StayEvent>, StayError> {
        let stay_id = ctx
            .find_stay_for_billing_ref(&self.refund_id)?
            .ok_or_else(|| StayError::RefundNotFound(self.refund_id.clone()))?;
        let snapshot = ctx.load_snapshot(&stay_id)?;
        let refund = snapshot
            .refunds
            .iter()
            .find(|r| r.refund_id == self.refund_id)
            .ok_or_else(|| StayError::RefundNotFound(self.refund_id.clone()))?;

        // A paid-out refund cannot be walked back by rejection.
        match refund.status {
            RefundStatus::Pending | RefundStatus::Approved => {}
            status => {
                return Err(StayError::InvalidTransition(format!(
                    "cannot reject a refund with status {:?}",
                    status
                )));
            }
        }

        let seq = ctx.next_sequence();
        let rejected = StayEvent::new(
            seq,
            stay_id,
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            metadata.timestamp,
            Some(metadata.client_timestamp),
            StayEventType::RefundRejected,
            EventPayload::RefundRejected {
                refund_id: self.refund_id.clone(),
                reason: self.reason.clone(),
            },
        );

        Ok(vec![rejected])
    }
}

#[async_trait]
impl CommandHandler for CompleteRefundAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<StayEvent>, StayError> {
        // 1. Resolve the approved refund
        let stay_id = ctx
            .find_stay_for_billing_ref(&self.refund_id)?
            .ok_or_else(|| StayError::RefundNotFound(self.refund_id.clone()))?;
        let snapshot = ctx.load_snapshot(&stay_id)?;
        let refund = snapshot
            .refunds
            .iter()
            .find(|r| r.refund_id == self.refund_id)
            .ok_or_else(|| StayError::RefundNotFound(self.refund_id.clone()))?;

        if refund.status != RefundStatus::Approved {
            return Err(StayError::InvalidTransition(format!(
                "cannot complete a refund with status {:?}",
                refund.status
            )));
        }
        let invoice = snapshot
            .invoice
            .as_ref()
            .ok_or_else(|| StayError::InvoiceNotFound(stay_id.clone()))?;

        // 2. Project the ledger with the refund paid out
        let payment_id = refund.payment_id.clone();

        let mut projected_refunds = snapshot.refunds.clone();
        if let Some(r) = projected_refunds
            .iter_mut()
            .find(|r| r.refund_id == self.refund_id)
        {
            r.status = RefundStatus::Completed;
            r.completed_at = Some(metadata.timestamp);
            r.transaction_ref = self.transaction_ref.clone();
        }

        // A fully refunded payment flips to refunded status.
        let mut projected_payments = snapshot.payments.clone();
        if let Some(p) = projected_payments
            .iter_mut()
            .find(|p| p.payment_id == payment_id)
        {
            let refunded = to_decimal(completed_refunds_against(&payment_id, &projected_refunds));
            if refunded >= to_decimal(p.amount) - MONEY_TOLERANCE {
                p.status = PaymentStatus::Refunded;
            }
        }

        let mut projected_invoice = invoice.clone();
        let total_paid = recompute_invoice(
            &mut projected_invoice,
            &projected_payments,
            &projected_refunds,
        );

        let seq = ctx.next_sequence();
        let completed = StayEvent::new(
            seq,
            stay_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            metadata.timestamp,
            Some(metadata.client_timestamp),
            StayEventType::RefundCompleted,
            EventPayload::RefundCompleted {
                refund_id: self.refund_id.clone(),
                transaction_ref: self.transaction_ref.clone(),
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
                invoice_id: projected_invoice.invoice_id.clone(),
                subtotal: projected_invoice.subtotal,
                tax_amount: projected_invoice.tax_amount,
                discount_amount: projected_invoice.discount_amount,
                total_amount: projected_invoice.total_amount,
                total_paid,
                status: projected_invoice.status,
            },
        );

        Ok(vec![completed, recomputed])
    }
}
