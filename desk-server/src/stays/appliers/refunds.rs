//! Appliers for the refund workflow events.

use crate::stays::money::{self, to_decimal, MONEY_TOLERANCE};
use crate::stays::traits::EventApplier;
use shared::stay::types::{PaymentStatus, RefundStatus};
use shared::stay::{EventPayload, StayEvent, StaySnapshot};

/// RefundRequested applier
pub struct RefundRequestedApplier;

impl EventApplier for RefundRequestedApplier {
    fn apply(&self, snapshot: &mut StaySnapshot, event: &StayEvent) {
        if let EventPayload::RefundRequested { refund } = &event.payload {
            snapshot.refunds.push(refund.clone());

            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
            snapshot.update_checksum();
        }
    }
}

/// RefundApproved applier
pub struct RefundApprovedApplier;

impl EventApplier for RefundApprovedApplier {
    fn apply(&self, snapshot: &mut StaySnapshot, event: &StayEvent) {
        if let EventPayload::RefundApproved { refund_id } = &event.payload {
            if let Some(refund) = snapshot
                .refunds
                .iter_mut()
                .find(|r| r.refund_id == *refund_id)
            {
                refund.status = RefundStatus::Approved;
                refund.resolved_at = Some(event.timestamp);
            }

            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
            snapshot.update_checksum();
        }
    }
}

/// RefundRejected applier
pub struct RefundRejectedApplier;

impl EventApplier for RefundRejectedApplier {
    fn apply(&self, snapshot: &mut StaySnapshot, event: &StayEvent) {
        if let EventPayload::RefundRejected { refund_id, reason } = &event.payload {
            if let Some(refund) = snapshot
                .refunds
                .iter_mut()
                .find(|r| r.refund_id == *refund_id)
            {
                refund.status = RefundStatus::Rejected;
                refund.reject_reason = Some(reason.clone());
                refund.resolved_at = Some(event.timestamp);
            }

            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
            snapshot.update_checksum();
        }
    }
}

/// RefundCompleted applier
///
/// Marks the refund completed, and when the payment's completed
/// refunds now cover its full amount, flips the payment to Refunded
/// so the slot it held against the overpayment guard is released.
pub struct RefundCompletedApplier;

impl EventApplier for RefundCompletedApplier {
    fn apply(&self, snapshot: &mut StaySnapshot, event: &StayEvent) {
        if let EventPayload::RefundCompleted {
            refund_id,
            transaction_ref,
        } = &event.payload
        {
            let mut payment_id = None;
            if let Some(refund) = snapshot
                .refunds
                .iter_mut()
                .find(|r| r.refund_id == *refund_id)
            {
                refund.status = RefundStatus::Completed;
                refund.completed_at = Some(event.timestamp);
                refund.transaction_ref = transaction_ref.clone();
                payment_id = Some(refund.payment_id.clone());
            }

            if let Some(payment_id) = payment_id {
                let refunded = money::completed_refunds_against(&payment_id, &snapshot.refunds);
                if let Some(payment) = snapshot
                    .payments
                    .iter_mut()
                    .find(|p| p.payment_id == payment_id)
                {
                    if to_decimal(refunded) >= to_decimal(payment.amount) - MONEY_TOLERANCE {
                        payment.status = PaymentStatus::Refunded;
                    }
                }
            }

            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
            snapshot.update_checksum();
        }
    }
}
