//! Appliers for payment ledger events.

use crate::stays::traits::EventApplier;
use shared::stay::types::PaymentStatus;
use shared::stay::{EventPayload, StayEvent, StaySnapshot};

/// PaymentRecorded applier
pub struct PaymentRecordedApplier;

impl EventApplier for PaymentRecordedApplier {
    fn apply(&self, snapshot: &mut StaySnapshot, event: &StayEvent) {
        if let EventPayload::PaymentRecorded {
            invoice_id: _,
            payment,
        } = &event.payload
        {
            snapshot.payments.push(payment.clone());

            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
            snapshot.update_checksum();
        }
    }
}

/// SplitPaymentRecorded applier
///
/// All entries of the batch land together; a replayed log can never
/// contain half a split.
pub struct SplitPaymentRecordedApplier;

impl EventApplier for SplitPaymentRecordedApplier {
    fn apply(&self, snapshot: &mut StaySnapshot, event: &StayEvent) {
        if let EventPayload::SplitPaymentRecorded {
            invoice_id: _,
            payments,
        } = &event.payload
        {
            snapshot.payments.extend(payments.iter().cloned());

            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
            snapshot.update_checksum();
        }
    }
}

/// PaymentVoided applier
pub struct PaymentVoidedApplier;

impl EventApplier for PaymentVoidedApplier {
    fn apply(&self, snapshot: &mut StaySnapshot, event: &StayEvent) {
        if let EventPayload::PaymentVoided {
            invoice_id: _,
            payment_id,
            reason,
        } = &event.payload
        {
            if let Some(payment) = snapshot
                .payments
                .iter_mut()
                .find(|p| p.payment_id == *payment_id)
            {
                payment.status = PaymentStatus::Failed;
                payment.void_reason = Some(reason.clone());
            }

            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
            snapshot.update_checksum();
        }
    }
}
