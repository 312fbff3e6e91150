//! VoidPayment command handler
//!
//! Marks a mis-recorded payment as failed so it stops counting toward
//! the invoice. Voiding is for entry errors (wrong amount, wrong
//! invoice); money actually returned to a guest goes through the
//! refund workflow instead, so a payment with refunds in flight or
//! completed cannot be voided.

use async_trait::async_trait;

use crate::stays::money::recompute_invoice;
use crate::stays::traits::{CommandContext, CommandHandler, CommandMetadata, StayError};
use shared::stay::types::PaymentStatus;
use shared::stay::{EventPayload, StayEvent, StayEventType};

/// VoidPayment action
#[derive(Debug, Clone)]
pub struct VoidPaymentAction {
    pub payment_id: String,
    pub reason: String,
}

#[async_trait]
impl CommandHandler for VoidPaymentAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<StayEvent>, StayError> {
        // 1. Resolve the owning stay
        let stay_id = ctx
            .find_stay_for_billing_ref(&self.payment_id)?
            .ok_or_else(|| StayError::PaymentNotFound(self.payment_id.clone()))?;
        let snapshot = ctx.load_snapshot(&stay_id)?;
        let payment = snapshot
            .payments
            .iter()
            .find(|p| p.payment_id == self.payment_id)
            .ok_or_else(|| StayError::PaymentNotFound(self.payment_id.clone()))?;
        let invoice = snapshot
            .invoice
            .as_ref()
            .ok_or_else(|| StayError::InvoiceNotFound(stay_id.clone()))?;

        // 2. Only a completed payment with no live refunds can be voided
        if payment.status != PaymentStatus::Completed {
            return Err(StayError::InvalidTransition(format!(
                "cannot void a payment with status {:?}",
                payment.status
            )));
        }
        let has_live_refunds = snapshot
            .refunds
            .iter()
            .any(|r| r.payment_id == self.payment_id && r.counts_against_payment());
        if has_live_refunds {
            return Err(StayError::InvalidTransition(
                "payment has refunds in flight or completed; resolve them first".to_string(),
            ));
        }

        // 3. Project the ledger without this payment's money
        let mut projected_invoice = invoice.clone();
        let mut projected_payments = snapshot.payments.clone();
        if let Some(p) = projected_payments
            .iter_mut()
            .find(|p| p.payment_id == self.payment_id)
        {
            p.status = PaymentStatus::Failed;
            p.void_reason = Some(self.reason.clone());
        }
        let total_paid = recompute_invoice(
            &mut projected_invoice,
            &projected_payments,
            &snapshot.refunds,
        );

        let seq = ctx.next_sequence();
        let voided = StayEvent::new(
            seq,
            stay_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            metadata.timestamp,
            Some(metadata.client_timestamp),
            StayEventType::PaymentVoided,
            EventPayload::PaymentVoided {
                invoice_id: projected_invoice.invoice_id.clone(),
                payment_id: self.payment_id.clone(),
                reason: self.reason.clone(),
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

        Ok(vec![voided, recomputed])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stays::storage::StayStorage;
    use shared::stay::types::{PaymentRecord, RefundRecord, RefundStatus};
    use shared::stay::{InvoiceState, InvoiceStatus, StaySnapshot, StayStatus};

    fn create_test_metadata() -> CommandMetadata {
        CommandMetadata {
            command_id: "cmd-1".to_string(),
            operator_id: "user-1".to_string(),
            operator_name: "Test User".to_string(),
            timestamp: 1_767_225_600_000,
            client_timestamp: 1_767_225_599_000,
        }
    }

    fn refund(id: &str, payment_id: &str, amount: f64, status: RefundStatus) -> RefundRecord {
        RefundRecord {
            refund_id: id.to_string(),
            payment_id: payment_id.to_string(),
            amount,
            reason: "Guest dispute".to_string(),
            method: "CASH".to_string(),
            status,
            requested_at: 1_767_200_000_000,
            resolved_at: None,
            completed_at: None,
            transaction_ref: None,
            reject_reason: None,
        }
    }

    // Finalized 232 invoice with one completed payment covering it.
    fn seed_stay(storage: &StayStorage, mutate: impl FnOnce(&mut StaySnapshot)) {
        let mut snapshot = StaySnapshot::new("stay-1".to_string());
        snapshot.status = StayStatus::CheckedOut;
        let mut invoice = InvoiceState::new("inv-1");
        invoice.subtotal = 200.0;
        invoice.tax_amount = 32.0;
        invoice.total_amount = 232.0;
        invoice.status = InvoiceStatus::Paid;
        invoice.finalized_at = Some(1_767_200_000_000);
        snapshot.invoice = Some(invoice);
        snapshot.payments.push(PaymentRecord {
            payment_id: "pay-1".to_string(),
            method: "CARD".to_string(),
            amount: 232.0,
            reference: None,
            note: None,
            timestamp: 1_767_200_000_000,
            status: PaymentStatus::Completed,
            void_reason: None,
        });
        mutate(&mut snapshot);

        let txn = storage.begin_write().unwrap();
        storage.store_snapshot(&txn, &snapshot).unwrap();
        storage.index_billing_ref(&txn, "pay-1", "stay-1").unwrap();
        txn.commit().unwrap();
    }

    fn action() -> VoidPaymentAction {
        VoidPaymentAction {
            payment_id: "pay-1".to_string(),
            reason: "Charged to the wrong invoice".to_string(),
        }
    }

    #[tokio::test]
    async fn test_void_payment_reopens_balance() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, |_| {});

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let events = action()
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        assert_eq!(events.len(), 2);
        if let EventPayload::PaymentVoided {
            payment_id, reason, ..
        } = &events[0].payload
        {
            assert_eq!(payment_id, "pay-1");
            assert_eq!(reason, "Charged to the wrong invoice");
        } else {
            panic!("Expected PaymentVoided payload");
        }

        // The full balance is owed again.
        if let EventPayload::InvoiceRecomputed {
            total_paid, status, ..
        } = &events[1].payload
        {
            assert_eq!(*total_paid, 0.0);
            assert_eq!(*status, InvoiceStatus::Pending);
        } else {
            panic!("Expected InvoiceRecomputed payload");
        }
    }

    #[tokio::test]
    async fn test_void_payment_with_pending_refund_fails() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, |s| {
            s.refunds
                .push(refund("ref-1", "pay-1", 50.0, RefundStatus::Pending));
        });

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = action().execute(&mut ctx, &create_test_metadata()).await;
        assert!(matches!(result, Err(StayError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_void_payment_with_rejected_refund_succeeds() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, |s| {
            s.refunds
                .push(refund("ref-1", "pay-1", 50.0, RefundStatus::Rejected));
        });

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = action().execute(&mut ctx, &create_test_metadata()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_void_already_voided_payment_fails() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, |s| {
            s.payments[0].status = PaymentStatus::Failed;
            s.payments[0].void_reason = Some("First void".to_string());
        });

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = action().execute(&mut ctx, &create_test_metadata()).await;
        assert!(matches!(result, Err(StayError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_void_refunded_payment_fails() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, |s| {
            s.payments[0].status = PaymentStatus::Refunded;
        });

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = action().execute(&mut ctx, &create_test_metadata()).await;
        assert!(matches!(result, Err(StayError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_void_unknown_payment_fails() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, |_| {});

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let mut act = action();
        act.payment_id = "pay-404".to_string();
        let result = act.execute(&mut ctx, &create_test_metadata()).await;
        assert!(matches!(result, Err(StayError::PaymentNotFound(_))));
    }
}
