//! ApplyPayment command handler
//!
//! Records one completed payment against an invoice. Collected money
//! may never exceed the invoice total: the guard compares against the
//! sum of completed payments, so a fully refunded payment (flipped to
//! refunded status) frees its slot for re-collection.

use async_trait::async_trait;

use crate::stays::money::{
    recompute_invoice, remaining_balance, sum_completed_payments, to_decimal, validate_payment,
    MONEY_TOLERANCE,
};
use crate::stays::traits::{CommandContext, CommandHandler, CommandMetadata, StayError};
use shared::stay::types::{PaymentInput, PaymentRecord, PaymentStatus};
use shared::stay::{EventPayload, StayEvent, StayEventType};

/// ApplyPayment action
#[derive(Debug, Clone)]
pub struct ApplyPaymentAction {
    pub invoice_id: String,
    pub payment: PaymentInput,
}

#[async_trait]
impl CommandHandler for ApplyPaymentAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<StayEvent>, StayError> {
        // 1. Validate the payment input
        validate_payment(&self.payment)?;

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

        // 3. Overpayment guard: collected money stays within the total
        let collected = to_decimal(sum_completed_payments(&snapshot.payments));
        let incoming = to_decimal(self.payment.amount);
        if collected + incoming > to_decimal(invoice.total_amount) + MONEY_TOLERANCE {
            return Err(StayError::Overpayment(format!(
                "payment of {} exceeds the remaining balance of {}",
                self.payment.amount,
                remaining_balance(invoice, &snapshot.payments)
            )));
        }

        // 4. Record and project the paid-up ledger
        let payment = PaymentRecord {
            payment_id: uuid::Uuid::new_v4().to_string(),
            method: self.payment.method.clone(),
            amount: self.payment.amount,
            reference: self.payment.reference.clone(),
            note: self.payment.note.clone(),
            timestamp: metadata.timestamp,
            status: PaymentStatus::Completed,
            void_reason: None,
        };

        let mut projected_invoice = invoice.clone();
        let mut projected_payments = snapshot.payments.clone();
        projected_payments.push(payment.clone());
        let total_paid = recompute_invoice(
            &mut projected_invoice,
            &projected_payments,
            &snapshot.refunds,
        );

        let seq = ctx.next_sequence();
        let recorded = StayEvent::new(
            seq,
            stay_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            metadata.timestamp,
            Some(metadata.client_timestamp),
            StayEventType::PaymentRecorded,
            EventPayload::PaymentRecorded {
                invoice_id: projected_invoice.invoice_id.clone(),
                payment,
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

        Ok(vec![recorded, recomputed])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stays::money::fill_line_item;
    use crate::stays::storage::StayStorage;
    use shared::stay::{InvoiceLineItem, InvoiceState, InvoiceStatus, StaySnapshot, StayStatus};

    fn create_test_metadata() -> CommandMetadata {
        CommandMetadata {
            command_id: "cmd-1".to_string(),
            operator_id: "user-1".to_string(),
            operator_name: "Test User".to_string(),
            timestamp: 1_767_225_600_000,
            client_timestamp: 1_767_225_599_000,
        }
    }

    // Finalized invoice at 232 total (2 x 100 plus 16% tax).
    fn seed_stay(storage: &StayStorage, mutate: impl FnOnce(&mut StaySnapshot)) {
        let mut snapshot = StaySnapshot::new("stay-1".to_string());
        snapshot.status = StayStatus::CheckedOut;
        let mut invoice = InvoiceState::new("inv-1");
        let mut item = InvoiceLineItem {
            line_item_id: "item-1".to_string(),
            description: "Room charge".to_string(),
            quantity: 2,
            unit_price: 100.0,
            total_price: 0.0,
            tax_rate: None,
            tax_amount: 0.0,
            room_id: None,
        };
        fill_line_item(&mut item);
        invoice.line_items.push(item);
        invoice.subtotal = 200.0;
        invoice.tax_amount = 32.0;
        invoice.total_amount = 232.0;
        invoice.status = InvoiceStatus::Pending;
        invoice.finalized_at = Some(1_767_200_000_000);
        snapshot.invoice = Some(invoice);
        mutate(&mut snapshot);

        let txn = storage.begin_write().unwrap();
        storage.store_snapshot(&txn, &snapshot).unwrap();
        storage.index_billing_ref(&txn, "inv-1", "stay-1").unwrap();
        txn.commit().unwrap();
    }

    fn completed_payment(id: &str, amount: f64) -> PaymentRecord {
        PaymentRecord {
            payment_id: id.to_string(),
            method: "CASH".to_string(),
            amount,
            reference: None,
            note: None,
            timestamp: 1_767_200_000_000,
            status: PaymentStatus::Completed,
            void_reason: None,
        }
    }

    fn action(amount: f64) -> ApplyPaymentAction {
        ApplyPaymentAction {
            invoice_id: "inv-1".to_string(),
            payment: PaymentInput {
                method: "CARD".to_string(),
                amount,
                reference: None,
                note: None,
            },
        }
    }

    #[tokio::test]
    async fn test_full_payment_settles_invoice() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, |_| {});

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let events = action(232.0)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        assert_eq!(events.len(), 2);
        if let EventPayload::PaymentRecorded { payment, .. } = &events[0].payload {
            assert_eq!(payment.amount, 232.0);
            assert_eq!(payment.method, "CARD");
            assert_eq!(payment.status, PaymentStatus::Completed);
            assert!(!payment.payment_id.is_empty());
        } else {
            panic!("Expected PaymentRecorded payload");
        }

        if let EventPayload::InvoiceRecomputed {
            total_paid, status, ..
        } = &events[1].payload
        {
            assert_eq!(*total_paid, 232.0);
            assert_eq!(*status, InvoiceStatus::Paid);
        } else {
            panic!("Expected InvoiceRecomputed payload");
        }
    }

    #[tokio::test]
    async fn test_partial_payment() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, |_| {});

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let events = action(100.0)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        if let EventPayload::InvoiceRecomputed {
            total_paid, status, ..
        } = &events[1].payload
        {
            assert_eq!(*total_paid, 100.0);
            assert_eq!(*status, InvoiceStatus::PartiallyPaid);
        } else {
            panic!("Expected InvoiceRecomputed payload");
        }
    }

    #[tokio::test]
    async fn test_overpayment_rejected() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, |s| {
            s.payments.push(completed_payment("pay-1", 232.0));
        });

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        // Even one unit over the settled total is refused.
        let result = action(1.0).execute(&mut ctx, &create_test_metadata()).await;
        assert!(matches!(result, Err(StayError::Overpayment(_))));
    }

    #[tokio::test]
    async fn test_exact_remaining_balance_accepted() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, |s| {
            s.payments.push(completed_payment("pay-1", 150.0));
        });

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let events = action(82.0)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        if let EventPayload::InvoiceRecomputed {
            total_paid, status, ..
        } = &events[1].payload
        {
            assert_eq!(*total_paid, 232.0);
            assert_eq!(*status, InvoiceStatus::Paid);
        } else {
            panic!("Expected InvoiceRecomputed payload");
        }
    }

    #[tokio::test]
    async fn test_refunded_payment_frees_its_slot() {
        use shared::stay::types::{RefundRecord, RefundStatus};

        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, |s| {
            let mut refunded = completed_payment("pay-1", 232.0);
            refunded.status = PaymentStatus::Refunded;
            s.payments.push(refunded);
            s.refunds.push(RefundRecord {
                refund_id: "ref-1".to_string(),
                payment_id: "pay-1".to_string(),
                amount: 232.0,
                reason: "Charged wrong card".to_string(),
                method: "CASH".to_string(),
                status: RefundStatus::Completed,
                requested_at: 1_767_200_000_000,
                resolved_at: Some(1_767_210_000_000),
                completed_at: Some(1_767_220_000_000),
                transaction_ref: None,
                reject_reason: None,
            });
        });

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        // The refunded payment no longer counts as collected.
        let events = action(232.0)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        if let EventPayload::InvoiceRecomputed {
            total_paid, status, ..
        } = &events[1].payload
        {
            assert_eq!(*total_paid, 232.0);
            assert_eq!(*status, InvoiceStatus::Paid);
        } else {
            panic!("Expected InvoiceRecomputed payload");
        }
    }

    #[tokio::test]
    async fn test_payment_on_draft_keeps_draft_status() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, |s| {
            if let Some(invoice) = s.invoice.as_mut() {
                invoice.status = InvoiceStatus::Draft;
                invoice.finalized_at = None;
            }
        });

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let events = action(100.0)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        // Money lands, but status derivation waits for finalization.
        if let EventPayload::InvoiceRecomputed {
            total_paid, status, ..
        } = &events[1].payload
        {
            assert_eq!(*total_paid, 100.0);
            assert_eq!(*status, InvoiceStatus::Draft);
        } else {
            panic!("Expected InvoiceRecomputed payload");
        }
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, |_| {});

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = action(0.0).execute(&mut ctx, &create_test_metadata()).await;
        assert!(matches!(result, Err(StayError::InvalidAmount)));

        let result = action(-10.0).execute(&mut ctx, &create_test_metadata()).await;
        assert!(matches!(result, Err(StayError::InvalidAmount)));
    }

    #[tokio::test]
    async fn test_empty_method_rejected() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, |_| {});

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let mut act = action(50.0);
        act.payment.method = "  ".to_string();
        let result = act.execute(&mut ctx, &create_test_metadata()).await;
        assert!(matches!(result, Err(StayError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unknown_invoice_fails() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, |_| {});

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let mut act = action(50.0);
        act.invoice_id = "inv-404".to_string();
        let result = act.execute(&mut ctx, &create_test_metadata()).await;
        assert!(matches!(result, Err(StayError::InvoiceNotFound(_))));
    }
}
