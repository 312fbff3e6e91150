//! ApplySplitPayment command handler
//!
//! Records a batch of up to four payment entries (cash plus card is
//! the common case) against one invoice. The batch is all-or-nothing:
//! its sum is guarded against the remaining balance before any entry
//! is recorded, and all entries land in a single event.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::stays::money::{
    recompute_invoice, remaining_balance, sum_completed_payments, to_decimal, validate_split_batch,
    MONEY_TOLERANCE,
};
use crate::stays::traits::{CommandContext, CommandHandler, CommandMetadata, StayError};
use shared::stay::types::{PaymentInput, PaymentRecord, PaymentStatus};
use shared::stay::{EventPayload, StayEvent, StayEventType};

/// ApplySplitPayment action
#[derive(Debug, Clone)]
pub struct ApplySplitPaymentAction {
    pub invoice_id: String,
    pub payments: Vec<PaymentInput>,
}

#[async_trait]
impl CommandHandler for ApplySplitPaymentAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<StayEvent>, StayError> {
        // 1. Validate the batch shape and every entry
        validate_split_batch(&self.payments)?;

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

        // 3. Guard the batch sum, not the entries one by one
        let batch_sum: Decimal = self.payments.iter().map(|p| to_decimal(p.amount)).sum();
        let collected = to_decimal(sum_completed_payments(&snapshot.payments));
        if collected + batch_sum > to_decimal(invoice.total_amount) + MONEY_TOLERANCE {
            return Err(StayError::Overpayment(format!(
                "split batch sum {} exceeds the remaining balance of {}",
                batch_sum,
                remaining_balance(invoice, &snapshot.payments)
            )));
        }

        // 4. Record every entry and project the paid-up ledger
        let records: Vec<PaymentRecord> = self
            .payments
            .iter()
            .map(|input| PaymentRecord {
                payment_id: uuid::Uuid::new_v4().to_string(),
                method: input.method.clone(),
                amount: input.amount,
                reference: input.reference.clone(),
                note: input.note.clone(),
                timestamp: metadata.timestamp,
                status: PaymentStatus::Completed,
                void_reason: None,
            })
            .collect();

        let mut projected_invoice = invoice.clone();
        let mut projected_payments = snapshot.payments.clone();
        projected_payments.extend(records.iter().cloned());
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
            StayEventType::SplitPaymentRecorded,
            EventPayload::SplitPaymentRecorded {
                invoice_id: projected_invoice.invoice_id.clone(),
                payments: records,
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
    use crate::stays::storage::StayStorage;
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

    // Finalized invoice at 232 total.
    fn seed_stay(storage: &StayStorage, mutate: impl FnOnce(&mut StaySnapshot)) {
        let mut snapshot = StaySnapshot::new("stay-1".to_string());
        snapshot.status = StayStatus::CheckedOut;
        let mut invoice = InvoiceState::new("inv-1");
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

    fn entry(method: &str, amount: f64) -> PaymentInput {
        PaymentInput {
            method: method.to_string(),
            amount,
            reference: None,
            note: None,
        }
    }

    fn action(payments: Vec<PaymentInput>) -> ApplySplitPaymentAction {
        ApplySplitPaymentAction {
            invoice_id: "inv-1".to_string(),
            payments,
        }
    }

    #[tokio::test]
    async fn test_split_batch_settles_invoice() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, |_| {});

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let events = action(vec![entry("CASH", 150.0), entry("CARD", 82.0)])
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        assert_eq!(events.len(), 2);
        if let EventPayload::SplitPaymentRecorded { payments, .. } = &events[0].payload {
            assert_eq!(payments.len(), 2);
            assert_eq!(payments[0].method, "CASH");
            assert_eq!(payments[0].amount, 150.0);
            assert_eq!(payments[1].method, "CARD");
            assert_eq!(payments[1].amount, 82.0);
            assert_ne!(payments[0].payment_id, payments[1].payment_id);
        } else {
            panic!("Expected SplitPaymentRecorded payload");
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
    async fn test_split_batch_over_balance_rejects_whole_batch() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, |_| {});

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        // 150 alone would fit; the batch sum of 240 does not.
        let result = action(vec![entry("CASH", 150.0), entry("CARD", 90.0)])
            .execute(&mut ctx, &create_test_metadata())
            .await;
        assert!(matches!(result, Err(StayError::Overpayment(_))));
    }

    #[tokio::test]
    async fn test_split_batch_counts_prior_payments() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, |s| {
            s.payments.push(PaymentRecord {
                payment_id: "pay-1".to_string(),
                method: "CASH".to_string(),
                amount: 100.0,
                reference: None,
                note: None,
                timestamp: 1_767_200_000_000,
                status: PaymentStatus::Completed,
                void_reason: None,
            });
        });

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let events = action(vec![entry("CARD", 100.0), entry("CASH", 32.0)])
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
    async fn test_split_batch_too_many_entries_fails() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, |_| {});

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = action(vec![
            entry("CASH", 40.0),
            entry("CARD", 40.0),
            entry("CARD", 40.0),
            entry("TRANSFER", 40.0),
            entry("CASH", 40.0),
        ])
        .execute(&mut ctx, &create_test_metadata())
        .await;
        assert!(matches!(result, Err(StayError::Validation(_))));
    }

    #[tokio::test]
    async fn test_split_batch_empty_fails() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, |_| {});

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = action(vec![]).execute(&mut ctx, &create_test_metadata()).await;
        assert!(matches!(result, Err(StayError::Validation(_))));
    }

    #[tokio::test]
    async fn test_split_batch_bad_entry_fails() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, |_| {});

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = action(vec![entry("CASH", 100.0), entry("CARD", 0.0)])
            .execute(&mut ctx, &create_test_metadata())
            .await;
        assert!(matches!(result, Err(StayError::InvalidAmount)));
    }

    #[tokio::test]
    async fn test_split_batch_unknown_invoice_fails() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, |_| {});

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let mut act = action(vec![entry("CASH", 50.0)]);
        act.invoice_id = "inv-404".to_string();
        let result = act.execute(&mut ctx, &create_test_metadata()).await;
        assert!(matches!(result, Err(StayError::InvoiceNotFound(_))));
    }
}
