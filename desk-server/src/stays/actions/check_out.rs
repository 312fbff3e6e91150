//! CheckOut command handler
//!
//! Departure: bills the stayed nights onto the invoice, finalizes the
//! ledger, and sends the room to cleaning. Nights are billed per rate
//! segment, so a mid-stay room change produces one room-charge line
//! per segment. A same-day departure still bills one night.

use async_trait::async_trait;
use chrono::Days;

use crate::stays::money::{fill_line_item, recompute_invoice};
use crate::stays::traits::{CommandContext, CommandHandler, CommandMetadata, StayError};
use crate::utils::{billable_nights, date_of_millis};
use shared::models::RoomStatus;
use shared::stay::{
    EventPayload, InvoiceLineItem, RateSegment, StayEvent, StayEventType, StayStatus,
};

/// CheckOut action
#[derive(Debug, Clone)]
pub struct CheckOutAction {
    pub stay_id: String,
    /// Days until the finalized invoice falls due, injected by StayManager.
    pub invoice_due_days: i64,
}

#[async_trait]
impl CommandHandler for CheckOutAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<StayEvent>, StayError> {
        // 1. Only an in-house stay can depart
        let snapshot = ctx.load_snapshot(&self.stay_id)?;
        if snapshot.status != StayStatus::CheckedIn {
            return Err(StayError::InvalidTransition(format!(
                "cannot check out a {} reservation",
                snapshot.status
            )));
        }
        let invoice = snapshot
            .invoice
            .as_ref()
            .ok_or_else(|| StayError::InvoiceNotFound(self.stay_id.clone()))?;
        let room = ctx.load_room(&snapshot.room_id)?;

        // 2. Count the stayed nights (calendar dates, minimum one)
        let check_in_ts = snapshot.actual_check_in.unwrap_or(metadata.timestamp);
        let nights = billable_nights(check_in_ts, metadata.timestamp);

        // 3. One room-charge line per consecutive run of same-segment nights
        let arrival_date = date_of_millis(check_in_ts);
        let mut groups: Vec<(&RateSegment, i32)> = Vec::new();
        for i in 0..nights {
            let night = arrival_date
                .checked_add_days(Days::new(i as u64))
                .ok_or_else(|| StayError::Validation("date overflow".to_string()))?;
            if let Some(segment) = snapshot.segment_for_night(night) {
                match groups.last_mut() {
                    Some((last, qty)) if last.from_date == segment.from_date => *qty += 1,
                    _ => groups.push((segment, 1)),
                }
            }
        }
        let mut room_items = Vec::with_capacity(groups.len());
        for (segment, qty) in groups {
            let mut item = InvoiceLineItem {
                line_item_id: uuid::Uuid::new_v4().to_string(),
                description: format!("Room {} nightly rate", segment.room_name),
                quantity: qty,
                unit_price: segment.nightly_rate,
                total_price: 0.0,
                tax_rate: None,
                tax_amount: 0.0,
                room_id: Some(segment.room_id.clone()),
            };
            fill_line_item(&mut item);
            room_items.push(item);
        }

        let due_date = date_of_millis(metadata.timestamp)
            .checked_add_days(Days::new(self.invoice_due_days.max(0) as u64))
            .ok_or_else(|| StayError::Validation("date overflow".to_string()))?;

        // 4. Project the finalized ledger for the recompute payload
        let mut projected = invoice.clone();
        projected.line_items.extend(room_items.iter().cloned());
        projected.finalized_at = Some(metadata.timestamp);
        projected.due_date = Some(due_date);
        let total_paid = recompute_invoice(&mut projected, &snapshot.payments, &snapshot.refunds);

        let seq = ctx.next_sequence();
        let checked_out = StayEvent::new(
            seq,
            self.stay_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            metadata.timestamp,
            Some(metadata.client_timestamp),
            StayEventType::StayCheckedOut,
            EventPayload::StayCheckedOut {
                room_id: room.id.clone(),
                actual_check_out: metadata.timestamp,
                billable_nights: nights,
            },
        );

        let seq = ctx.next_sequence();
        let finalized = StayEvent::new(
            seq,
            self.stay_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            metadata.timestamp,
            Some(metadata.client_timestamp),
            StayEventType::InvoiceFinalized,
            EventPayload::InvoiceFinalized {
                invoice_id: projected.invoice_id.clone(),
                line_items: room_items,
                due_date,
            },
        );

        let seq = ctx.next_sequence();
        let recomputed = StayEvent::new(
            seq,
            self.stay_id.clone(),
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

        let seq = ctx.next_sequence();
        let room_cleaning = StayEvent::new(
            seq,
            room.id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            metadata.timestamp,
            Some(metadata.client_timestamp),
            StayEventType::RoomStatusChanged,
            EventPayload::RoomStatusChanged {
                room_id: room.id,
                previous_status: room.status,
                new_status: RoomStatus::Cleaning,
                reason: None,
            },
        );

        Ok(vec![checked_out, finalized, recomputed, room_cleaning])
    }
}
