//! Stay domain events.
//!
//! Events are the persisted source of truth: every successful state
//! transition and every ledger recompute is recorded as one event and
//! broadcast to subscribers after commit. Replaying a stay's events
//! reproduces its snapshot exactly.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::RoomStatus;
use crate::stay::snapshot::InvoiceStatus;
use crate::stay::types::{InvoiceLineItem, PaymentRecord, RefundRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StayEventType {
    ReservationCreated,
    ReservationConfirmed,
    ReservationUpdated,
    ReservationCancelled,
    ReservationNoShow,
    StayCheckedIn,
    RoomChanged,
    StayCheckedOut,
    RoomStatusChanged,
    InvoiceFinalized,
    LineItemAdded,
    LineItemRemoved,
    InvoiceDiscountApplied,
    InvoiceMarkedOverdue,
    InvoiceRecomputed,
    PaymentRecorded,
    SplitPaymentRecorded,
    PaymentVoided,
    RefundRequested,
    RefundApproved,
    RefundRejected,
    RefundCompleted,
}

impl std::fmt::Display for StayEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StayEventType::ReservationCreated => "RESERVATION_CREATED",
            StayEventType::ReservationConfirmed => "RESERVATION_CONFIRMED",
            StayEventType::ReservationUpdated => "RESERVATION_UPDATED",
            StayEventType::ReservationCancelled => "RESERVATION_CANCELLED",
            StayEventType::ReservationNoShow => "RESERVATION_NO_SHOW",
            StayEventType::StayCheckedIn => "STAY_CHECKED_IN",
            StayEventType::RoomChanged => "ROOM_CHANGED",
            StayEventType::StayCheckedOut => "STAY_CHECKED_OUT",
            StayEventType::RoomStatusChanged => "ROOM_STATUS_CHANGED",
            StayEventType::InvoiceFinalized => "INVOICE_FINALIZED",
            StayEventType::LineItemAdded => "LINE_ITEM_ADDED",
            StayEventType::LineItemRemoved => "LINE_ITEM_REMOVED",
            StayEventType::InvoiceDiscountApplied => "INVOICE_DISCOUNT_APPLIED",
            StayEventType::InvoiceMarkedOverdue => "INVOICE_MARKED_OVERDUE",
            StayEventType::InvoiceRecomputed => "INVOICE_RECOMPUTED",
            StayEventType::PaymentRecorded => "PAYMENT_RECORDED",
            StayEventType::SplitPaymentRecorded => "SPLIT_PAYMENT_RECORDED",
            StayEventType::PaymentVoided => "PAYMENT_VOIDED",
            StayEventType::RefundRequested => "REFUND_REQUESTED",
            StayEventType::RefundApproved => "REFUND_APPROVED",
            StayEventType::RefundRejected => "REFUND_REJECTED",
            StayEventType::RefundCompleted => "REFUND_COMPLETED",
        };
        write!(f, "{}", s)
    }
}

/// Typed event payloads. The tag mirrors `StayEventType`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    ReservationCreated {
        guest_id: String,
        guest_name: String,
        room_id: String,
        room_name: String,
        room_type_id: String,
        check_in_date: NaiveDate,
        check_out_date: NaiveDate,
        num_adults: i32,
        num_children: i32,
        source: Option<String>,
        note: Option<String>,
        nightly_rate: f64,
        base_rate: f64,
        applied_rule_id: Option<String>,
        applied_rule_name: Option<String>,
        quoted_total: f64,
    },
    ReservationConfirmed {},
    /// Carries the full post-update values so replay is deterministic.
    ReservationUpdated {
        room_id: String,
        room_name: String,
        room_type_id: String,
        check_in_date: NaiveDate,
        check_out_date: NaiveDate,
        num_adults: i32,
        num_children: i32,
        note: Option<String>,
        nightly_rate: f64,
        base_rate: f64,
        applied_rule_id: Option<String>,
        applied_rule_name: Option<String>,
        quoted_total: f64,
    },
    ReservationCancelled {
        reason: Option<String>,
        /// Instant after which the dates stop blocking availability.
        released_after: i64,
    },
    ReservationNoShow {
        released_after: i64,
    },
    StayCheckedIn {
        room_id: String,
        actual_check_in: i64,
        /// The draft invoice opened for this stay.
        invoice_id: String,
    },
    RoomChanged {
        previous_room_id: String,
        previous_room_name: String,
        new_room_id: String,
        new_room_name: String,
        new_room_type_id: String,
        /// First night billed under the new segment.
        effective_date: NaiveDate,
        nightly_rate: f64,
        base_rate: f64,
        applied_rule_id: Option<String>,
        applied_rule_name: Option<String>,
        quoted_total: f64,
    },
    StayCheckedOut {
        room_id: String,
        actual_check_out: i64,
        billable_nights: i64,
    },
    RoomStatusChanged {
        room_id: String,
        previous_status: RoomStatus,
        new_status: RoomStatus,
        reason: Option<String>,
    },
    InvoiceFinalized {
        invoice_id: String,
        /// Room charges posted at finalization; empty for a manual
        /// finalize with no generated charges.
        line_items: Vec<InvoiceLineItem>,
        due_date: NaiveDate,
    },
    LineItemAdded {
        invoice_id: String,
        item: InvoiceLineItem,
    },
    LineItemRemoved {
        invoice_id: String,
        line_item_id: String,
    },
    InvoiceDiscountApplied {
        invoice_id: String,
        discount_amount: f64,
    },
    InvoiceMarkedOverdue {
        invoice_id: String,
    },
    /// Emitted after every ledger recompute with the derived totals.
    InvoiceRecomputed {
        invoice_id: String,
        subtotal: f64,
        tax_amount: f64,
        discount_amount: f64,
        total_amount: f64,
        total_paid: f64,
        status: InvoiceStatus,
    },
    PaymentRecorded {
        invoice_id: String,
        payment: PaymentRecord,
    },
    /// All entries of one split batch, persisted atomically.
    SplitPaymentRecorded {
        invoice_id: String,
        payments: Vec<PaymentRecord>,
    },
    PaymentVoided {
        invoice_id: String,
        payment_id: String,
        reason: String,
    },
    RefundRequested {
        refund: RefundRecord,
    },
    RefundApproved {
        refund_id: String,
    },
    RefundRejected {
        refund_id: String,
        reason: String,
    },
    RefundCompleted {
        refund_id: String,
        transaction_ref: Option<String>,
    },
}

/// A persisted stay event.
///
/// `subject_id` is the aggregate the event belongs to: a stay id for
/// lifecycle/billing events, a room id for housekeeping transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StayEvent {
    pub event_id: String,
    /// Global monotonic sequence across all subjects.
    pub sequence: u64,
    pub subject_id: String,
    /// Server-authoritative time the command was accepted.
    pub timestamp: i64,
    /// Client clock from the command envelope, kept for audit.
    pub client_timestamp: Option<i64>,
    pub operator_id: String,
    pub operator_name: String,
    pub command_id: String,
    pub event_type: StayEventType,
    pub payload: EventPayload,
}

impl StayEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sequence: u64,
        subject_id: String,
        operator_id: String,
        operator_name: String,
        command_id: String,
        timestamp: i64,
        client_timestamp: Option<i64>,
        event_type: StayEventType,
        payload: EventPayload,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            sequence,
            subject_id,
            timestamp,
            client_timestamp,
            operator_id,
            operator_name,
            command_id,
            event_type,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_tag_matches_event_type_display() {
        let payload = EventPayload::ReservationConfirmed {};
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "RESERVATION_CONFIRMED");
        assert_eq!(
            json["type"],
            StayEventType::ReservationConfirmed.to_string().as_str()
        );
    }

    #[test]
    fn test_event_roundtrip() {
        let event = StayEvent::new(
            7,
            "stay-1".to_string(),
            "op-1".to_string(),
            "Front Desk".to_string(),
            "cmd-1".to_string(),
            1_700_000_000_000,
            Some(1_699_999_999_000),
            StayEventType::RefundApproved,
            EventPayload::RefundApproved {
                refund_id: "ref-1".to_string(),
            },
        );

        let bytes = serde_json::to_vec(&event).unwrap();
        let back: StayEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.sequence, 7);
        assert_eq!(back.subject_id, "stay-1");
        assert_eq!(back.event_type, StayEventType::RefundApproved);
        assert_eq!(back.timestamp, 1_700_000_000_000);
    }
}
