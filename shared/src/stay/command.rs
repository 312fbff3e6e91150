//! Command envelope submitted by front-desk clients.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stay::types::{LineItemInput, PaymentInput, ReservationChanges, ReservationInput};

/// A front-desk command. `command_id` is the idempotency key: a
/// command that was already processed is acknowledged, not re-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StayCommand {
    pub command_id: String,
    pub operator_id: String,
    pub operator_name: String,
    /// Client-side submission time. The server stamps its own receipt
    /// time on the resulting events.
    pub timestamp: i64,
    pub payload: StayCommandPayload,
}

impl StayCommand {
    pub fn new(
        operator_id: impl Into<String>,
        operator_name: impl Into<String>,
        payload: StayCommandPayload,
    ) -> Self {
        Self {
            command_id: Uuid::new_v4().to_string(),
            operator_id: operator_id.into(),
            operator_name: operator_name.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StayCommandPayload {
    // Reservation lifecycle
    CreateReservation {
        reservation: ReservationInput,
    },
    UpdateReservation {
        stay_id: String,
        changes: ReservationChanges,
    },
    ConfirmReservation {
        stay_id: String,
    },
    CancelReservation {
        stay_id: String,
        reason: Option<String>,
    },
    MarkNoShow {
        stay_id: String,
    },

    // In-house lifecycle
    CheckIn {
        stay_id: String,
    },
    ChangeRoom {
        stay_id: String,
        new_room_id: String,
    },
    CheckOut {
        stay_id: String,
    },

    // Housekeeping
    MarkRoomClean {
        room_id: String,
    },
    SetRoomMaintenance {
        room_id: String,
        reason: Option<String>,
    },
    ClearRoomMaintenance {
        room_id: String,
    },

    // Invoice
    FinalizeInvoice {
        invoice_id: String,
    },
    AddLineItem {
        invoice_id: String,
        item: LineItemInput,
    },
    RemoveLineItem {
        invoice_id: String,
        line_item_id: String,
    },
    ApplyInvoiceDiscount {
        invoice_id: String,
        amount: f64,
    },
    MarkInvoiceOverdue {
        invoice_id: String,
    },

    // Payments
    ApplyPayment {
        invoice_id: String,
        payment: PaymentInput,
    },
    ApplySplitPayment {
        invoice_id: String,
        payments: Vec<PaymentInput>,
    },
    VoidPayment {
        payment_id: String,
        reason: Option<String>,
    },

    // Refunds
    RequestRefund {
        payment_id: String,
        amount: f64,
        reason: String,
        method: Option<String>,
    },
    ApproveRefund {
        refund_id: String,
    },
    RejectRefund {
        refund_id: String,
        reason: Option<String>,
    },
    CompleteRefund {
        refund_id: String,
        transaction_ref: Option<String>,
    },
}

impl StayCommandPayload {
    /// Short operation name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            StayCommandPayload::CreateReservation { .. } => "CREATE_RESERVATION",
            StayCommandPayload::UpdateReservation { .. } => "UPDATE_RESERVATION",
            StayCommandPayload::ConfirmReservation { .. } => "CONFIRM_RESERVATION",
            StayCommandPayload::CancelReservation { .. } => "CANCEL_RESERVATION",
            StayCommandPayload::MarkNoShow { .. } => "MARK_NO_SHOW",
            StayCommandPayload::CheckIn { .. } => "CHECK_IN",
            StayCommandPayload::ChangeRoom { .. } => "CHANGE_ROOM",
            StayCommandPayload::CheckOut { .. } => "CHECK_OUT",
            StayCommandPayload::MarkRoomClean { .. } => "MARK_ROOM_CLEAN",
            StayCommandPayload::SetRoomMaintenance { .. } => "SET_ROOM_MAINTENANCE",
            StayCommandPayload::ClearRoomMaintenance { .. } => "CLEAR_ROOM_MAINTENANCE",
            StayCommandPayload::FinalizeInvoice { .. } => "FINALIZE_INVOICE",
            StayCommandPayload::AddLineItem { .. } => "ADD_LINE_ITEM",
            StayCommandPayload::RemoveLineItem { .. } => "REMOVE_LINE_ITEM",
            StayCommandPayload::ApplyInvoiceDiscount { .. } => "APPLY_INVOICE_DISCOUNT",
            StayCommandPayload::MarkInvoiceOverdue { .. } => "MARK_INVOICE_OVERDUE",
            StayCommandPayload::ApplyPayment { .. } => "APPLY_PAYMENT",
            StayCommandPayload::ApplySplitPayment { .. } => "APPLY_SPLIT_PAYMENT",
            StayCommandPayload::VoidPayment { .. } => "VOID_PAYMENT",
            StayCommandPayload::RequestRefund { .. } => "REQUEST_REFUND",
            StayCommandPayload::ApproveRefund { .. } => "APPROVE_REFUND",
            StayCommandPayload::RejectRefund { .. } => "REJECT_REFUND",
            StayCommandPayload::CompleteRefund { .. } => "COMPLETE_REFUND",
        }
    }
}
