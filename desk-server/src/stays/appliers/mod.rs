//! Event applier implementations
//!
//! Each applier implements the `EventApplier` trait and handles one
//! specific event type. Appliers are PURE functions over the snapshot:
//! no storage access, no derived-total math. Replaying a stay's event
//! log through them reproduces the live snapshot bit for bit.

use enum_dispatch::enum_dispatch;

use shared::stay::{EventPayload, StayEvent};

mod billing;
mod lifecycle;
mod payments;
mod refunds;
mod reservation;

pub use billing::{
    InvoiceDiscountAppliedApplier, InvoiceFinalizedApplier, InvoiceMarkedOverdueApplier,
    InvoiceRecomputedApplier, LineItemAddedApplier, LineItemRemovedApplier,
};
pub use lifecycle::{RoomChangedApplier, StayCheckedInApplier, StayCheckedOutApplier};
pub use payments::{PaymentRecordedApplier, PaymentVoidedApplier, SplitPaymentRecordedApplier};
pub use refunds::{
    RefundApprovedApplier, RefundCompletedApplier, RefundRejectedApplier, RefundRequestedApplier,
};
pub use reservation::{
    ReservationCancelledApplier, ReservationConfirmedApplier, ReservationCreatedApplier,
    ReservationNoShowApplier, ReservationUpdatedApplier,
};

/// EventAction enum - dispatches to concrete applier implementations
///
/// Uses enum_dispatch for zero-cost static dispatch.
#[enum_dispatch(EventApplier)]
pub enum EventAction {
    ReservationCreated(ReservationCreatedApplier),
    ReservationUpdated(ReservationUpdatedApplier),
    ReservationConfirmed(ReservationConfirmedApplier),
    ReservationCancelled(ReservationCancelledApplier),
    ReservationNoShow(ReservationNoShowApplier),
    StayCheckedIn(StayCheckedInApplier),
    RoomChanged(RoomChangedApplier),
    StayCheckedOut(StayCheckedOutApplier),
    InvoiceFinalized(InvoiceFinalizedApplier),
    LineItemAdded(LineItemAddedApplier),
    LineItemRemoved(LineItemRemovedApplier),
    InvoiceDiscountApplied(InvoiceDiscountAppliedApplier),
    InvoiceMarkedOverdue(InvoiceMarkedOverdueApplier),
    InvoiceRecomputed(InvoiceRecomputedApplier),
    PaymentRecorded(PaymentRecordedApplier),
    SplitPaymentRecorded(SplitPaymentRecordedApplier),
    PaymentVoided(PaymentVoidedApplier),
    RefundRequested(RefundRequestedApplier),
    RefundApproved(RefundApprovedApplier),
    RefundRejected(RefundRejectedApplier),
    RefundCompleted(RefundCompletedApplier),
}

impl EventAction {
    /// Resolve the applier for an event.
    ///
    /// This is the ONLY place with a match on `EventPayload` for
    /// application. Returns `None` for `RoomStatusChanged`: room
    /// status lives in the rooms table, not in any stay snapshot, and
    /// the manager persists it directly.
    pub fn for_event(event: &StayEvent) -> Option<EventAction> {
        match &event.payload {
            EventPayload::ReservationCreated { .. } => {
                Some(EventAction::ReservationCreated(ReservationCreatedApplier))
            }
            EventPayload::ReservationUpdated { .. } => {
                Some(EventAction::ReservationUpdated(ReservationUpdatedApplier))
            }
            EventPayload::ReservationConfirmed {} => Some(EventAction::ReservationConfirmed(
                ReservationConfirmedApplier,
            )),
            EventPayload::ReservationCancelled { .. } => Some(EventAction::ReservationCancelled(
                ReservationCancelledApplier,
            )),
            EventPayload::ReservationNoShow { .. } => {
                Some(EventAction::ReservationNoShow(ReservationNoShowApplier))
            }
            EventPayload::StayCheckedIn { .. } => {
                Some(EventAction::StayCheckedIn(StayCheckedInApplier))
            }
            EventPayload::RoomChanged { .. } => Some(EventAction::RoomChanged(RoomChangedApplier)),
            EventPayload::StayCheckedOut { .. } => {
                Some(EventAction::StayCheckedOut(StayCheckedOutApplier))
            }
            EventPayload::RoomStatusChanged { .. } => None,
            EventPayload::InvoiceFinalized { .. } => {
                Some(EventAction::InvoiceFinalized(InvoiceFinalizedApplier))
            }
            EventPayload::LineItemAdded { .. } => {
                Some(EventAction::LineItemAdded(LineItemAddedApplier))
            }
            EventPayload::LineItemRemoved { .. } => {
                Some(EventAction::LineItemRemoved(LineItemRemovedApplier))
            }
            EventPayload::InvoiceDiscountApplied { .. } => Some(EventAction::InvoiceDiscountApplied(
                InvoiceDiscountAppliedApplier,
            )),
            EventPayload::InvoiceMarkedOverdue { .. } => Some(EventAction::InvoiceMarkedOverdue(
                InvoiceMarkedOverdueApplier,
            )),
            EventPayload::InvoiceRecomputed { .. } => {
                Some(EventAction::InvoiceRecomputed(InvoiceRecomputedApplier))
            }
            EventPayload::PaymentRecorded { .. } => {
                Some(EventAction::PaymentRecorded(PaymentRecordedApplier))
            }
            EventPayload::SplitPaymentRecorded { .. } => Some(EventAction::SplitPaymentRecorded(
                SplitPaymentRecordedApplier,
            )),
            EventPayload::PaymentVoided { .. } => {
                Some(EventAction::PaymentVoided(PaymentVoidedApplier))
            }
            EventPayload::RefundRequested { .. } => {
                Some(EventAction::RefundRequested(RefundRequestedApplier))
            }
            EventPayload::RefundApproved { .. } => {
                Some(EventAction::RefundApproved(RefundApprovedApplier))
            }
            EventPayload::RefundRejected { .. } => {
                Some(EventAction::RefundRejected(RefundRejectedApplier))
            }
            EventPayload::RefundCompleted { .. } => {
                Some(EventAction::RefundCompleted(RefundCompletedApplier))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stays::traits::EventApplier;
    use shared::models::RoomStatus;
    use shared::stay::{StayEventType, StaySnapshot, StayStatus};

    fn make_event(event_type: StayEventType, payload: EventPayload) -> StayEvent {
        StayEvent::new(
            1,
            "stay-1".to_string(),
            "user-1".to_string(),
            "Test User".to_string(),
            "cmd-1".to_string(),
            1_767_225_600_000,
            None,
            event_type,
            payload,
        )
    }

    #[test]
    fn test_room_status_event_has_no_snapshot_applier() {
        let event = make_event(
            StayEventType::RoomStatusChanged,
            EventPayload::RoomStatusChanged {
                room_id: "room-101".to_string(),
                previous_status: RoomStatus::Cleaning,
                new_status: RoomStatus::Available,
                reason: None,
            },
        );
        assert!(EventAction::for_event(&event).is_none());
    }

    #[test]
    fn test_dispatch_applies_through_enum() {
        let event = make_event(
            StayEventType::ReservationConfirmed,
            EventPayload::ReservationConfirmed {},
        );
        let mut snapshot = StaySnapshot::new("stay-1".to_string());

        let applier = EventAction::for_event(&event).unwrap();
        applier.apply(&mut snapshot, &event);

        assert_eq!(snapshot.status, StayStatus::Confirmed);
        assert_eq!(snapshot.last_sequence, 1);
    }
}
