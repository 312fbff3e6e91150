//! Appliers for the in-house phase: check-in, room change, check-out.

use crate::stays::traits::EventApplier;
use shared::stay::types::RateSegment;
use shared::stay::{EventPayload, InvoiceState, StayEvent, StaySnapshot, StayStatus};

/// StayCheckedIn applier
///
/// Opens the stay's draft invoice alongside the status change.
pub struct StayCheckedInApplier;

impl EventApplier for StayCheckedInApplier {
    fn apply(&self, snapshot: &mut StaySnapshot, event: &StayEvent) {
        if let EventPayload::StayCheckedIn {
            room_id: _,
            actual_check_in,
            invoice_id,
        } = &event.payload
        {
            snapshot.status = StayStatus::CheckedIn;
            snapshot.actual_check_in = Some(*actual_check_in);
            snapshot.invoice = Some(InvoiceState::new(invoice_id.clone()));

            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
            snapshot.update_checksum();
        }
    }
}

/// RoomChanged applier
///
/// Rewrites the assigned room and appends the new rate segment. The
/// previous segments stay: nights already slept keep their rate.
pub struct RoomChangedApplier;

impl EventApplier for RoomChangedApplier {
    fn apply(&self, snapshot: &mut StaySnapshot, event: &StayEvent) {
        if let EventPayload::RoomChanged {
            previous_room_id: _,
            previous_room_name: _,
            new_room_id,
            new_room_name,
            new_room_type_id,
            effective_date,
            nightly_rate,
            base_rate,
            applied_rule_id,
            applied_rule_name,
            quoted_total,
        } = &event.payload
        {
            snapshot.room_id = new_room_id.clone();
            snapshot.room_name = new_room_name.clone();
            snapshot.room_type_id = new_room_type_id.clone();
            snapshot.quoted_total = *quoted_total;

            snapshot.segments.push(RateSegment {
                from_date: *effective_date,
                room_id: new_room_id.clone(),
                room_name: new_room_name.clone(),
                room_type_id: new_room_type_id.clone(),
                nightly_rate: *nightly_rate,
                base_rate: *base_rate,
                applied_rule_id: applied_rule_id.clone(),
                applied_rule_name: applied_rule_name.clone(),
            });

            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
            snapshot.update_checksum();
        }
    }
}

/// StayCheckedOut applier
pub struct StayCheckedOutApplier;

impl EventApplier for StayCheckedOutApplier {
    fn apply(&self, snapshot: &mut StaySnapshot, event: &StayEvent) {
        if let EventPayload::StayCheckedOut {
            room_id: _,
            actual_check_out,
            billable_nights,
        } = &event.payload
        {
            snapshot.status = StayStatus::CheckedOut;
            snapshot.actual_check_out = Some(*actual_check_out);
            snapshot.billable_nights = Some(*billable_nights);

            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
            snapshot.update_checksum();
        }
    }
}
