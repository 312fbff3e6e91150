//! Appliers for the reservation phase: creation, amendment,
//! confirmation, cancellation and no-show.

use crate::stays::traits::EventApplier;
use shared::stay::types::RateSegment;
use shared::stay::{EventPayload, StayEvent, StaySnapshot, StayStatus};

/// ReservationCreated applier
pub struct ReservationCreatedApplier;

impl EventApplier for ReservationCreatedApplier {
    fn apply(&self, snapshot: &mut StaySnapshot, event: &StayEvent) {
        if let EventPayload::ReservationCreated {
            guest_id,
            guest_name,
            room_id,
            room_name,
            room_type_id,
            check_in_date,
            check_out_date,
            num_adults,
            num_children,
            source,
            note,
            nightly_rate,
            base_rate,
            applied_rule_id,
            applied_rule_name,
            quoted_total,
        } = &event.payload
        {
            snapshot.guest_id = guest_id.clone();
            snapshot.guest_name = guest_name.clone();
            snapshot.room_id = room_id.clone();
            snapshot.room_name = room_name.clone();
            snapshot.room_type_id = room_type_id.clone();
            snapshot.check_in_date = *check_in_date;
            snapshot.check_out_date = *check_out_date;
            snapshot.num_adults = *num_adults;
            snapshot.num_children = *num_children;
            snapshot.source = source.clone();
            snapshot.note = note.clone();
            snapshot.status = StayStatus::Pending;
            snapshot.quoted_total = *quoted_total;

            // Opening rate segment covers the whole booked range.
            snapshot.segments = vec![RateSegment {
                from_date: *check_in_date,
                room_id: room_id.clone(),
                room_name: room_name.clone(),
                room_type_id: room_type_id.clone(),
                nightly_rate: *nightly_rate,
                base_rate: *base_rate,
                applied_rule_id: applied_rule_id.clone(),
                applied_rule_name: applied_rule_name.clone(),
            }];

            snapshot.created_at = event.timestamp;
            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
            snapshot.update_checksum();
        }
    }
}

/// ReservationUpdated applier
///
/// The event carries the full post-update values, so applying is a
/// straight overwrite plus a rebuilt rate segment.
pub struct ReservationUpdatedApplier;

impl EventApplier for ReservationUpdatedApplier {
    fn apply(&self, snapshot: &mut StaySnapshot, event: &StayEvent) {
        if let EventPayload::ReservationUpdated {
            room_id,
            room_name,
            room_type_id,
            check_in_date,
            check_out_date,
            num_adults,
            num_children,
            note,
            nightly_rate,
            base_rate,
            applied_rule_id,
            applied_rule_name,
            quoted_total,
        } = &event.payload
        {
            snapshot.room_id = room_id.clone();
            snapshot.room_name = room_name.clone();
            snapshot.room_type_id = room_type_id.clone();
            snapshot.check_in_date = *check_in_date;
            snapshot.check_out_date = *check_out_date;
            snapshot.num_adults = *num_adults;
            snapshot.num_children = *num_children;
            snapshot.note = note.clone();
            snapshot.quoted_total = *quoted_total;

            // Updates happen before check-in, so the single opening
            // segment is replaced wholesale.
            snapshot.segments = vec![RateSegment {
                from_date: *check_in_date,
                room_id: room_id.clone(),
                room_name: room_name.clone(),
                room_type_id: room_type_id.clone(),
                nightly_rate: *nightly_rate,
                base_rate: *base_rate,
                applied_rule_id: applied_rule_id.clone(),
                applied_rule_name: applied_rule_name.clone(),
            }];

            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
            snapshot.update_checksum();
        }
    }
}

/// ReservationConfirmed applier
pub struct ReservationConfirmedApplier;

impl EventApplier for ReservationConfirmedApplier {
    fn apply(&self, snapshot: &mut StaySnapshot, event: &StayEvent) {
        if let EventPayload::ReservationConfirmed {} = &event.payload {
            snapshot.status = StayStatus::Confirmed;

            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
            snapshot.update_checksum();
        }
    }
}

/// ReservationCancelled applier
pub struct ReservationCancelledApplier;

impl EventApplier for ReservationCancelledApplier {
    fn apply(&self, snapshot: &mut StaySnapshot, event: &StayEvent) {
        if let EventPayload::ReservationCancelled {
            reason,
            released_after,
        } = &event.payload
        {
            snapshot.status = StayStatus::Cancelled;
            snapshot.cancel_reason = reason.clone();
            snapshot.released_after = Some(*released_after);

            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
            snapshot.update_checksum();
        }
    }
}

/// ReservationNoShow applier
pub struct ReservationNoShowApplier;

impl EventApplier for ReservationNoShowApplier {
    fn apply(&self, snapshot: &mut StaySnapshot, event: &StayEvent) {
        if let EventPayload::ReservationNoShow { released_after } = &event.payload {
            snapshot.status = StayStatus::NoShow;
            snapshot.released_after = Some(*released_after);

            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
            snapshot.update_checksum();
        }
    }
}
