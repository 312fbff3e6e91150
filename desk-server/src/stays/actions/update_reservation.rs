//! UpdateReservation command handler
//!
//! Applies partial changes (room, dates, party size, note) to a
//! reservation that has not checked in yet. Date or room changes
//! re-run the availability guard with the reservation itself
//! excluded, and the nightly rate is re-resolved against the merged
//! values. The event carries the full post-update state so replay
//! needs no merge logic.

use async_trait::async_trait;

use crate::pricing;
use crate::stays::traits::{CommandContext, CommandHandler, CommandMetadata, StayError};
use crate::utils::nights_between;
use shared::models::PricingRule;
use shared::stay::{EventPayload, ReservationChanges, StayEvent, StayEventType, StayStatus};

/// UpdateReservation action
#[derive(Debug, Clone)]
pub struct UpdateReservationAction {
    pub stay_id: String,
    pub changes: ReservationChanges,
    /// Active pricing rules, injected by StayManager.
    pub rules: Vec<PricingRule>,
}

#[async_trait]
impl CommandHandler for UpdateReservationAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<StayEvent>, StayError> {
        if self.changes.is_empty() {
            return Err(StayError::Validation(
                "update contains no changes".to_string(),
            ));
        }

        // 1. Load and check the stay is still amendable
        let snapshot = ctx.load_snapshot(&self.stay_id)?;
        match snapshot.status {
            StayStatus::Pending | StayStatus::Confirmed => {}
            status => {
                return Err(StayError::InvalidTransition(format!(
                    "cannot update a {} reservation",
                    status
                )));
            }
        }

        // 2. Merge the changes onto the current values
        let changes = &self.changes;
        let room_id = changes.room_id.clone().unwrap_or(snapshot.room_id.clone());
        let check_in = changes.check_in_date.unwrap_or(snapshot.check_in_date);
        let check_out = changes.check_out_date.unwrap_or(snapshot.check_out_date);
        let num_adults = changes.num_adults.unwrap_or(snapshot.num_adults);
        let num_children = changes.num_children.unwrap_or(snapshot.num_children);
        let note = changes.note.clone().or(snapshot.note.clone());

        if check_in >= check_out {
            return Err(StayError::Validation(format!(
                "check_in_date {} must be before check_out_date {}",
                check_in, check_out
            )));
        }
        if num_adults < 1 {
            return Err(StayError::Validation(
                "num_adults must be at least 1".to_string(),
            ));
        }
        if num_children < 0 {
            return Err(StayError::Validation(
                "num_children must not be negative".to_string(),
            ));
        }

        // 3. Target room must exist and fit the party
        let room = ctx.load_room(&room_id)?;
        if let Some(cap) = room.max_occupancy
            && num_adults + num_children > cap
        {
            return Err(StayError::Validation(format!(
                "party of {} exceeds room capacity {}",
                num_adults + num_children,
                cap
            )));
        }

        // 4. Re-run the guard, excluding this reservation's own block
        let available = ctx.is_room_available(
            &room_id,
            check_in,
            check_out,
            Some(&self.stay_id),
            metadata.timestamp,
        )?;
        if !available {
            return Err(StayError::RoomUnavailable(format!(
                "Room {} is not available for {} to {}",
                room.name, check_in, check_out
            )));
        }

        // 5. Re-resolve the rate for the merged stay
        let resolved = pricing::resolve_price(
            room.base_price,
            &room.room_type_id,
            check_in,
            check_out,
            &self.rules,
        );
        let nights = nights_between(check_in, check_out);
        let quoted_total = pricing::stay_quote(resolved.final_price, nights);

        let seq = ctx.next_sequence();
        let event = StayEvent::new(
            seq,
            self.stay_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            metadata.timestamp,
            Some(metadata.client_timestamp),
            StayEventType::ReservationUpdated,
            EventPayload::ReservationUpdated {
                room_id: room.id.clone(),
                room_name: room.name.clone(),
                room_type_id: room.room_type_id.clone(),
                check_in_date: check_in,
                check_out_date: check_out,
                num_adults,
                num_children,
                note,
                nightly_rate: resolved.final_price,
                base_rate: room.base_price,
                applied_rule_id: resolved.applied_rule_id,
                applied_rule_name: resolved.applied_rule_name,
                quoted_total,
            },
        );

        Ok(vec![event])
    }
}
