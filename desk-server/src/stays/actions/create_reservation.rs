//! CreateReservation command handler
//!
//! Books a room for a guest and date range. The availability guard
//! runs inside the same write transaction that will persist the
//! reservation, so two racing bookings for overlapping dates cannot
//! both commit.

use async_trait::async_trait;
use validator::Validate;

use crate::pricing;
use crate::stays::traits::{CommandContext, CommandHandler, CommandMetadata, StayError};
use crate::utils::nights_between;
use shared::models::PricingRule;
use shared::stay::{EventPayload, ReservationInput, StayEvent, StayEventType};

/// CreateReservation action
#[derive(Debug, Clone)]
pub struct CreateReservationAction {
    pub reservation: ReservationInput,
    /// Active pricing rules, injected by StayManager.
    pub rules: Vec<PricingRule>,
}

#[async_trait]
impl CommandHandler for CreateReservationAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<StayEvent>, StayError> {
        // 1. Validate input shape (ids, guest counts)
        self.reservation
            .validate()
            .map_err(|e| StayError::Validation(e.to_string()))?;

        let input = &self.reservation;
        if input.check_in_date >= input.check_out_date {
            return Err(StayError::Validation(format!(
                "check_in_date {} must be before check_out_date {}",
                input.check_in_date, input.check_out_date
            )));
        }

        // 2. Room must exist and fit the party
        let room = ctx.load_room(&input.room_id)?;
        if let Some(cap) = room.max_occupancy
            && input.num_adults + input.num_children > cap
        {
            return Err(StayError::Validation(format!(
                "party of {} exceeds room capacity {}",
                input.num_adults + input.num_children,
                cap
            )));
        }

        // 3. Availability guard, in-transaction
        let available = ctx.is_room_available(
            &input.room_id,
            input.check_in_date,
            input.check_out_date,
            None,
            metadata.timestamp,
        )?;
        if !available {
            return Err(StayError::RoomUnavailable(format!(
                "Room {} is not available for {} to {}",
                room.name, input.check_in_date, input.check_out_date
            )));
        }

        // 4. Resolve the nightly rate and quote the stay
        let resolved = pricing::resolve_price(
            room.base_price,
            &room.room_type_id,
            input.check_in_date,
            input.check_out_date,
            &self.rules,
        );
        let nights = nights_between(input.check_in_date, input.check_out_date);
        let quoted_total = pricing::stay_quote(resolved.final_price, nights);

        // 5. Emit the creation event
        let stay_id = uuid::Uuid::new_v4().to_string();
        let seq = ctx.next_sequence();

        let event = StayEvent::new(
            seq,
            stay_id,
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            metadata.timestamp,
            Some(metadata.client_timestamp),
            StayEventType::ReservationCreated,
            EventPayload::ReservationCreated {
                guest_id: input.guest_id.clone(),
                guest_name: input.guest_name.clone(),
                room_id: room.id.clone(),
                room_name: room.name.clone(),
                room_type_id: room.room_type_id.clone(),
                check_in_date: input.check_in_date,
                check_out_date: input.check_out_date,
                num_adults: input.num_adults,
                num_children: input.num_children,
                source: input.source.clone(),
                note: input.note.clone(),
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
