//! ChangeRoom command handler
//!
//! Moves an in-house guest to a different room. The guard re-runs for
//! the new room over the remaining nights (the stay itself excluded),
//! and both room statuses flip in the same transaction. Past nights
//! are never rebilled: the move opens a new rate segment, and whether
//! the change day itself bills at the new or the old rate is a
//! configured policy.

use async_trait::async_trait;
use chrono::Days;
use rust_decimal::Decimal;

use crate::core::config::ChangeDayBilling;
use crate::pricing::resolve_price;
use crate::stays::money::{to_decimal, to_f64};
use crate::stays::traits::{CommandContext, CommandHandler, CommandMetadata, StayError};
use crate::utils::{date_of_millis, nights_between};
use shared::models::{PricingRule, RoomStatus};
use shared::stay::{EventPayload, RateSegment, StayEvent, StayEventType, StayStatus};

/// ChangeRoom action
#[derive(Debug, Clone)]
pub struct ChangeRoomAction {
    pub stay_id: String,
    pub new_room_id: String,
    /// Active pricing rules, injected by StayManager.
    pub rules: Vec<PricingRule>,
    /// Change-day rate policy, injected by StayManager.
    pub change_day_billing: ChangeDayBilling,
}

#[async_trait]
impl CommandHandler for ChangeRoomAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<StayEvent>, StayError> {
        // 1. Only an in-house stay can move rooms
        let snapshot = ctx.load_snapshot(&self.stay_id)?;
        if snapshot.status != StayStatus::CheckedIn {
            return Err(StayError::InvalidTransition(format!(
                "cannot change room on a {} reservation",
                snapshot.status
            )));
        }
        if self.new_room_id == snapshot.room_id {
            return Err(StayError::Validation(
                "reservation is already assigned to this room".to_string(),
            ));
        }

        // 2. The target room must exist and be physically ready
        let old_room = ctx.load_room(&snapshot.room_id)?;
        let new_room = ctx.load_room(&self.new_room_id)?;
        if new_room.status != RoomStatus::Available {
            return Err(StayError::RoomUnavailable(format!(
                "Room {} is {} and cannot receive a guest",
                new_room.name, new_room.status
            )));
        }

        // 3. Guard the remaining nights on the new room
        let change_date = date_of_millis(metadata.timestamp);
        let available = ctx.is_room_available(
            &self.new_room_id,
            change_date,
            snapshot.check_out_date,
            Some(&self.stay_id),
            metadata.timestamp,
        )?;
        if !available {
            return Err(StayError::RoomUnavailable(format!(
                "Room {} is not available for the remaining dates",
                new_room.name
            )));
        }

        // 4. Open the new rate segment at the configured boundary
        let effective_date = match self.change_day_billing {
            ChangeDayBilling::NewRoomRate => change_date,
            ChangeDayBilling::OldRoomRate => change_date
                .checked_add_days(Days::new(1))
                .ok_or_else(|| StayError::Validation("date overflow".to_string()))?,
        };
        let resolved = resolve_price(
            new_room.base_price,
            &new_room.room_type_id,
            effective_date,
            snapshot.check_out_date,
            &self.rules,
        );

        // 5. Re-quote the whole stay night by night across segments
        let new_segment = RateSegment {
            from_date: effective_date,
            room_id: new_room.id.clone(),
            room_name: new_room.name.clone(),
            room_type_id: new_room.room_type_id.clone(),
            nightly_rate: resolved.final_price,
            base_rate: resolved.base_price,
            applied_rule_id: resolved.applied_rule_id.clone(),
            applied_rule_name: resolved.applied_rule_name.clone(),
        };
        let mut projected = snapshot.clone();
        projected.segments.push(new_segment);

        let nights = nights_between(projected.check_in_date, projected.check_out_date).max(1);
        let mut quoted = Decimal::ZERO;
        for i in 0..nights {
            let night = projected
                .check_in_date
                .checked_add_days(Days::new(i as u64))
                .ok_or_else(|| StayError::Validation("date overflow".to_string()))?;
            if let Some(segment) = projected.segment_for_night(night) {
                quoted += to_decimal(segment.nightly_rate);
            }
        }
        let quoted_total = to_f64(quoted);

        let seq = ctx.next_sequence();
        let room_changed = StayEvent::new(
            seq,
            self.stay_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            metadata.timestamp,
            Some(metadata.client_timestamp),
            StayEventType::RoomChanged,
            EventPayload::RoomChanged {
                previous_room_id: old_room.id.clone(),
                previous_room_name: old_room.name.clone(),
                new_room_id: new_room.id.clone(),
                new_room_name: new_room.name.clone(),
                new_room_type_id: new_room.room_type_id.clone(),
                effective_date,
                nightly_rate: resolved.final_price,
                base_rate: resolved.base_price,
                applied_rule_id: resolved.applied_rule_id,
                applied_rule_name: resolved.applied_rule_name,
                quoted_total,
            },
        );

        let seq = ctx.next_sequence();
        let old_released = StayEvent::new(
            seq,
            old_room.id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            metadata.timestamp,
            Some(metadata.client_timestamp),
            StayEventType::RoomStatusChanged,
            EventPayload::RoomStatusChanged {
                room_id: old_room.id.clone(),
                previous_status: old_room.status,
                new_status: RoomStatus::Available,
                reason: None,
            },
        );

        let seq = ctx.next_sequence();
        let new_occupied = StayEvent::new(
            seq,
            new_room.id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            metadata.timestamp,
            Some(metadata.client_timestamp),
            StayEventType::RoomStatusChanged,
            EventPayload::RoomStatusChanged {
                room_id: new_room.id.clone(),
                previous_status: RoomStatus::Available,
                new_status: RoomStatus::Occupied,
                reason: None,
            },
        );

        Ok(vec![room_changed, old_released, new_occupied])
    }
}
