//! Housekeeping room-status handlers
//!
//! Explicit room transitions outside the stay lifecycle: cleaning
//! done, maintenance opened, maintenance cleared. An occupied room
//! never transitions here; only check-out releases it.

use async_trait::async_trait;

use crate::stays::traits::{CommandContext, CommandHandler, CommandMetadata, StayError};
use shared::models::RoomStatus;
use shared::stay::{EventPayload, StayEvent, StayEventType};

/// MarkRoomClean action
#[derive(Debug, Clone)]
pub struct MarkRoomCleanAction {
    pub room_id: String,
}

/// SetRoomMaintenance action
#[derive(Debug, Clone)]
pub struct SetRoomMaintenanceAction {
    pub room_id: String,
    pub reason: Option<String>,
}

/// ClearRoomMaintenance action
#[derive(Debug, Clone)]
pub struct ClearRoomMaintenanceAction {
    pub room_id: String,
}

fn room_status_event(
    ctx: &mut CommandContext<'_>,
    metadata: &CommandMetadata,
    room_id: String,
    previous_status: RoomStatus,
    new_status: RoomStatus,
    reason: Option<String>,
) -> StayEvent {
    let seq = ctx.next_sequence();
    StayEvent::new(
        seq,
        room_id.clone(),
        metadata.operator_id.clone(),
        metadata.operator_name.clone(),
        metadata.command_id.clone(),
        metadata.timestamp,
        Some(metadata.client_timestamp),
        StayEventType::RoomStatusChanged,
        EventPayload::RoomStatusChanged {
            room_id,
            previous_status,
            new_status,
            reason,
        },
    )
}

#[async_trait]
impl CommandHandler for MarkRoomCleanAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<StayEvent>, StayError> {
        let room = ctx.load_room(&self.room_id)?;
        if room.status != RoomStatus::Cleaning {
            return Err(StayError::InvalidTransition(format!(
                "Room {} is {}, not cleaning",
                room.name, room.status
            )));
        }

        Ok(vec![room_status_event(
            ctx,
            metadata,
            room.id,
            RoomStatus::Cleaning,
            RoomStatus::Available,
            None,
        )])
    }
}

#[async_trait]
impl CommandHandler for SetRoomMaintenanceAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<StayEvent>, StayError> {
        let room = ctx.load_room(&self.room_id)?;
        match room.status {
            RoomStatus::Available | RoomStatus::Cleaning => {}
            status => {
                return Err(StayError::InvalidTransition(format!(
                    "Room {} is {} and cannot enter maintenance",
                    room.name, status
                )));
            }
        }

        Ok(vec![room_status_event(
            ctx,
            metadata,
            room.id,
            room.status,
            RoomStatus::Maintenance,
            self.reason.clone(),
        )])
    }
}

#[async_trait]
impl CommandHandler for ClearRoomMaintenanceAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<StayEvent>, StayError> {
        let room = ctx.load_room(&self.room_id)?;
        if room.status != RoomStatus::Maintenance {
            return Err(StayError::InvalidTransition(format!(
                "Room {} is {}, not under maintenance",
                room.name, room.status
            )));
        }

        Ok(vec![room_status_event(
            ctx,
            metadata,
            room.id,
            RoomStatus::Maintenance,
            RoomStatus::Available,
            None,
        )])
    }
}
