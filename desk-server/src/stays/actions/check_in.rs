//! CheckIn command handler
//!
//! Arrival: flips the stay to checked-in, occupies the room, and
//! lazily opens the stay's draft invoice. The reservation already
//! holds its dates (the guard admitted it at creation), so check-in
//! only verifies the physical room state.

use async_trait::async_trait;

use crate::stays::traits::{CommandContext, CommandHandler, CommandMetadata, StayError};
use shared::models::RoomStatus;
use shared::stay::{EventPayload, StayEvent, StayEventType, StayStatus};

/// CheckIn action
#[derive(Debug, Clone)]
pub struct CheckInAction {
    pub stay_id: String,
}

#[async_trait]
impl CommandHandler for CheckInAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<StayEvent>, StayError> {
        // 1. Stay must be awaiting arrival
        let snapshot = ctx.load_snapshot(&self.stay_id)?;
        match snapshot.status {
            StayStatus::Pending | StayStatus::Confirmed => {}
            status => {
                return Err(StayError::InvalidTransition(format!(
                    "cannot check in a {} reservation",
                    status
                )));
            }
        }

        // 2. The room must be physically ready
        let room = ctx.load_room(&snapshot.room_id)?;
        if room.status != RoomStatus::Available {
            return Err(StayError::RoomUnavailable(format!(
                "Room {} is {} and cannot receive a guest",
                room.name, room.status
            )));
        }

        // 3. Open the draft invoice for this stay
        let invoice_id = uuid::Uuid::new_v4().to_string();

        let seq = ctx.next_sequence();
        let checked_in = StayEvent::new(
            seq,
            self.stay_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            metadata.timestamp,
            Some(metadata.client_timestamp),
            StayEventType::StayCheckedIn,
            EventPayload::StayCheckedIn {
                room_id: room.id.clone(),
                actual_check_in: metadata.timestamp,
                invoice_id,
            },
        );

        let seq = ctx.next_sequence();
        let room_occupied = StayEvent::new(
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
                previous_status: RoomStatus::Available,
                new_status: RoomStatus::Occupied,
                reason: None,
            },
        );

        Ok(vec![checked_in, room_occupied])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stays::storage::StayStorage;
    use chrono::NaiveDate;
    use shared::models::Room;
    use shared::stay::StaySnapshot;

    fn create_test_metadata() -> CommandMetadata {
        CommandMetadata {
            command_id: "cmd-1".to_string(),
            operator_id: "user-1".to_string(),
            operator_name: "Test User".to_string(),
            timestamp: 1_767_225_600_000,
            client_timestamp: 1_767_225_599_000,
        }
    }

    fn seed(storage: &StayStorage, stay_status: StayStatus, room_status: RoomStatus) {
        let mut room = Room::new("room-101", "Room 101", "standard", "Standard", 100.0);
        room.status = room_status;
        storage.put_room(&room).unwrap();

        let mut snapshot = StaySnapshot::new("stay-1".to_string());
        snapshot.room_id = "room-101".to_string();
        snapshot.check_in_date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        snapshot.check_out_date = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
        snapshot.status = stay_status;

        let txn = storage.begin_write().unwrap();
        storage.store_snapshot(&txn, &snapshot).unwrap();
        storage.link_room_stay(&txn, "room-101", "stay-1").unwrap();
        txn.commit().unwrap();
    }

    #[tokio::test]
    async fn test_check_in_emits_stay_and_room_events() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed(&storage, StayStatus::Confirmed, RoomStatus::Available);

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = CheckInAction {
            stay_id: "stay-1".to_string(),
        };

        let metadata = create_test_metadata();
        let events = action.execute(&mut ctx, &metadata).await.unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, StayEventType::StayCheckedIn);
        assert_eq!(events[0].subject_id, "stay-1");
        assert_eq!(events[1].event_type, StayEventType::RoomStatusChanged);
        assert_eq!(events[1].subject_id, "room-101");

        if let EventPayload::StayCheckedIn {
            actual_check_in,
            invoice_id,
            ..
        } = &events[0].payload
        {
            assert_eq!(*actual_check_in, metadata.timestamp);
            assert!(!invoice_id.is_empty());
        } else {
            panic!("Expected StayCheckedIn payload");
        }

        if let EventPayload::RoomStatusChanged {
            previous_status,
            new_status,
            ..
        } = &events[1].payload
        {
            assert_eq!(*previous_status, RoomStatus::Available);
            assert_eq!(*new_status, RoomStatus::Occupied);
        } else {
            panic!("Expected RoomStatusChanged payload");
        }
    }

    #[tokio::test]
    async fn test_check_in_pending_reservation_allowed() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed(&storage, StayStatus::Pending, RoomStatus::Available);

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = CheckInAction {
            stay_id: "stay-1".to_string(),
        };

        let result = action.execute(&mut ctx, &create_test_metadata()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_check_in_occupied_room_fails() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed(&storage, StayStatus::Confirmed, RoomStatus::Occupied);

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = CheckInAction {
            stay_id: "stay-1".to_string(),
        };

        let result = action.execute(&mut ctx, &create_test_metadata()).await;
        assert!(matches!(result, Err(StayError::RoomUnavailable(_))));
    }

    #[tokio::test]
    async fn test_check_in_room_under_maintenance_fails() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed(&storage, StayStatus::Confirmed, RoomStatus::Maintenance);

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = CheckInAction {
            stay_id: "stay-1".to_string(),
        };

        let result = action.execute(&mut ctx, &create_test_metadata()).await;
        assert!(matches!(result, Err(StayError::RoomUnavailable(_))));
    }

    #[tokio::test]
    async fn test_check_in_twice_fails() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed(&storage, StayStatus::CheckedIn, RoomStatus::Occupied);

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = CheckInAction {
            stay_id: "stay-1".to_string(),
        };

        let result = action.execute(&mut ctx, &create_test_metadata()).await;
        assert!(matches!(result, Err(StayError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_check_in_checked_out_stay_fails() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed(&storage, StayStatus::CheckedOut, RoomStatus::Cleaning);

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = CheckInAction {
            stay_id: "stay-1".to_string(),
        };

        let result = action.execute(&mut ctx, &create_test_metadata()).await;
        assert!(matches!(result, Err(StayError::InvalidTransition(_))));
    }
}
