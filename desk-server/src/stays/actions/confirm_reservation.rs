//! ConfirmReservation command handler

use async_trait::async_trait;

use crate::stays::traits::{CommandContext, CommandHandler, CommandMetadata, StayError};
use shared::stay::{EventPayload, StayEvent, StayEventType, StayStatus};

/// ConfirmReservation action
#[derive(Debug, Clone)]
pub struct ConfirmReservationAction {
    pub stay_id: String,
}

#[async_trait]
impl CommandHandler for ConfirmReservationAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<StayEvent>, StayError> {
        let snapshot = ctx.load_snapshot(&self.stay_id)?;
        if snapshot.status != StayStatus::Pending {
            return Err(StayError::InvalidTransition(format!(
                "cannot confirm a {} reservation",
                snapshot.status
            )));
        }

        let seq = ctx.next_sequence();
        let event = StayEvent::new(
            seq,
            self.stay_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            metadata.timestamp,
            Some(metadata.client_timestamp),
            StayEventType::ReservationConfirmed,
            EventPayload::ReservationConfirmed {},
        );

        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stays::storage::StayStorage;
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

    fn seed_stay(storage: &StayStorage, stay_id: &str, status: StayStatus) {
        let mut snapshot = StaySnapshot::new(stay_id.to_string());
        snapshot.status = status;
        let txn = storage.begin_write().unwrap();
        storage.store_snapshot(&txn, &snapshot).unwrap();
        txn.commit().unwrap();
    }

    #[tokio::test]
    async fn test_confirm_pending_reservation() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, "stay-1", StayStatus::Pending);

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = ConfirmReservationAction {
            stay_id: "stay-1".to_string(),
        };

        let events = action.execute(&mut ctx, &create_test_metadata()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, StayEventType::ReservationConfirmed);
    }

    #[tokio::test]
    async fn test_confirm_twice_fails() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, "stay-1", StayStatus::Confirmed);

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = ConfirmReservationAction {
            stay_id: "stay-1".to_string(),
        };

        let result = action.execute(&mut ctx, &create_test_metadata()).await;
        assert!(matches!(result, Err(StayError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_confirm_cancelled_fails() {
        let storage = StayStorage::open_in_memory().unwrap();
        seed_stay(&storage, "stay-1", StayStatus::Cancelled);

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = ConfirmReservationAction {
            stay_id: "stay-1".to_string(),
        };

        let result = action.execute(&mut ctx, &create_test_metadata()).await;
        assert!(matches!(result, Err(StayError::InvalidTransition(_))));
    }
}
