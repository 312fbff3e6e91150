//! CancelReservation command handler
//!
//! Cancellation is terminal and never deletes anything. The cancelled
//! dates may keep blocking availability for a configurable hold
//! window, giving the desk a chance to reinstate a booking cancelled
//! by mistake before the room is resold.

use async_trait::async_trait;

use crate::stays::traits::{CommandContext, CommandHandler, CommandMetadata, StayError};
use shared::stay::{EventPayload, StayEvent, StayEventType, StayStatus};

const MILLIS_PER_HOUR: i64 = 3_600_000;

/// CancelReservation action
#[derive(Debug, Clone)]
pub struct CancelReservationAction {
    pub stay_id: String,
    pub reason: Option<String>,
    /// Hold window policy, injected by StayManager.
    pub hold_window_hours: i64,
}

#[async_trait]
impl CommandHandler for CancelReservationAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<StayEvent>, StayError> {
        let snapshot = ctx.load_snapshot(&self.stay_id)?;
        match snapshot.status {
            StayStatus::Pending | StayStatus::Confirmed => {}
            status => {
                return Err(StayError::InvalidTransition(format!(
                    "cannot cancel a {} reservation",
                    status
                )));
            }
        }

        let released_after = metadata.timestamp + self.hold_window_hours.max(0) * MILLIS_PER_HOUR;

        let seq = ctx.next_sequence();
        let event = StayEvent::new(
            seq,
            self.stay_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            metadata.timestamp,
            Some(metadata.client_timestamp),
            StayEventType::ReservationCancelled,
            EventPayload::ReservationCancelled {
                reason: self.reason.clone(),
                released_after,
            },
        );

        Ok(vec![event])
    }
}
