//! MarkNoShow command handler
//!
//! Records that a confirmed guest failed to arrive. The arrival
//! cutoff itself lives outside this engine; by the time this command
//! arrives the decision has been made. Only confirmed reservations
//! can no-show: a pending one is cancelled instead.

use async_trait::async_trait;

use crate::stays::traits::{CommandContext, CommandHandler, CommandMetadata, StayError};
use shared::stay::{EventPayload, StayEvent, StayEventType, StayStatus};

const MILLIS_PER_HOUR: i64 = 3_600_000;

/// MarkNoShow action
#[derive(Debug, Clone)]
pub struct MarkNoShowAction {
    pub stay_id: String,
    /// Hold window policy, injected by StayManager.
    pub hold_window_hours: i64,
}

#[async_trait]
impl CommandHandler for MarkNoShowAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<StayEvent>, StayError> {
        let snapshot = ctx.load_snapshot(&self.stay_id)?;
        if snapshot.status != StayStatus::Confirmed {
            return Err(StayError::InvalidTransition(format!(
                "cannot mark a {} reservation as no-show",
                snapshot.status
            )));
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
            StayEventType::ReservationNoShow,
            EventPayload::ReservationNoShow { released_after },
        );

        Ok(vec![event])
    }
}
