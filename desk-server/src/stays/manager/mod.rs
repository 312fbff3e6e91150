//! StayManager - Core command processing and event generation
//!
//! This module handles:
//! - Command validation and processing
//! - Event generation with global sequence numbers
//! - Persistence to redb (transactional)
//! - Snapshot updates
//! - Event broadcasting (via tokio broadcast channel)
//!
//! # Command Flow
//!
//! ```text
//! execute_command(cmd)
//!     ├─ 1. Idempotency check (command_id)
//!     ├─ 2. Begin write transaction
//!     ├─ 3. Create CommandContext
//!     ├─ 4. Convert command to action and execute
//!     ├─ 5. Apply events to snapshots via EventApplier
//!     ├─ 6. Persist events and snapshots
//!     ├─ 7. Mark command processed
//!     ├─ 8. Commit transaction
//!     ├─ 9. Broadcast event(s)
//!     └─ 10. Return response
//! ```

mod error;
pub use error::*;

use super::actions::{self, CommandAction};
use super::appliers::EventAction;
use super::availability;
use super::storage::{StayStorage, StorageError};
use super::traits::{CommandContext, CommandHandler, CommandMetadata, EventApplier};
use crate::core::config::StayPolicy;
use chrono::NaiveDate;
use parking_lot::RwLock;
use redb::WriteTransaction;
use shared::models::{PricingRule, Room};
use shared::stay::types::CommandErrorCode;
use shared::stay::{
    CommandError, CommandResponse, EventPayload, StayCommand, StayCommandPayload, StayEvent,
    StaySnapshot, StayStatus,
};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Event broadcast channel capacity (sized for resync bursts after reconnect)
const EVENT_CHANNEL_CAPACITY: usize = 65536;

/// Rule cache size warning threshold
const RULE_CACHE_WARN_THRESHOLD: usize = 500;

/// StayManager for command processing
///
/// The `epoch` field is a unique identifier generated on each startup.
/// Clients use it to detect server restarts and trigger full resync.
pub struct StayManager {
    storage: StayStorage,
    event_tx: broadcast::Sender<StayEvent>,
    /// Server instance epoch - unique ID generated on startup
    /// Used by clients to detect server restarts
    epoch: String,
    /// Cached pricing rules, refreshed on catalog writes
    rule_cache: Arc<RwLock<Vec<PricingRule>>>,
    /// House policy knobs injected into actions
    policy: StayPolicy,
    /// Per-command processing deadline
    request_timeout: Duration,
}

impl std::fmt::Debug for StayManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StayManager")
            .field("storage", &"<StayStorage>")
            .field("event_tx", &"<broadcast::Sender>")
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl StayManager {
    /// Create a new StayManager with the given database path
    pub fn new(
        db_path: impl AsRef<Path>,
        policy: StayPolicy,
        request_timeout_ms: u64,
    ) -> ManagerResult<Self> {
        let storage = StayStorage::open(db_path)?;
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let epoch = uuid::Uuid::new_v4().to_string();
        tracing::info!(epoch = %epoch, "StayManager started with new epoch");
        let manager = Self {
            storage,
            event_tx,
            epoch,
            rule_cache: Arc::new(RwLock::new(Vec::new())),
            policy,
            request_timeout: Duration::from_millis(request_timeout_ms),
        };
        manager.reload_rules()?;
        Ok(manager)
    }

    /// Create a StayManager with existing storage (for testing)
    #[cfg(test)]
    pub fn with_storage(storage: StayStorage, policy: StayPolicy) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let epoch = uuid::Uuid::new_v4().to_string();
        Self {
            storage,
            event_tx,
            epoch,
            rule_cache: Arc::new(RwLock::new(Vec::new())),
            policy,
            request_timeout: Duration::from_millis(30_000),
        }
    }

    /// Get the server epoch (unique instance ID)
    pub fn epoch(&self) -> &str {
        &self.epoch
    }

    /// Subscribe to event broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<StayEvent> {
        self.event_tx.subscribe()
    }

    /// Get the underlying storage
    pub fn storage(&self) -> &StayStorage {
        &self.storage
    }

    // ========== Pricing Rules ==========

    /// Reload the pricing rule cache from storage.
    ///
    /// Called on startup and after every catalog write. Returns the
    /// number of rules loaded.
    pub fn reload_rules(&self) -> ManagerResult<usize> {
        let rules = self.storage.get_all_rules()?;
        if rules.len() > RULE_CACHE_WARN_THRESHOLD {
            tracing::warn!(
                rule_count = rules.len(),
                "Pricing rule cache exceeds threshold"
            );
        }
        let count = rules.len();
        *self.rule_cache.write() = rules;
        Ok(count)
    }

    /// Persist a pricing rule and refresh the cache
    pub fn upsert_pricing_rule(&self, rule: &PricingRule) -> ManagerResult<()> {
        self.storage.upsert_rule(rule)?;
        self.reload_rules()?;
        Ok(())
    }

    /// Remove a pricing rule and refresh the cache
    pub fn remove_pricing_rule(&self, rule_id: &str) -> ManagerResult<()> {
        self.storage.remove_rule(rule_id)?;
        self.reload_rules()?;
        Ok(())
    }

    /// All cached pricing rules.
    ///
    /// The cache holds every stored rule; the resolver filters by room
    /// type, date window and active flag when it prices a quote.
    pub fn list_pricing_rules(&self) -> Vec<PricingRule> {
        self.rule_cache.read().clone()
    }

    // ========== Room Catalog ==========

    /// Create or update a room record
    pub fn register_room(&self, room: &Room) -> ManagerResult<()> {
        self.storage.put_room(room)?;
        tracing::info!(room_id = %room.id, room_name = %room.name, "Room registered");
        Ok(())
    }

    /// Get a room by ID
    pub fn get_room(&self, room_id: &str) -> ManagerResult<Option<Room>> {
        Ok(self.storage.get_room(room_id)?)
    }

    /// All rooms in the catalog
    pub fn list_rooms(&self) -> ManagerResult<Vec<Room>> {
        Ok(self.storage.get_all_rooms()?)
    }

    // ========== Command Processing ==========

    /// Execute a command and return the response.
    ///
    /// Processing runs on a blocking thread because the redb write
    /// lock serializes writers; the async runtime must never park on
    /// it. When the deadline passes the caller gets a retryable
    /// SYSTEM_BUSY while the transaction runs to completion, so a
    /// retry of the same command resolves as a duplicate once the
    /// late commit lands.
    pub async fn execute_command(&self, cmd: StayCommand) -> CommandResponse {
        let command_id = cmd.command_id.clone();
        let manager = self.clone();
        let task_command_id = command_id.clone();
        // Broadcast happens inside the task: a caller timeout must not
        // drop events that the commit made durable.
        let task = tokio::task::spawn_blocking(move || match manager.process_command(cmd) {
            Ok((response, events)) => {
                manager.broadcast_events(events);
                response
            }
            Err(err) => CommandResponse::error(task_command_id, err.into()),
        });

        match tokio::time::timeout(self.request_timeout, task).await {
            Ok(Ok(response)) => response,
            Ok(Err(join_err)) => {
                tracing::error!(command_id = %command_id, error = %join_err, "Command task failed");
                CommandResponse::error(
                    command_id,
                    CommandError::new(CommandErrorCode::InternalError, "command task failed"),
                )
            }
            Err(_) => {
                tracing::warn!(
                    command_id = %command_id,
                    timeout_ms = self.request_timeout.as_millis() as u64,
                    "Command deadline exceeded; the transaction may still commit"
                );
                CommandResponse::error(
                    command_id,
                    CommandError::new(
                        CommandErrorCode::SystemBusy,
                        "command processing timed out; it may still complete",
                    ),
                )
            }
        }
    }

    /// Broadcast events after a successful commit
    fn broadcast_events(&self, events: Vec<StayEvent>) {
        for event in events {
            if self.event_tx.send(event).is_err() {
                tracing::warn!("Event broadcast failed: no active receivers");
                break;
            }
        }
    }

    /// Process command and return response with events
    ///
    /// Uses the action-based architecture:
    /// 1. Convert command to CommandAction
    /// 2. Execute action to generate events
    /// 3. Apply events to snapshots via EventApplier
    /// 4. Persist everything atomically
    fn process_command(
        &self,
        cmd: StayCommand,
    ) -> ManagerResult<(CommandResponse, Vec<StayEvent>)> {
        tracing::debug!(command_id = %cmd.command_id, payload = %cmd.payload.name(), "Processing command");

        // 1. Idempotency check (before transaction)
        if self.storage.is_command_processed(&cmd.command_id)? {
            tracing::warn!(command_id = %cmd.command_id, "Duplicate command");
            return Ok((CommandResponse::duplicate(cmd.command_id, None), vec![]));
        }

        // 2. Begin write transaction
        let txn = self.storage.begin_write()?;

        // Double-check idempotency within the transaction
        if self
            .storage
            .is_command_processed_txn(&txn, &cmd.command_id)?
        {
            return Ok((CommandResponse::duplicate(cmd.command_id, None), vec![]));
        }

        // 3. Get current sequence for context initialization
        let current_sequence = self.storage.get_current_sequence()?;

        // 4. Create context and metadata
        let mut ctx = CommandContext::new(&txn, &self.storage, current_sequence);
        let metadata = CommandMetadata {
            command_id: cmd.command_id.clone(),
            operator_id: cmd.operator_id.clone(),
            operator_name: cmd.operator_name.clone(),
            timestamp: shared::util::now_millis(),
            client_timestamp: cmd.timestamp,
        };

        // 5. Convert to action and execute
        let action = self.build_action(&cmd);
        let events = futures::executor::block_on(action.execute(&mut ctx, &metadata))
            .map_err(ManagerError::from)?;

        // 6. Apply events to snapshots. Room transitions carry no stay
        //    snapshot and go straight to the room record.
        let mut snapshots: HashMap<String, StaySnapshot> = HashMap::new();
        for event in &events {
            let Some(applier) = EventAction::for_event(event) else {
                self.apply_room_transition(&txn, event)?;
                continue;
            };
            let snapshot = match snapshots.entry(event.subject_id.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let loaded = self
                        .storage
                        .get_snapshot_txn(&txn, &event.subject_id)?
                        .unwrap_or_else(|| StaySnapshot::new(event.subject_id.clone()));
                    entry.insert(loaded)
                }
            };
            let room_before = snapshot.room_id.clone();
            applier.apply(snapshot, event);
            self.maintain_indices(&txn, event, &room_before, &snapshot.room_id)?;
        }

        // 7. Persist events
        for event in &events {
            self.storage.store_event(&txn, event)?;
        }

        // 8. Persist snapshots and update active stay tracking
        for snapshot in snapshots.values() {
            self.storage.store_snapshot(&txn, snapshot)?;

            match snapshot.status {
                StayStatus::Pending | StayStatus::Confirmed | StayStatus::CheckedIn => {
                    self.storage.mark_stay_active(&txn, &snapshot.stay_id)?;
                }
                StayStatus::CheckedOut | StayStatus::Cancelled | StayStatus::NoShow => {
                    self.storage.mark_stay_inactive(&txn, &snapshot.stay_id)?;
                }
            }
        }

        // 9. Update sequence counter
        let max_sequence = events
            .iter()
            .map(|e| e.sequence)
            .max()
            .unwrap_or(current_sequence);
        if max_sequence > current_sequence {
            self.storage.set_sequence(&txn, max_sequence)?;
        }

        // 10. Mark command processed
        self.storage.mark_command_processed(&txn, &cmd.command_id)?;

        // 11. Commit transaction
        txn.commit().map_err(StorageError::from)?;

        // 12. Return response
        let subject_id = events.first().map(|e| e.subject_id.clone());
        tracing::info!(
            command_id = %cmd.command_id,
            subject_id = ?subject_id,
            event_count = events.len(),
            "Command processed successfully"
        );
        Ok((
            CommandResponse::success(cmd.command_id, subject_id.unwrap_or_default()),
            events,
        ))
    }

    /// Convert a command into its action, injecting the pricing rules
    /// and policy knobs the payload cannot carry.
    fn build_action(&self, cmd: &StayCommand) -> CommandAction {
        match &cmd.payload {
            StayCommandPayload::CreateReservation { reservation } => {
                CommandAction::CreateReservation(actions::CreateReservationAction {
                    reservation: reservation.clone(),
                    rules: self.list_pricing_rules(),
                })
            }
            StayCommandPayload::UpdateReservation { stay_id, changes } => {
                CommandAction::UpdateReservation(actions::UpdateReservationAction {
                    stay_id: stay_id.clone(),
                    changes: changes.clone(),
                    rules: self.list_pricing_rules(),
                })
            }
            StayCommandPayload::CancelReservation { stay_id, reason } => {
                CommandAction::CancelReservation(actions::CancelReservationAction {
                    stay_id: stay_id.clone(),
                    reason: reason.clone(),
                    hold_window_hours: self.policy.hold_window_hours,
                })
            }
            StayCommandPayload::MarkNoShow { stay_id } => {
                CommandAction::MarkNoShow(actions::MarkNoShowAction {
                    stay_id: stay_id.clone(),
                    hold_window_hours: self.policy.hold_window_hours,
                })
            }
            StayCommandPayload::ChangeRoom {
                stay_id,
                new_room_id,
            } => CommandAction::ChangeRoom(actions::ChangeRoomAction {
                stay_id: stay_id.clone(),
                new_room_id: new_room_id.clone(),
                rules: self.list_pricing_rules(),
                change_day_billing: self.policy.change_day_billing,
            }),
            StayCommandPayload::CheckOut { stay_id } => {
                CommandAction::CheckOut(actions::CheckOutAction {
                    stay_id: stay_id.clone(),
                    invoice_due_days: self.policy.invoice_due_days,
                })
            }
            StayCommandPayload::FinalizeInvoice { invoice_id } => {
                CommandAction::FinalizeInvoice(actions::FinalizeInvoiceAction {
                    invoice_id: invoice_id.clone(),
                    invoice_due_days: self.policy.invoice_due_days,
                })
            }
            _ => cmd.into(),
        }
    }

    /// RoomStatusChanged events target the room record itself, not a
    /// stay snapshot.
    fn apply_room_transition(
        &self,
        txn: &WriteTransaction,
        event: &StayEvent,
    ) -> ManagerResult<()> {
        let EventPayload::RoomStatusChanged {
            room_id,
            new_status,
            reason,
            ..
        } = &event.payload
        else {
            return Ok(());
        };
        let mut room = self
            .storage
            .get_room_txn(txn, room_id)?
            .ok_or_else(|| ManagerError::RoomNotFound(room_id.clone()))?;
        room.status = *new_status;
        room.status_reason = reason.clone();
        room.updated_at = event.timestamp;
        self.storage.put_room_txn(txn, &room)?;
        Ok(())
    }

    /// Keep the room-to-stay links and billing-ref index in step with
    /// the event stream.
    fn maintain_indices(
        &self,
        txn: &WriteTransaction,
        event: &StayEvent,
        room_before: &str,
        room_after: &str,
    ) -> ManagerResult<()> {
        match &event.payload {
            EventPayload::ReservationCreated { room_id, .. } => {
                self.storage
                    .link_room_stay(txn, room_id, &event.subject_id)?;
            }
            EventPayload::ReservationUpdated { .. } => {
                if room_before != room_after {
                    self.storage
                        .unlink_room_stay(txn, room_before, &event.subject_id)?;
                    self.storage
                        .link_room_stay(txn, room_after, &event.subject_id)?;
                }
            }
            EventPayload::RoomChanged {
                previous_room_id,
                new_room_id,
                ..
            } => {
                self.storage
                    .unlink_room_stay(txn, previous_room_id, &event.subject_id)?;
                self.storage
                    .link_room_stay(txn, new_room_id, &event.subject_id)?;
            }
            EventPayload::StayCheckedIn { invoice_id, .. } => {
                self.storage
                    .index_billing_ref(txn, invoice_id, &event.subject_id)?;
            }
            EventPayload::PaymentRecorded { payment, .. } => {
                self.storage
                    .index_billing_ref(txn, &payment.payment_id, &event.subject_id)?;
            }
            EventPayload::SplitPaymentRecorded { payments, .. } => {
                for payment in payments {
                    self.storage
                        .index_billing_ref(txn, &payment.payment_id, &event.subject_id)?;
                }
            }
            EventPayload::RefundRequested { refund } => {
                self.storage
                    .index_billing_ref(txn, &refund.refund_id, &event.subject_id)?;
            }
            _ => {}
        }
        Ok(())
    }

    // ========== Public Query Methods ==========

    /// Get a stay snapshot by ID
    pub fn get_stay(&self, stay_id: &str) -> ManagerResult<Option<StaySnapshot>> {
        Ok(self.storage.get_snapshot(stay_id)?)
    }

    /// All stays currently in a non-terminal status
    pub fn get_active_stays(&self) -> ManagerResult<Vec<StaySnapshot>> {
        Ok(self.storage.get_active_stays()?)
    }

    /// Get current sequence number
    pub fn get_current_sequence(&self) -> ManagerResult<u64> {
        Ok(self.storage.get_current_sequence()?)
    }

    /// Get events since a given sequence
    pub fn get_events_since(&self, since_sequence: u64) -> ManagerResult<Vec<StayEvent>> {
        Ok(self.storage.get_events_since(since_sequence)?)
    }

    /// Get all events for a specific stay
    pub fn get_events_for_stay(&self, stay_id: &str) -> ManagerResult<Vec<StayEvent>> {
        Ok(self.storage.get_events_for_subject(stay_id)?)
    }

    /// Rebuild a snapshot from events (for verification)
    ///
    /// Uses EventApplier to apply each event to build the snapshot.
    pub fn rebuild_stay(&self, stay_id: &str) -> ManagerResult<StaySnapshot> {
        let events = self.storage.get_events_for_subject(stay_id)?;
        if events.is_empty() {
            return Err(ManagerError::ReservationNotFound(stay_id.to_string()));
        }

        let mut snapshot = StaySnapshot::new(stay_id.to_string());
        for event in &events {
            if let Some(applier) = EventAction::for_event(event) {
                applier.apply(&mut snapshot, event);
            }
        }

        Ok(snapshot)
    }

    /// Read-only availability probe for UI searches.
    ///
    /// The authoritative check re-runs inside the command transaction,
    /// so a `true` here can still lose the race at booking time.
    pub fn check_availability(
        &self,
        room_id: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> ManagerResult<bool> {
        let stays = self.storage.get_stays_for_room(room_id)?;
        let now = shared::util::now_millis();
        Ok(availability::is_range_free(
            &stays, check_in, check_out, None, now,
        ))
    }
}

// Make StayManager Clone-able so command processing can move onto a
// blocking thread.
impl Clone for StayManager {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            event_tx: self.event_tx.clone(),
            epoch: self.epoch.clone(),
            rule_cache: self.rule_cache.clone(),
            policy: self.policy,
            request_timeout: self.request_timeout,
        }
    }
}

#[cfg(test)]
mod tests;
