//! redb-based storage layer for stay event sourcing
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `events` | `(subject_id, sequence)` | `StayEvent` | Event stream (append-only) |
//! | `snapshots` | `stay_id` | `StaySnapshot` | Snapshot cache |
//! | `active_stays` | `stay_id` | `()` | Non-terminal stay index |
//! | `room_stays` | `(room_id, stay_id)` | `()` | Availability guard index |
//! | `rooms` | `room_id` | `Room` | Room catalog with live status |
//! | `pricing_rules` | `rule_id` | `PricingRule` | Pricing rule catalog |
//! | `billing_refs` | `ref_id` | `stay_id` | Invoice/payment/refund lookup |
//! | `processed_commands` | `command_id` | `()` | Idempotency check |
//! | `sequence_counter` | `()` | `u64` | Global sequence |
//!
//! The subject of an event is the stay it belongs to, except room
//! status events whose subject is the room itself.
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate`: once `commit()` returns
//! the data survives power loss, and the file is always in a
//! consistent state via copy-on-write. Front desks lose power too.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use shared::models::{PricingRule, Room};
use shared::stay::{StayEvent, StaySnapshot};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Event stream: key = (subject_id, sequence), value = JSON-serialized StayEvent
const EVENTS_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("events");

/// Snapshots: key = stay_id, value = JSON-serialized StaySnapshot
const SNAPSHOTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("snapshots");

/// Active (non-terminal) stays: key = stay_id, value = empty (existence check)
const ACTIVE_STAYS_TABLE: TableDefinition<&str, ()> = TableDefinition::new("active_stays");

/// Availability guard index: key = (room_id, stay_id), value = empty
const ROOM_STAYS_TABLE: TableDefinition<(&str, &str), ()> = TableDefinition::new("room_stays");

/// Room catalog: key = room_id, value = JSON-serialized Room
const ROOMS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("rooms");

/// Pricing rule catalog: key = rule_id, value = JSON-serialized PricingRule
const PRICING_RULES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("pricing_rules");

/// Billing reference lookup: key = invoice/payment/refund id, value = stay_id
const BILLING_REFS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("billing_refs");

/// Processed commands: key = command_id, value = empty (idempotency)
const PROCESSED_COMMANDS_TABLE: TableDefinition<&str, ()> =
    TableDefinition::new("processed_commands");

/// Sequence counter: key = "seq", value = u64
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

const SEQUENCE_KEY: &str = "seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stay not found: {0}")]
    StayNotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Stay storage backed by redb
#[derive(Clone)]
pub struct StayStorage {
    db: Arc<Database>,
}

impl StayStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::initialize(db)
    }

    /// Open an in-memory database (tests and ephemeral servers)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::initialize(db)
    }

    fn initialize(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(EVENTS_TABLE)?;
            let _ = write_txn.open_table(SNAPSHOTS_TABLE)?;
            let _ = write_txn.open_table(ACTIVE_STAYS_TABLE)?;
            let _ = write_txn.open_table(ROOM_STAYS_TABLE)?;
            let _ = write_txn.open_table(ROOMS_TABLE)?;
            let _ = write_txn.open_table(PRICING_RULES_TABLE)?;
            let _ = write_txn.open_table(BILLING_REFS_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_COMMANDS_TABLE)?;

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(SEQUENCE_KEY)?.is_none() {
                seq_table.insert(SEQUENCE_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Sequence Operations ==========

    /// Get the next sequence number (does NOT increment - use within transaction)
    pub fn get_next_sequence(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0);
        Ok(current + 1)
    }

    /// Get current sequence (read-only)
    pub fn get_current_sequence(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    /// Set sequence number (within transaction)
    ///
    /// The manager advances the counter to the highest sequence its
    /// generated events consumed.
    pub fn set_sequence(&self, txn: &WriteTransaction, sequence: u64) -> StorageResult<()> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        table.insert(SEQUENCE_KEY, sequence)?;
        Ok(())
    }

    // ========== Command Idempotency ==========

    /// Check if a command has been processed
    pub fn is_command_processed(&self, command_id: &str) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    /// Check if a command has been processed (within transaction)
    pub fn is_command_processed_txn(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<bool> {
        let table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    /// Mark a command as processed
    pub fn mark_command_processed(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        table.insert(command_id, ())?;
        Ok(())
    }

    // ========== Event Operations ==========

    /// Store an event
    pub fn store_event(&self, txn: &WriteTransaction, event: &StayEvent) -> StorageResult<()> {
        let mut table = txn.open_table(EVENTS_TABLE)?;
        let key = (event.subject_id.as_str(), event.sequence);
        let value = serde_json::to_vec(event)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    /// Get all events for a subject (stay or room)
    pub fn get_events_for_subject(&self, subject_id: &str) -> StorageResult<Vec<StayEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        let mut events = Vec::new();
        let range_start = (subject_id, 0u64);
        let range_end = (subject_id, u64::MAX);

        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            let event: StayEvent = serde_json::from_slice(value.value())?;
            events.push(event);
        }

        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    /// Get events since a given sequence (across all subjects)
    pub fn get_events_since(&self, since_sequence: u64) -> StorageResult<Vec<StayEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        let mut events = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let event: StayEvent = serde_json::from_slice(value.value())?;
            if event.sequence > since_sequence {
                events.push(event);
            }
        }

        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    // ========== Snapshot Operations ==========

    /// Store a snapshot
    pub fn store_snapshot(
        &self,
        txn: &WriteTransaction,
        snapshot: &StaySnapshot,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(SNAPSHOTS_TABLE)?;
        let value = serde_json::to_vec(snapshot)?;
        table.insert(snapshot.stay_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get a snapshot by stay ID
    pub fn get_snapshot(&self, stay_id: &str) -> StorageResult<Option<StaySnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SNAPSHOTS_TABLE)?;

        match table.get(stay_id)? {
            Some(value) => {
                let snapshot: StaySnapshot = serde_json::from_slice(value.value())?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    /// Get a snapshot by stay ID (within transaction)
    pub fn get_snapshot_txn(
        &self,
        txn: &WriteTransaction,
        stay_id: &str,
    ) -> StorageResult<Option<StaySnapshot>> {
        let table = txn.open_table(SNAPSHOTS_TABLE)?;

        match table.get(stay_id)? {
            Some(value) => {
                let snapshot: StaySnapshot = serde_json::from_slice(value.value())?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    /// Get all snapshots
    pub fn get_all_snapshots(&self) -> StorageResult<Vec<StaySnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SNAPSHOTS_TABLE)?;

        let mut snapshots = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let snapshot: StaySnapshot = serde_json::from_slice(value.value())?;
            snapshots.push(snapshot);
        }

        Ok(snapshots)
    }

    // ========== Active Stays ==========

    /// Mark a stay as active (non-terminal)
    pub fn mark_stay_active(&self, txn: &WriteTransaction, stay_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_STAYS_TABLE)?;
        table.insert(stay_id, ())?;
        Ok(())
    }

    /// Mark a stay as inactive (terminal)
    pub fn mark_stay_inactive(&self, txn: &WriteTransaction, stay_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_STAYS_TABLE)?;
        table.remove(stay_id)?;
        Ok(())
    }

    /// Check if a stay is active
    pub fn is_stay_active(&self, stay_id: &str) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACTIVE_STAYS_TABLE)?;
        Ok(table.get(stay_id)?.is_some())
    }

    /// Get all active stay IDs
    pub fn get_active_stay_ids(&self) -> StorageResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACTIVE_STAYS_TABLE)?;

        let mut stay_ids: Vec<String> = Vec::new();
        for result in table.iter()? {
            let (key, _value) = result?;
            stay_ids.push(key.value().to_string());
        }

        Ok(stay_ids)
    }

    /// Get all active stay snapshots
    pub fn get_active_stays(&self) -> StorageResult<Vec<StaySnapshot>> {
        let active_ids = self.get_active_stay_ids()?;
        let mut snapshots = Vec::new();

        for stay_id in active_ids {
            if let Some(snapshot) = self.get_snapshot(&stay_id)? {
                snapshots.push(snapshot);
            }
        }

        Ok(snapshots)
    }

    // ========== Room Guard Index ==========

    /// Link a stay to the room whose dates it can block
    pub fn link_room_stay(
        &self,
        txn: &WriteTransaction,
        room_id: &str,
        stay_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ROOM_STAYS_TABLE)?;
        table.insert((room_id, stay_id), ())?;
        Ok(())
    }

    /// Remove a stay's link from a room
    pub fn unlink_room_stay(
        &self,
        txn: &WriteTransaction,
        room_id: &str,
        stay_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ROOM_STAYS_TABLE)?;
        table.remove((room_id, stay_id))?;
        Ok(())
    }

    /// Get all stays linked to a room (within transaction)
    ///
    /// Links whose stay has terminated and stopped blocking are pruned
    /// on the way through, so the guard index never grows unbounded.
    pub fn get_stays_for_room_txn(
        &self,
        txn: &WriteTransaction,
        room_id: &str,
    ) -> StorageResult<Vec<StaySnapshot>> {
        let now = shared::util::now_millis();
        let mut stays = Vec::new();
        let mut stale: Vec<String> = Vec::new();

        {
            let links_table = txn.open_table(ROOM_STAYS_TABLE)?;
            let snapshots_table = txn.open_table(SNAPSHOTS_TABLE)?;

            for result in links_table.range((room_id, "")..)? {
                let (key, _) = result?;
                let (rid, stay_id) = key.value();
                if rid != room_id {
                    break;
                }

                match snapshots_table.get(stay_id)? {
                    Some(value) => {
                        let snapshot: StaySnapshot = serde_json::from_slice(value.value())?;
                        if snapshot.is_terminal() && !snapshot.blocks_availability(now) {
                            stale.push(stay_id.to_string());
                        } else {
                            stays.push(snapshot);
                        }
                    }
                    None => stale.push(stay_id.to_string()),
                }
            }
        }

        if !stale.is_empty() {
            let mut links_table = txn.open_table(ROOM_STAYS_TABLE)?;
            for stay_id in &stale {
                links_table.remove((room_id, stay_id.as_str()))?;
            }
        }

        Ok(stays)
    }

    /// Get all stays linked to a room (read-only, no pruning)
    pub fn get_stays_for_room(&self, room_id: &str) -> StorageResult<Vec<StaySnapshot>> {
        let read_txn = self.db.begin_read()?;
        let links_table = read_txn.open_table(ROOM_STAYS_TABLE)?;
        let snapshots_table = read_txn.open_table(SNAPSHOTS_TABLE)?;

        let mut stays = Vec::new();
        for result in links_table.range((room_id, "")..)? {
            let (key, _) = result?;
            let (rid, stay_id) = key.value();
            if rid != room_id {
                break;
            }
            if let Some(value) = snapshots_table.get(stay_id)? {
                let snapshot: StaySnapshot = serde_json::from_slice(value.value())?;
                stays.push(snapshot);
            }
        }

        Ok(stays)
    }

    // ========== Room Catalog ==========

    /// Store a room (within transaction)
    pub fn put_room_txn(&self, txn: &WriteTransaction, room: &Room) -> StorageResult<()> {
        let mut table = txn.open_table(ROOMS_TABLE)?;
        let value = serde_json::to_vec(room)?;
        table.insert(room.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Store a room (standalone, for catalog seeding)
    pub fn put_room(&self, room: &Room) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        self.put_room_txn(&txn, room)?;
        txn.commit()?;
        Ok(())
    }

    /// Get a room by ID
    pub fn get_room(&self, room_id: &str) -> StorageResult<Option<Room>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ROOMS_TABLE)?;

        match table.get(room_id)? {
            Some(value) => {
                let room: Room = serde_json::from_slice(value.value())?;
                Ok(Some(room))
            }
            None => Ok(None),
        }
    }

    /// Get a room by ID (within transaction)
    pub fn get_room_txn(
        &self,
        txn: &WriteTransaction,
        room_id: &str,
    ) -> StorageResult<Option<Room>> {
        let table = txn.open_table(ROOMS_TABLE)?;

        match table.get(room_id)? {
            Some(value) => {
                let room: Room = serde_json::from_slice(value.value())?;
                Ok(Some(room))
            }
            None => Ok(None),
        }
    }

    /// Get all rooms
    pub fn get_all_rooms(&self) -> StorageResult<Vec<Room>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ROOMS_TABLE)?;

        let mut rooms = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let room: Room = serde_json::from_slice(value.value())?;
            rooms.push(room);
        }

        Ok(rooms)
    }

    // ========== Pricing Rule Catalog ==========

    /// Insert or replace a pricing rule
    pub fn upsert_rule(&self, rule: &PricingRule) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PRICING_RULES_TABLE)?;
            let value = serde_json::to_vec(rule)?;
            table.insert(rule.id.as_str(), value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Remove a pricing rule
    pub fn remove_rule(&self, rule_id: &str) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PRICING_RULES_TABLE)?;
            table.remove(rule_id)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Get a pricing rule by ID
    pub fn get_rule(&self, rule_id: &str) -> StorageResult<Option<PricingRule>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRICING_RULES_TABLE)?;

        match table.get(rule_id)? {
            Some(value) => {
                let rule: PricingRule = serde_json::from_slice(value.value())?;
                Ok(Some(rule))
            }
            None => Ok(None),
        }
    }

    /// Get all pricing rules
    pub fn get_all_rules(&self) -> StorageResult<Vec<PricingRule>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRICING_RULES_TABLE)?;

        let mut rules = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let rule: PricingRule = serde_json::from_slice(value.value())?;
            rules.push(rule);
        }

        Ok(rules)
    }

    // ========== Billing References ==========

    /// Map an invoice, payment, or refund id to its owning stay
    pub fn index_billing_ref(
        &self,
        txn: &WriteTransaction,
        ref_id: &str,
        stay_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(BILLING_REFS_TABLE)?;
        table.insert(ref_id, stay_id)?;
        Ok(())
    }

    /// Resolve a billing reference to its stay (within transaction)
    pub fn find_stay_for_billing_ref_txn(
        &self,
        txn: &WriteTransaction,
        ref_id: &str,
    ) -> StorageResult<Option<String>> {
        let table = txn.open_table(BILLING_REFS_TABLE)?;
        Ok(table.get(ref_id)?.map(|v| v.value().to_string()))
    }

    /// Resolve a billing reference to its stay (read-only)
    pub fn find_stay_for_billing_ref(&self, ref_id: &str) -> StorageResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BILLING_REFS_TABLE)?;
        Ok(table.get(ref_id)?.map(|v| v.value().to_string()))
    }

    // ========== Statistics ==========

    /// Get storage statistics
    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;

        let events_table = read_txn.open_table(EVENTS_TABLE)?;
        let snapshots_table = read_txn.open_table(SNAPSHOTS_TABLE)?;
        let active_table = read_txn.open_table(ACTIVE_STAYS_TABLE)?;
        let rooms_table = read_txn.open_table(ROOMS_TABLE)?;
        let commands_table = read_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        let seq_table = read_txn.open_table(SEQUENCE_TABLE)?;

        Ok(StorageStats {
            event_count: events_table.len()?,
            snapshot_count: snapshots_table.len()?,
            active_stay_count: active_table.len()?,
            room_count: rooms_table.len()?,
            processed_command_count: commands_table.len()?,
            current_sequence: seq_table
                .get(SEQUENCE_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0),
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    pub event_count: u64,
    pub snapshot_count: u64,
    pub active_stay_count: u64,
    pub room_count: u64,
    pub processed_command_count: u64,
    pub current_sequence: u64,
}
