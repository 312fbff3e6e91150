//! Command handling traits and the shared transaction context.
//!
//! Every state-changing operation is a [`CommandHandler`] that runs
//! inside one open write transaction via [`CommandContext`] and
//! returns events. Snapshot mutation happens afterwards through
//! [`EventApplier`] implementations so that live processing and
//! event replay share one code path.

use async_trait::async_trait;
use redb::WriteTransaction;
use thiserror::Error;

// enum_dispatch links the applier enum to the trait defined below.
// The generated impl lives at this site, so every variant type must
// be in scope here.
use crate::stays::appliers::EventAction;
use crate::stays::appliers::{
    InvoiceDiscountAppliedApplier, InvoiceFinalizedApplier, InvoiceMarkedOverdueApplier,
    InvoiceRecomputedApplier, LineItemAddedApplier, LineItemRemovedApplier, PaymentRecordedApplier,
    PaymentVoidedApplier, RefundApprovedApplier, RefundCompletedApplier, RefundRejectedApplier,
    RefundRequestedApplier, ReservationCancelledApplier, ReservationConfirmedApplier,
    ReservationCreatedApplier, ReservationNoShowApplier, ReservationUpdatedApplier,
    RoomChangedApplier, SplitPaymentRecordedApplier, StayCheckedInApplier, StayCheckedOutApplier,
};
use crate::stays::availability;
use crate::stays::storage::{StayStorage, StorageError};
use shared::models::Room;
use shared::stay::{StayEvent, StaySnapshot};

/// Action-level errors. Mapped to `CommandErrorCode` at the manager
/// boundary.
#[derive(Debug, Error)]
pub enum StayError {
    #[error("Reservation not found: {0}")]
    ReservationNotFound(String),

    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    #[error("Refund not found: {0}")]
    RefundNotFound(String),

    #[error("Room unavailable: {0}")]
    RoomUnavailable(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Overpayment: {0}")]
    Overpayment(String),

    #[error("Refund exceeds payment: {0}")]
    ExcessRefund(String),

    #[error("Invalid amount")]
    InvalidAmount,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StorageError> for StayError {
    fn from(err: StorageError) -> Self {
        StayError::Storage(err.to_string())
    }
}

/// Command metadata passed to every handler.
///
/// `timestamp` is the server receipt time and is what events and
/// snapshots record; `client_timestamp` is preserved for audit only.
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    pub command_id: String,
    pub operator_id: String,
    pub operator_name: String,
    pub timestamp: i64,
    pub client_timestamp: i64,
}

/// Shared context for command execution.
///
/// Wraps the open write transaction so every read a handler performs
/// sees the same consistent state the eventual commit will act on.
pub struct CommandContext<'a> {
    txn: &'a WriteTransaction,
    storage: &'a StayStorage,
    current_sequence: u64,
}

impl<'a> CommandContext<'a> {
    pub fn new(txn: &'a WriteTransaction, storage: &'a StayStorage, current_sequence: u64) -> Self {
        Self {
            txn,
            storage,
            current_sequence,
        }
    }

    /// Allocate the next global sequence number.
    pub fn next_sequence(&mut self) -> u64 {
        self.current_sequence += 1;
        self.current_sequence
    }

    /// Load a stay snapshot.
    pub fn load_snapshot(&self, stay_id: &str) -> Result<StaySnapshot, StayError> {
        self.storage
            .get_snapshot_txn(self.txn, stay_id)?
            .ok_or_else(|| StayError::ReservationNotFound(stay_id.to_string()))
    }

    /// Load a room from the catalog.
    pub fn load_room(&self, room_id: &str) -> Result<Room, StayError> {
        self.storage
            .get_room_txn(self.txn, room_id)?
            .ok_or_else(|| StayError::RoomNotFound(room_id.to_string()))
    }

    /// Availability guard, evaluated against the open transaction.
    ///
    /// Returns true iff no blocking stay on `room_id` overlaps the
    /// half-open `[check_in, check_out)` range. `exclude_stay_id`
    /// lets a stay's own update or room change ignore itself.
    pub fn is_room_available(
        &self,
        room_id: &str,
        check_in: chrono::NaiveDate,
        check_out: chrono::NaiveDate,
        exclude_stay_id: Option<&str>,
        now: i64,
    ) -> Result<bool, StayError> {
        let candidates = self.storage.get_stays_for_room_txn(self.txn, room_id)?;

        for stay in &candidates {
            if Some(stay.stay_id.as_str()) == exclude_stay_id {
                continue;
            }
            if !stay.blocks_availability(now) {
                continue;
            }
            if availability::ranges_overlap(
                check_in,
                check_out,
                stay.check_in_date,
                stay.check_out_date,
            ) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Resolve a billing reference (invoice, payment, or refund id)
    /// to its owning stay.
    pub fn find_stay_for_billing_ref(&self, ref_id: &str) -> Result<Option<String>, StayError> {
        Ok(self.storage.find_stay_for_billing_ref_txn(self.txn, ref_id)?)
    }
}

/// Trait for command handlers.
#[async_trait]
pub trait CommandHandler {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<StayEvent>, StayError>;
}

/// Trait for event appliers. Appliers are PURE: snapshot in, snapshot
/// out, no storage access, so replay from the event log reproduces
/// the live state exactly.
#[enum_dispatch::enum_dispatch]
pub trait EventApplier {
    fn apply(&self, snapshot: &mut StaySnapshot, event: &StayEvent);
}
