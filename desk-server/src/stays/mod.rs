//! Stay Event Sourcing Module
//!
//! This module implements the stay lifecycle and billing engine using
//! event sourcing:
//!
//! - **manager**: Core StayManager for command processing and event generation
//! - **storage**: redb-based persistence layer for events, snapshots, and indices
//! - **actions**: One command handler per front-desk/billing operation
//! - **appliers**: Pure event-to-snapshot application (also used for replay)
//! - **availability**: Half-open date-range overlap checks
//! - **money**: Decimal arithmetic and the invoice recompute
//!
//! # Architecture
//!
//! ```text
//! Command → StayManager → Event → Storage (redb)
//!                ↓                     ↓
//!             Broadcast         Snapshot Update
//!                ↓
//!          All Subscribers
//! ```
//!
//! # Data Flow
//!
//! 1. Caller submits a StayCommand
//! 2. StayManager validates and processes it inside one write transaction
//! 3. StayEvents are generated with global sequence numbers
//! 4. Events, snapshots, and room status are persisted atomically
//! 5. Events are broadcast to all subscribers
//! 6. CommandResponse is returned to the caller

pub mod actions;
pub mod appliers;
pub mod availability;
pub mod manager;
pub mod money;
pub mod storage;
pub mod traits;

// Re-exports
pub use manager::StayManager;
pub use storage::StayStorage;

// Re-export shared types for convenience
pub use shared::stay::{
    CommandError, CommandErrorCode, CommandResponse, EventPayload, StayCommand,
    StayCommandPayload, StayEvent, StayEventType, StaySnapshot, StayStatus,
};
