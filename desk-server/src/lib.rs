//! Desk Server - hotel front-desk stay lifecycle and billing engine
//!
//! # Architecture
//!
//! The engine is an embedded, event-sourced command processor. Every
//! front-desk and billing operation is a [`StayCommand`] handled inside
//! one database write transaction; the resulting events are the source
//! of truth, and snapshots are the cached projection clients read.
//!
//! - **Stay lifecycle** (`stays`): reservations, check-in/out, room
//!   changes, cancellation and no-show handling
//! - **Billing** (`stays::money`): invoice ledger, payments, refunds
//! - **Pricing** (`pricing`): nightly-rate resolution from rules
//! - **Storage** (`stays::storage`): embedded redb persistence
//!
//! # Module Structure
//!
//! ```text
//! desk-server/src/
//! ├── core/          # Config, policy, engine state
//! ├── pricing/       # Pricing rule resolver
//! ├── stays/         # Event sourcing: manager, actions, appliers,
//! │                  # availability, money, storage
//! └── utils/         # Logging, calendar arithmetic
//! ```

pub mod core;
pub mod pricing;
pub mod stays;
pub mod utils;

// Re-export public types
pub use core::{ChangeDayBilling, Config, EngineState, StayPolicy};
pub use pricing::{ResolvedPrice, resolve_price};
pub use stays::{StayManager, StayStorage};
pub use stays::{
    CommandError, CommandErrorCode, CommandResponse, StayCommand, StayCommandPayload, StayEvent,
    StaySnapshot, StayStatus,
};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

pub fn print_banner() {
    println!(
        r#"
    ____            __
   / __ \___  _____/ /__
  / / / / _ \/ ___/ //_/
 / /_/ /  __(__  ) ,<
/_____/\___/____/_/|_|
   _____
  / ___/___  ______   _____  _____
  \__ \/ _ \/ ___/ | / / _ \/ ___/
 ___/ /  __/ /   | |/ /  __/ /
/____/\___/_/    |___/\___/_/
    "#
    );
}
