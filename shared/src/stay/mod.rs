//! Stay domain: commands in, events out, snapshots as state.

pub mod command;
pub mod event;
pub mod snapshot;
pub mod types;

pub use command::{StayCommand, StayCommandPayload};
pub use event::{EventPayload, StayEvent, StayEventType};
pub use snapshot::{InvoiceState, InvoiceStatus, StaySnapshot, StayStatus};
pub use types::{
    CommandError, CommandErrorCode, CommandResponse, InvoiceLineItem, LineItemInput, PaymentInput,
    PaymentRecord, PaymentStatus, RateSegment, RefundRecord, RefundStatus, ReservationChanges,
    ReservationInput,
};
