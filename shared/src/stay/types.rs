//! Input payloads, ledger record types, and the command response
//! envelope shared between the engine and its callers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// New-reservation request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReservationInput {
    #[validate(length(min = 1))]
    pub guest_id: String,
    #[validate(length(min = 1))]
    pub guest_name: String,
    #[validate(length(min = 1))]
    pub room_id: String,
    /// Half-open range: the night of `check_out_date` is not billed.
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    #[validate(range(min = 1))]
    pub num_adults: i32,
    #[validate(range(min = 0))]
    pub num_children: i32,
    /// Booking channel, e.g. "walk_in", "phone", "web".
    pub source: Option<String>,
    pub note: Option<String>,
}

/// Partial update against a pending/confirmed reservation.
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReservationChanges {
    pub room_id: Option<String>,
    pub check_in_date: Option<NaiveDate>,
    pub check_out_date: Option<NaiveDate>,
    pub num_adults: Option<i32>,
    pub num_children: Option<i32>,
    pub note: Option<String>,
}

impl ReservationChanges {
    pub fn is_empty(&self) -> bool {
        self.room_id.is_none()
            && self.check_in_date.is_none()
            && self.check_out_date.is_none()
            && self.num_adults.is_none()
            && self.num_children.is_none()
            && self.note.is_none()
    }
}

/// Manual invoice line item request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LineItemInput {
    #[validate(length(min = 1, max = 200))]
    pub description: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub unit_price: f64,
    /// Percent override; when None the invoice default rate applies.
    pub tax_rate: Option<f64>,
}

/// A posted invoice line. `total_price` and `tax_amount` are derived
/// by the ledger recompute and never set by callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    pub line_item_id: String,
    pub description: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub total_price: f64,
    pub tax_rate: Option<f64>,
    pub tax_amount: f64,
    /// Source room for room-charge lines; None for manual charges.
    pub room_id: Option<String>,
}

/// Payment request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInput {
    /// Payment method, e.g. "CASH", "CARD", "TRANSFER".
    pub method: String,
    pub amount: f64,
    /// External processor / terminal reference.
    pub reference: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Reserved for asynchronous capture flows; the engine records
    /// front-desk payments directly as `Completed`.
    Pending,
    Completed,
    /// Voided after the fact (wrong amount, wrong method).
    Failed,
    /// Fully covered by completed refunds.
    Refunded,
}

/// A payment applied against an invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub payment_id: String,
    pub method: String,
    pub amount: f64,
    pub reference: Option<String>,
    pub note: Option<String>,
    pub timestamp: i64,
    pub status: PaymentStatus,
    pub void_reason: Option<String>,
}

impl PaymentRecord {
    /// Counts toward the overpayment guard and the paid total.
    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

/// A refund against a single payment, moving through the three-stage
/// request → approve → complete workflow (or rejected along the way).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRecord {
    pub refund_id: String,
    pub payment_id: String,
    pub amount: f64,
    pub reason: String,
    pub method: String,
    pub status: RefundStatus,
    pub requested_at: i64,
    /// Approval or rejection time.
    pub resolved_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub transaction_ref: Option<String>,
    pub reject_reason: Option<String>,
}

impl RefundRecord {
    /// Non-rejected refunds reserve their amount against the payment.
    pub fn counts_against_payment(&self) -> bool {
        self.status != RefundStatus::Rejected
    }

    pub fn is_completed(&self) -> bool {
        self.status == RefundStatus::Completed
    }
}

/// One contiguous span of nights billed at a single resolved rate.
/// A stay starts with one segment; each room change appends another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateSegment {
    /// First night covered by this segment.
    pub from_date: NaiveDate,
    pub room_id: String,
    pub room_name: String,
    pub room_type_id: String,
    /// Nightly price after the applied rule's discount.
    pub nightly_rate: f64,
    /// Nightly price before any rule.
    pub base_rate: f64,
    pub applied_rule_id: Option<String>,
    pub applied_rule_name: Option<String>,
}

/// Outcome of one command execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    pub command_id: String,
    pub success: bool,
    /// The stay or room the command acted on.
    pub subject_id: Option<String>,
    pub error: Option<CommandError>,
}

impl CommandResponse {
    pub fn success(command_id: impl Into<String>, subject_id: impl Into<String>) -> Self {
        Self {
            command_id: command_id.into(),
            success: true,
            subject_id: Some(subject_id.into()),
            error: None,
        }
    }

    pub fn error(command_id: impl Into<String>, error: CommandError) -> Self {
        Self {
            command_id: command_id.into(),
            success: false,
            subject_id: None,
            error: Some(error),
        }
    }

    /// A command that was already processed; reports the original
    /// subject so the caller can reconcile.
    pub fn duplicate(command_id: impl Into<String>, subject_id: Option<String>) -> Self {
        Self {
            command_id: command_id.into(),
            success: true,
            subject_id,
            error: Some(CommandError::new(
                CommandErrorCode::DuplicateCommand,
                "command already processed",
            )),
        }
    }
}

/// Machine-readable failure codes; the caller owns localization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandErrorCode {
    ReservationNotFound,
    RoomNotFound,
    InvoiceNotFound,
    PaymentNotFound,
    RefundNotFound,
    /// Availability guard rejection or a room in the wrong physical
    /// state; retryable after re-searching availability.
    RoomUnavailable,
    InvalidTransition,
    Overpayment,
    ExcessRefund,
    InvalidAmount,
    ValidationFailed,
    DuplicateCommand,
    InternalError,
    StorageFull,
    OutOfMemory,
    StorageCorrupted,
    SystemBusy,
}

impl CommandErrorCode {
    /// Whether the caller may safely retry the same intent after
    /// re-reading state.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            CommandErrorCode::RoomUnavailable | CommandErrorCode::SystemBusy
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandError {
    pub code: CommandErrorCode,
    pub message: String,
    pub retryable: bool,
}

impl CommandError {
    pub fn new(code: CommandErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: code.is_retryable(),
        }
    }
}
