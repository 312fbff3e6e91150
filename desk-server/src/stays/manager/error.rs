use super::super::storage::StorageError;
use super::super::traits::StayError;
use shared::stay::{CommandError, CommandErrorCode};
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

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

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Map a storage failure to an error code the client can act on.
fn classify_storage_error(e: &StorageError) -> CommandErrorCode {
    match e {
        StorageError::Serialization(_) => return CommandErrorCode::InternalError,
        StorageError::StayNotFound(_) => return CommandErrorCode::ReservationNotFound,
        _ => {}
    }

    // redb errors are classified by message.
    let err_str = e.to_string().to_lowercase();

    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return CommandErrorCode::StorageFull;
    }

    if err_str.contains("out of memory") || err_str.contains("cannot allocate") {
        return CommandErrorCode::OutOfMemory;
    }

    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return CommandErrorCode::StorageCorrupted;
    }

    // Default: busy (redb database / transaction / table / commit errors).
    CommandErrorCode::SystemBusy
}

impl From<ManagerError> for CommandError {
    fn from(err: ManagerError) -> Self {
        let (code, message) = match err {
            ManagerError::Storage(e) => {
                let code = classify_storage_error(&e);
                let message = e.to_string();
                tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
                (code, message)
            }
            ManagerError::ReservationNotFound(id) => (
                CommandErrorCode::ReservationNotFound,
                format!("Reservation not found: {}", id),
            ),
            ManagerError::RoomNotFound(id) => (
                CommandErrorCode::RoomNotFound,
                format!("Room not found: {}", id),
            ),
            ManagerError::InvoiceNotFound(id) => (
                CommandErrorCode::InvoiceNotFound,
                format!("Invoice not found: {}", id),
            ),
            ManagerError::PaymentNotFound(id) => (
                CommandErrorCode::PaymentNotFound,
                format!("Payment not found: {}", id),
            ),
            ManagerError::RefundNotFound(id) => (
                CommandErrorCode::RefundNotFound,
                format!("Refund not found: {}", id),
            ),
            ManagerError::RoomUnavailable(msg) => (CommandErrorCode::RoomUnavailable, msg),
            ManagerError::InvalidTransition(msg) => (CommandErrorCode::InvalidTransition, msg),
            ManagerError::Overpayment(msg) => (CommandErrorCode::Overpayment, msg),
            ManagerError::ExcessRefund(msg) => (CommandErrorCode::ExcessRefund, msg),
            ManagerError::InvalidAmount => (
                CommandErrorCode::InvalidAmount,
                "Invalid amount".to_string(),
            ),
            ManagerError::Validation(msg) => (CommandErrorCode::ValidationFailed, msg),
            ManagerError::Internal(msg) => (CommandErrorCode::InternalError, msg),
        };
        CommandError::new(code, message)
    }
}

impl From<StayError> for ManagerError {
    fn from(err: StayError) -> Self {
        match err {
            StayError::ReservationNotFound(id) => ManagerError::ReservationNotFound(id),
            StayError::RoomNotFound(id) => ManagerError::RoomNotFound(id),
            StayError::InvoiceNotFound(id) => ManagerError::InvoiceNotFound(id),
            StayError::PaymentNotFound(id) => ManagerError::PaymentNotFound(id),
            StayError::RefundNotFound(id) => ManagerError::RefundNotFound(id),
            StayError::RoomUnavailable(msg) => ManagerError::RoomUnavailable(msg),
            StayError::InvalidTransition(msg) => ManagerError::InvalidTransition(msg),
            StayError::Overpayment(msg) => ManagerError::Overpayment(msg),
            StayError::ExcessRefund(msg) => ManagerError::ExcessRefund(msg),
            StayError::InvalidAmount => ManagerError::InvalidAmount,
            StayError::Validation(msg) => ManagerError::Validation(msg),
            StayError::Storage(msg) => ManagerError::Internal(msg),
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;
