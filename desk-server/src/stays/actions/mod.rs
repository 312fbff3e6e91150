//! Command action handlers
//!
//! One handler per front-desk or billing operation. [`CommandAction`]
//! is the dispatch enum the manager drives; `From<&StayCommand>` is
//! the single place a command payload is matched. Fields the client
//! does not supply (pricing rules, policy knobs) are defaulted here
//! and injected by the manager before execution.

mod add_line_item;
mod apply_invoice_discount;
mod apply_payment;
mod apply_split_payment;
mod cancel_reservation;
mod change_room;
mod check_in;
mod check_out;
mod confirm_reservation;
mod create_reservation;
mod finalize_invoice;
mod mark_invoice_overdue;
mod mark_no_show;
mod refunds;
mod remove_line_item;
mod room_status;
mod update_reservation;
mod void_payment;

pub use add_line_item::AddLineItemAction;
pub use apply_invoice_discount::ApplyInvoiceDiscountAction;
pub use apply_payment::ApplyPaymentAction;
pub use apply_split_payment::ApplySplitPaymentAction;
pub use cancel_reservation::CancelReservationAction;
pub use change_room::ChangeRoomAction;
pub use check_in::CheckInAction;
pub use check_out::CheckOutAction;
pub use confirm_reservation::ConfirmReservationAction;
pub use create_reservation::CreateReservationAction;
pub use finalize_invoice::FinalizeInvoiceAction;
pub use mark_invoice_overdue::MarkInvoiceOverdueAction;
pub use mark_no_show::MarkNoShowAction;
pub use refunds::{
    ApproveRefundAction, CompleteRefundAction, RejectRefundAction, RequestRefundAction,
};
pub use remove_line_item::RemoveLineItemAction;
pub use room_status::{ClearRoomMaintenanceAction, MarkRoomCleanAction, SetRoomMaintenanceAction};
pub use update_reservation::UpdateReservationAction;
pub use void_payment::VoidPaymentAction;

use async_trait::async_trait;

use crate::core::config::ChangeDayBilling;
use crate::stays::traits::{CommandContext, CommandHandler, CommandMetadata, StayError};
use shared::stay::{StayCommand, StayCommandPayload, StayEvent};

/// All command actions, dispatched by the manager.
#[derive(Debug, Clone)]
pub enum CommandAction {
    CreateReservation(CreateReservationAction),
    UpdateReservation(UpdateReservationAction),
    ConfirmReservation(ConfirmReservationAction),
    CancelReservation(CancelReservationAction),
    MarkNoShow(MarkNoShowAction),
    CheckIn(CheckInAction),
    ChangeRoom(ChangeRoomAction),
    CheckOut(CheckOutAction),
    MarkRoomClean(MarkRoomCleanAction),
    SetRoomMaintenance(SetRoomMaintenanceAction),
    ClearRoomMaintenance(ClearRoomMaintenanceAction),
    FinalizeInvoice(FinalizeInvoiceAction),
    AddLineItem(AddLineItemAction),
    RemoveLineItem(RemoveLineItemAction),
    ApplyInvoiceDiscount(ApplyInvoiceDiscountAction),
    MarkInvoiceOverdue(MarkInvoiceOverdueAction),
    ApplyPayment(ApplyPaymentAction),
    ApplySplitPayment(ApplySplitPaymentAction),
    VoidPayment(VoidPaymentAction),
    RequestRefund(RequestRefundAction),
    ApproveRefund(ApproveRefundAction),
    RejectRefund(RejectRefundAction),
    CompleteRefund(CompleteRefundAction),
}

#[async_trait]
impl CommandHandler for CommandAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<StayEvent>, StayError> {
        match self {
            CommandAction::CreateReservation(a) => a.execute(ctx, metadata).await,
            CommandAction::UpdateReservation(a) => a.execute(ctx, metadata).await,
            CommandAction::ConfirmReservation(a) => a.execute(ctx, metadata).await,
            CommandAction::CancelReservation(a) => a.execute(ctx, metadata).await,
            CommandAction::MarkNoShow(a) => a.execute(ctx, metadata).await,
            CommandAction::CheckIn(a) => a.execute(ctx, metadata).await,
            CommandAction::ChangeRoom(a) => a.execute(ctx, metadata).await,
            CommandAction::CheckOut(a) => a.execute(ctx, metadata).await,
            CommandAction::MarkRoomClean(a) => a.execute(ctx, metadata).await,
            CommandAction::SetRoomMaintenance(a) => a.execute(ctx, metadata).await,
            CommandAction::ClearRoomMaintenance(a) => a.execute(ctx, metadata).await,
            CommandAction::FinalizeInvoice(a) => a.execute(ctx, metadata).await,
            CommandAction::AddLineItem(a) => a.execute(ctx, metadata).await,
            CommandAction::RemoveLineItem(a) => a.execute(ctx, metadata).await,
            CommandAction::ApplyInvoiceDiscount(a) => a.execute(ctx, metadata).await,
            CommandAction::MarkInvoiceOverdue(a) => a.execute(ctx, metadata).await,
            CommandAction::ApplyPayment(a) => a.execute(ctx, metadata).await,
            CommandAction::ApplySplitPayment(a) => a.execute(ctx, metadata).await,
            CommandAction::VoidPayment(a) => a.execute(ctx, metadata).await,
            CommandAction::RequestRefund(a) => a.execute(ctx, metadata).await,
            CommandAction::ApproveRefund(a) => a.execute(ctx, metadata).await,
            CommandAction::RejectRefund(a) => a.execute(ctx, metadata).await,
            CommandAction::CompleteRefund(a) => a.execute(ctx, metadata).await,
        }
    }
}

impl From<&StayCommand> for CommandAction {
    fn from(command: &StayCommand) -> Self {
        match &command.payload {
            StayCommandPayload::CreateReservation { reservation } => {
                CommandAction::CreateReservation(CreateReservationAction {
                    reservation: reservation.clone(),
                    rules: vec![], // Injected by StayManager
                })
            }
            StayCommandPayload::UpdateReservation { stay_id, changes } => {
                CommandAction::UpdateReservation(UpdateReservationAction {
                    stay_id: stay_id.clone(),
                    changes: changes.clone(),
                    rules: vec![], // Injected by StayManager
                })
            }
            StayCommandPayload::ConfirmReservation { stay_id } => {
                CommandAction::ConfirmReservation(ConfirmReservationAction {
                    stay_id: stay_id.clone(),
                })
            }
            StayCommandPayload::CancelReservation { stay_id, reason } => {
                CommandAction::CancelReservation(CancelReservationAction {
                    stay_id: stay_id.clone(),
                    reason: reason.clone(),
                    hold_window_hours: 0, // Injected by StayManager
                })
            }
            StayCommandPayload::MarkNoShow { stay_id } => {
                CommandAction::MarkNoShow(MarkNoShowAction {
                    stay_id: stay_id.clone(),
                    hold_window_hours: 0, // Injected by StayManager
                })
            }
            StayCommandPayload::CheckIn { stay_id } => CommandAction::CheckIn(CheckInAction {
                stay_id: stay_id.clone(),
            }),
            StayCommandPayload::ChangeRoom {
                stay_id,
                new_room_id,
            } => CommandAction::ChangeRoom(ChangeRoomAction {
                stay_id: stay_id.clone(),
                new_room_id: new_room_id.clone(),
                rules: vec![],                                  // Injected by StayManager
                change_day_billing: ChangeDayBilling::default(), // Injected by StayManager
            }),
            StayCommandPayload::CheckOut { stay_id } => CommandAction::CheckOut(CheckOutAction {
                stay_id: stay_id.clone(),
                invoice_due_days: 0, // Injected by StayManager
            }),
            StayCommandPayload::MarkRoomClean { room_id } => {
                CommandAction::MarkRoomClean(MarkRoomCleanAction {
                    room_id: room_id.clone(),
                })
            }
            StayCommandPayload::SetRoomMaintenance { room_id, reason } => {
                CommandAction::SetRoomMaintenance(SetRoomMaintenanceAction {
                    room_id: room_id.clone(),
                    reason: reason.clone(),
                })
            }
            StayCommandPayload::ClearRoomMaintenance { room_id } => {
                CommandAction::ClearRoomMaintenance(ClearRoomMaintenanceAction {
                    room_id: room_id.clone(),
                })
            }
            StayCommandPayload::FinalizeInvoice { invoice_id } => {
                CommandAction::FinalizeInvoice(FinalizeInvoiceAction {
                    invoice_id: invoice_id.clone(),
                    invoice_due_days: 0, // Injected by StayManager
                })
            }
            StayCommandPayload::AddLineItem { invoice_id, item } => {
                CommandAction::AddLineItem(AddLineItemAction {
                    invoice_id: invoice_id.clone(),
                    item: item.clone(),
                })
            }
            StayCommandPayload::RemoveLineItem {
                invoice_id,
                line_item_id,
            } => CommandAction::RemoveLineItem(RemoveLineItemAction {
                invoice_id: invoice_id.clone(),
                line_item_id: line_item_id.clone(),
            }),
            StayCommandPayload::ApplyInvoiceDiscount { invoice_id, amount } => {
                CommandAction::ApplyInvoiceDiscount(ApplyInvoiceDiscountAction {
                    invoice_id: invoice_id.clone(),
                    discount_amount: *amount,
                })
            }
            StayCommandPayload::MarkInvoiceOverdue { invoice_id } => {
                CommandAction::MarkInvoiceOverdue(MarkInvoiceOverdueAction {
                    invoice_id: invoice_id.clone(),
                })
            }
            StayCommandPayload::ApplyPayment {
                invoice_id,
                payment,
            } => CommandAction::ApplyPayment(ApplyPaymentAction {
                invoice_id: invoice_id.clone(),
                payment: payment.clone(),
            }),
            StayCommandPayload::ApplySplitPayment {
                invoice_id,
                payments,
            } => CommandAction::ApplySplitPayment(ApplySplitPaymentAction {
                invoice_id: invoice_id.clone(),
                payments: payments.clone(),
            }),
            StayCommandPayload::VoidPayment { payment_id, reason } => {
                CommandAction::VoidPayment(VoidPaymentAction {
                    payment_id: payment_id.clone(),
                    reason: reason.clone().unwrap_or_default(),
                })
            }
            StayCommandPayload::RequestRefund {
                payment_id,
                amount,
                reason,
                method,
            } => CommandAction::RequestRefund(RequestRefundAction {
                payment_id: payment_id.clone(),
                amount: *amount,
                reason: reason.clone(),
                method: method.clone(),
            }),
            StayCommandPayload::ApproveRefund { refund_id } => {
                CommandAction::ApproveRefund(ApproveRefundAction {
                    refund_id: refund_id.clone(),
                })
            }
            StayCommandPayload::RejectRefund { refund_id, reason } => {
                CommandAction::RejectRefund(RejectRefundAction {
                    refund_id: refund_id.clone(),
                    reason: reason.clone().unwrap_or_default(),
                })
            }
            StayCommandPayload::CompleteRefund {
                refund_id,
                transaction_ref,
            } => CommandAction::CompleteRefund(CompleteRefundAction {
                refund_id: refund_id.clone(),
                transaction_ref: transaction_ref.clone(),
            }),
        }
    }
}
