use super::*;
use shared::models::{DiscountType, RoomStatus};
use shared::stay::{
    InvoiceState, InvoiceStatus, LineItemInput, PaymentInput, PaymentStatus, RefundStatus,
    ReservationChanges, ReservationInput, StayEventType,
};

fn create_test_manager() -> StayManager {
    let storage = StayStorage::open_in_memory().unwrap();
    StayManager::with_storage(storage, StayPolicy::default())
}

fn manager_with_policy(policy: StayPolicy) -> StayManager {
    let storage = StayStorage::open_in_memory().unwrap();
    StayManager::with_storage(storage, policy)
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn days_from_now(n: u64) -> NaiveDate {
    chrono::Utc::now()
        .date_naive()
        .checked_add_days(chrono::Days::new(n))
        .unwrap()
}

fn seed_room(manager: &StayManager, room_id: &str, base_price: f64) {
    let room = Room::new(room_id, room_id, "rt-standard", "Standard", base_price);
    manager.register_room(&room).unwrap();
}

fn percentage_rule(id: &str, priority: i32, percent: f64) -> PricingRule {
    PricingRule::new(id, id, priority, DiscountType::Percentage, percent)
}

fn fixed_rule(id: &str, priority: i32, amount: f64) -> PricingRule {
    PricingRule::new(id, id, priority, DiscountType::Fixed, amount)
}

fn reservation_input(room_id: &str, check_in: NaiveDate, check_out: NaiveDate) -> ReservationInput {
    ReservationInput {
        guest_id: "guest-1".to_string(),
        guest_name: "Ada Lovelace".to_string(),
        room_id: room_id.to_string(),
        check_in_date: check_in,
        check_out_date: check_out,
        num_adults: 2,
        num_children: 0,
        source: Some("walk_in".to_string()),
        note: None,
    }
}

async fn exec(manager: &StayManager, payload: StayCommandPayload) -> CommandResponse {
    manager
        .execute_command(StayCommand::new("op-1", "Front Desk", payload))
        .await
}

async fn reserve(
    manager: &StayManager,
    room_id: &str,
    check_in: &str,
    check_out: &str,
) -> CommandResponse {
    reserve_for_dates(manager, room_id, date(check_in), date(check_out)).await
}

async fn reserve_for_dates(
    manager: &StayManager,
    room_id: &str,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> CommandResponse {
    exec(
        manager,
        StayCommandPayload::CreateReservation {
            reservation: reservation_input(room_id, check_in, check_out),
        },
    )
    .await
}

async fn confirm(manager: &StayManager, stay_id: &str) -> CommandResponse {
    exec(
        manager,
        StayCommandPayload::ConfirmReservation {
            stay_id: stay_id.to_string(),
        },
    )
    .await
}

async fn check_in(manager: &StayManager, stay_id: &str) -> CommandResponse {
    exec(
        manager,
        StayCommandPayload::CheckIn {
            stay_id: stay_id.to_string(),
        },
    )
    .await
}

async fn check_out(manager: &StayManager, stay_id: &str) -> CommandResponse {
    exec(
        manager,
        StayCommandPayload::CheckOut {
            stay_id: stay_id.to_string(),
        },
    )
    .await
}

async fn pay(
    manager: &StayManager,
    invoice_id: &str,
    amount: f64,
    method: &str,
) -> CommandResponse {
    exec(
        manager,
        StayCommandPayload::ApplyPayment {
            invoice_id: invoice_id.to_string(),
            payment: PaymentInput {
                method: method.to_string(),
                amount,
                reference: None,
                note: None,
            },
        },
    )
    .await
}

fn stored_invoice(manager: &StayManager, stay_id: &str) -> InvoiceState {
    manager
        .get_stay(stay_id)
        .unwrap()
        .unwrap()
        .invoice
        .unwrap()
}

/// Reserve, confirm and check in a guest; returns (stay_id, invoice_id).
async fn checked_in_stay(
    manager: &StayManager,
    room_id: &str,
    check_in_date: &str,
    check_out_date: &str,
) -> (String, String) {
    checked_in_stay_for_dates(manager, room_id, date(check_in_date), date(check_out_date)).await
}

async fn checked_in_stay_for_dates(
    manager: &StayManager,
    room_id: &str,
    check_in_date: NaiveDate,
    check_out_date: NaiveDate,
) -> (String, String) {
    let resp = reserve_for_dates(manager, room_id, check_in_date, check_out_date).await;
    assert!(resp.success, "reserve failed: {:?}", resp.error);
    let stay_id = resp.subject_id.unwrap();
    let resp = confirm(manager, &stay_id).await;
    assert!(resp.success, "confirm failed: {:?}", resp.error);
    let resp = check_in(manager, &stay_id).await;
    assert!(resp.success, "check-in failed: {:?}", resp.error);
    let invoice_id = stored_invoice(manager, &stay_id).invoice_id;
    (stay_id, invoice_id)
}

fn assert_stay_status(manager: &StayManager, stay_id: &str, expected: StayStatus) {
    let snapshot = manager.get_stay(stay_id).unwrap().unwrap();
    assert_eq!(
        snapshot.status, expected,
        "Expected stay status {:?}, got {:?}",
        expected, snapshot.status
    );
}

/// The stored snapshot and an event replay must agree bit for bit.
fn assert_replay_matches(manager: &StayManager, stay_id: &str) {
    let stored = manager.get_stay(stay_id).unwrap().unwrap();
    let rebuilt = manager.rebuild_stay(stay_id).unwrap();
    assert_eq!(
        stored.state_checksum, rebuilt.state_checksum,
        "Snapshot diverged from event replay!\n  stored status: {:?} invoice: {:?}\n  rebuilt status: {:?} invoice: {:?}",
        stored.status, stored.invoice, rebuilt.status, rebuilt.invoice,
    );
}

fn assert_close(actual: f64, expected: f64, msg: &str) {
    assert!(
        (actual - expected).abs() < 0.02,
        "{}: expected {:.2}, got {:.2}",
        msg,
        expected,
        actual
    );
}
