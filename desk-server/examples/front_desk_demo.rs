//! Front Desk Demo - a full stay walked through the engine in-process
//!
//! Drives one reservation from booking to a settled, partially
//! refunded folio:
//! 1. Seed the room catalog and a pricing rule
//! 2. Reserve -> confirm -> check in
//! 3. Post a minibar charge, check out (invoice finalizes)
//! 4. Settle with a split payment, then refund a disputed charge
//! 5. Housekeeping returns the room to service
//!
//! Every committed event is printed from the broadcast bus as it
//! happens.
//!
//! Run: cargo run -p desk-server --example front_desk_demo

use chrono::Days;
use desk_server::{
    CommandResponse, Config, EngineState, StayCommand, StayCommandPayload, StayManager, StayPolicy,
    init_logger_with_file,
};
use shared::models::{DiscountType, PricingRule, Room};
use shared::stay::{LineItemInput, PaymentInput, ReservationInput, StaySnapshot};
use std::time::Duration;
use tokio::sync::broadcast;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Keep tracing quiet; the demo narrates through the event bus.
    init_logger_with_file(Some("warn"), None, None);

    println!("=== Front Desk Demo ===\n");

    // === 1. Initialize the engine in a scratch directory ===
    println!("1. Initializing engine...");
    let work_dir = std::env::temp_dir().join("desk-server-demo");
    let _ = std::fs::remove_dir_all(&work_dir);
    std::fs::create_dir_all(&work_dir)?;

    let config = Config::with_overrides(work_dir.to_string_lossy(), StayPolicy::default());
    let state = EngineState::initialize(&config)?;
    let manager = state.manager();
    println!("   Engine ready at {}\n", work_dir.display());

    // === 2. Watch the outbound event stream ===
    let mut events = manager.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => println!(
                    "   [event] #{:<3} {:<24} {}",
                    event.sequence, event.event_type, event.subject_id
                ),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // === 3. Seed the catalog ===
    println!("2. Seeding rooms and a pricing rule...");
    manager.register_room(&Room::new("room-101", "101", "standard", "Standard Queen", 100.0))?;
    manager.register_room(&Room::new("room-205", "205", "suite", "Junior Suite", 150.0))?;

    let rule = PricingRule::new(
        "rule-early",
        "Early Booking -10%",
        5,
        DiscountType::Percentage,
        10.0,
    );
    manager.upsert_pricing_rule(&rule)?;
    println!("   2 rooms, 1 rule.\n");

    // === 4. Reserve and confirm ===
    println!("3. Booking room 101 for two nights...");
    let today = chrono::Utc::now().date_naive();
    let resp = run(
        &manager,
        StayCommandPayload::CreateReservation {
            reservation: ReservationInput {
                guest_id: "guest-7".to_string(),
                guest_name: "Dana Whitfield".to_string(),
                room_id: "room-101".to_string(),
                check_in_date: today,
                check_out_date: today + Days::new(2),
                num_adults: 2,
                num_children: 0,
                source: Some("phone".to_string()),
                note: None,
            },
        },
    )
    .await;
    let stay_id = resp.subject_id.expect("reservation id");

    run(
        &manager,
        StayCommandPayload::ConfirmReservation {
            stay_id: stay_id.clone(),
        },
    )
    .await;

    let stay = fetch(&manager, &stay_id)?;
    println!(
        "   Quoted {:.2}/stay ({} applied).\n",
        stay.quoted_total,
        stay.segments[0]
            .applied_rule_name
            .as_deref()
            .unwrap_or("no rule"),
    );

    // === 5. Check in and post a charge ===
    println!("4. Checking in...");
    run(
        &manager,
        StayCommandPayload::CheckIn {
            stay_id: stay_id.clone(),
        },
    )
    .await;

    let stay = fetch(&manager, &stay_id)?;
    let invoice_id = stay.invoice.expect("invoice opens at check-in").invoice_id;

    println!("5. Posting a minibar charge...");
    run(
        &manager,
        StayCommandPayload::AddLineItem {
            invoice_id: invoice_id.clone(),
            item: LineItemInput {
                description: "Minibar".to_string(),
                quantity: 2,
                unit_price: 12.50,
                tax_rate: None,
            },
        },
    )
    .await;

    // === 6. Check out: room charges post, invoice finalizes ===
    println!("6. Checking out...");
    run(
        &manager,
        StayCommandPayload::CheckOut {
            stay_id: stay_id.clone(),
        },
    )
    .await;

    let stay = fetch(&manager, &stay_id)?;
    let invoice = stay.invoice.expect("finalized invoice");
    println!(
        "   Invoice {:?}: subtotal {:.2}, tax {:.2}, total {:.2}, due {}.\n",
        invoice.status,
        invoice.subtotal,
        invoice.tax_amount,
        invoice.total_amount,
        invoice
            .due_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string()),
    );

    // === 7. Settle with a split payment ===
    println!("7. Settling cash + card...");
    let card_share = invoice.total_amount - 50.0;
    run(
        &manager,
        StayCommandPayload::ApplySplitPayment {
            invoice_id: invoice_id.clone(),
            payments: vec![
                PaymentInput {
                    method: "CASH".to_string(),
                    amount: 50.0,
                    reference: None,
                    note: None,
                },
                PaymentInput {
                    method: "CARD".to_string(),
                    amount: card_share,
                    reference: Some("tx-4471".to_string()),
                    note: None,
                },
            ],
        },
    )
    .await;

    // === 8. Guest disputes the minibar charge: partial refund ===
    println!("8. Refunding the disputed minibar charge...");
    let stay = fetch(&manager, &stay_id)?;
    let card_payment_id = stay
        .payments
        .iter()
        .find(|p| p.method == "CARD")
        .expect("card payment")
        .payment_id
        .clone();

    run(
        &manager,
        StayCommandPayload::RequestRefund {
            payment_id: card_payment_id,
            amount: 14.50,
            reason: "Minibar charge disputed".to_string(),
            method: None,
        },
    )
    .await;

    let stay = fetch(&manager, &stay_id)?;
    let refund_id = stay.refunds.last().expect("requested refund").refund_id.clone();

    run(
        &manager,
        StayCommandPayload::ApproveRefund {
            refund_id: refund_id.clone(),
        },
    )
    .await;
    run(
        &manager,
        StayCommandPayload::CompleteRefund {
            refund_id,
            transaction_ref: Some("rf-58291".to_string()),
        },
    )
    .await;

    // === 9. Housekeeping turns the room around ===
    println!("9. Marking room 101 clean...");
    run(
        &manager,
        StayCommandPayload::MarkRoomClean {
            room_id: "room-101".to_string(),
        },
    )
    .await;

    // Let the subscriber drain before printing the folio.
    tokio::time::sleep(Duration::from_millis(100)).await;

    // === 10. Final folio ===
    let stay = fetch(&manager, &stay_id)?;
    let invoice = stay.invoice.expect("invoice");
    println!("\n=== Folio for {} ({:?}) ===", stay.guest_name, stay.status);
    for item in &invoice.line_items {
        println!(
            "   {:<24} {} x {:>8.2} = {:>8.2}  (+{:.2} tax)",
            item.description, item.quantity, item.unit_price, item.total_price, item.tax_amount
        );
    }
    println!(
        "   {:<24} subtotal {:.2}  tax {:.2}  total {:.2}",
        "", invoice.subtotal, invoice.tax_amount, invoice.total_amount
    );
    for payment in &stay.payments {
        println!(
            "   paid   {:<8} {:>8.2}  [{:?}]",
            payment.method, payment.amount, payment.status
        );
    }
    for refund in &stay.refunds {
        println!(
            "   refund {:<8} {:>8.2}  [{:?}] {}",
            refund.method, refund.amount, refund.status, refund.reason
        );
    }
    println!("   Invoice status: {:?}", invoice.status);

    let room = manager.get_room("room-101")?.expect("room");
    println!("   Room 101: {}", room.status);

    Ok(())
}

/// Submit one command as the demo operator; panics on rejection so a
/// broken flow fails loudly.
async fn run(manager: &StayManager, payload: StayCommandPayload) -> CommandResponse {
    let name = payload.name();
    let resp = manager
        .execute_command(StayCommand::new("op-demo", "Front Desk", payload))
        .await;
    if !resp.success {
        panic!("{} rejected: {:?}", name, resp.error);
    }
    resp
}

fn fetch(manager: &StayManager, stay_id: &str) -> anyhow::Result<StaySnapshot> {
    manager
        .get_stay(stay_id)?
        .ok_or_else(|| anyhow::anyhow!("stay {} not found", stay_id))
}
