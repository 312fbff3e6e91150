//! Stay stress test - hundreds of full stay lifecycles
//!
//! Uses EngineState::initialize against an on-disk database, then
//! replays and checksums every snapshot at the end.
//!
//! Each worker owns one room and drives its stays through the full
//! pipeline sequentially, so rooms never contend and every stay is
//! expected to succeed.

use chrono::{Days, NaiveDate};
use desk_server::{Config, EngineState, StayPolicy};
use rand::Rng;
use shared::stay::{
    InvoiceStatus, LineItemInput, PaymentInput, ReservationInput, StayCommand, StayCommandPayload,
    StayStatus,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

const STAY_COUNT: usize = 200;
const CONCURRENCY: usize = 8;

/// Stay phase
#[derive(Debug, Clone, Copy, PartialEq)]
enum StayPhase {
    Reserve,
    Confirm,
    CheckIn,
    CheckOut,
    Settle,
    Clean,
}

/// Per-stay context carried between phases
#[derive(Clone)]
struct StayContext {
    idx: usize,
    room_id: String,
    window: (NaiveDate, NaiveDate),
    stay_id: Option<String>,
    invoice_id: Option<String>,
    total: f64,
    commands: usize,
}

fn stay_window(slot: usize) -> (NaiveDate, NaiveDate) {
    let base = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
    let start = base
        .checked_add_days(Days::new(3 * slot as u64))
        .unwrap();
    let end = start.checked_add_days(Days::new(2)).unwrap();
    (start, end)
}

/// Execute one phase of a stay pipeline
async fn execute_phase(
    state: &EngineState,
    ctx: &mut StayContext,
    phase: StayPhase,
) -> Result<(), String> {
    let op_id = format!("op-{}", ctx.idx % 10);
    let op_name = format!("Clerk {}", ctx.idx % 10);
    let manager = state.manager();

    match phase {
        StayPhase::Reserve => {
            let guests = {
                let mut rng = rand::thread_rng();
                rng.gen_range(1..=4)
            };
            let cmd = StayCommand::new(
                op_id,
                op_name,
                StayCommandPayload::CreateReservation {
                    reservation: ReservationInput {
                        guest_id: format!("guest-{}", ctx.idx),
                        guest_name: format!("Guest {}", ctx.idx),
                        room_id: ctx.room_id.clone(),
                        check_in_date: ctx.window.0,
                        check_out_date: ctx.window.1,
                        num_adults: guests,
                        num_children: 0,
                        source: Some("walk_in".to_string()),
                        note: None,
                    },
                },
            );
            let resp = manager.execute_command(cmd).await;
            if !resp.success {
                return Err(format!("reserve failed: {:?}", resp.error));
            }
            ctx.stay_id = resp.subject_id;
            ctx.commands += 1;
            Ok(())
        }
        StayPhase::Confirm => {
            let stay_id = ctx.stay_id.as_ref().ok_or("no stay_id")?;
            let cmd = StayCommand::new(
                op_id,
                op_name,
                StayCommandPayload::ConfirmReservation {
                    stay_id: stay_id.clone(),
                },
            );
            let resp = manager.execute_command(cmd).await;
            if !resp.success {
                return Err(format!("confirm failed: {:?}", resp.error));
            }
            ctx.commands += 1;
            Ok(())
        }
        StayPhase::CheckIn => {
            let stay_id = ctx.stay_id.as_ref().ok_or("no stay_id")?;
            let cmd = StayCommand::new(
                op_id.clone(),
                op_name.clone(),
                StayCommandPayload::CheckIn {
                    stay_id: stay_id.clone(),
                },
            );
            let resp = manager.execute_command(cmd).await;
            if !resp.success {
                return Err(format!("check-in failed: {:?}", resp.error));
            }
            ctx.commands += 1;

            let snapshot = manager
                .get_stay(stay_id)
                .map_err(|e| e.to_string())?
                .ok_or("snapshot missing")?;
            let invoice_id = snapshot.invoice.ok_or("invoice missing")?.invoice_id;

            // Some guests raid the minibar
            let extra = {
                let mut rng = rand::thread_rng();
                if rng.gen_bool(0.25) {
                    Some((rng.gen_range(5.0_f64..60.0) * 100.0).round() / 100.0)
                } else {
                    None
                }
            };
            if let Some(amount) = extra {
                let cmd = StayCommand::new(
                    op_id,
                    op_name,
                    StayCommandPayload::AddLineItem {
                        invoice_id: invoice_id.clone(),
                        item: LineItemInput {
                            description: "Minibar".to_string(),
                            quantity: 1,
                            unit_price: amount,
                            tax_rate: None,
                        },
                    },
                );
                let resp = manager.execute_command(cmd).await;
                if !resp.success {
                    return Err(format!("line item failed: {:?}", resp.error));
                }
                ctx.commands += 1;
            }

            ctx.invoice_id = Some(invoice_id);
            Ok(())
        }
        StayPhase::CheckOut => {
            let stay_id = ctx.stay_id.as_ref().ok_or("no stay_id")?;
            let cmd = StayCommand::new(
                op_id,
                op_name,
                StayCommandPayload::CheckOut {
                    stay_id: stay_id.clone(),
                },
            );
            let resp = manager.execute_command(cmd).await;
            if !resp.success {
                return Err(format!("check-out failed: {:?}", resp.error));
            }
            ctx.commands += 1;

            let snapshot = manager
                .get_stay(stay_id)
                .map_err(|e| e.to_string())?
                .ok_or("snapshot missing")?;
            ctx.total = snapshot.invoice.ok_or("invoice missing")?.total_amount;
            Ok(())
        }
        StayPhase::Settle => {
            let invoice_id = ctx.invoice_id.as_ref().ok_or("no invoice_id")?;
            let method = {
                let mut rng = rand::thread_rng();
                const METHODS: &[&str] = &["CASH", "CARD", "TRANSFER"];
                METHODS[rng.gen_range(0..METHODS.len())]
            };
            let cmd = StayCommand::new(
                op_id,
                op_name,
                StayCommandPayload::ApplyPayment {
                    invoice_id: invoice_id.clone(),
                    payment: PaymentInput {
                        method: method.to_string(),
                        amount: ctx.total,
                        reference: Some(format!("R{:06}", ctx.idx)),
                        note: None,
                    },
                },
            );
            let resp = manager.execute_command(cmd).await;
            if !resp.success {
                return Err(format!("payment failed: {:?}", resp.error));
            }
            ctx.commands += 1;
            Ok(())
        }
        StayPhase::Clean => {
            let cmd = StayCommand::new(
                op_id,
                op_name,
                StayCommandPayload::MarkRoomClean {
                    room_id: ctx.room_id.clone(),
                },
            );
            let resp = manager.execute_command(cmd).await;
            if !resp.success {
                return Err(format!("mark clean failed: {:?}", resp.error));
            }
            ctx.commands += 1;
            Ok(())
        }
    }
}

fn get_dir_size(path: &PathBuf) -> u64 {
    if path.is_file() {
        return fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    }
    let mut size = 0;
    if let Ok(entries) = fs::read_dir(path) {
        for entry in entries.flatten() {
            let p = entry.path();
            if p.is_file() {
                size += fs::metadata(&p).map(|m| m.len()).unwrap_or(0);
            } else if p.is_dir() {
                size += get_dir_size(&p);
            }
        }
    }
    size
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stay_pipeline_under_load() {
    let work_dir = PathBuf::from("/tmp/desk_stress_test");
    let _ = fs::remove_dir_all(&work_dir);

    println!();
    println!("=====================================================");
    println!(" Stay stress test - {} stays, {} workers", STAY_COUNT, CONCURRENCY);
    println!("   work dir: {}", work_dir.display());
    println!("=====================================================");
    println!();

    // 1. Configuration and engine
    println!("[1/4] Initializing engine...");
    let config = Config::with_overrides(work_dir.to_str().unwrap(), StayPolicy::default());
    let state = EngineState::initialize(&config).expect("engine init failed");
    println!("      ok (epoch: {})", state.manager.epoch());

    // 2. Register one room per worker
    println!("[2/4] Registering {} rooms...", CONCURRENCY);
    for w in 0..CONCURRENCY {
        let room = shared::models::Room::new(
            format!("room-{:02}", w),
            format!("Room {:02}", w),
            "rt-standard",
            "Standard",
            100.0,
        );
        state.manager.register_room(&room).expect("room registration failed");
    }
    println!("      ok");

    let state = Arc::new(state);
    let success = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let commands_executed = Arc::new(AtomicUsize::new(0));

    // 3. Drive the pipelines
    println!("[3/4] Running stay pipelines...");
    let start = Instant::now();

    let mut handles = Vec::with_capacity(CONCURRENCY);
    for w in 0..CONCURRENCY {
        let state = state.clone();
        let success = success.clone();
        let failed = failed.clone();
        let commands_executed = commands_executed.clone();

        handles.push(tokio::spawn(async move {
            let mut slot = 0;
            let mut i = w;
            while i < STAY_COUNT {
                let mut ctx = StayContext {
                    idx: i,
                    room_id: format!("room-{:02}", w),
                    window: stay_window(slot),
                    stay_id: None,
                    invoice_id: None,
                    total: 0.0,
                    commands: 0,
                };

                let result = async {
                    execute_phase(&state, &mut ctx, StayPhase::Reserve).await?;
                    execute_phase(&state, &mut ctx, StayPhase::Confirm).await?;
                    execute_phase(&state, &mut ctx, StayPhase::CheckIn).await?;
                    execute_phase(&state, &mut ctx, StayPhase::CheckOut).await?;
                    execute_phase(&state, &mut ctx, StayPhase::Settle).await?;
                    execute_phase(&state, &mut ctx, StayPhase::Clean).await?;
                    Ok::<_, String>(())
                }
                .await;

                match result {
                    Ok(()) => {
                        commands_executed.fetch_add(ctx.commands, Ordering::Relaxed);
                        success.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        let n = failed.fetch_add(1, Ordering::Relaxed) + 1;
                        if n <= 3 {
                            eprintln!("      [ERR] stay {} failed: {}", i, e);
                        }
                    }
                }

                slot += 1;
                i += CONCURRENCY;
            }
        }));
    }

    // Progress output
    let success_monitor = success.clone();
    let commands_monitor = commands_executed.clone();
    let monitor = tokio::spawn(async move {
        let mut last_n = 0;
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(3)).await;
            let n = success_monitor.load(Ordering::Relaxed);
            if n >= STAY_COUNT || n == last_n {
                break;
            }
            last_n = n;
            let cmds = commands_monitor.load(Ordering::Relaxed);
            let elapsed = start.elapsed().as_secs_f64();
            println!(
                "      [{:>5.1}s] stays: {:>4}/{}, commands: {} ({:.0} cmd/s)",
                elapsed,
                n,
                STAY_COUNT,
                cmds,
                cmds as f64 / elapsed
            );
        }
    });

    for h in handles {
        h.await.unwrap();
    }
    monitor.abort();

    let elapsed = start.elapsed();
    let ok = success.load(Ordering::Relaxed);
    let err = failed.load(Ordering::Relaxed);
    let cmds = commands_executed.load(Ordering::Relaxed);

    println!();
    println!("      done: {} succeeded, {} failed", ok, err);
    println!(
        "      {} commands in {:.2?} ({:.1} cmd/s)",
        cmds,
        elapsed,
        cmds as f64 / elapsed.as_secs_f64()
    );

    // 4. Verify every snapshot: checksum and event replay
    println!();
    println!("[4/4] Verifying snapshots against the event log...");
    let manager = state.manager();
    let snapshots = manager.storage().get_all_snapshots().expect("snapshots");

    let mut checksum_invalid = 0;
    let mut replay_mismatch = 0;
    let mut replay_error = 0;
    let mut settled = 0;

    for s in &snapshots {
        if !s.verify_checksum() {
            checksum_invalid += 1;
            if checksum_invalid <= 3 {
                eprintln!("      [WARN] stay {} checksum invalid", s.stay_id);
            }
        }

        match manager.rebuild_stay(&s.stay_id) {
            Ok(rebuilt) => {
                if rebuilt.state_checksum != s.state_checksum {
                    replay_mismatch += 1;
                    if replay_mismatch <= 3 {
                        eprintln!(
                            "      [WARN] stay {} replay mismatch: stored={}, rebuilt={}",
                            s.stay_id, s.state_checksum, rebuilt.state_checksum
                        );
                    }
                }
            }
            Err(e) => {
                replay_error += 1;
                if replay_error <= 3 {
                    eprintln!("      [ERR] stay {} replay failed: {}", s.stay_id, e);
                }
            }
        }

        if s.status == StayStatus::CheckedOut
            && s.invoice
                .as_ref()
                .is_some_and(|inv| inv.status == InvoiceStatus::Paid)
        {
            settled += 1;
        }
    }

    let stats = manager.storage().get_stats().expect("stats");
    let db_path = work_dir.join("stays.redb");

    println!();
    println!("      snapshots:          {}", snapshots.len());
    println!("      checksum invalid:   {}", checksum_invalid);
    println!("      replay mismatches:  {}", replay_mismatch);
    println!("      replay errors:      {}", replay_error);
    println!("      settled stays:      {}", settled);
    println!();
    println!("      events:             {}", stats.event_count);
    println!("      sequence:           {}", stats.current_sequence);
    println!("      processed commands: {}", stats.processed_command_count);
    println!("      active stays:       {}", stats.active_stay_count);
    println!("      database size:      {}", format_size(get_dir_size(&db_path)));

    assert_eq!(ok, STAY_COUNT, "every stay should complete");
    assert_eq!(checksum_invalid, 0, "all checksums should verify");
    assert_eq!(replay_mismatch, 0, "replay should match every snapshot");
    assert_eq!(replay_error, 0, "replay should not error");
    assert_eq!(settled, STAY_COUNT, "every invoice should settle as Paid");
    assert_eq!(stats.active_stay_count, 0, "no stay should remain active");
    assert_eq!(
        stats.event_count, stats.current_sequence,
        "the event log should be dense up to the sequence counter"
    );
    assert_eq!(
        stats.processed_command_count, cmds as u64,
        "every successful command should be recorded exactly once"
    );

    println!();
    println!("      all checks passed");
}
