//! Date-range availability checks.
//!
//! Reservations use half-open ranges: a stay occupies its room from
//! the check-in date up to but not including the check-out date, so
//! back-to-back bookings (A departs the morning B arrives) never
//! conflict.

use chrono::NaiveDate;

use shared::stay::StaySnapshot;

/// Half-open overlap test: `[a_start, a_end)` intersects `[b_start, b_end)`.
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Read-only availability probe over a set of candidate stays.
///
/// The authoritative guard runs inside the write transaction (see
/// `CommandContext::is_room_available`); this variant serves UI
/// searches against already-loaded snapshots.
pub fn is_range_free(
    stays: &[StaySnapshot],
    check_in: NaiveDate,
    check_out: NaiveDate,
    exclude_stay_id: Option<&str>,
    now: i64,
) -> bool {
    !stays.iter().any(|stay| {
        Some(stay.stay_id.as_str()) != exclude_stay_id
            && stay.blocks_availability(now)
            && ranges_overlap(check_in, check_out, stay.check_in_date, stay.check_out_date)
    })
}
