//! Stay snapshot: the materialized state of one stay aggregate.
//!
//! A snapshot is derived purely by applying the stay's events in
//! sequence order. It carries the reservation fields, the rate
//! segments, the embedded invoice, and the payment/refund ledgers.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::stay::types::{PaymentRecord, RateSegment, RefundRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StayStatus {
    #[default]
    Pending,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
    NoShow,
}

impl StayStatus {
    /// No transition leaves a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StayStatus::CheckedOut | StayStatus::Cancelled | StayStatus::NoShow
        )
    }
}

impl std::fmt::Display for StayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StayStatus::Pending => "pending",
            StayStatus::Confirmed => "confirmed",
            StayStatus::CheckedIn => "checked_in",
            StayStatus::CheckedOut => "checked_out",
            StayStatus::Cancelled => "cancelled",
            StayStatus::NoShow => "no_show",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Pending,
    Paid,
    PartiallyPaid,
    Overdue,
}

/// The invoice ledger embedded in a stay.
///
/// `subtotal`, `tax_amount`, `total_amount` and `status` are derived
/// fields: only the ledger recompute writes them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceState {
    pub invoice_id: String,
    pub line_items: Vec<crate::stay::types::InvoiceLineItem>,
    pub subtotal: f64,
    pub tax_amount: f64,
    /// Standalone invoice-level discount; not derived from items.
    pub discount_amount: f64,
    pub total_amount: f64,
    pub status: InvoiceStatus,
    pub due_date: Option<NaiveDate>,
    pub finalized_at: Option<i64>,
}

impl InvoiceState {
    pub fn new(invoice_id: impl Into<String>) -> Self {
        Self {
            invoice_id: invoice_id.into(),
            ..Default::default()
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized_at.is_some()
    }

    /// The overdue predicate. Detecting the date crossing is an
    /// external scheduler's job; this only answers the question.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        if self.status == InvoiceStatus::Paid || !self.is_finalized() {
            return false;
        }
        match self.due_date {
            Some(due) => due < today,
            None => false,
        }
    }
}

/// Materialized state of one stay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaySnapshot {
    pub stay_id: String,
    pub guest_id: String,
    pub guest_name: String,
    /// Currently assigned room (rewritten by room changes).
    pub room_id: String,
    pub room_name: String,
    pub room_type_id: String,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub num_adults: i32,
    pub num_children: i32,
    pub source: Option<String>,
    pub note: Option<String>,
    pub status: StayStatus,
    /// Price quoted at booking/update time; the invoice is the
    /// authoritative amount once finalized.
    pub quoted_total: f64,
    pub segments: Vec<RateSegment>,
    pub actual_check_in: Option<i64>,
    pub actual_check_out: Option<i64>,
    pub billable_nights: Option<i64>,
    pub cancel_reason: Option<String>,
    /// For cancelled/no-show stays: the instant their dates stop
    /// blocking availability (hold window policy).
    pub released_after: Option<i64>,
    pub invoice: Option<InvoiceState>,
    pub payments: Vec<PaymentRecord>,
    pub refunds: Vec<RefundRecord>,
    pub created_at: i64,
    pub updated_at: i64,
    pub last_sequence: u64,
    pub state_checksum: u64,
}

impl StaySnapshot {
    pub fn new(stay_id: String) -> Self {
        Self {
            stay_id,
            guest_id: String::new(),
            guest_name: String::new(),
            room_id: String::new(),
            room_name: String::new(),
            room_type_id: String::new(),
            check_in_date: NaiveDate::default(),
            check_out_date: NaiveDate::default(),
            num_adults: 0,
            num_children: 0,
            source: None,
            note: None,
            status: StayStatus::default(),
            quoted_total: 0.0,
            segments: Vec::new(),
            actual_check_in: None,
            actual_check_out: None,
            billable_nights: None,
            cancel_reason: None,
            released_after: None,
            invoice: None,
            payments: Vec::new(),
            refunds: Vec::new(),
            created_at: 0,
            updated_at: 0,
            last_sequence: 0,
            state_checksum: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_in_house(&self) -> bool {
        self.status == StayStatus::CheckedIn
    }

    /// Whether this stay blocks its room/date range at `now_millis`.
    /// Cancelled and no-show stays keep blocking until their hold
    /// window elapses; checked-out stays never block.
    pub fn blocks_availability(&self, now_millis: i64) -> bool {
        match self.status {
            StayStatus::Pending | StayStatus::Confirmed | StayStatus::CheckedIn => true,
            StayStatus::CheckedOut => false,
            StayStatus::Cancelled | StayStatus::NoShow => match self.released_after {
                Some(t) => now_millis < t,
                None => false,
            },
        }
    }

    /// The segment currently in force (last one).
    pub fn current_segment(&self) -> Option<&RateSegment> {
        self.segments.last()
    }

    /// The segment billing a given night: the last whose `from_date`
    /// is on or before it. Nights before the first segment starts
    /// (early check-in) bill at the first segment's rate.
    pub fn segment_for_night(&self, night: NaiveDate) -> Option<&RateSegment> {
        self.segments
            .iter()
            .rev()
            .find(|s| s.from_date <= night)
            .or_else(|| self.segments.first())
    }

    /// Compute a checksum over the financially relevant state.
    /// Used to detect divergence between replicas or replay drift.
    pub fn compute_checksum(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.stay_id.hash(&mut hasher);
        self.status.hash(&mut hasher);
        self.room_id.hash(&mut hasher);
        to_cents(self.quoted_total).hash(&mut hasher);
        if let Some(inv) = &self.invoice {
            inv.line_items.len().hash(&mut hasher);
            to_cents(inv.subtotal).hash(&mut hasher);
            to_cents(inv.tax_amount).hash(&mut hasher);
            to_cents(inv.discount_amount).hash(&mut hasher);
            to_cents(inv.total_amount).hash(&mut hasher);
        }
        self.payments.len().hash(&mut hasher);
        self.refunds.len().hash(&mut hasher);
        self.last_sequence.hash(&mut hasher);
        hasher.finish()
    }

    pub fn update_checksum(&mut self) {
        self.state_checksum = self.compute_checksum();
    }

    pub fn verify_checksum(&self) -> bool {
        self.state_checksum == self.compute_checksum()
    }
}

fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}
