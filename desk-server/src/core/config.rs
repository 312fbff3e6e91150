use std::str::FromStr;

/// Which room's rate bills the night of a mid-stay room change.
///
/// The guest sleeps in the new room that night, so `NewRoomRate` makes
/// the new segment effective from the change date. `OldRoomRate` keeps
/// the change night on the old room's rate and starts the new segment
/// the following day. There is no partial-night proration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeDayBilling {
    #[default]
    NewRoomRate,
    OldRoomRate,
}

impl FromStr for ChangeDayBilling {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new_room_rate" | "new" => Ok(ChangeDayBilling::NewRoomRate),
            "old_room_rate" | "old" => Ok(ChangeDayBilling::OldRoomRate),
            other => Err(format!("unknown change-day billing policy: {}", other)),
        }
    }
}

/// Business policy knobs injected into command handlers.
#[derive(Debug, Clone, Copy)]
pub struct StayPolicy {
    /// Hours a cancelled or no-show stay keeps blocking its dates.
    /// 0 releases the room immediately.
    pub hold_window_hours: i64,
    /// Days between checkout and the finalized invoice's due date.
    pub invoice_due_days: i64,
    /// Rate side billed for the night of a room change.
    pub change_day_billing: ChangeDayBilling,
}

impl Default for StayPolicy {
    fn default() -> Self {
        Self {
            hold_window_hours: 0,
            invoice_due_days: 14,
            change_day_billing: ChangeDayBilling::default(),
        }
    }
}

/// Engine configuration.
///
/// # Environment variables
///
/// Every setting can be overridden through the environment:
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | /var/lib/desk-server | Working directory (database, logs) |
/// | ENVIRONMENT | development | development \| staging \| production |
/// | REQUEST_TIMEOUT_MS | 30000 | Command processing timeout (ms) |
/// | HOLD_WINDOW_HOURS | 0 | Cancelled/no-show availability hold |
/// | INVOICE_DUE_DAYS | 14 | Due date offset applied at finalization |
/// | CHANGE_DAY_BILLING | new_room_rate | new_room_rate \| old_room_rate |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/data/frontdesk HOLD_WINDOW_HOURS=24 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory holding the database and log files.
    pub work_dir: String,
    /// Runtime environment: development | staging | production.
    pub environment: String,
    /// Command processing timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Business policy knobs.
    pub policy: StayPolicy,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR")
                .unwrap_or_else(|_| "/var/lib/desk-server".into()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30000),
            policy: StayPolicy {
                hold_window_hours: std::env::var("HOLD_WINDOW_HOURS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0),
                invoice_due_days: std::env::var("INVOICE_DUE_DAYS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(14),
                change_day_billing: std::env::var("CHANGE_DAY_BILLING")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_default(),
            },
        }
    }

    /// Override the working directory and policy, keeping everything
    /// else from the environment. Used by tests.
    pub fn with_overrides(work_dir: impl Into<String>, policy: StayPolicy) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.policy = policy;
        config
    }

    /// Path of the redb database file.
    pub fn db_path(&self) -> String {
        format!("{}/stays.redb", self.work_dir)
    }

    /// Directory for rolling log files.
    pub fn log_dir(&self) -> String {
        format!("{}/logs", self.work_dir)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
