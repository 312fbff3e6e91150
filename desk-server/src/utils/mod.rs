//! Utility modules: logging setup and calendar arithmetic.

pub mod logger;
pub mod time;

pub use time::{billable_nights, date_of_millis, nights_between};
