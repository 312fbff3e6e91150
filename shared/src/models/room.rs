//! Room catalog model.
//!
//! A room's `status` is the physical side of the paired stay/room state
//! machine. It is only ever mutated by the stay lifecycle (check-in,
//! room change, check-out) or by the explicit housekeeping operations.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Physical room status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    #[default]
    Available,
    Occupied,
    Cleaning,
    Maintenance,
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoomStatus::Available => write!(f, "available"),
            RoomStatus::Occupied => write!(f, "occupied"),
            RoomStatus::Cleaning => write!(f, "cleaning"),
            RoomStatus::Maintenance => write!(f, "maintenance"),
        }
    }
}

/// A bookable room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    /// Display name, e.g. "101".
    pub name: String,
    pub room_type_id: String,
    pub room_type_name: String,
    /// Nightly base price before any pricing rule.
    pub base_price: f64,
    pub floor: Option<i32>,
    /// Maximum guests (adults + children); None means unrestricted.
    pub max_occupancy: Option<i32>,
    pub status: RoomStatus,
    /// Set when the room is parked in maintenance.
    pub status_reason: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Room {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        room_type_id: impl Into<String>,
        room_type_name: impl Into<String>,
        base_price: f64,
    ) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: id.into(),
            name: name.into(),
            room_type_id: room_type_id.into(),
            room_type_name: room_type_name.into(),
            base_price,
            floor: None,
            max_occupancy: None,
            status: RoomStatus::Available,
            status_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == RoomStatus::Available
    }
}
