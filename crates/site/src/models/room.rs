//! Rooms offered for booking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lodge_core::RoomId;

/// A bookable room. Reference data seeded by the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub description: String,
    pub shower: bool,
    pub minibar: bool,
    /// Rate card reference; pricing itself lives outside this system.
    pub pricing_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    /// Human readable amenity list, e.g. `"Shower, Minibar"`.
    #[must_use]
    pub fn amenities(&self) -> String {
        let mut list = Vec::new();
        if self.shower {
            list.push("Shower");
        }
        if self.minibar {
            list.push("Minibar");
        }
        if list.is_empty() {
            "None".to_string()
        } else {
            list.join(", ")
        }
    }
}
