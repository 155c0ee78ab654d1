//! Reservations and the room restrictions that block availability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lodge_core::{
    Email, ReservationId, RestrictionKind, RoomId, RoomRestrictionId, StayRange,
};

/// Who the booking is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: String,
}

impl GuestDetails {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Input for creating a reservation.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub guest: GuestDetails,
    pub room_id: RoomId,
    pub stay: StayRange,
}

/// A stored reservation, joined with its room name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub id: ReservationId,
    pub guest: GuestDetails,
    pub stay: StayRange,
    pub room_id: RoomId,
    pub room_name: String,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A date range during which a room cannot be booked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRestriction {
    pub id: RoomRestrictionId,
    pub room_id: RoomId,
    /// Set when `kind` is [`RestrictionKind::Reservation`].
    pub reservation_id: Option<ReservationId>,
    pub kind: RestrictionKind,
    pub stay: StayRange,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a room restriction.
#[derive(Debug, Clone, Copy)]
pub struct NewRoomRestriction {
    pub room_id: RoomId,
    pub reservation_id: Option<ReservationId>,
    pub kind: RestrictionKind,
    pub stay: StayRange,
}

impl NewRoomRestriction {
    /// The restriction recorded for a freshly inserted reservation.
    #[must_use]
    pub const fn for_reservation(id: ReservationId, room_id: RoomId, stay: StayRange) -> Self {
        Self {
            room_id,
            reservation_id: Some(id),
            kind: RestrictionKind::Reservation,
            stay,
        }
    }

    #[must_use]
    pub const fn owner_block(room_id: RoomId, stay: StayRange) -> Self {
        Self {
            room_id,
            reservation_id: None,
            kind: RestrictionKind::OwnerBlock,
            stay,
        }
    }
}

/// Which reservations an admin list shows.
///
/// Also carried in admin URLs as `new` or `all` so pages can link back to the
/// list they came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationFilter {
    /// Not yet processed.
    New,
    All,
}

impl ReservationFilter {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::All => "all",
        }
    }

    #[must_use]
    pub fn matches(self, reservation: &Reservation) -> bool {
        match self {
            Self::New => !reservation.processed,
            Self::All => true,
        }
    }
}

impl std::fmt::Display for ReservationFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
