//! Session-related types.
//!
//! Types stored in the visitor's server-side session.

use serde::{Deserialize, Serialize};

use lodge_core::{AccessLevel, Email, ReservationId, RoomId, StayRange, UserId};

use super::{GuestDetails, User};

/// An in-progress booking.
///
/// Created when the visitor picks dates, completed with a room and guest
/// details, and removed once the summary page has been shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationDraft {
    pub stay: StayRange,
    pub room_id: Option<RoomId>,
    pub room_name: Option<String>,
    pub guest: Option<GuestDetails>,
    /// Set once the booking has been stored.
    pub reservation_id: Option<ReservationId>,
}

impl ReservationDraft {
    #[must_use]
    pub const fn new(stay: StayRange) -> Self {
        Self {
            stay,
            room_id: None,
            room_name: None,
            guest: None,
            reservation_id: None,
        }
    }

    #[must_use]
    pub const fn for_room(stay: StayRange, room_id: RoomId) -> Self {
        Self {
            stay,
            room_id: Some(room_id),
            room_name: None,
            guest: None,
            reservation_id: None,
        }
    }
}

/// Session-stored staff identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentStaff {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub access_level: AccessLevel,
}

impl From<&User> for CurrentStaff {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: format!("{} {}", user.first_name, user.last_name),
            access_level: user.access_level,
        }
    }
}

/// Session keys.
pub mod keys {
    /// The visitor's [`super::ReservationDraft`].
    pub const RESERVATION: &str = "reservation";

    /// The signed-in [`super::CurrentStaff`].
    pub const CURRENT_STAFF: &str = "current_staff";

    /// Per-session CSRF token.
    pub const CSRF_TOKEN: &str = "csrf_token";

    /// One-shot success message.
    pub const FLASH: &str = "flash";

    /// One-shot error message.
    pub const ERROR: &str = "error";

    /// One-shot warning message.
    pub const WARNING: &str = "warning";
}
