//! Lookup enums shared by the site and the CLI.

use serde::{Deserialize, Serialize};

/// Why a room is blocked for a date range.
///
/// Discriminants match the ids seeded into the `restrictions` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum RestrictionKind {
    /// Blocked by a guest reservation.
    Reservation = 1,
    /// Blocked manually by the owner.
    OwnerBlock = 2,
}

impl RestrictionKind {
    pub const ALL: [Self; 2] = [Self::Reservation, Self::OwnerBlock];

    #[must_use]
    pub const fn id(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Reservation => "Reservation",
            Self::OwnerBlock => "Owner block",
        }
    }
}

/// An id that matches no known variant.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unknown {kind} id {id}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub id: i32,
}

impl TryFrom<i32> for RestrictionKind {
    type Error = UnknownVariant;

    fn try_from(id: i32) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(Self::Reservation),
            2 => Ok(Self::OwnerBlock),
            _ => Err(UnknownVariant {
                kind: "restriction",
                id,
            }),
        }
    }
}

/// Staff permission level, stored as an integer on `users.access_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum AccessLevel {
    /// Can view and process reservations.
    Staff = 1,
    /// Full access, including owner blocks.
    Admin = 3,
}

impl AccessLevel {
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for AccessLevel {
    type Error = UnknownVariant;

    fn try_from(id: i32) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(Self::Staff),
            3 => Ok(Self::Admin),
            _ => Err(UnknownVariant {
                kind: "access level",
                id,
            }),
        }
    }
}

impl std::str::FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "staff" => Ok(Self::Staff),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown access level: {other}")),
        }
    }
}
