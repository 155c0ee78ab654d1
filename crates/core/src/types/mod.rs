//! Core types for Lodge.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod stay;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use stay::{DateParseError, StayRange, StayRangeError, parse_date};
pub use status::{AccessLevel, RestrictionKind, UnknownVariant};
