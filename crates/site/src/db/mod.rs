//! Persistence for rooms, reservations, restrictions and staff.
//!
//! # Tables
//!
//! - `rooms` - Bookable rooms (seeded reference data)
//! - `restrictions` - Restriction kinds (1 = reservation, 2 = owner block)
//! - `reservations` - Guest bookings
//! - `room_restrictions` - Date ranges blocking a room; availability queries run here
//! - `users` - Staff accounts
//! - `tower_sessions.session` - Session storage (owned by `tower-sessions-sqlx-store`)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/site/migrations/` and run via:
//! ```bash
//! cargo run -p lodge-cli -- migrate
//! ```
//!
//! Handlers talk to the [`BookingRepository`] trait. [`PgBookingRepository`]
//! is the production store; [`MemoryBookingRepository`] backs tests and
//! local demos.

mod memory;
mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use lodge_core::{Email, ReservationId, RoomId, RoomRestrictionId, StayRange, UserId};

use crate::models::{
    GuestDetails, NewReservation, NewRoomRestriction, NewUser, Reservation, ReservationFilter,
    Room, RoomRestriction, User,
};

pub use memory::MemoryBookingRepository;
pub use postgres::PgBookingRepository;

/// Upper bound on any single repository call.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Errors that can occur during repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., overlapping stay, duplicate email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The call did not finish within [`QUERY_TIMEOUT`].
    #[error("query timed out after {}s", QUERY_TIMEOUT.as_secs())]
    Timeout,
}

/// Rooms, reservations and availability.
///
/// Availability treats stays as half-open `[start, end)` ranges: a room is
/// free unless some restriction satisfies `start < r.end AND end > r.start`.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Round-trip to the store, used by the readiness probe.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// All rooms ordered by name.
    async fn all_rooms(&self) -> Result<Vec<Room>, RepositoryError>;

    async fn get_room(&self, id: RoomId) -> Result<Option<Room>, RepositoryError>;

    /// Whether `room_id` has no restriction overlapping `stay`.
    async fn search_availability_for_room(
        &self,
        room_id: RoomId,
        stay: StayRange,
    ) -> Result<bool, RepositoryError>;

    /// Rooms with no restriction overlapping `stay`, ordered by name.
    async fn search_availability_for_all_rooms(
        &self,
        stay: StayRange,
    ) -> Result<Vec<Room>, RepositoryError>;

    /// Insert a reservation row without touching restrictions.
    async fn insert_reservation(
        &self,
        reservation: &NewReservation,
    ) -> Result<ReservationId, RepositoryError>;

    /// Insert a restriction row without checking for overlaps.
    async fn insert_room_restriction(
        &self,
        restriction: &NewRoomRestriction,
    ) -> Result<RoomRestrictionId, RepositoryError>;

    /// Book a room atomically.
    ///
    /// Re-checks availability, inserts the reservation and its restriction
    /// together, and fails with [`RepositoryError::Conflict`] if the stay
    /// overlaps an existing restriction. Concurrent bookings of the same room
    /// are serialized.
    async fn create_booking(
        &self,
        reservation: &NewReservation,
    ) -> Result<ReservationId, RepositoryError>;

    async fn get_reservation(
        &self,
        id: ReservationId,
    ) -> Result<Option<Reservation>, RepositoryError>;

    /// Reservations matching `filter`, ordered by arrival date.
    async fn list_reservations(
        &self,
        filter: ReservationFilter,
    ) -> Result<Vec<Reservation>, RepositoryError>;

    /// Replace the guest fields of a reservation.
    async fn update_reservation_guest(
        &self,
        id: ReservationId,
        guest: &GuestDetails,
    ) -> Result<(), RepositoryError>;

    async fn set_processed(&self, id: ReservationId, processed: bool)
    -> Result<(), RepositoryError>;

    /// Delete a reservation and, with it, its restriction.
    async fn delete_reservation(&self, id: ReservationId) -> Result<(), RepositoryError>;

    /// Restrictions on `room_id` overlapping `range`, earliest first.
    async fn restrictions_for_room(
        &self,
        room_id: RoomId,
        range: StayRange,
    ) -> Result<Vec<RoomRestriction>, RepositoryError>;

    /// Add an owner block, failing with [`RepositoryError::Conflict`] if it
    /// overlaps an existing restriction.
    async fn add_owner_block(
        &self,
        room_id: RoomId,
        stay: StayRange,
    ) -> Result<RoomRestrictionId, RepositoryError>;

    /// Remove an owner block. Reservation restrictions are left alone and
    /// reported as [`RepositoryError::NotFound`].
    async fn delete_owner_block(&self, id: RoomRestrictionId) -> Result<(), RepositoryError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// A staff account and its password hash, for sign-in.
    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Create a staff account, failing with [`RepositoryError::Conflict`] on a
    /// duplicate email.
    async fn create_user(&self, user: &NewUser) -> Result<UserId, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Bound `fut` by [`QUERY_TIMEOUT`].
pub(crate) async fn with_timeout<T>(
    fut: impl Future<Output = Result<T, RepositoryError>>,
) -> Result<T, RepositoryError> {
    tokio::time::timeout(QUERY_TIMEOUT, fut)
        .await
        .map_err(|_| RepositoryError::Timeout)?
}
