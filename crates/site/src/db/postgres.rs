//! `PostgreSQL` implementation of [`BookingRepository`].

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool};

use lodge_core::{
    AccessLevel, Email, ReservationId, RestrictionKind, RoomId, RoomRestrictionId, StayRange,
    UserId,
};

use super::{BookingRepository, RepositoryError, with_timeout};
use crate::models::{
    GuestDetails, NewReservation, NewRoomRestriction, NewUser, Reservation, ReservationFilter,
    Room, RoomRestriction, User,
};

const ROOM_COLUMNS: &str = "id, room_name, description, shower, minibar, pricing_id, created_at, updated_at";

const RESERVATION_SELECT: &str = r"
    SELECT r.id, r.first_name, r.last_name, r.email, r.phone, r.start_date, r.end_date,
           r.room_id, rm.room_name, r.processed, r.created_at, r.updated_at
    FROM reservations r
    JOIN rooms rm ON rm.id = r.room_id
";

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, password, access_level, created_at, updated_at";

/// Repository backed by a `PgPool`. Every call is bounded by
/// [`super::QUERY_TIMEOUT`].
#[derive(Clone)]
pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// =============================================================================
// Row types
// =============================================================================

#[derive(sqlx::FromRow)]
struct RoomRow {
    id: i32,
    room_name: String,
    description: String,
    shower: bool,
    minibar: bool,
    pricing_id: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RoomRow> for Room {
    fn from(r: RoomRow) -> Self {
        Self {
            id: RoomId::new(r.id),
            name: r.room_name,
            description: r.description,
            shower: r.shower,
            minibar: r.minibar,
            pricing_id: r.pricing_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: i32,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    room_id: i32,
    room_name: String,
    processed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = RepositoryError;

    fn try_from(r: ReservationRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email on reservation {}: {e}", r.id))
        })?;
        let stay = stay_from_row(r.start_date, r.end_date)?;

        Ok(Self {
            id: ReservationId::new(r.id),
            guest: GuestDetails {
                first_name: r.first_name,
                last_name: r.last_name,
                email,
                phone: r.phone,
            },
            stay,
            room_id: RoomId::new(r.room_id),
            room_name: r.room_name,
            processed: r.processed,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RestrictionRow {
    id: i32,
    room_id: i32,
    reservation_id: Option<i32>,
    restriction_id: i32,
    start_date: NaiveDate,
    end_date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl TryFrom<RestrictionRow> for RoomRestriction {
    type Error = RepositoryError;

    fn try_from(r: RestrictionRow) -> Result<Self, Self::Error> {
        let kind = RestrictionKind::try_from(r.restriction_id)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        Ok(Self {
            id: RoomRestrictionId::new(r.id),
            room_id: RoomId::new(r.room_id),
            reservation_id: r.reservation_id.map(ReservationId::new),
            kind,
            stay: stay_from_row(r.start_date, r.end_date)?,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i32,
    first_name: String,
    last_name: String,
    email: String,
    password: String,
    access_level: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user_and_hash(self) -> Result<(User, String), RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let access_level = AccessLevel::try_from(self.access_level)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        let user = User {
            id: UserId::new(self.id),
            first_name: self.first_name,
            last_name: self.last_name,
            email,
            access_level,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        Ok((user, self.password))
    }
}

fn stay_from_row(start: NaiveDate, end: NaiveDate) -> Result<StayRange, RepositoryError> {
    StayRange::new(start, end).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid stay {start}..{end}: {e}"))
    })
}

/// Map constraint violations onto domain errors.
fn map_constraint(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return RepositoryError::Conflict(db.message().to_string());
        }
        if db.is_foreign_key_violation() {
            return RepositoryError::NotFound;
        }
    }
    RepositoryError::Database(err)
}

// =============================================================================
// Transaction helpers
// =============================================================================

/// Lock the room row so concurrent bookings of the same room queue up.
async fn lock_room(conn: &mut PgConnection, room_id: RoomId) -> Result<(), RepositoryError> {
    sqlx::query_scalar::<_, i32>("SELECT id FROM rooms WHERE id = $1 FOR UPDATE")
        .bind(room_id)
        .fetch_optional(conn)
        .await?
        .map(|_| ())
        .ok_or(RepositoryError::NotFound)
}

async fn has_overlap(
    conn: &mut PgConnection,
    room_id: RoomId,
    stay: StayRange,
) -> Result<bool, RepositoryError> {
    let overlap = sqlx::query_scalar::<_, bool>(
        r"
        SELECT EXISTS (
            SELECT 1 FROM room_restrictions
            WHERE room_id = $1 AND $2 < end_date AND $3 > start_date
        )
        ",
    )
    .bind(room_id)
    .bind(stay.start())
    .bind(stay.end())
    .fetch_one(conn)
    .await?;
    Ok(overlap)
}

async fn insert_reservation_row(
    conn: &mut PgConnection,
    reservation: &NewReservation,
) -> Result<ReservationId, RepositoryError> {
    let guest = &reservation.guest;
    let id = sqlx::query_scalar::<_, i32>(
        r"
        INSERT INTO reservations (first_name, last_name, email, phone, start_date, end_date, room_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        ",
    )
    .bind(&guest.first_name)
    .bind(&guest.last_name)
    .bind(&guest.email)
    .bind(&guest.phone)
    .bind(reservation.stay.start())
    .bind(reservation.stay.end())
    .bind(reservation.room_id)
    .fetch_one(conn)
    .await
    .map_err(map_constraint)?;
    Ok(ReservationId::new(id))
}

async fn insert_restriction_row(
    conn: &mut PgConnection,
    restriction: &NewRoomRestriction,
) -> Result<RoomRestrictionId, RepositoryError> {
    let id = sqlx::query_scalar::<_, i32>(
        r"
        INSERT INTO room_restrictions (start_date, end_date, room_id, reservation_id, restriction_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        ",
    )
    .bind(restriction.stay.start())
    .bind(restriction.stay.end())
    .bind(restriction.room_id)
    .bind(restriction.reservation_id)
    .bind(restriction.kind.id())
    .fetch_one(conn)
    .await
    .map_err(map_constraint)?;
    Ok(RoomRestrictionId::new(id))
}

// =============================================================================
// Repository
// =============================================================================

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn ping(&self) -> Result<(), RepositoryError> {
        with_timeout(async {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok::<_, RepositoryError>(())
        })
        .await
    }

    async fn all_rooms(&self) -> Result<Vec<Room>, RepositoryError> {
        with_timeout(async {
            let rows = sqlx::query_as::<_, RoomRow>(&format!(
                "SELECT {ROOM_COLUMNS} FROM rooms ORDER BY room_name"
            ))
            .fetch_all(&self.pool)
            .await?;
            Ok::<_, RepositoryError>(rows.into_iter().map(Room::from).collect())
        })
        .await
    }

    async fn get_room(&self, id: RoomId) -> Result<Option<Room>, RepositoryError> {
        with_timeout(async {
            let row = sqlx::query_as::<_, RoomRow>(&format!(
                "SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
            Ok::<_, RepositoryError>(row.map(Room::from))
        })
        .await
    }

    async fn search_availability_for_room(
        &self,
        room_id: RoomId,
        stay: StayRange,
    ) -> Result<bool, RepositoryError> {
        with_timeout(async {
            let mut conn = self.pool.acquire().await?;
            Ok::<_, RepositoryError>(!has_overlap(&mut conn, room_id, stay).await?)
        })
        .await
    }

    async fn search_availability_for_all_rooms(
        &self,
        stay: StayRange,
    ) -> Result<Vec<Room>, RepositoryError> {
        with_timeout(async {
            let rows = sqlx::query_as::<_, RoomRow>(&format!(
                r"
                SELECT {ROOM_COLUMNS} FROM rooms
                WHERE id NOT IN (
                    SELECT room_id FROM room_restrictions
                    WHERE $1 < end_date AND $2 > start_date
                )
                ORDER BY room_name
                "
            ))
            .bind(stay.start())
            .bind(stay.end())
            .fetch_all(&self.pool)
            .await?;
            Ok::<_, RepositoryError>(rows.into_iter().map(Room::from).collect())
        })
        .await
    }

    async fn insert_reservation(
        &self,
        reservation: &NewReservation,
    ) -> Result<ReservationId, RepositoryError> {
        with_timeout(async {
            let mut conn = self.pool.acquire().await?;
            insert_reservation_row(&mut conn, reservation).await
        })
        .await
    }

    async fn insert_room_restriction(
        &self,
        restriction: &NewRoomRestriction,
    ) -> Result<RoomRestrictionId, RepositoryError> {
        with_timeout(async {
            let mut conn = self.pool.acquire().await?;
            insert_restriction_row(&mut conn, restriction).await
        })
        .await
    }

    async fn create_booking(
        &self,
        reservation: &NewReservation,
    ) -> Result<ReservationId, RepositoryError> {
        // Dropping the transaction on timeout or error rolls it back.
        with_timeout(async {
            let mut tx = self.pool.begin().await?;
            lock_room(&mut tx, reservation.room_id).await?;
            if has_overlap(&mut tx, reservation.room_id, reservation.stay).await? {
                return Err(RepositoryError::Conflict(format!(
                    "room {} is not available for {}",
                    reservation.room_id, reservation.stay
                )));
            }
            let id = insert_reservation_row(&mut tx, reservation).await?;
            insert_restriction_row(
                &mut tx,
                &NewRoomRestriction::for_reservation(id, reservation.room_id, reservation.stay),
            )
            .await?;
            tx.commit().await?;
            Ok(id)
        })
        .await
    }

    async fn get_reservation(
        &self,
        id: ReservationId,
    ) -> Result<Option<Reservation>, RepositoryError> {
        with_timeout(async {
            let row = sqlx::query_as::<_, ReservationRow>(&format!(
                "{RESERVATION_SELECT} WHERE r.id = $1"
            ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
            row.map(Reservation::try_from).transpose()
        })
        .await
    }

    async fn list_reservations(
        &self,
        filter: ReservationFilter,
    ) -> Result<Vec<Reservation>, RepositoryError> {
        let clause = match filter {
            ReservationFilter::New => "WHERE r.processed = FALSE",
            ReservationFilter::All => "",
        };
        with_timeout(async {
            let rows = sqlx::query_as::<_, ReservationRow>(&format!(
                "{RESERVATION_SELECT} {clause} ORDER BY r.start_date, r.id"
            ))
            .fetch_all(&self.pool)
            .await?;
            rows.into_iter()
                .map(Reservation::try_from)
                .collect::<Result<Vec<_>, _>>()
        })
        .await
    }

    async fn update_reservation_guest(
        &self,
        id: ReservationId,
        guest: &GuestDetails,
    ) -> Result<(), RepositoryError> {
        with_timeout(async {
            let result = sqlx::query(
                r"
                UPDATE reservations
                SET first_name = $1, last_name = $2, email = $3, phone = $4, updated_at = NOW()
                WHERE id = $5
                ",
            )
            .bind(&guest.first_name)
            .bind(&guest.last_name)
            .bind(&guest.email)
            .bind(&guest.phone)
            .bind(id)
            .execute(&self.pool)
            .await?;
            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn set_processed(
        &self,
        id: ReservationId,
        processed: bool,
    ) -> Result<(), RepositoryError> {
        with_timeout(async {
            let result = sqlx::query(
                "UPDATE reservations SET processed = $1, updated_at = NOW() WHERE id = $2",
            )
            .bind(processed)
            .bind(id)
            .execute(&self.pool)
            .await?;
            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn delete_reservation(&self, id: ReservationId) -> Result<(), RepositoryError> {
        // room_restrictions.reservation_id cascades
        with_timeout(async {
            let result = sqlx::query("DELETE FROM reservations WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn restrictions_for_room(
        &self,
        room_id: RoomId,
        range: StayRange,
    ) -> Result<Vec<RoomRestriction>, RepositoryError> {
        with_timeout(async {
            let rows = sqlx::query_as::<_, RestrictionRow>(
                r"
                SELECT id, room_id, reservation_id, restriction_id, start_date, end_date, created_at
                FROM room_restrictions
                WHERE room_id = $1 AND $2 < end_date AND $3 > start_date
                ORDER BY start_date
                ",
            )
            .bind(room_id)
            .bind(range.start())
            .bind(range.end())
            .fetch_all(&self.pool)
            .await?;
            rows.into_iter()
                .map(RoomRestriction::try_from)
                .collect::<Result<Vec<_>, _>>()
        })
        .await
    }

    async fn add_owner_block(
        &self,
        room_id: RoomId,
        stay: StayRange,
    ) -> Result<RoomRestrictionId, RepositoryError> {
        with_timeout(async {
            let mut tx = self.pool.begin().await?;
            lock_room(&mut tx, room_id).await?;
            if has_overlap(&mut tx, room_id, stay).await? {
                return Err(RepositoryError::Conflict(format!(
                    "room {room_id} is already blocked during {stay}"
                )));
            }
            let id =
                insert_restriction_row(&mut tx, &NewRoomRestriction::owner_block(room_id, stay))
                    .await?;
            tx.commit().await?;
            Ok(id)
        })
        .await
    }

    async fn delete_owner_block(&self, id: RoomRestrictionId) -> Result<(), RepositoryError> {
        with_timeout(async {
            let result =
                sqlx::query("DELETE FROM room_restrictions WHERE id = $1 AND restriction_id = $2")
                    .bind(id)
                    .bind(RestrictionKind::OwnerBlock.id())
                    .execute(&self.pool)
                    .await?;
            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        with_timeout(async {
            let row = sqlx::query_as::<_, UserRow>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
            row.map(|r| r.into_user_and_hash().map(|(user, _)| user))
                .transpose()
        })
        .await
    }

    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        with_timeout(async {
            let row = sqlx::query_as::<_, UserRow>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
            ))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
            row.map(UserRow::into_user_and_hash).transpose()
        })
        .await
    }

    async fn create_user(&self, user: &NewUser) -> Result<UserId, RepositoryError> {
        with_timeout(async {
            let id = sqlx::query_scalar::<_, i32>(
                r"
                INSERT INTO users (first_name, last_name, email, password, access_level)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                ",
            )
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.access_level.as_i32())
            .fetch_one(&self.pool)
            .await
            .map_err(map_constraint)?;
            Ok::<_, RepositoryError>(UserId::new(id))
        })
        .await
    }
}
