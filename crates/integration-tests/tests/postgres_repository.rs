//! `PgBookingRepository` against a real database.
//!
//! These tests require a running `PostgreSQL` database. They apply the
//! migrations themselves and work on rooms created per test, so they can
//! share a database with a development install.
//!
//! Run with:
//!
//! ```bash
//! LODGE_TEST_DATABASE_URL=postgres://localhost/lodge_test \
//!     cargo test -p lodge-integration-tests --test postgres_repository -- --ignored
//! ```

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use secrecy::SecretString;
use sqlx::PgPool;
use uuid::Uuid;

use lodge_core::{AccessLevel, Email, RestrictionKind, RoomId, StayRange};
use lodge_site::db::{BookingRepository, PgBookingRepository, RepositoryError, create_pool};
use lodge_site::models::{GuestDetails, NewReservation, NewRoomRestriction, NewUser};

fn database_url() -> SecretString {
    std::env::var("LODGE_TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("LODGE_TEST_DATABASE_URL or DATABASE_URL must be set")
        .into()
}

async fn repository() -> PgBookingRepository {
    let pool = create_pool(&database_url()).await.unwrap();
    sqlx::migrate!("../site/migrations").run(&pool).await.unwrap();
    PgBookingRepository::new(pool)
}

/// A room with a unique name; removed again by [`drop_room`].
async fn create_room(pool: &PgPool) -> RoomId {
    let name = format!("Test Room {}", Uuid::new_v4());
    let id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO rooms (room_name, description) VALUES ($1, 'test') RETURNING id",
    )
    .bind(name)
    .fetch_one(pool)
    .await
    .unwrap();
    RoomId::new(id)
}

async fn drop_room(pool: &PgPool, room_id: RoomId) {
    sqlx::query("DELETE FROM reservations WHERE room_id = $1")
        .bind(room_id)
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("DELETE FROM rooms WHERE id = $1")
        .bind(room_id)
        .execute(pool)
        .await
        .unwrap();
}

async fn count(pool: &PgPool, sql: &str, room_id: RoomId) -> i64 {
    sqlx::query_scalar::<_, i64>(sql)
        .bind(room_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

fn stay(start: &str, end: &str) -> StayRange {
    StayRange::parse(start, end).unwrap()
}

fn booking(room_id: RoomId, stay: StayRange) -> NewReservation {
    NewReservation {
        guest: GuestDetails {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: Email::parse("ada@example.com").unwrap(),
            phone: "555-0100".to_string(),
        },
        room_id,
        stay,
    }
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_overlap_uses_half_open_ranges() {
    let repo = repository().await;
    let room = create_room(repo.pool()).await;
    repo.create_booking(&booking(room, stay("2031-06-10", "2031-06-15")))
        .await
        .unwrap();

    let cases = [
        // Touching either end is free
        ("2031-06-15", "2031-06-18", true),
        ("2031-06-05", "2031-06-10", true),
        // Any shared night is not
        ("2031-06-14", "2031-06-16", false),
        ("2031-06-08", "2031-06-11", false),
        ("2031-06-11", "2031-06-12", false),
        ("2031-06-01", "2031-06-30", false),
    ];
    for (start, end, free) in cases {
        let s = stay(start, end);
        assert_eq!(
            repo.search_availability_for_room(room, s).await.unwrap(),
            free,
            "{s}"
        );
        let listed = repo
            .search_availability_for_all_rooms(s)
            .await
            .unwrap()
            .iter()
            .any(|r| r.id == room);
        assert_eq!(listed, free, "{s}");
    }

    drop_room(repo.pool(), room).await;
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_booking_conflict_leaves_no_rows() {
    let repo = repository().await;
    let room = create_room(repo.pool()).await;
    let first = repo
        .create_booking(&booking(room, stay("2031-07-01", "2031-07-05")))
        .await
        .unwrap();

    let err = repo
        .create_booking(&booking(room, stay("2031-07-04", "2031-07-06")))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));

    let reservations = count(
        repo.pool(),
        "SELECT COUNT(*) FROM reservations WHERE room_id = $1",
        room,
    )
    .await;
    let restrictions = count(
        repo.pool(),
        "SELECT COUNT(*) FROM room_restrictions WHERE room_id = $1",
        room,
    )
    .await;
    assert_eq!((reservations, restrictions), (1, 1));

    let stored = repo.get_reservation(first).await.unwrap().unwrap();
    assert_eq!(stored.guest, booking(room, stored.stay).guest);
    assert!(!stored.processed);

    drop_room(repo.pool(), room).await;
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_concurrent_bookings_admit_one() {
    let repo = Arc::new(repository().await);
    let room = create_room(repo.pool()).await;
    let s = stay("2031-08-01", "2031-08-03");

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move { repo.create_booking(&booking(room, s)).await })
        })
        .collect();

    let mut booked = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => booked += 1,
            Err(RepositoryError::Conflict(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(booked, 1);

    drop_room(repo.pool(), room).await;
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_delete_reservation_cascades_and_frees_room() {
    let repo = repository().await;
    let room = create_room(repo.pool()).await;
    let s = stay("2031-09-01", "2031-09-04");
    let id = repo.create_booking(&booking(room, s)).await.unwrap();
    assert!(!repo.search_availability_for_room(room, s).await.unwrap());

    repo.delete_reservation(id).await.unwrap();

    assert!(repo.search_availability_for_room(room, s).await.unwrap());
    assert_eq!(
        count(
            repo.pool(),
            "SELECT COUNT(*) FROM room_restrictions WHERE room_id = $1",
            room
        )
        .await,
        0
    );
    assert!(matches!(
        repo.delete_reservation(id).await,
        Err(RepositoryError::NotFound)
    ));

    drop_room(repo.pool(), room).await;
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_only_owner_blocks_can_be_removed() {
    let repo = repository().await;
    let room = create_room(repo.pool()).await;
    repo.create_booking(&booking(room, stay("2031-10-01", "2031-10-03")))
        .await
        .unwrap();
    let block = repo
        .add_owner_block(room, stay("2031-10-03", "2031-10-06"))
        .await
        .unwrap();

    assert!(matches!(
        repo.add_owner_block(room, stay("2031-10-05", "2031-10-07")).await,
        Err(RepositoryError::Conflict(_))
    ));

    let restrictions = repo
        .restrictions_for_room(room, stay("2031-10-01", "2031-11-01"))
        .await
        .unwrap();
    assert_eq!(restrictions.len(), 2);
    let reserved = restrictions
        .iter()
        .find(|r| r.kind == RestrictionKind::Reservation)
        .unwrap();
    assert!(reserved.reservation_id.is_some());

    assert!(matches!(
        repo.delete_owner_block(reserved.id).await,
        Err(RepositoryError::NotFound)
    ));
    repo.delete_owner_block(block).await.unwrap();
    assert!(
        repo.search_availability_for_room(room, stay("2031-10-03", "2031-10-06"))
            .await
            .unwrap()
    );

    drop_room(repo.pool(), room).await;
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_primitive_inserts_round_trip() {
    let repo = repository().await;
    let room = create_room(repo.pool()).await;
    let s = stay("2031-11-01", "2031-11-03");
    let new = booking(room, s);

    let id = repo.insert_reservation(&new).await.unwrap();
    let stored = repo.get_reservation(id).await.unwrap().unwrap();
    assert_eq!(stored.guest, new.guest);
    assert_eq!(stored.stay, s);
    assert_eq!(stored.room_id, room);
    assert!(repo.search_availability_for_room(room, s).await.unwrap());

    repo.insert_room_restriction(&NewRoomRestriction::for_reservation(id, room, s))
        .await
        .unwrap();
    assert!(!repo.search_availability_for_room(room, s).await.unwrap());

    drop_room(repo.pool(), room).await;
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_staff_accounts() {
    let repo = repository().await;
    let email = Email::parse(&format!("staff-{}@lodge.test", Uuid::new_v4())).unwrap();
    let new = NewUser {
        first_name: "Ada".to_string(),
        last_name: "Owner".to_string(),
        email: email.clone(),
        password_hash: "not-a-real-hash".to_string(),
        access_level: AccessLevel::Admin,
    };

    let id = repo.create_user(&new).await.unwrap();
    assert!(matches!(
        repo.create_user(&new).await,
        Err(RepositoryError::Conflict(_))
    ));

    let user = repo.get_user(id).await.unwrap().unwrap();
    assert_eq!(user.email, email);
    assert_eq!(user.access_level, AccessLevel::Admin);
    let (found, hash) = repo.find_credentials(&email).await.unwrap().unwrap();
    assert_eq!(found.id, id);
    assert_eq!(hash, "not-a-real-hash");

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(repo.pool())
        .await
        .unwrap();
    assert!(repo.get_user(id).await.unwrap().is_none());
}
