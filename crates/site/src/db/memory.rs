//! In-process [`BookingRepository`] for tests and local demos.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use lodge_core::{
    Email, ReservationId, RestrictionKind, RoomId, RoomRestrictionId, StayRange, UserId,
};

use super::{BookingRepository, RepositoryError};
use crate::models::{
    GuestDetails, NewReservation, NewRoomRestriction, NewUser, Reservation, ReservationFilter,
    Room, RoomRestriction, User,
};

/// Repository holding everything behind one async mutex.
///
/// Holding the lock across check and insert gives [`Self::create_booking`]
/// the same all-or-nothing behaviour as the `PostgreSQL` transaction.
#[derive(Default)]
pub struct MemoryBookingRepository {
    data: Mutex<Data>,
}

#[derive(Default)]
struct Data {
    rooms: BTreeMap<i32, Room>,
    reservations: BTreeMap<i32, StoredReservation>,
    restrictions: BTreeMap<i32, RoomRestriction>,
    users: BTreeMap<i32, (User, String)>,
    next_id: i32,
}

struct StoredReservation {
    id: ReservationId,
    guest: GuestDetails,
    stay: StayRange,
    room_id: RoomId,
    processed: bool,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

impl Data {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn overlaps(&self, room_id: RoomId, stay: StayRange) -> bool {
        self.restrictions
            .values()
            .any(|r| r.room_id == room_id && r.stay.overlaps(&stay))
    }

    fn joined(&self, stored: &StoredReservation) -> Result<Reservation, RepositoryError> {
        let room = self.rooms.get(&stored.room_id.as_i32()).ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "reservation {} references missing room {}",
                stored.id, stored.room_id
            ))
        })?;
        Ok(Reservation {
            id: stored.id,
            guest: stored.guest.clone(),
            stay: stored.stay,
            room_id: stored.room_id,
            room_name: room.name.clone(),
            processed: stored.processed,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        })
    }

    fn insert_reservation(
        &mut self,
        reservation: &NewReservation,
    ) -> Result<ReservationId, RepositoryError> {
        if !self.rooms.contains_key(&reservation.room_id.as_i32()) {
            return Err(RepositoryError::NotFound);
        }
        let id = ReservationId::new(self.next_id());
        let now = Utc::now();
        self.reservations.insert(
            id.as_i32(),
            StoredReservation {
                id,
                guest: reservation.guest.clone(),
                stay: reservation.stay,
                room_id: reservation.room_id,
                processed: false,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    fn insert_restriction(
        &mut self,
        restriction: &NewRoomRestriction,
    ) -> Result<RoomRestrictionId, RepositoryError> {
        if !self.rooms.contains_key(&restriction.room_id.as_i32()) {
            return Err(RepositoryError::NotFound);
        }
        if let Some(reservation_id) = restriction.reservation_id
            && !self.reservations.contains_key(&reservation_id.as_i32())
        {
            return Err(RepositoryError::NotFound);
        }
        let id = RoomRestrictionId::new(self.next_id());
        self.restrictions.insert(
            id.as_i32(),
            RoomRestriction {
                id,
                room_id: restriction.room_id,
                reservation_id: restriction.reservation_id,
                kind: restriction.kind,
                stay: restriction.stay,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    fn reservation_mut(
        &mut self,
        id: ReservationId,
    ) -> Result<&mut StoredReservation, RepositoryError> {
        self.reservations
            .get_mut(&id.as_i32())
            .ok_or(RepositoryError::NotFound)
    }
}

impl MemoryBookingRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a room and return its id.
    pub async fn add_room(&self, name: &str, description: &str) -> RoomId {
        let mut data = self.data.lock().await;
        let id = RoomId::new(data.next_id());
        let now = Utc::now();
        data.rooms.insert(
            id.as_i32(),
            Room {
                id,
                name: name.to_string(),
                description: description.to_string(),
                shower: true,
                minibar: false,
                pricing_id: None,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    /// Remove a staff account, as an operator deleting it by hand would.
    pub async fn remove_user(&self, id: UserId) -> bool {
        self.data.lock().await.users.remove(&id.as_i32()).is_some()
    }
}

#[async_trait]
impl BookingRepository for MemoryBookingRepository {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn all_rooms(&self) -> Result<Vec<Room>, RepositoryError> {
        let data = self.data.lock().await;
        let mut rooms: Vec<Room> = data.rooms.values().cloned().collect();
        rooms.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rooms)
    }

    async fn get_room(&self, id: RoomId) -> Result<Option<Room>, RepositoryError> {
        let data = self.data.lock().await;
        Ok(data.rooms.get(&id.as_i32()).cloned())
    }

    async fn search_availability_for_room(
        &self,
        room_id: RoomId,
        stay: StayRange,
    ) -> Result<bool, RepositoryError> {
        let data = self.data.lock().await;
        Ok(!data.overlaps(room_id, stay))
    }

    async fn search_availability_for_all_rooms(
        &self,
        stay: StayRange,
    ) -> Result<Vec<Room>, RepositoryError> {
        let data = self.data.lock().await;
        let mut rooms: Vec<Room> = data
            .rooms
            .values()
            .filter(|room| !data.overlaps(room.id, stay))
            .cloned()
            .collect();
        rooms.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rooms)
    }

    async fn insert_reservation(
        &self,
        reservation: &NewReservation,
    ) -> Result<ReservationId, RepositoryError> {
        self.data.lock().await.insert_reservation(reservation)
    }

    async fn insert_room_restriction(
        &self,
        restriction: &NewRoomRestriction,
    ) -> Result<RoomRestrictionId, RepositoryError> {
        self.data.lock().await.insert_restriction(restriction)
    }

    async fn create_booking(
        &self,
        reservation: &NewReservation,
    ) -> Result<ReservationId, RepositoryError> {
        let mut data = self.data.lock().await;
        if !data.rooms.contains_key(&reservation.room_id.as_i32()) {
            return Err(RepositoryError::NotFound);
        }
        if data.overlaps(reservation.room_id, reservation.stay) {
            return Err(RepositoryError::Conflict(format!(
                "room {} is not available for {}",
                reservation.room_id, reservation.stay
            )));
        }
        let id = data.insert_reservation(reservation)?;
        data.insert_restriction(&NewRoomRestriction::for_reservation(
            id,
            reservation.room_id,
            reservation.stay,
        ))?;
        Ok(id)
    }

    async fn get_reservation(
        &self,
        id: ReservationId,
    ) -> Result<Option<Reservation>, RepositoryError> {
        let data = self.data.lock().await;
        data.reservations
            .get(&id.as_i32())
            .map(|stored| data.joined(stored))
            .transpose()
    }

    async fn list_reservations(
        &self,
        filter: ReservationFilter,
    ) -> Result<Vec<Reservation>, RepositoryError> {
        let data = self.data.lock().await;
        let mut list = data
            .reservations
            .values()
            .map(|stored| data.joined(stored))
            .collect::<Result<Vec<_>, _>>()?;
        list.retain(|r| filter.matches(r));
        list.sort_by_key(|r| (r.stay.start(), r.id.as_i32()));
        Ok(list)
    }

    async fn update_reservation_guest(
        &self,
        id: ReservationId,
        guest: &GuestDetails,
    ) -> Result<(), RepositoryError> {
        let mut data = self.data.lock().await;
        let stored = data.reservation_mut(id)?;
        stored.guest = guest.clone();
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn set_processed(
        &self,
        id: ReservationId,
        processed: bool,
    ) -> Result<(), RepositoryError> {
        let mut data = self.data.lock().await;
        let stored = data.reservation_mut(id)?;
        stored.processed = processed;
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_reservation(&self, id: ReservationId) -> Result<(), RepositoryError> {
        let mut data = self.data.lock().await;
        data.reservations
            .remove(&id.as_i32())
            .ok_or(RepositoryError::NotFound)?;
        data.restrictions
            .retain(|_, r| r.reservation_id != Some(id));
        Ok(())
    }

    async fn restrictions_for_room(
        &self,
        room_id: RoomId,
        range: StayRange,
    ) -> Result<Vec<RoomRestriction>, RepositoryError> {
        let data = self.data.lock().await;
        let mut list: Vec<RoomRestriction> = data
            .restrictions
            .values()
            .filter(|r| r.room_id == room_id && r.stay.overlaps(&range))
            .cloned()
            .collect();
        list.sort_by_key(|r| r.stay.start());
        Ok(list)
    }

    async fn add_owner_block(
        &self,
        room_id: RoomId,
        stay: StayRange,
    ) -> Result<RoomRestrictionId, RepositoryError> {
        let mut data = self.data.lock().await;
        if data.overlaps(room_id, stay) {
            return Err(RepositoryError::Conflict(format!(
                "room {room_id} is already blocked during {stay}"
            )));
        }
        data.insert_restriction(&NewRoomRestriction::owner_block(room_id, stay))
    }

    async fn delete_owner_block(&self, id: RoomRestrictionId) -> Result<(), RepositoryError> {
        let mut data = self.data.lock().await;
        let is_block = data
            .restrictions
            .get(&id.as_i32())
            .is_some_and(|r| r.kind == RestrictionKind::OwnerBlock);
        if !is_block {
            return Err(RepositoryError::NotFound);
        }
        data.restrictions.remove(&id.as_i32());
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let data = self.data.lock().await;
        Ok(data.users.get(&id.as_i32()).map(|(user, _)| user.clone()))
    }

    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let data = self.data.lock().await;
        Ok(data.users.values().find(|(u, _)| &u.email == email).cloned())
    }

    async fn create_user(&self, user: &NewUser) -> Result<UserId, RepositoryError> {
        let mut data = self.data.lock().await;
        if data.users.values().any(|(u, _)| u.email == user.email) {
            return Err(RepositoryError::Conflict(format!(
                "user {} already exists",
                user.email
            )));
        }
        let id = UserId::new(data.next_id());
        let now = Utc::now();
        data.users.insert(
            id.as_i32(),
            (
                User {
                    id,
                    first_name: user.first_name.clone(),
                    last_name: user.last_name.clone(),
                    email: user.email.clone(),
                    access_level: user.access_level,
                    created_at: now,
                    updated_at: now,
                },
                user.password_hash.clone(),
            ),
        );
        Ok(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn stay(start: &str, end: &str) -> StayRange {
        StayRange::new(
            NaiveDate::parse_from_str(start, "%Y-%m-%d").unwrap(),
            NaiveDate::parse_from_str(end, "%Y-%m-%d").unwrap(),
        )
        .unwrap()
    }

    fn booking(room_id: RoomId, s: StayRange) -> NewReservation {
        NewReservation {
            guest: GuestDetails {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: Email::parse("ada@example.com").unwrap(),
                phone: "555-0100".to_string(),
            },
            room_id,
            stay: s,
        }
    }

    #[tokio::test]
    async fn test_search_excludes_only_overlapping_rooms() {
        let repo = MemoryBookingRepository::new();
        let generals = repo.add_room("General's Quarters", "").await;
        let majors = repo.add_room("Major's Suite", "").await;
        repo.create_booking(&booking(generals, stay("2026-06-01", "2026-06-05")))
            .await
            .unwrap();

        let free = repo
            .search_availability_for_all_rooms(stay("2026-06-04", "2026-06-06"))
            .await
            .unwrap();
        assert_eq!(free.iter().map(|r| r.id).collect::<Vec<_>>(), vec![majors]);

        let free = repo
            .search_availability_for_all_rooms(stay("2026-06-05", "2026-06-06"))
            .await
            .unwrap();
        assert_eq!(free.len(), 2);
    }

    #[tokio::test]
    async fn test_restriction_ending_on_arrival_day_does_not_block() {
        let repo = MemoryBookingRepository::new();
        let room = repo.add_room("Garden Room", "").await;
        repo.add_owner_block(room, stay("2026-03-01", "2026-03-10"))
            .await
            .unwrap();

        assert!(
            repo.search_availability_for_room(room, stay("2026-03-10", "2026-03-12"))
                .await
                .unwrap()
        );
        assert!(
            !repo
                .search_availability_for_room(room, stay("2026-03-09", "2026-03-12"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_primitive_inserts_round_trip_and_block_room() {
        let repo = MemoryBookingRepository::new();
        let room = repo.add_room("Garden Room", "").await;
        let s = stay("2026-07-01", "2026-07-04");
        let new = booking(room, s);

        let id = repo.insert_reservation(&new).await.unwrap();
        let stored = repo.get_reservation(id).await.unwrap().unwrap();
        assert_eq!(stored.guest, new.guest);
        assert_eq!(stored.stay, s);
        assert_eq!(stored.room_name, "Garden Room");
        // A bare reservation row does not block the room by itself
        assert!(repo.search_availability_for_room(room, s).await.unwrap());

        repo.insert_room_restriction(&NewRoomRestriction::for_reservation(id, room, s))
            .await
            .unwrap();
        assert!(!repo.search_availability_for_room(room, s).await.unwrap());
        assert!(
            repo.search_availability_for_room(room, stay("2026-07-04", "2026-07-05"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_create_booking_conflict_leaves_nothing_behind() {
        let repo = MemoryBookingRepository::new();
        let room = repo.add_room("Garden Room", "").await;
        repo.create_booking(&booking(room, stay("2026-06-01", "2026-06-05")))
            .await
            .unwrap();

        let err = repo
            .create_booking(&booking(room, stay("2026-06-03", "2026-06-04")))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(
            repo.list_reservations(ReservationFilter::All)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_delete_reservation_frees_room() {
        let repo = MemoryBookingRepository::new();
        let room = repo.add_room("Garden Room", "").await;
        let s = stay("2026-06-01", "2026-06-05");
        let id = repo.create_booking(&booking(room, s)).await.unwrap();

        repo.delete_reservation(id).await.unwrap();
        assert!(repo.search_availability_for_room(room, s).await.unwrap());
        assert!(matches!(
            repo.delete_reservation(id).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_processed_filter() {
        let repo = MemoryBookingRepository::new();
        let room = repo.add_room("Garden Room", "").await;
        let first = repo
            .create_booking(&booking(room, stay("2026-06-01", "2026-06-02")))
            .await
            .unwrap();
        repo.create_booking(&booking(room, stay("2026-06-02", "2026-06-03")))
            .await
            .unwrap();

        repo.set_processed(first, true).await.unwrap();
        let new = repo.list_reservations(ReservationFilter::New).await.unwrap();
        assert_eq!(new.len(), 1);
        assert_ne!(new[0].id, first);
    }

    #[tokio::test]
    async fn test_reservation_restriction_cannot_be_removed_as_block() {
        let repo = MemoryBookingRepository::new();
        let room = repo.add_room("Garden Room", "").await;
        let s = stay("2026-06-01", "2026-06-02");
        repo.create_booking(&booking(room, s)).await.unwrap();
        let restriction = repo.restrictions_for_room(room, s).await.unwrap();
        assert_eq!(restriction[0].kind, RestrictionKind::Reservation);

        assert!(matches!(
            repo.delete_owner_block(restriction[0].id).await,
            Err(RepositoryError::NotFound)
        ));
    }
}
