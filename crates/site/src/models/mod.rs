//! Domain models for the booking site.
//!
//! These are validated domain objects, separate from database row types.

pub mod reservation;
pub mod room;
pub mod session;
pub mod user;

pub use reservation::{
    GuestDetails, NewReservation, NewRoomRestriction, Reservation, ReservationFilter,
    RoomRestriction,
};
pub use room::Room;
pub use session::{CurrentStaff, ReservationDraft};
pub use user::{NewUser, User};
