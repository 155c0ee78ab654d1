//! Admin console: reservation management and the room calendar.
//!
//! Every handler takes [`RequireStaff`](crate::middleware::RequireStaff)
//! as its first extractor so anonymous visitors are redirected before any
//! flash messages are consumed.

pub mod calendar;
pub mod dashboard;
pub mod reservations;

use std::str::FromStr;

use axum::{
    Router,
    routing::{get, post},
};

use crate::error::AppError;
use crate::models::{Reservation, ReservationFilter};
use crate::state::AppState;

/// The page a reservation was opened from, so actions can return there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    List(ReservationFilter),
    Calendar,
}

impl Source {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::List(filter) => filter.as_str(),
            Self::Calendar => "cal",
        }
    }

    /// Where to go back to after acting on `reservation`.
    #[must_use]
    pub fn return_url(self, reservation: &Reservation) -> String {
        match self {
            Self::List(filter) => format!("/admin/reservations-{filter}"),
            Self::Calendar => calendar::month_url(reservation.stay.start()),
        }
    }
}

impl FromStr for Source {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::List(ReservationFilter::New)),
            "all" => Ok(Self::List(ReservationFilter::All)),
            "cal" => Ok(Self::Calendar),
            other => Err(AppError::BadRequest(format!("unknown source {other:?}"))),
        }
    }
}

/// Create the admin routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard::dashboard))
        .route("/reservations-new", get(reservations::list_new))
        .route("/reservations-all", get(reservations::list_all))
        .route(
            "/reservations/{src}/{id}",
            get(reservations::show).post(reservations::update),
        )
        .route(
            "/process-reservation/{src}/{id}",
            post(reservations::process),
        )
        .route(
            "/delete-reservation/{src}/{id}",
            post(reservations::delete),
        )
        .route(
            "/reservations-calendar",
            get(calendar::show).post(calendar::add_block),
        )
        .route("/blocks/{id}/delete", post(calendar::remove_block))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_source_parse() {
        assert_eq!(
            "new".parse::<Source>().unwrap(),
            Source::List(ReservationFilter::New)
        );
        assert_eq!("cal".parse::<Source>().unwrap(), Source::Calendar);
        assert_eq!(Source::List(ReservationFilter::All).as_str(), "all");
        assert!("old".parse::<Source>().is_err());
    }
}
