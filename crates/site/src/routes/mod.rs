//! HTTP route handlers for the site.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//! GET  /about                  - About page
//! GET  /contact                - Contact page
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (database ping)
//!
//! # Rooms
//! GET  /rooms                  - Room listing
//! GET  /rooms/{id}             - Room page with availability check
//!
//! # Booking
//! GET  /booking                - Date search form
//! POST /booking                - Search all rooms, show free ones
//! POST /bookingjson            - Single room availability (JSON)
//! GET  /chooseroom/{id}        - Pick a room from search results
//! GET  /bookroom?id=&s=&e=     - Start a booking from a room page
//! GET  /reservation            - Guest details form
//! POST /reservation            - Create the reservation
//! GET  /reservationsummary     - Confirmation page
//!
//! # Staff auth
//! GET  /user/login             - Login page
//! POST /user/login             - Login action
//! GET  /user/logout            - Logout
//!
//! # Admin (requires staff login)
//! GET  /admin/dashboard                          - Reservation counts
//! GET  /admin/reservations-new                   - Unprocessed reservations
//! GET  /admin/reservations-all                   - All reservations
//! GET  /admin/reservations/{src}/{id}            - Reservation detail
//! POST /admin/reservations/{src}/{id}            - Update guest details
//! POST /admin/process-reservation/{src}/{id}     - Mark processed
//! POST /admin/delete-reservation/{src}/{id}      - Delete
//! GET  /admin/reservations-calendar?y=&m=        - Month calendar per room
//! POST /admin/reservations-calendar              - Add owner block
//! POST /admin/blocks/{id}/delete                 - Remove owner block
//! ```

pub mod admin;
pub mod auth;
pub mod booking;
pub mod pages;
pub mod reservation;

use axum::{
    Router,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_sessions::Session;

use crate::middleware::{Flash, set_flash};
use crate::state::AppState;

/// Show `message` on the next page and send the visitor to `to`.
pub(crate) async fn redirect_with_error(
    session: &Session,
    message: impl Into<String>,
    to: &str,
) -> Response {
    set_flash(session, Flash::Error, message).await;
    Redirect::to(to).into_response()
}

/// Create the room and static page routes.
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::home))
        .route("/about", get(pages::about))
        .route("/contact", get(pages::contact))
        .route("/rooms", get(pages::rooms))
        .route("/rooms/{id}", get(pages::room))
}

/// Create the guest booking flow routes.
pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/booking", get(booking::search_page).post(booking::search))
        .route("/bookingjson", post(booking::availability_json))
        .route("/chooseroom/{id}", get(booking::choose_room))
        .route("/bookroom", get(booking::book_room))
        .route(
            "/reservation",
            get(reservation::form_page).post(reservation::submit),
        )
        .route("/reservationsummary", get(reservation::summary))
}

/// Create the staff login routes.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
}

/// Create all routes for the site.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(page_routes())
        .merge(booking_routes())
        .nest("/user", auth_routes())
        .nest("/admin", admin::routes())
}
