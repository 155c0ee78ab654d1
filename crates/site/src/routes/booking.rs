//! Availability search and the first steps of the booking flow.
//!
//! The visitor's in-progress booking lives in the session as a
//! [`ReservationDraft`]. Searching stores the dates, picking a room adds the
//! room, and the reservation form in [`super::reservation`] completes it.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use lodge_core::{RoomId, StayRange};

use super::pages::RoomView;
use super::redirect_with_error;
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::PageContext;
use crate::models::ReservationDraft;
use crate::models::session::keys;
use crate::state::AppState;

// =============================================================================
// Session Draft
// =============================================================================

/// Load the visitor's booking draft, if any.
///
/// An unreadable draft is treated as missing.
pub(crate) async fn load_draft(session: &Session) -> Option<ReservationDraft> {
    match session.get::<ReservationDraft>(keys::RESERVATION).await {
        Ok(draft) => draft,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load reservation draft");
            None
        }
    }
}

/// Save the visitor's booking draft.
pub(crate) async fn store_draft(session: &Session, draft: &ReservationDraft) -> Result<()> {
    session.insert(keys::RESERVATION, draft).await?;
    Ok(())
}

// =============================================================================
// Views
// =============================================================================

/// Stay dates for templates.
#[derive(Debug, Clone)]
pub struct StayView {
    pub arrival: String,
    pub departure: String,
    pub nights: i64,
}

impl From<StayRange> for StayView {
    fn from(stay: StayRange) -> Self {
        Self {
            arrival: filters::display_date(stay.start()),
            departure: filters::display_date(stay.end()),
            nights: stay.nights(),
        }
    }
}

// =============================================================================
// Form and Query Types
// =============================================================================

/// Search form data.
#[derive(Debug, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

/// Single-room availability request.
#[derive(Debug, Deserialize)]
pub struct AvailabilityForm {
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default)]
    pub room_id: String,
}

/// Single-room availability answer.
#[derive(Debug, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub ok: bool,
    pub message: String,
    pub room_id: String,
    pub start_date: String,
    pub end_date: String,
}

/// Query parameters of `/bookroom`.
#[derive(Debug, Deserialize)]
pub struct BookRoomQuery {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub s: String,
    #[serde(default)]
    pub e: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Date search page template.
#[derive(Template, WebTemplate)]
#[template(path = "booking/search.html")]
pub struct SearchTemplate {
    pub ctx: PageContext,
}

/// Search results template.
#[derive(Template, WebTemplate)]
#[template(path = "booking/choose_room.html")]
pub struct ChooseRoomTemplate {
    pub ctx: PageContext,
    pub stay: StayView,
    pub rooms: Vec<RoomView>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the date search form.
#[instrument(skip_all)]
pub async fn search_page(ctx: PageContext) -> impl IntoResponse {
    SearchTemplate { ctx }
}

/// Search every room for the submitted dates.
///
/// # Errors
///
/// Returns an error if the draft cannot be saved to the session.
#[instrument(skip(state, session, ctx))]
pub async fn search(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    Form(form): Form<SearchForm>,
) -> Result<Response> {
    let stay = match StayRange::parse(&form.start_date, &form.end_date) {
        Ok(stay) => stay,
        Err(e) => {
            return Ok(redirect_with_error(&session, format!("Invalid dates: {e}"), "/booking").await);
        }
    };

    let rooms = match state.repo().search_availability_for_all_rooms(stay).await {
        Ok(rooms) => rooms,
        Err(e) => {
            tracing::error!(error = %e, %stay, "Availability search failed");
            return Ok(redirect_with_error(&session, "Can't search for availability", "/booking").await);
        }
    };

    if rooms.is_empty() {
        tracing::info!(%stay, "No rooms available");
        return Ok(redirect_with_error(&session, "No availability", "/booking").await);
    }

    add_breadcrumb(
        "booking",
        "Searched availability",
        &[("stay", stay.to_string()), ("rooms", rooms.len().to_string())],
    );
    store_draft(&session, &ReservationDraft::new(stay)).await?;

    Ok(ChooseRoomTemplate {
        ctx,
        stay: StayView::from(stay),
        rooms: rooms.iter().map(RoomView::from).collect(),
    }
    .into_response())
}

/// Check one room for the submitted dates and answer in JSON.
///
/// Invalid input is answered with `400`, a store failure with `500`; both
/// carry `ok: false`.
#[instrument(skip(state))]
pub async fn availability_json(
    State(state): State<AppState>,
    Form(form): Form<AvailabilityForm>,
) -> Response {
    let reply = |status: StatusCode, ok: bool, message: &str| {
        (
            status,
            Json(AvailabilityResponse {
                ok,
                message: message.to_string(),
                room_id: form.room_id.clone(),
                start_date: form.start.clone(),
                end_date: form.end.clone(),
            }),
        )
            .into_response()
    };

    let Ok(room_id) = form.room_id.trim().parse::<i32>().map(RoomId::new) else {
        return reply(StatusCode::BAD_REQUEST, false, "Invalid room");
    };
    let stay = match StayRange::parse(&form.start, &form.end) {
        Ok(stay) => stay,
        Err(e) => return reply(StatusCode::BAD_REQUEST, false, &e.to_string()),
    };

    match state.repo().get_room(room_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return reply(StatusCode::BAD_REQUEST, false, "Invalid room"),
        Err(e) => {
            tracing::error!(error = %e, %room_id, "Failed to load room");
            return reply(StatusCode::INTERNAL_SERVER_ERROR, false, "Error querying database");
        }
    }

    match state.repo().search_availability_for_room(room_id, stay).await {
        Ok(true) => reply(StatusCode::OK, true, "Available!"),
        Ok(false) => reply(StatusCode::OK, false, "Not available for these dates"),
        Err(e) => {
            tracing::error!(error = %e, %room_id, %stay, "Availability check failed");
            reply(StatusCode::INTERNAL_SERVER_ERROR, false, "Error querying database")
        }
    }
}

/// Pick a room from the search results.
///
/// # Errors
///
/// Returns an error if the draft cannot be saved to the session.
#[instrument(skip(session))]
pub async fn choose_room(Path(id): Path<i32>, session: Session) -> Result<Response> {
    let Some(mut draft) = load_draft(&session).await else {
        return Ok(redirect_with_error(&session, "Can't get reservation from session", "/").await);
    };

    draft.room_id = Some(RoomId::new(id));
    draft.room_name = None;
    store_draft(&session, &draft).await?;

    Ok(Redirect::to("/reservation").into_response())
}

/// Start a booking for one room straight from its page.
///
/// # Errors
///
/// Returns an error if the draft cannot be saved to the session.
#[instrument(skip(state, session))]
pub async fn book_room(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<BookRoomQuery>,
) -> Result<Response> {
    let Ok(room_id) = query.id.trim().parse::<i32>().map(RoomId::new) else {
        return Ok(redirect_with_error(&session, "Invalid room", "/").await);
    };
    let Ok(stay) = StayRange::parse(&query.s, &query.e) else {
        return Ok(redirect_with_error(&session, "Invalid dates", "/").await);
    };

    let room = match state.repo().get_room(room_id).await {
        Ok(Some(room)) => room,
        Ok(None) => return Ok(redirect_with_error(&session, "Invalid room", "/").await),
        Err(e) => {
            tracing::error!(error = %e, %room_id, "Failed to load room");
            return Ok(redirect_with_error(&session, "Can't get room from database", "/").await);
        }
    };

    let mut draft = ReservationDraft::for_room(stay, room_id);
    draft.room_name = Some(room.name);
    store_draft(&session, &draft).await?;

    Ok(Redirect::to("/reservation").into_response())
}
