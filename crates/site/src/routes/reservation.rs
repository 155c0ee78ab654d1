//! Guest details form, reservation creation and the summary page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use lodge_core::RoomId;

use super::booking::{StayView, load_draft, store_draft};
use super::redirect_with_error;
use crate::db::RepositoryError;
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::forms::{FieldErrors, ReservationForm};
use crate::middleware::PageContext;
use crate::models::session::keys;
use crate::models::{GuestDetails, NewReservation, ReservationDraft};
use crate::services::email::BookingNotice;
use crate::state::AppState;

const MISSING_DRAFT: &str = "Can't get reservation from session";

/// Guest details form template.
#[derive(Template, WebTemplate)]
#[template(path = "reservation/form.html")]
pub struct ReservationFormTemplate {
    pub ctx: PageContext,
    pub room_name: String,
    pub stay: StayView,
    pub form: ReservationForm,
    pub errors: FieldErrors,
}

/// Booking confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "reservation/summary.html")]
pub struct SummaryTemplate {
    pub ctx: PageContext,
    pub reservation_id: i32,
    pub room_name: String,
    pub stay: StayView,
    pub guest: GuestDetails,
}

/// Look up the room a draft points at, filling in its name.
///
/// Sends the visitor elsewhere with a flash message when there is no usable
/// room.
async fn draft_room(
    state: &AppState,
    session: &Session,
    draft: &mut ReservationDraft,
) -> std::result::Result<RoomId, Response> {
    let Some(room_id) = draft.room_id else {
        return Err(redirect_with_error(session, "Choose a room first", "/booking").await);
    };

    match state.repo().get_room(room_id).await {
        Ok(Some(room)) => {
            draft.room_name = Some(room.name);
            Ok(room_id)
        }
        Ok(None) => Err(redirect_with_error(session, "Invalid room", "/booking").await),
        Err(e) => {
            tracing::error!(error = %e, %room_id, "Failed to load room");
            Err(redirect_with_error(session, "Can't get room from database", "/").await)
        }
    }
}

/// Display the guest details form for the drafted booking.
///
/// # Errors
///
/// Returns an error if the draft cannot be saved to the session.
#[instrument(skip_all)]
pub async fn form_page(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
) -> Result<Response> {
    let Some(mut draft) = load_draft(&session).await else {
        return Ok(redirect_with_error(&session, MISSING_DRAFT, "/").await);
    };
    if let Err(redirect) = draft_room(&state, &session, &mut draft).await {
        return Ok(redirect);
    }
    store_draft(&session, &draft).await?;

    let form = draft
        .guest
        .as_ref()
        .map(ReservationForm::from)
        .unwrap_or_default();

    Ok(ReservationFormTemplate {
        ctx,
        room_name: draft.room_name.unwrap_or_default(),
        stay: StayView::from(draft.stay),
        form,
        errors: FieldErrors::new(),
    }
    .into_response())
}

/// Validate the guest details and store the reservation.
///
/// # Errors
///
/// Returns an error if the booked draft cannot be saved to the session.
#[instrument(skip(state, session, ctx))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    Form(form): Form<ReservationForm>,
) -> Result<Response> {
    let Some(mut draft) = load_draft(&session).await else {
        return Ok(redirect_with_error(&session, MISSING_DRAFT, "/").await);
    };
    let room_id = match draft_room(&state, &session, &mut draft).await {
        Ok(room_id) => room_id,
        Err(redirect) => return Ok(redirect),
    };
    let room_name = draft.room_name.clone().unwrap_or_default();

    let guest = match form.validate() {
        Ok(guest) => guest,
        Err(errors) => {
            tracing::info!("Reservation form failed validation");
            return Ok(ReservationFormTemplate {
                ctx: ctx.with_error("Please correct the errors below"),
                room_name,
                stay: StayView::from(draft.stay),
                form,
                errors,
            }
            .into_response());
        }
    };

    let booking = NewReservation {
        guest: guest.clone(),
        room_id,
        stay: draft.stay,
    };
    let reservation_id = match state.repo().create_booking(&booking).await {
        Ok(id) => id,
        Err(RepositoryError::Conflict(reason)) => {
            tracing::info!(%room_id, stay = %draft.stay, %reason, "Booking conflicted");
            return Ok(redirect_with_error(
                &session,
                "Sorry, that room is no longer available for those dates",
                "/booking",
            )
            .await);
        }
        Err(RepositoryError::NotFound) => {
            return Ok(redirect_with_error(&session, "Invalid room", "/booking").await);
        }
        Err(e) => {
            tracing::error!(error = %e, %room_id, "Failed to store reservation");
            return Ok(redirect_with_error(&session, "Can't insert reservation into database!", "/").await);
        }
    };

    tracing::info!(%reservation_id, %room_id, stay = %draft.stay, "Reservation created");
    add_breadcrumb(
        "booking",
        "Reservation created",
        &[("reservation_id", reservation_id.to_string())],
    );

    state.mail().booking_confirmed(&BookingNotice {
        reservation_id,
        guest: &guest,
        room_name: &room_name,
        stay: draft.stay,
    });

    draft.guest = Some(guest);
    draft.reservation_id = Some(reservation_id);
    store_draft(&session, &draft).await?;

    Ok(Redirect::to("/reservationsummary").into_response())
}

/// Display the confirmation once, then forget the draft.
///
/// # Errors
///
/// Returns an error if the session cannot be read.
#[instrument(skip_all)]
pub async fn summary(session: Session, ctx: PageContext) -> Result<Response> {
    let draft = session.remove::<ReservationDraft>(keys::RESERVATION).await?;

    let Some(ReservationDraft {
        stay,
        room_name,
        guest: Some(guest),
        reservation_id: Some(reservation_id),
        ..
    }) = draft
    else {
        return Ok(redirect_with_error(&session, MISSING_DRAFT, "/").await);
    };

    Ok(SummaryTemplate {
        ctx,
        reservation_id: reservation_id.as_i32(),
        room_name: room_name.unwrap_or_default(),
        stay: StayView::from(stay),
        guest,
    }
    .into_response())
}
