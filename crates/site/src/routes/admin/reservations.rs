//! Reservation lists, detail/edit, processing and deletion.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use lodge_core::ReservationId;

use super::Source;
use crate::error::{AppError, Result};
use crate::filters;
use crate::forms::{FieldErrors, ReservationForm};
use crate::middleware::{Flash, PageContext, RequireStaff, set_flash};
use crate::models::{CurrentStaff, Reservation, ReservationFilter};
use crate::state::AppState;

/// Reservation row for list templates.
#[derive(Debug, Clone)]
pub struct ReservationRow {
    pub id: i32,
    pub guest_name: String,
    pub room_name: String,
    pub arrival: String,
    pub departure: String,
    pub processed: bool,
}

impl From<&Reservation> for ReservationRow {
    fn from(r: &Reservation) -> Self {
        Self {
            id: r.id.as_i32(),
            guest_name: r.guest.full_name(),
            room_name: r.room_name.clone(),
            arrival: filters::display_date(r.stay.start()),
            departure: filters::display_date(r.stay.end()),
            processed: r.processed,
        }
    }
}

/// Reservation list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/reservations.html")]
pub struct ReservationsTemplate {
    pub ctx: PageContext,
    pub staff: CurrentStaff,
    pub title: &'static str,
    pub src: &'static str,
    pub reservations: Vec<ReservationRow>,
}

/// Reservation detail/edit template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/reservation.html")]
pub struct ReservationTemplate {
    pub ctx: PageContext,
    pub staff: CurrentStaff,
    pub src: &'static str,
    pub back_url: String,
    pub reservation: ReservationRow,
    pub form: ReservationForm,
    pub errors: FieldErrors,
}

async fn list(
    state: &AppState,
    ctx: PageContext,
    staff: CurrentStaff,
    filter: ReservationFilter,
) -> Result<ReservationsTemplate> {
    let reservations = state.repo().list_reservations(filter).await?;

    Ok(ReservationsTemplate {
        ctx,
        staff,
        title: match filter {
            ReservationFilter::New => "New Reservations",
            ReservationFilter::All => "All Reservations",
        },
        src: filter.as_str(),
        reservations: reservations.iter().map(ReservationRow::from).collect(),
    })
}

/// Unprocessed reservations.
///
/// # Errors
///
/// Returns an error if the reservations cannot be loaded.
#[instrument(skip_all, fields(user_id = %staff.id))]
pub async fn list_new(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ctx: PageContext,
) -> Result<impl IntoResponse> {
    list(&state, ctx, staff, ReservationFilter::New).await
}

/// Every reservation.
///
/// # Errors
///
/// Returns an error if the reservations cannot be loaded.
#[instrument(skip_all, fields(user_id = %staff.id))]
pub async fn list_all(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ctx: PageContext,
) -> Result<impl IntoResponse> {
    list(&state, ctx, staff, ReservationFilter::All).await
}

async fn load(state: &AppState, id: i32) -> Result<Reservation> {
    state
        .repo()
        .get_reservation(ReservationId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("reservation {id}")))
}

/// Show one reservation with its edit form.
///
/// # Errors
///
/// Returns 404 if the reservation doesn't exist.
#[instrument(skip(staff, state, ctx))]
pub async fn show(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Path((src, id)): Path<(String, i32)>,
    ctx: PageContext,
) -> Result<impl IntoResponse> {
    let source: Source = src.parse()?;
    let reservation = load(&state, id).await?;

    Ok(ReservationTemplate {
        ctx,
        staff,
        src: source.as_str(),
        back_url: source.return_url(&reservation),
        reservation: ReservationRow::from(&reservation),
        form: ReservationForm::from(&reservation.guest),
        errors: FieldErrors::new(),
    })
}

/// Save edited guest details.
///
/// # Errors
///
/// Returns 404 if the reservation doesn't exist.
#[instrument(skip(staff, state, session, ctx))]
pub async fn update(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    session: Session,
    Path((src, id)): Path<(String, i32)>,
    ctx: PageContext,
    Form(form): Form<ReservationForm>,
) -> Result<Response> {
    let source: Source = src.parse()?;
    let reservation = load(&state, id).await?;

    let guest = match form.validate() {
        Ok(guest) => guest,
        Err(errors) => {
            return Ok(ReservationTemplate {
                ctx: ctx.with_error("Please correct the errors below"),
                staff,
                src: source.as_str(),
                back_url: source.return_url(&reservation),
                reservation: ReservationRow::from(&reservation),
                form,
                errors,
            }
            .into_response());
        }
    };

    state
        .repo()
        .update_reservation_guest(reservation.id, &guest)
        .await?;
    tracing::info!(reservation_id = %reservation.id, user_id = %staff.id, "Reservation updated");

    set_flash(&session, Flash::Success, "Changes saved").await;
    Ok(Redirect::to(&source.return_url(&reservation)).into_response())
}

/// Mark a reservation as processed.
///
/// # Errors
///
/// Returns 404 if the reservation doesn't exist.
#[instrument(skip(staff, state, session))]
pub async fn process(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    session: Session,
    Path((src, id)): Path<(String, i32)>,
) -> Result<Response> {
    let source: Source = src.parse()?;
    let reservation = load(&state, id).await?;

    state.repo().set_processed(reservation.id, true).await?;
    tracing::info!(reservation_id = %reservation.id, user_id = %staff.id, "Reservation processed");

    set_flash(&session, Flash::Success, "Reservation marked as processed").await;
    Ok(Redirect::to(&source.return_url(&reservation)).into_response())
}

/// Delete a reservation and free its dates.
///
/// # Errors
///
/// Returns 404 if the reservation doesn't exist.
#[instrument(skip(staff, state, session))]
pub async fn delete(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    session: Session,
    Path((src, id)): Path<(String, i32)>,
) -> Result<Response> {
    let source: Source = src.parse()?;
    let reservation = load(&state, id).await?;

    state.repo().delete_reservation(reservation.id).await?;
    tracing::info!(reservation_id = %reservation.id, user_id = %staff.id, "Reservation deleted");

    set_flash(&session, Flash::Success, "Reservation deleted").await;
    Ok(Redirect::to(&source.return_url(&reservation)).into_response())
}
