//! Month calendar of room restrictions, with owner block management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use lodge_core::{RestrictionKind, RoomId, RoomRestrictionId, StayRange};

use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{Flash, PageContext, RequireStaff, set_flash};
use crate::models::{CurrentStaff, RoomRestriction};
use crate::state::AppState;

/// Calendar link for the month containing `date`.
#[must_use]
pub fn month_url(date: NaiveDate) -> String {
    format!(
        "/admin/reservations-calendar?y={}&m={}",
        date.year(),
        date.month()
    )
}

/// Month selection; also sent as hidden fields by calendar forms.
#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    pub y: Option<i32>,
    pub m: Option<u32>,
}

impl MonthQuery {
    /// First day of the selected month, defaulting to the current one.
    fn first_day(&self) -> Result<NaiveDate> {
        let today = Utc::now().date_naive();
        let year = self.y.unwrap_or_else(|| today.year());
        let month = self.m.unwrap_or_else(|| today.month());
        NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| AppError::BadRequest(format!("invalid month {year}-{month}")))
    }
}

/// Owner block form data.
#[derive(Debug, Deserialize)]
pub struct BlockForm {
    pub room_id: i32,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
}

/// One day of one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayCell {
    Free,
    Reserved(i32),
    Blocked(i32),
}

impl DayCell {
    fn for_date(date: NaiveDate, restrictions: &[RoomRestriction]) -> Self {
        match restrictions.iter().find(|r| r.stay.contains(date)) {
            None => Self::Free,
            Some(r) => match (r.kind, r.reservation_id) {
                (RestrictionKind::Reservation, Some(id)) => Self::Reserved(id.as_i32()),
                _ => Self::Blocked(r.id.as_i32()),
            },
        }
    }
}

/// A room's row in the calendar.
#[derive(Debug, Clone)]
pub struct RoomRow {
    pub id: i32,
    pub name: String,
    pub days: Vec<DayCell>,
}

/// Calendar template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/calendar.html")]
pub struct CalendarTemplate {
    pub ctx: PageContext,
    pub staff: CurrentStaff,
    pub title: String,
    pub year: i32,
    pub month: u32,
    pub days: Vec<u32>,
    pub rooms: Vec<RoomRow>,
    pub prev_url: String,
    pub next_url: String,
    pub first_iso: String,
}

/// The whole month as a stay range.
fn month_range(first: NaiveDate) -> Result<StayRange> {
    let next = first
        .checked_add_months(chrono::Months::new(1))
        .ok_or_else(|| AppError::BadRequest("month out of range".to_string()))?;
    StayRange::new(first, next).map_err(|e| AppError::Internal(e.to_string()))
}

/// Show every room's restrictions for one month.
///
/// # Errors
///
/// Returns an error if the month is invalid or the restrictions cannot be
/// loaded.
#[instrument(skip(staff, state, ctx))]
pub async fn show(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
    ctx: PageContext,
) -> Result<impl IntoResponse> {
    let first = query.first_day()?;
    let range = month_range(first)?;
    let dates: Vec<NaiveDate> = range.nights_iter().collect();

    let mut rooms = Vec::new();
    for room in state.repo().all_rooms().await? {
        let restrictions = state.repo().restrictions_for_room(room.id, range).await?;
        rooms.push(RoomRow {
            id: room.id.as_i32(),
            name: room.name,
            days: dates
                .iter()
                .map(|date| DayCell::for_date(*date, &restrictions))
                .collect(),
        });
    }

    let prev = first
        .checked_sub_months(chrono::Months::new(1))
        .unwrap_or(first);

    Ok(CalendarTemplate {
        ctx,
        staff,
        title: first.format("%B %Y").to_string(),
        year: first.year(),
        month: first.month(),
        days: dates.iter().map(Datelike::day).collect(),
        rooms,
        prev_url: month_url(prev),
        next_url: month_url(range.end()),
        first_iso: filters::iso_date(first),
    })
}

/// Block a room for a date range.
///
/// # Errors
///
/// Returns an error if the block cannot be stored for reasons other than
/// bad input or an overlap.
#[instrument(skip(staff, state, session))]
pub async fn add_block(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<BlockForm>,
) -> Result<Response> {
    let stay = match StayRange::parse(&form.start, &form.end) {
        Ok(stay) => stay,
        Err(e) => {
            set_flash(&session, Flash::Error, format!("Invalid dates: {e}")).await;
            return Ok(Redirect::to("/admin/reservations-calendar").into_response());
        }
    };
    let room_id = RoomId::new(form.room_id);

    match state.repo().add_owner_block(room_id, stay).await {
        Ok(id) => {
            tracing::info!(block_id = %id, %room_id, %stay, user_id = %staff.id, "Owner block added");
            set_flash(&session, Flash::Success, "Dates blocked").await;
        }
        Err(RepositoryError::Conflict(_)) => {
            set_flash(
                &session,
                Flash::Error,
                "Those dates overlap an existing reservation or block",
            )
            .await;
        }
        Err(RepositoryError::NotFound) => {
            set_flash(&session, Flash::Error, "Invalid room").await;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to(&month_url(stay.start())).into_response())
}

/// Remove an owner block.
///
/// # Errors
///
/// Returns an error if the store fails.
#[instrument(skip(staff, state, session))]
pub async fn remove_block(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(month): Form<MonthQuery>,
) -> Result<Response> {
    let first = month.first_day()?;

    match state
        .repo()
        .delete_owner_block(RoomRestrictionId::new(id))
        .await
    {
        Ok(()) => {
            tracing::info!(block_id = id, user_id = %staff.id, "Owner block removed");
            set_flash(&session, Flash::Success, "Block removed").await;
        }
        Err(RepositoryError::NotFound) => {
            set_flash(&session, Flash::Error, "No such owner block").await;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to(&month_url(first)).into_response())
}
