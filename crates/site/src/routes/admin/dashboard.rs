//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::{PageContext, RequireStaff};
use crate::models::{CurrentStaff, ReservationFilter};
use crate::state::AppState;

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub ctx: PageContext,
    pub staff: CurrentStaff,
    pub new_count: usize,
    pub all_count: usize,
}

/// Dashboard page handler.
///
/// # Errors
///
/// Returns an error if the reservations cannot be counted.
#[instrument(skip_all, fields(user_id = %staff.id))]
pub async fn dashboard(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ctx: PageContext,
) -> Result<impl IntoResponse> {
    let all = state.repo().list_reservations(ReservationFilter::All).await?;
    let new_count = all
        .iter()
        .filter(|r| ReservationFilter::New.matches(r))
        .count();

    Ok(DashboardTemplate {
        ctx,
        staff,
        new_count,
        all_count: all.len(),
    })
}
