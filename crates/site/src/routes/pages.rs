//! Static pages and room pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::instrument;

use lodge_core::RoomId;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::PageContext;
use crate::models::Room;
use crate::state::AppState;

/// Room data for templates.
#[derive(Debug, Clone)]
pub struct RoomView {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub amenities: String,
}

impl From<&Room> for RoomView {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.as_i32(),
            name: room.name.clone(),
            description: room.description.clone(),
            amenities: room.amenities(),
        }
    }
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub ctx: PageContext,
}

/// About page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/about.html")]
pub struct AboutTemplate {
    pub ctx: PageContext,
}

/// Contact page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/contact.html")]
pub struct ContactTemplate {
    pub ctx: PageContext,
}

/// Room listing template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/rooms.html")]
pub struct RoomsTemplate {
    pub ctx: PageContext,
    pub rooms: Vec<RoomView>,
}

/// Single room template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/room.html")]
pub struct RoomTemplate {
    pub ctx: PageContext,
    pub room: RoomView,
}

/// Display the home page.
#[instrument(skip_all)]
pub async fn home(ctx: PageContext) -> impl IntoResponse {
    HomeTemplate { ctx }
}

/// Display the about page.
#[instrument(skip_all)]
pub async fn about(ctx: PageContext) -> impl IntoResponse {
    AboutTemplate { ctx }
}

/// Display the contact page.
#[instrument(skip_all)]
pub async fn contact(ctx: PageContext) -> impl IntoResponse {
    ContactTemplate { ctx }
}

/// Display every room.
///
/// # Errors
///
/// Returns an error if the rooms cannot be loaded.
#[instrument(skip_all)]
pub async fn rooms(State(state): State<AppState>, ctx: PageContext) -> Result<impl IntoResponse> {
    let rooms = state.repo().all_rooms().await?;

    Ok(RoomsTemplate {
        ctx,
        rooms: rooms.iter().map(RoomView::from).collect(),
    })
}

/// Display a room with its availability check form.
///
/// # Errors
///
/// Returns 404 if the room doesn't exist.
#[instrument(skip(state, ctx))]
pub async fn room(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ctx: PageContext,
) -> Result<impl IntoResponse> {
    let room = state
        .repo()
        .get_room(RoomId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("room {id}")))?;

    Ok(RoomTemplate {
        ctx,
        room: RoomView::from(&room),
    })
}
