//! Staff authentication extractors.
//!
//! Admin routes take [`RequireStaff`]; anonymous visitors, and sessions whose
//! staff account no longer exists, are sent to the login page with an error
//! message.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use super::flash::{Flash, set_flash};
use crate::models::CurrentStaff;
use crate::models::session::keys;
use crate::state::AppState;

/// Where anonymous visitors to admin pages are sent.
pub const LOGIN_PATH: &str = "/user/login";

/// Extractor that requires a signed-in staff member.
///
/// # Example
///
/// ```rust,ignore
/// async fn dashboard(RequireStaff(staff): RequireStaff) -> impl IntoResponse {
///     format!("Hello, {}!", staff.name)
/// }
/// ```
pub struct RequireStaff(pub CurrentStaff);

/// Returned when a staff session is required but missing.
pub enum AuthRejection {
    RedirectToLogin,
    /// No session layer ran before the extractor.
    MissingSession,
    /// The staff account could not be looked up.
    StoreUnavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::MissingSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            Self::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        }
    }
}

async fn reject_to_login(session: &Session, path: &str) -> AuthRejection {
    tracing::info!(%path, "Anonymous request to admin page");
    set_flash(session, Flash::Error, "Log in first!").await;
    AuthRejection::RedirectToLogin
}

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::MissingSession)?;

        let Some(staff) = session
            .get::<CurrentStaff>(keys::CURRENT_STAFF)
            .await
            .ok()
            .flatten()
        else {
            return Err(reject_to_login(session, parts.uri.path()).await);
        };

        // The account may have been removed since sign-in
        match state.repo().get_user(staff.id).await {
            Ok(Some(user)) => Ok(Self(CurrentStaff::from(&user))),
            Ok(None) => {
                tracing::warn!(user_id = %staff.id, "Session refers to a missing staff account");
                if let Err(e) = session.remove::<CurrentStaff>(keys::CURRENT_STAFF).await {
                    tracing::warn!(error = %e, "Failed to drop stale staff session");
                }
                Err(reject_to_login(session, parts.uri.path()).await)
            }
            Err(e) => {
                tracing::error!(error = %e, user_id = %staff.id, "Failed to load staff account");
                Err(AuthRejection::StoreUnavailable)
            }
        }
    }
}

/// Record the signed-in staff member.
///
/// Cycles the session id first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_staff(
    session: &Session,
    staff: &CurrentStaff,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_STAFF, staff).await
}

/// Sign out: drop everything held in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
