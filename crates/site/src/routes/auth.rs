//! Staff login and logout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::redirect_with_error;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{Flash, PageContext, clear_session, set_current_staff, set_flash};
use crate::models::CurrentStaff;
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

/// Where staff land after signing in.
const AFTER_LOGIN: &str = "/admin/dashboard";

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
}

/// Display the login page.
#[instrument(skip_all)]
pub async fn login_page(ctx: PageContext) -> Response {
    if ctx.is_authenticated() {
        return Redirect::to(AFTER_LOGIN).into_response();
    }
    LoginTemplate { ctx }.into_response()
}

/// Handle login form submission.
///
/// # Errors
///
/// Returns an error if the session cannot be updated after a successful
/// login.
#[instrument(skip(state, session))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let auth = AuthService::new(state.repo());
    let user = match auth.login(&form.email, &form.password).await {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            tracing::info!(email = %form.email, "Failed staff login");
            return Ok(redirect_with_error(&session, "Invalid login credentials", "/user/login").await);
        }
        Err(e) => {
            tracing::error!(error = %e, "Staff login failed");
            return Ok(redirect_with_error(&session, "Can't log in right now", "/user/login").await);
        }
    };

    let staff = CurrentStaff::from(&user);
    set_current_staff(&session, &staff).await?;
    set_sentry_user(&staff.id, Some(staff.email.as_str()));
    tracing::info!(user_id = %staff.id, "Staff logged in");

    set_flash(&session, Flash::Success, "Logged in successfully").await;
    Ok(Redirect::to(AFTER_LOGIN).into_response())
}

/// Sign out and return to the login page.
///
/// # Errors
///
/// Returns an error if the session cannot be cleared.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<Response> {
    clear_session(&session).await?;
    clear_sentry_user();

    set_flash(&session, Flash::Success, "Logged out").await;
    Ok(Redirect::to("/user/login").into_response())
}
