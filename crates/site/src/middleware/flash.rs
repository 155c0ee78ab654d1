//! One-shot flash messages and the per-page context built from them.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use super::csrf::CsrfToken;
use crate::models::CurrentStaff;
use crate::models::session::keys;

/// Which banner a flash message shows in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    Success,
    Error,
    Warning,
}

impl Flash {
    const fn key(self) -> &'static str {
        match self {
            Self::Success => keys::FLASH,
            Self::Error => keys::ERROR,
            Self::Warning => keys::WARNING,
        }
    }
}

/// Store a message for the next rendered page.
///
/// A session failure only loses the message, so it is logged rather than
/// returned.
pub async fn set_flash(session: &Session, kind: Flash, message: impl Into<String>) {
    let message = message.into();
    if let Err(e) = session.insert(kind.key(), &message).await {
        tracing::warn!(error = %e, %message, "Failed to store flash message");
    }
}

async fn take(session: &Session, kind: Flash) -> Option<String> {
    session
        .remove::<String>(kind.key())
        .await
        .ok()
        .flatten()
}

/// Data every page template needs: pending flash messages, the CSRF token
/// and who is signed in.
///
/// Extracting it consumes the flash messages.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub flash: Option<String>,
    pub error: Option<String>,
    pub warning: Option<String>,
    pub csrf_token: String,
    pub staff: Option<CurrentStaff>,
}

impl PageContext {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.staff.is_some()
    }

    /// Add an error to show on this render (e.g., a form that failed
    /// validation and is shown again without a redirect).
    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Ok(CsrfToken(csrf_token)) = CsrfToken::from_request_parts(parts, state).await;

        let Some(session) = parts.extensions.get::<Session>() else {
            tracing::warn!("Session not found in request extensions - middleware may be misconfigured");
            return Ok(Self {
                csrf_token,
                ..Self::default()
            });
        };

        Ok(Self {
            flash: take(session, Flash::Success).await,
            error: take(session, Flash::Error).await,
            warning: take(session, Flash::Warning).await,
            csrf_token,
            staff: session
                .get::<CurrentStaff>(keys::CURRENT_STAFF)
                .await
                .ok()
                .flatten(),
        })
    }
}
