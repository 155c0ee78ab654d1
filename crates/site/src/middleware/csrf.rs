//! CSRF protection for every state-changing request.
//!
//! Each session holds a random token (128-bit, base64). Pages embed it in
//! forms as `csrf_token`; scripts send it in the `x-csrf-token` header. Any
//! request with an unsafe method must present the session's token or it is
//! rejected with `400 Bad Request` before reaching a handler.
//!
//! Must run inside the session layer.

use axum::{
    body::{Body, to_bytes},
    extract::{FromRequestParts, Request},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use tower_sessions::Session;

use crate::models::session::keys;

/// Header checked for the token on script-initiated requests.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Form field checked for the token.
pub const CSRF_FIELD: &str = "csrf_token";

/// Largest form body buffered while looking for the token.
const MAX_FORM_BYTES: usize = 64 * 1024;

/// The session's CSRF token, for embedding in pages.
#[derive(Clone, Debug)]
pub struct CsrfToken(pub String);

impl CsrfToken {
    /// Generate a new random token.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

/// Why a request was refused.
#[derive(Debug)]
pub enum CsrfRejection {
    /// No session layer ran before this middleware.
    MissingSession,
    Session(tower_sessions::session::Error),
    BodyTooLarge,
    /// Token absent or wrong.
    Mismatch,
}

impl IntoResponse for CsrfRejection {
    fn into_response(self) -> Response {
        match self {
            Self::MissingSession => {
                tracing::error!("CSRF middleware ran without a session");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::Session(e) => {
                tracing::error!(error = %e, "Failed to load CSRF token");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE.into_response(),
            Self::Mismatch => {
                tracing::warn!("Rejected request with missing or invalid CSRF token");
                (StatusCode::BAD_REQUEST, "Invalid CSRF token").into_response()
            }
        }
    }
}

/// The session's token, created on first use.
async fn session_token(session: &Session) -> Result<CsrfToken, CsrfRejection> {
    if let Some(token) = session
        .get::<String>(keys::CSRF_TOKEN)
        .await
        .map_err(CsrfRejection::Session)?
    {
        return Ok(CsrfToken(token));
    }
    let token = CsrfToken::generate();
    session
        .insert(keys::CSRF_TOKEN, token.value())
        .await
        .map_err(CsrfRejection::Session)?;
    Ok(token)
}

/// Compare without short-circuiting on the first differing byte.
fn tokens_match(expected: &str, submitted: &str) -> bool {
    expected.len() == submitted.len()
        && expected
            .bytes()
            .zip(submitted.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Find the token in a urlencoded body.
fn token_from_form(body: &[u8]) -> Option<String> {
    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == CSRF_FIELD)
        .map(|(_, value)| value.into_owned())
}

/// Middleware that issues and verifies CSRF tokens.
///
/// # Errors
///
/// Returns a [`CsrfRejection`] response when verification fails.
pub async fn csrf_middleware(mut request: Request, next: Next) -> Result<Response, CsrfRejection> {
    let session = request
        .extensions()
        .get::<Session>()
        .cloned()
        .ok_or(CsrfRejection::MissingSession)?;
    let expected = session_token(&session).await?;
    request.extensions_mut().insert(expected.clone());

    if request.method().is_safe() {
        return Ok(next.run(request).await);
    }

    let header_token = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    if let Some(token) = header_token {
        if tokens_match(expected.value(), &token) {
            return Ok(next.run(request).await);
        }
        return Err(CsrfRejection::Mismatch);
    }

    // The handler still needs the body, so buffer it and put it back.
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_FORM_BYTES)
        .await
        .map_err(|_| CsrfRejection::BodyTooLarge)?;
    match token_from_form(&bytes) {
        Some(token) if tokens_match(expected.value(), &token) => {
            Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
        }
        _ => Err(CsrfRejection::Mismatch),
    }
}

/// Extractor for the token set by [`csrf_middleware`].
impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().cloned().unwrap_or_else(|| {
            tracing::warn!("CSRF token not found in request extensions - middleware may be misconfigured");
            Self(String::new())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_distinct() {
        let a = CsrfToken::generate();
        let b = CsrfToken::generate();
        assert_eq!(a.value().len(), 22);
        assert_ne!(a.value(), b.value());
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("abc", "abc"));
        assert!(!tokens_match("abc", "abd"));
        assert!(!tokens_match("abc", "ab"));
        assert!(!tokens_match("abc", ""));
    }

    #[test]
    fn test_token_from_form() {
        let body = b"start=2026-01-01&csrf_token=a%2Bb&end=2026-01-02";
        assert_eq!(token_from_form(body).as_deref(), Some("a+b"));
        assert_eq!(token_from_form(b"start=2026-01-01"), None);
    }
}
