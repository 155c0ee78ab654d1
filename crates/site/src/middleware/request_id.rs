//! Request ID middleware for log and error correlation.
//!
//! Each request carries an id, either the one a trusted proxy sent in
//! `x-request-id` or a fresh UUID v4. It is recorded on the tracing span,
//! tagged on the Sentry scope, and echoed on the response.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream id we accept before generating our own.
const MAX_UPSTREAM_ID_LEN: usize = 128;

/// The id assigned to the current request, available from extensions.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Accept an upstream id only if it is short and plain ASCII.
fn upstream_id(value: &HeaderValue) -> Option<String> {
    let s = value.to_str().ok()?;
    let plain = !s.is_empty()
        && s.len() <= MAX_UPSTREAM_ID_LEN
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    plain.then(|| s.to_string())
}

/// Middleware that ensures every request has a request ID.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(upstream_id)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", &request_id);
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_id_accepts_plain_ids() {
        let value = HeaderValue::from_static("abc-123_x.y");
        assert_eq!(upstream_id(&value).as_deref(), Some("abc-123_x.y"));
    }

    #[test]
    fn test_upstream_id_rejects_odd_values() {
        assert!(upstream_id(&HeaderValue::from_static("")).is_none());
        assert!(upstream_id(&HeaderValue::from_static("has space")).is_none());
        let long = "a".repeat(MAX_UPSTREAM_ID_LEN + 1);
        assert!(upstream_id(&HeaderValue::from_str(&long).unwrap_or(HeaderValue::from_static(""))).is_none());
    }
}
