//! HTTP middleware stack for the site.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request spans)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers
//! 5. Session layer (tower-sessions with `PostgreSQL` store)
//! 6. CSRF (issue token, verify unsafe methods)

pub mod auth;
pub mod csrf;
pub mod flash;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{RequireStaff, clear_session, set_current_staff};
pub use csrf::{CsrfToken, csrf_middleware};
pub use flash::{Flash, PageContext, set_flash};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, session_layer};
