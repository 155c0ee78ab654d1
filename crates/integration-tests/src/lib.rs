//! Integration test harness for the Lodge site.
//!
//! [`TestApp`] drives the real router in-process with
//! `tower::ServiceExt::oneshot`, backed by the in-memory repository, an
//! in-memory session store and a mailer that records instead of sending.
//! It keeps the session cookie between requests like a browser would and
//! adds the CSRF token to form posts.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p lodge-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use tokio::sync::Mutex;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use lodge_core::{AccessLevel, Email, RoomId};
use lodge_site::db::MemoryBookingRepository;
use lodge_site::middleware::csrf::CSRF_HEADER;
use lodge_site::middleware::session::SESSION_COOKIE_NAME;
use lodge_site::middleware::session_layer;
use lodge_site::services::{AuthService, EmailError, MailMessage, MailQueue, Mailer, spawn_worker};
use lodge_site::state::AppState;

/// Address booking notifications go to in tests.
pub const OWNER_EMAIL: &str = "owner@lodge.test";

/// Password given to staff accounts created by [`TestApp::login_as_staff`].
pub const STAFF_PASSWORD: &str = "correct horse battery";

/// Mailer that keeps every message it is asked to send.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
}

impl RecordingMailer {
    pub async fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), EmailError> {
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}

/// A response with its body read.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// The redirect target, if any.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    /// Parse the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// The site running in-process.
pub struct TestApp {
    router: Router,
    pub repo: Arc<MemoryBookingRepository>,
    pub mailer: Arc<RecordingMailer>,
    cookie: Option<String>,
    csrf_token: Option<String>,
}

impl TestApp {
    /// Start a fresh site with no rooms.
    pub fn new() -> Self {
        let repo = Arc::new(MemoryBookingRepository::new());
        let mailer = Arc::new(RecordingMailer::default());

        let (mail, receiver) = MailQueue::new(Email::parse(OWNER_EMAIL).unwrap());
        spawn_worker(receiver, mailer.clone());

        let state = AppState::new(repo.clone(), mail);
        let router = lodge_site::router(
            state,
            session_layer(MemoryStore::default(), false),
            Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../site/static")),
        );

        Self {
            router,
            repo,
            mailer,
            cookie: None,
            csrf_token: None,
        }
    }

    /// Start a site with the two standard rooms.
    pub async fn with_rooms() -> (Self, RoomId, RoomId) {
        let app = Self::new();
        let generals = app
            .repo
            .add_room("General's Quarters", "Corner room with a lake view.")
            .await;
        let majors = app
            .repo
            .add_room("Major's Suite", "Quiet suite under the eaves.")
            .await;
        (app, generals, majors)
    }

    /// Forget the session cookie, as a new visitor.
    pub fn clear_cookies(&mut self) {
        self.cookie = None;
        self.csrf_token = None;
    }

    pub async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();

        for value in response.headers().get_all(header::SET_COOKIE) {
            let pair = value.to_str().unwrap().split(';').next().unwrap_or_default();
            if let Some(session) = pair.strip_prefix(&format!("{SESSION_COOKIE_NAME}=")) {
                let cookie = (!session.is_empty()).then(|| pair.to_string());
                // A new session may not hold the old token
                if cookie != self.cookie {
                    self.csrf_token = None;
                }
                self.cookie = cookie;
            }
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = String::from_utf8(bytes.to_vec()).unwrap();

        if let Some(token) = extract_csrf_token(&body) {
            self.csrf_token = Some(token);
        }

        TestResponse {
            status,
            headers,
            body,
        }
    }

    fn request(&self, method: Method, path: &str) -> axum::http::request::Builder {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        let request = self.request(Method::GET, path).body(Body::empty()).unwrap();
        self.send(request).await
    }

    /// The session's CSRF token, loading a page first if none was seen yet.
    pub async fn csrf_token(&mut self) -> String {
        if self.csrf_token.is_none() {
            self.get("/about").await;
        }
        self.csrf_token.clone().unwrap()
    }

    /// Post a form exactly as given, without adding a CSRF token.
    pub async fn post_form_raw(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = self
            .request(Method::POST, path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Post a form with the session's CSRF token added.
    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let token = self.csrf_token().await;
        let mut fields = fields.to_vec();
        fields.push(("csrf_token", &token));
        self.post_form_raw(path, &fields).await
    }

    /// Post a form carrying the CSRF token in a header, as page scripts do.
    pub async fn post_form_with_csrf_header(
        &mut self,
        path: &str,
        fields: &[(&str, &str)],
    ) -> TestResponse {
        let token = self.csrf_token().await;
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = self
            .request(Method::POST, path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(CSRF_HEADER, token)
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Create a staff account and sign in as it.
    pub async fn login_as_staff(&mut self, email: &str) -> TestResponse {
        AuthService::new(self.repo.as_ref())
            .create_staff("Ada", "Owner", email, STAFF_PASSWORD, AccessLevel::Admin)
            .await
            .unwrap();
        self.post_form(
            "/user/login",
            &[("email", email), ("password", STAFF_PASSWORD)],
        )
        .await
    }

    /// Wait until the mail worker has delivered at least `count` messages.
    pub async fn wait_for_mail(&self, count: usize) -> Vec<MailMessage> {
        for _ in 0..100 {
            let sent = self.mailer.sent().await;
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.mailer.sent().await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull the CSRF token out of a rendered page.
fn extract_csrf_token(body: &str) -> Option<String> {
    let marker = r#"name="csrf-token" content=""#;
    let start = body.find(marker)? + marker.len();
    let end = body[start..].find('"')?;
    Some(body[start..start + end].to_string())
}
