//! CSRF, staff-only pages, health checks and response headers.

#![allow(clippy::unwrap_used)]

use axum::http::{StatusCode, header};

use lodge_core::Email;
use lodge_integration_tests::{STAFF_PASSWORD, TestApp};
use lodge_site::db::BookingRepository;

#[tokio::test]
async fn test_post_without_token_is_rejected() {
    let (mut app, _, _) = TestApp::with_rooms().await;
    app.get("/booking").await;

    let res = app
        .post_form_raw(
            "/booking",
            &[("start_date", "2030-01-01"), ("end_date", "2030-01-02")],
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_post_with_wrong_token_is_rejected() {
    let (mut app, _, _) = TestApp::with_rooms().await;
    app.get("/booking").await;

    let res = app
        .post_form_raw(
            "/booking",
            &[
                ("start_date", "2030-01-01"),
                ("end_date", "2030-01-02"),
                ("csrf_token", "not-the-token"),
            ],
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_token_from_another_session_is_rejected() {
    let (mut app, _, _) = TestApp::with_rooms().await;
    let stolen = app.csrf_token().await;

    app.clear_cookies();
    app.get("/").await;
    let res = app
        .post_form_raw(
            "/booking",
            &[
                ("start_date", "2030-01-01"),
                ("end_date", "2030-01-02"),
                ("csrf_token", &stolen),
            ],
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_pages_require_login() {
    let mut app = TestApp::new();

    for path in [
        "/admin/dashboard",
        "/admin/reservations-new",
        "/admin/reservations-all",
        "/admin/reservations-calendar",
        "/admin/reservations/all/1",
    ] {
        let res = app.get(path).await;
        assert_eq!(res.status, StatusCode::SEE_OTHER, "{path}");
        assert_eq!(res.location(), Some("/user/login"), "{path}");
    }

    let login = app.get("/user/login").await;
    assert!(login.body.contains("Log in first!"));
}

#[tokio::test]
async fn test_admin_posts_require_login() {
    let mut app = TestApp::new();
    let res = app.post_form("/admin/delete-reservation/all/1", &[]).await;
    assert_eq!(res.location(), Some("/user/login"));
}

#[tokio::test]
async fn test_wrong_password_is_refused() {
    let mut app = TestApp::new();
    app.login_as_staff("ada@lodge.test").await;
    app.get("/user/logout").await;

    let res = app
        .post_form(
            "/user/login",
            &[("email", "ada@lodge.test"), ("password", "wrong password")],
        )
        .await;
    assert_eq!(res.location(), Some("/user/login"));

    let page = app.get("/user/login").await;
    assert!(page.body.contains("Invalid login credentials"));

    let res = app.get("/admin/dashboard").await;
    assert_eq!(res.location(), Some("/user/login"));
}

#[tokio::test]
async fn test_logout_ends_staff_session() {
    let mut app = TestApp::new();
    let res = app.login_as_staff("ada@lodge.test").await;
    assert_eq!(res.location(), Some("/admin/dashboard"));
    assert_eq!(app.get("/admin/dashboard").await.status, StatusCode::OK);

    let res = app.get("/user/logout").await;
    assert_eq!(res.location(), Some("/user/login"));
    assert!(app.get("/user/login").await.body.contains("Logged out"));
    assert_eq!(
        app.get("/admin/dashboard").await.location(),
        Some("/user/login")
    );

    // Signing in again works with a fresh token
    let res = app
        .post_form(
            "/user/login",
            &[("email", "ada@lodge.test"), ("password", STAFF_PASSWORD)],
        )
        .await;
    assert_eq!(res.location(), Some("/admin/dashboard"));
}

#[tokio::test]
async fn test_removed_staff_account_loses_access() {
    let mut app = TestApp::new();
    app.login_as_staff("ada@lodge.test").await;
    assert_eq!(app.get("/admin/dashboard").await.status, StatusCode::OK);

    let (user, _) = app
        .repo
        .find_credentials(&Email::parse("ada@lodge.test").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(app.repo.remove_user(user.id).await);

    let res = app.get("/admin/dashboard").await;
    assert_eq!(res.location(), Some("/user/login"));
    let login = app.get("/user/login").await;
    assert!(login.body.contains("Log in first!"));

    // The stale identity is gone from the session, not just refused once
    assert_eq!(
        app.get("/admin/reservations-all").await.location(),
        Some("/user/login")
    );
}

#[tokio::test]
async fn test_health_endpoints() {
    let mut app = TestApp::new();

    let res = app.get("/health").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, "ok");
    assert!(res.headers.get(header::SET_COOKIE).is_none());

    let res = app.get("/health/ready").await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_pages_carry_security_headers() {
    let mut app = TestApp::new();
    let res = app.get("/").await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
    assert_eq!(
        res.headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
        "nosniff"
    );
    let csp = res
        .headers
        .get(header::CONTENT_SECURITY_POLICY)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(csp.contains("script-src 'self'"));
    assert!(!csp.contains("unsafe-inline"));
    assert!(res.headers.get("x-request-id").is_some());
}

#[tokio::test]
async fn test_unknown_room_page_is_not_found() {
    let (mut app, generals, _) = TestApp::with_rooms().await;
    assert_eq!(app.get(&format!("/rooms/{generals}")).await.status, StatusCode::OK);
    assert_eq!(app.get("/rooms/999").await.status, StatusCode::NOT_FOUND);
}
