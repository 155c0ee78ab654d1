//! The single-room availability endpoint used by room pages.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use lodge_core::StayRange;
use lodge_integration_tests::TestApp;
use lodge_site::db::BookingRepository;
use lodge_site::routes::booking::AvailabilityResponse;

#[tokio::test]
async fn test_free_room_is_available() {
    let (mut app, generals, _) = TestApp::with_rooms().await;
    let room = generals.to_string();

    let res = app
        .post_form(
            "/bookingjson",
            &[("start", "2030-03-01"), ("end", "2030-03-03"), ("room_id", &room)],
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let answer: AvailabilityResponse = res.json();
    assert!(answer.ok);
    assert_eq!(answer.message, "Available!");
    assert_eq!(answer.room_id, room);
    assert_eq!(answer.start_date, "2030-03-01");
    assert_eq!(answer.end_date, "2030-03-03");
}

#[tokio::test]
async fn test_blocked_room_is_not_available() {
    let (mut app, generals, majors) = TestApp::with_rooms().await;
    app.repo
        .add_owner_block(generals, StayRange::parse("2030-03-02", "2030-03-05").unwrap())
        .await
        .unwrap();

    let res = app
        .post_form(
            "/bookingjson",
            &[
                ("start", "2030-03-01"),
                ("end", "2030-03-03"),
                ("room_id", &generals.to_string()),
            ],
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let answer: AvailabilityResponse = res.json();
    assert!(!answer.ok);
    assert_eq!(answer.message, "Not available for these dates");

    // Leaving on the block's first day does not collide with it
    let res = app
        .post_form(
            "/bookingjson",
            &[
                ("start", "2030-03-01"),
                ("end", "2030-03-02"),
                ("room_id", &generals.to_string()),
            ],
        )
        .await;
    assert!(res.json::<AvailabilityResponse>().ok);

    let res = app
        .post_form(
            "/bookingjson",
            &[
                ("start", "2030-03-01"),
                ("end", "2030-03-03"),
                ("room_id", &majors.to_string()),
            ],
        )
        .await;
    assert!(res.json::<AvailabilityResponse>().ok);
}

#[tokio::test]
async fn test_bad_input_is_rejected() {
    let (mut app, generals, _) = TestApp::with_rooms().await;

    let res = app
        .post_form(
            "/bookingjson",
            &[("start", "2030-03-01"), ("end", "2030-03-03"), ("room_id", "abc")],
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let answer: AvailabilityResponse = res.json();
    assert!(!answer.ok);
    assert_eq!(answer.message, "Invalid room");
    assert_eq!(answer.room_id, "abc");

    let res = app
        .post_form(
            "/bookingjson",
            &[("start", "2030-03-01"), ("end", "2030-03-03"), ("room_id", "999")],
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<AvailabilityResponse>().message, "Invalid room");

    let res = app
        .post_form(
            "/bookingjson",
            &[
                ("start", "2030-03-03"),
                ("end", "2030-03-01"),
                ("room_id", &generals.to_string()),
            ],
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        res.json::<AvailabilityResponse>().message,
        "departure must be after arrival"
    );

    let res = app
        .post_form(
            "/bookingjson",
            &[
                ("start", "tomorrow"),
                ("end", "2030-03-01"),
                ("room_id", &generals.to_string()),
            ],
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(!res.json::<AvailabilityResponse>().ok);
}

#[tokio::test]
async fn test_token_in_header_is_accepted() {
    let (mut app, generals, _) = TestApp::with_rooms().await;

    let res = app
        .post_form_with_csrf_header(
            "/bookingjson",
            &[
                ("start", "2030-04-01"),
                ("end", "2030-04-02"),
                ("room_id", &generals.to_string()),
            ],
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.json::<AvailabilityResponse>().ok);
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let (mut app, generals, _) = TestApp::with_rooms().await;
    app.get("/").await;

    let res = app
        .post_form_raw(
            "/bookingjson",
            &[
                ("start", "2030-04-01"),
                ("end", "2030-04-02"),
                ("room_id", &generals.to_string()),
            ],
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}
