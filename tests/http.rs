//! HTTP surface tests driven through the router with `tower::oneshot`.

use std::path::PathBuf;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;
use uuid::Uuid;

use airpool_server::app::AppState;
use airpool_server::config::Config;
use airpool_server::http::build_router;
use airpool_server::room::ROOM_CODE_LEN;

fn test_config(static_dir: PathBuf) -> Config {
    Config {
        server_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "warn".to_string(),
        static_dir,
    }
}

/// Static dir with a room page, unique per test
fn static_dir_with_room_page() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("airpool-test-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("room.html"), "<html>match</html>").unwrap();
    dir
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_room_counts() {
    let state = AppState::new(test_config(static_dir_with_room_page()));
    state.rooms.create_room().unwrap();
    let router = build_router(state);

    let response = router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["active_rooms"], 1);
}

#[tokio::test]
async fn room_new_redirects_to_a_fresh_code() {
    let state = AppState::new(test_config(static_dir_with_room_page()));
    let router = build_router(state.clone());

    let response = router
        .clone()
        .oneshot(Request::get("/room/new").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()["location"].to_str().unwrap().to_string();
    let code = location.strip_prefix("/room/").unwrap();
    assert_eq!(code.len(), ROOM_CODE_LEN);
    assert!(code.chars().all(|c| c.is_ascii_uppercase()));
    assert!(state.rooms.get(code).is_ok());

    // The join page for that code serves the client bundle
    let response = router
        .oneshot(Request::get(location.as_str()).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_room_bounces_to_the_landing_page() {
    let state = AppState::new(test_config(static_dir_with_room_page()));
    let router = build_router(state);

    let response = router
        .oneshot(Request::get("/room/ZZZZZ").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/?error=invalid_room");
}
