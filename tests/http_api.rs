use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use roulette_back::{
    config::AppConfig, dao::draw_store::memory::MemoryDrawStore, routes,
    services::game_state_service, state::AppState,
};

const TOKEN: &str = "integration-admin-token";

async fn app() -> Router {
    let config = AppConfig::default().with_admin_token(TOKEN);
    let state = AppState::with_store(config, Arc::new(MemoryDrawStore::new())).await;
    game_state_service::initialize_state(&state, Some(1), None)
        .await
        .unwrap();
    routes::router(state)
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header("x-admin-token", token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn admin_routes_require_a_token() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/admin/draws",
            None,
            json!({ "draw_number": 5, "winning_number": 17 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(post_json(
            "/admin/draws",
            Some("wrong"),
            json!({ "draw_number": 5, "winning_number": 17 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn record_then_read_back() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/admin/draws",
            Some(TOKEN),
            json!({ "draw_number": 5, "winning_number": 17 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["draw"]["winning_color"], "black");

    let response = app
        .clone()
        .oneshot(post_json(
            "/admin/draws",
            Some(TOKEN),
            json!({ "draw_number": 5, "winning_number": 3 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json(response).await;
    assert_eq!(body["success"], false);

    let response = app
        .oneshot(
            Request::get("/public/draws/5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["winning_number"], 17);
}

#[tokio::test]
async fn out_of_range_number_is_a_bad_request() {
    let app = app().await;
    let response = app
        .oneshot(post_json(
            "/admin/draws",
            Some(TOKEN),
            json!({ "draw_number": 5, "winning_number": 37 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn public_state_reports_the_next_draw() {
    let app = app().await;
    let response = app
        .oneshot(Request::get("/public/state").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["current_draw_number"], 0);
    assert_eq!(body["next_draw_number"], 1);
}
