// tests/router_tests.rs
//
// Drives the router in-process, without binding a socket.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use quizhub::{
    config::Config,
    models::profile::Role,
    routes,
    state::AppState,
    store::MemoryStore,
    utils::jwt::sign_jwt,
};
use tower::ServiceExt;

const SECRET: &str = "router_test_secret";

fn app() -> axum::Router {
    routes::create_router(AppState {
        store: Arc::new(MemoryStore::new()),
        config: Config::in_memory(SECRET),
    })
}

async fn status_of(request: Request<Body>) -> StatusCode {
    app().oneshot(request).await.unwrap().status()
}

#[tokio::test]
async fn public_leaderboards_need_no_token() {
    let request = Request::get("/api/leaderboard").body(Body::empty()).unwrap();
    assert_eq!(status_of(request).await, StatusCode::OK);

    let request = Request::get("/api/quizzes/42/leaderboard")
        .body(Body::empty())
        .unwrap();
    assert_eq!(status_of(request).await, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_routes_reject_other_roles() {
    let token = sign_jwt("t-1", Role::Teacher, None, SECRET, 60).unwrap();
    let request = Request::get("/api/admin/profiles")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    assert_eq!(status_of(request).await, StatusCode::FORBIDDEN);

    let token = sign_jwt("a-1", Role::Admin, None, SECRET, 60).unwrap();
    let request = Request::get("/api/admin/profiles")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    assert_eq!(status_of(request).await, StatusCode::OK);
}

#[tokio::test]
async fn tokens_signed_with_another_secret_are_rejected() {
    let token = sign_jwt("s-1", Role::Student, None, "some_other_secret", 60).unwrap();
    let request = Request::get("/api/results")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn join_lookup_requires_token() {
    let request = Request::get("/api/join/ABC234").body(Body::empty()).unwrap();
    assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED);
}
