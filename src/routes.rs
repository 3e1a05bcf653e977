// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, host, leaderboard, profile, quiz, session},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Leaderboards are public; everything else requires a bearer token.
/// * `/api/admin` also requires the admin role.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth = middleware::from_fn_with_state(state.config.clone(), auth_middleware);

    let profile_routes = Router::new()
        .route("/", post(profile::ensure_profile))
        .route("/me", get(profile::get_me).put(profile::update_me))
        .layer(auth.clone());

    let quiz_routes = Router::new()
        .route("/", post(quiz::create_quiz).get(quiz::list_my_quizzes))
        .route("/{id}", get(quiz::get_quiz).delete(quiz::delete_quiz))
        .route("/{id}/start", post(host::start_quiz))
        .route("/{id}/next", post(host::next_question))
        .route("/{id}/reveal", post(host::reveal_results))
        .route("/{id}/end", post(host::end_quiz))
        .route("/{id}/host", get(host::host_view))
        .layer(auth.clone())
        // Public
        .merge(Router::new().route("/{id}/leaderboard", get(leaderboard::quiz_leaderboard)));

    let join_routes = Router::new()
        .route("/{code}", get(session::lookup_code))
        .layer(auth.clone());

    let session_routes = Router::new()
        .route("/", post(session::join_quiz))
        .route("/{id}", get(session::session_view))
        .route(
            "/{id}/answers",
            post(session::submit_answer).get(session::list_my_answers),
        )
        .layer(auth.clone());

    let results_routes = Router::new()
        .route("/", get(leaderboard::my_results))
        .layer(auth.clone());

    let leaderboard_routes = Router::new().route("/", get(leaderboard::global_leaderboard));

    let admin_routes = Router::new()
        .route("/profiles", get(admin::list_profiles))
        .route("/teachers/{id}/approve", post(admin::approve_teacher))
        .route("/teachers/{id}/reject", post(admin::reject_teacher))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(auth);

    Router::new()
        .nest("/api/profile", profile_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/join", join_routes)
        .nest("/api/sessions", session_routes)
        .nest("/api/results", results_routes)
        .nest("/api/leaderboard", leaderboard_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from top to bottom)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
