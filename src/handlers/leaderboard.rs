// src/handlers/leaderboard.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::{
    config::{GLOBAL_LEADERBOARD_LIMIT, QUIZ_LEADERBOARD_LIMIT},
    error::AppError,
    models::leaderboard::GlobalLeaderboardParams,
    store::DynStore,
    utils::jwt::Claims,
};

/// Top finishers of one quiz.
pub async fn quiz_leaderboard(
    State(store): State<DynStore>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if store.get_quiz(id).await?.is_none() {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    let entries = store.quiz_leaderboard(id, QUIZ_LEADERBOARD_LIMIT).await?;

    Ok(Json(entries))
}

/// Recent completions across all quizzes.
pub async fn global_leaderboard(
    State(store): State<DynStore>,
    Query(params): Query<GlobalLeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params
        .limit
        .unwrap_or(GLOBAL_LEADERBOARD_LIMIT)
        .clamp(1, GLOBAL_LEADERBOARD_LIMIT);

    let filter = params
        .quiz
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty());

    let entries = store.global_leaderboard(filter, limit).await?;

    Ok(Json(entries))
}

/// The caller's finished sessions.
pub async fn my_results(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let results = store.student_results(&claims.sub).await?;

    Ok(Json(results))
}
