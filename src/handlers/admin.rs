// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::profile::{Profile, ProfileListParams, Role},
    store::DynStore,
};

/// Lists profiles, newest first.
/// Admin only.
pub async fn list_profiles(
    State(store): State<DynStore>,
    Query(params): Query<ProfileListParams>,
) -> Result<impl IntoResponse, AppError> {
    let profiles = store.list_profiles(params.role, params.pending).await?;

    Ok(Json(profiles))
}

/// Approves a teacher account so it can author and host quizzes.
/// Admin only.
pub async fn approve_teacher(
    State(store): State<DynStore>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    set_teacher_approval(&store, &id, true).await
}

/// Revokes (or declines) a teacher's approval.
/// Admin only.
pub async fn reject_teacher(
    State(store): State<DynStore>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    set_teacher_approval(&store, &id, false).await
}

async fn set_teacher_approval(
    store: &DynStore,
    id: &str,
    approved: bool,
) -> Result<Json<Profile>, AppError> {
    let profile = store
        .get_profile(id)
        .await?
        .ok_or(AppError::NotFound("Profile not found".to_string()))?;

    if profile.role != Role::Teacher {
        return Err(AppError::BadRequest(format!(
            "Profile '{}' is not a teacher",
            id
        )));
    }

    let updated = store
        .set_approval(id, approved)
        .await?
        .ok_or(AppError::NotFound("Profile not found".to_string()))?;

    tracing::info!(
        "Teacher {} {}",
        updated.id,
        if approved { "approved" } else { "rejected" }
    );

    Ok(Json(updated))
}
