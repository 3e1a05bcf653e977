// src/handlers/profile.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError,
    models::profile::{EnsureProfileRequest, NewProfile, UpdateProfileRequest},
    store::DynStore,
    utils::jwt::Claims,
};

/// Creates the caller's profile on first use, or returns the stored one.
///
/// The role always comes from the token; teachers start unapproved.
pub async fn ensure_profile(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<EnsureProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let role = claims.role()?;
    let display_name = payload
        .display_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| claims.fallback_name());

    let (profile, created) = store
        .ensure_profile(NewProfile::new(&claims.sub, claims.email.clone(), display_name, role))
        .await?;

    if created {
        tracing::info!("Profile created: {} ({})", profile.id, profile.role);
    }

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(profile)))
}

/// Get current user's profile.
pub async fn get_me(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let profile = store
        .get_profile(&claims.sub)
        .await?
        .ok_or(AppError::NotFound("Profile not found".to_string()))?;

    Ok(Json(profile))
}

/// Renames the caller. Role and approval are left alone.
pub async fn update_me(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let profile = store
        .update_display_name(&claims.sub, payload.display_name.trim())
        .await?
        .ok_or(AppError::NotFound("Profile not found".to_string()))?;

    Ok(Json(profile))
}
