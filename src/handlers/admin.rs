// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::exam_result::ResultUpdate,
    state::AppState,
    utils::{
        html::clean_text,
        jwt::{ADMIN_ROLE, sign_jwt},
    },
};

/// DTO for admin login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Authenticates the configured admin and returns a JWT token.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let admin = state
        .admin
        .as_ref()
        .ok_or(AppError::AuthError("Admin login is not configured".to_string()))?;

    if !admin.verify(&payload.username, &payload.password)? {
        tracing::warn!("Rejected admin login for '{}'", payload.username);
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    let token = sign_jwt(
        &admin.username,
        ADMIN_ROLE,
        &state.config.jwt_secret,
        state.config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
    })))
}

/// Lists every stored result, newest first.
/// Admin only.
pub async fn list_results(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let rows = state.remote.list_all().await?;
    Ok(Json(rows))
}

/// Edits the name and/or enrollment id of a stored result.
/// Admin only.
pub async fn update_result(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<ResultUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let changes = ResultUpdate {
        name: payload.name.as_deref().map(clean_text),
        enrollment_id: payload.enrollment_id.as_deref().map(clean_text),
    };

    if changes.is_empty() {
        return Err(AppError::BadRequest("Nothing to update".to_string()));
    }
    // Validated after cleaning so stripped markup cannot satisfy the length rules.
    if let Err(validation_errors) = changes.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    state.remote.update(&user_id, &changes).await?;

    let row = state
        .remote
        .find_by_user_id(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No result stored for user '{}'", user_id)))?;

    Ok(Json(row))
}

/// Deletes the stored result of a user.
/// Admin only.
pub async fn delete_result(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.remote.delete(&user_id).await?;
    tracing::info!(user_id = %user_id, "Exam result deleted");

    Ok(StatusCode::NO_CONTENT)
}
