// src/handlers/register.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::EXAM_QUESTION_COUNT,
    error::AppError,
    exam::{ExamSession, question_bank::QUESTION_BANK},
    models::{
        question::PublicQuestion,
        user::{RegisterRequest, User},
    },
    state::AppState,
    store::RemoteError,
    utils::html::clean_text,
};

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// Pass this to the exam routes; it replaces any client-side "current user".
    pub session_id: Uuid,
    pub user: User,
    pub questions: Vec<PublicQuestion>,
    /// True when the registration was staged locally because the remote is offline.
    pub buffered: bool,
}

/// Registers an examinee and opens an exam session.
///
/// * Online: rejects an enrollment id that already has a stored result.
/// * Offline: stages the user in the local buffer right away.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Length rules apply to what will be stored, not to the raw markup.
    let payload = RegisterRequest {
        name: clean_text(&payload.name),
        enrollment_id: clean_text(&payload.enrollment_id),
    };
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let RegisterRequest {
        name,
        enrollment_id,
    } = payload;

    let mut online = state.connectivity.is_online();
    if online {
        match state.remote.exists_for_enrollment(&enrollment_id).await {
            Ok(true) => {
                return Err(AppError::Conflict(format!(
                    "Enrollment id '{}' has already taken the exam",
                    enrollment_id
                )));
            }
            Ok(false) => {}
            Err(RemoteError::NotConfigured) => online = false,
            Err(e) => {
                tracing::warn!("Duplicate check failed, registering offline: {}", e);
                state.connectivity.set_online(false);
                online = false;
            }
        }
    }

    let user = User::new(name, enrollment_id);

    if !online {
        state.buffer.put_user(&user).await?;
        tracing::info!(user_id = %user.id, "Registration buffered while offline");
    }

    let session = ExamSession::start(
        user.clone(),
        QUESTION_BANK,
        EXAM_QUESTION_COUNT,
        &mut rand::thread_rng(),
    );
    let questions = session.view().questions;
    let session_id = state.sessions.insert(session).await;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            session_id,
            user,
            questions,
            buffered: !online,
        }),
    ))
}
