// src/handlers/exam.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    exam::{ExamSession, SessionStore, session::SessionView},
    models::exam_result::{Grade, ResultSummary},
    state::AppState,
    sync::{Delivery, deliver},
};

fn session_not_found() -> AppError {
    AppError::NotFound("Exam session not found or already submitted".to_string())
}

/// Returns the questions (without answer keys) and current progress.
pub async fn get_session(
    State(sessions): State<SessionStore>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = sessions
        .get(&session_id)
        .await
        .ok_or_else(session_not_found)?;

    Ok(Json(session.view()))
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    /// Index into the question's options.
    pub option: usize,
}

/// Records the chosen option for the question at `index`.
pub async fn answer_question(
    State(sessions): State<SessionStore>,
    Path((session_id, index)): Path<(Uuid, usize)>,
    Json(req): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions
        .with_session(&session_id, |session| {
            session.answer(index, req.option)?;
            Ok::<_, AppError>(session.view())
        })
        .await
        .ok_or_else(session_not_found)??;

    Ok(Json(view))
}

async fn navigate(
    sessions: &SessionStore,
    session_id: &Uuid,
    step: fn(&mut ExamSession) -> bool,
) -> Result<SessionView, AppError> {
    sessions
        .with_session(session_id, |session| {
            step(session);
            session.view()
        })
        .await
        .ok_or_else(session_not_found)
}

/// Moves to the next question; stays put on the last one.
pub async fn next_question(
    State(sessions): State<SessionStore>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = navigate(&sessions, &session_id, ExamSession::next).await?;
    Ok(Json(view))
}

/// Moves to the previous question; stays put on the first one.
pub async fn previous_question(
    State(sessions): State<SessionStore>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = navigate(&sessions, &session_id, ExamSession::previous).await?;
    Ok(Json(view))
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub summary: ResultSummary,
    pub grade: Grade,
    pub message: &'static str,
    /// Query string for a shareable results link.
    pub query: String,
    pub delivery: Delivery,
}

/// Scores the attempt and records it.
///
/// The result is always written to the local buffer first; a failure there
/// aborts the submission and keeps the session open for a retry. When online
/// the result is then pushed straight to the remote store.
pub async fn submit_exam(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .sessions
        .get(&session_id)
        .await
        .ok_or_else(session_not_found)?;

    let result = session.finish(Utc::now());

    let delivery = deliver(
        &state.buffer,
        state.remote.as_ref(),
        &state.connectivity,
        session.user(),
        &result,
    )
    .await?;

    state.sessions.remove(&session_id).await;

    tracing::info!(
        user_id = %result.user_id,
        score = result.score,
        ?delivery,
        "Exam submitted"
    );

    let summary = ResultSummary::from(&result);
    let grade = Grade::for_score(result.score);

    Ok(Json(SubmitResponse {
        query: summary.to_query(),
        message: grade.message(),
        grade,
        summary,
        delivery,
    }))
}
