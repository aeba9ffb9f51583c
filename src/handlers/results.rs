// src/handlers/results.rs

use axum::{
    Json,
    extract::{Query, RawQuery, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    exam::question_bank,
    models::{
        exam_result::{Grade, ResultRow, ResultSummary},
        question::QuestionReview,
    },
    state::AppState,
    store::LocalBuffer,
};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub enrollment_id: String,
}

/// A stored result with its answers expanded for review.
#[derive(Debug, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub row: ResultRow,
    pub review: Vec<QuestionReview>,
}

/// Searches stored results by enrollment id (case-insensitive substring), newest first.
pub async fn search_results(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let text = params.enrollment_id.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest(
            "Enter an enrollment id to search".to_string(),
        ));
    }

    let hits: Vec<SearchHit> = state
        .remote
        .search_by_enrollment(text)
        .await?
        .into_iter()
        .map(|row| SearchHit {
            review: question_bank::review(&row.answers),
            row,
        })
        .collect();

    Ok(Json(hits))
}

#[derive(Debug, Serialize)]
pub struct SummaryView {
    #[serde(flatten)]
    pub summary: ResultSummary,
    pub grade: Grade,
    pub message: &'static str,
    pub review: Vec<QuestionReview>,
}

/// Renders a results link (`?score=..&correct=..&incorrect=..&answers=..`).
pub async fn result_summary(RawQuery(query): RawQuery) -> Result<impl IntoResponse, AppError> {
    let summary = ResultSummary::from_query(query.as_deref().unwrap_or_default())?;
    let grade = Grade::for_score(summary.score);

    Ok(Json(SummaryView {
        review: question_bank::review(&summary.answers),
        message: grade.message(),
        grade,
        summary,
    }))
}

/// Registrations still waiting in the local buffer.
pub async fn pending_users(
    State(buffer): State<LocalBuffer>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(buffer.list_users().await?))
}
