// src/models/exam_result.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::form_urlencoded;
use validator::Validate;

use crate::{
    config::{GRADE_EXCELLENT, GRADE_GOOD_EFFORT, GRADE_GREAT_JOB},
    error::AppError,
    models::user::User,
};

/// The option picked for one question, `None` when left unanswered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    pub question_id: i64,
    pub answer: Option<usize>,
}

/// Outcome of one completed exam attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResult {
    pub user_id: String,
    /// Percentage in `0.0..=100.0`.
    pub score: f64,
    pub correct_count: i32,
    pub incorrect_count: i32,
    /// In the order the questions were presented.
    pub answers: Vec<AnsweredQuestion>,
    pub created_at: DateTime<Utc>,
}

/// Represents the 'exam_results' table in the remote store.
/// At most one row per `user_id`.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ResultRow {
    pub user_id: String,
    pub name: String,
    pub enrollment_id: String,
    pub score: f64,
    pub correct_answers: i32,
    pub incorrect_answers: i32,
    #[sqlx(json)]
    pub answers: Vec<AnsweredQuestion>,
    pub created_at: DateTime<Utc>,
}

impl ResultRow {
    pub fn new(user: &User, result: &ExamResult) -> Self {
        Self::with_identity(&user.name, &user.enrollment_id, result)
    }

    /// Maps a result whose user is only known by name and enrollment id
    /// (e.g. taken from a row the remote store already holds).
    pub fn with_identity(name: &str, enrollment_id: &str, result: &ExamResult) -> Self {
        Self {
            user_id: result.user_id.clone(),
            name: name.to_string(),
            enrollment_id: enrollment_id.to_string(),
            score: result.score,
            correct_answers: result.correct_count,
            incorrect_answers: result.incorrect_count,
            answers: result.answers.clone(),
            created_at: result.created_at,
        }
    }
}

/// DTO for the admin edit form. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ResultUpdate {
    #[validate(length(
        min = 2,
        max = 100,
        message = "Name must be between 2 and 100 characters."
    ))]
    pub name: Option<String>,
    #[validate(length(
        min = 4,
        max = 50,
        message = "Enrollment id must be between 4 and 50 characters."
    ))]
    pub enrollment_id: Option<String>,
}

impl ResultUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.enrollment_id.is_none()
    }
}

/// Score band shown with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Excellent,
    GreatJob,
    GoodEffort,
    KeepStudying,
}

impl Grade {
    pub fn for_score(score: f64) -> Self {
        if score >= GRADE_EXCELLENT {
            Grade::Excellent
        } else if score >= GRADE_GREAT_JOB {
            Grade::GreatJob
        } else if score >= GRADE_GOOD_EFFORT {
            Grade::GoodEffort
        } else {
            Grade::KeepStudying
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Grade::Excellent => "Excellent! You're a PWA expert!",
            Grade::GreatJob => "Great Job! You have a solid understanding of PWAs.",
            Grade::GoodEffort => "Good Effort! You're on your way to mastering PWAs.",
            Grade::KeepStudying => "Keep Studying! Review the material and try again.",
        }
    }
}

/// The shareable part of a result, carried in a results URL as
/// `score`, `correct`, `incorrect` and `answers=qid:idx,qid:n,...`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub score: f64,
    pub correct: i32,
    pub incorrect: i32,
    pub answers: Vec<AnsweredQuestion>,
}

/// Marks an unanswered question in the `answers` parameter.
const UNANSWERED: &str = "n";

impl From<&ExamResult> for ResultSummary {
    fn from(result: &ExamResult) -> Self {
        Self {
            score: result.score,
            correct: result.correct_count,
            incorrect: result.incorrect_count,
            answers: result.answers.clone(),
        }
    }
}

impl ResultSummary {
    pub fn to_query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("score", &self.score.to_string())
            .append_pair("correct", &self.correct.to_string())
            .append_pair("incorrect", &self.incorrect.to_string());
        if !self.answers.is_empty() {
            query.append_pair("answers", &encode_answers(&self.answers));
        }
        query.finish()
    }

    /// Parses a results query string. Missing counters default to zero.
    pub fn from_query(query: &str) -> Result<Self, AppError> {
        let mut summary = Self::default();
        let query = query.strip_prefix('?').unwrap_or(query);

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "score" => {
                    summary.score = value
                        .parse()
                        .map_err(|_| AppError::BadRequest(format!("Invalid score '{}'", value)))?
                }
                "correct" => summary.correct = parse_count("correct", &value)?,
                "incorrect" => summary.incorrect = parse_count("incorrect", &value)?,
                "answers" => summary.answers = decode_answers(&value)?,
                _ => {}
            }
        }

        Ok(summary)
    }
}

fn parse_count(key: &str, value: &str) -> Result<i32, AppError> {
    value
        .parse::<i32>()
        .ok()
        .filter(|count| *count >= 0)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid {} '{}'", key, value)))
}

fn encode_answers(answers: &[AnsweredQuestion]) -> String {
    answers
        .iter()
        .map(|a| match a.answer {
            Some(index) => format!("{}:{}", a.question_id, index),
            None => format!("{}:{}", a.question_id, UNANSWERED),
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn decode_answers(raw: &str) -> Result<Vec<AnsweredQuestion>, AppError> {
    raw.split(',')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let invalid = || AppError::BadRequest(format!("Invalid answer pair '{}'", pair));
            let (question_id, answer) = pair.split_once(':').ok_or_else(invalid)?;
            let question_id = question_id.parse::<i64>().map_err(|_| invalid())?;
            let answer = match answer {
                UNANSWERED => None,
                index => Some(index.parse::<usize>().map_err(|_| invalid())?),
            };
            Ok(AnsweredQuestion {
                question_id,
                answer,
            })
        })
        .collect()
}
