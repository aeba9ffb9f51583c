// src/models/question.rs

use serde::Serialize;

/// A multiple-choice question from the static bank.
#[derive(Debug, PartialEq, Eq)]
pub struct Question {
    pub id: i64,
    pub prompt: &'static str,
    pub options: &'static [&'static str],
    /// Index into `options` of the correct answer.
    pub correct_index: usize,
}

impl Question {
    pub fn is_correct(&self, chosen: Option<usize>) -> bool {
        chosen == Some(self.correct_index)
    }
}

/// DTO for sending a question to the examinee (excludes the answer key).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub prompt: String,
    pub options: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id,
            prompt: question.prompt.to_string(),
            options: question.options.iter().map(|o| o.to_string()).collect(),
        }
    }
}

/// One answered question expanded against the bank, for result review.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionReview {
    pub question_id: i64,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub chosen: Option<usize>,
    pub is_correct: bool,
}

impl QuestionReview {
    pub fn new(question: &Question, chosen: Option<usize>) -> Self {
        Self {
            question_id: question.id,
            prompt: question.prompt.to_string(),
            options: question.options.iter().map(|o| o.to_string()).collect(),
            correct_index: question.correct_index,
            chosen,
            is_correct: question.is_correct(chosen),
        }
    }
}
