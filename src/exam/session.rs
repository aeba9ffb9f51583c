// src/exam/session.rs

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

use crate::{
    error::AppError,
    models::{
        exam_result::{AnsweredQuestion, ExamResult},
        question::{PublicQuestion, Question},
        user::User,
    },
};

/// Outcome of scoring an answer sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub correct: usize,
    pub incorrect: usize,
    /// `100 * correct / total`, or 0 for an empty sheet.
    pub percentage: f64,
}

/// Scores `answers` positionally against `questions`.
/// Unanswered questions count as incorrect.
pub fn score_answers(questions: &[&Question], answers: &[Option<usize>]) -> Score {
    let total = questions.len();

    if total == 0 {
        return Score {
            correct: 0,
            incorrect: 0,
            percentage: 0.0,
        };
    }

    let correct = questions
        .iter()
        .zip(answers)
        .filter(|(question, chosen)| question.is_correct(**chosen))
        .count();

    Score {
        correct,
        incorrect: total - correct,
        percentage: 100.0 * correct as f64 / total as f64,
    }
}

/// Progress snapshot sent to the examinee.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub user: User,
    pub questions: Vec<PublicQuestion>,
    pub answers: Vec<Option<usize>>,
    pub answered: usize,
    pub total: usize,
    /// Index of the question the examinee is looking at.
    pub current: usize,
}

/// One in-progress exam attempt for a registered user.
#[derive(Debug, Clone)]
pub struct ExamSession {
    user: User,
    questions: Vec<&'static Question>,
    answers: Vec<Option<usize>>,
    current: usize,
    started_at: DateTime<Utc>,
}

impl ExamSession {
    /// Draws `count` distinct questions from `bank` (all of them if the bank is smaller).
    pub fn start<R: Rng + ?Sized>(
        user: User,
        bank: &'static [Question],
        count: usize,
        rng: &mut R,
    ) -> Self {
        let amount = count.min(bank.len());
        let questions: Vec<&'static Question> = rand::seq::index::sample(rng, bank.len(), amount)
            .into_iter()
            .map(|i| &bank[i])
            .collect();

        Self {
            user,
            answers: vec![None; questions.len()],
            questions,
            current: 0,
            started_at: Utc::now(),
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn questions(&self) -> &[&'static Question] {
        &self.questions
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Records `option` as the answer to the question at `index`, replacing any earlier choice.
    pub fn answer(&mut self, index: usize, option: usize) -> Result<(), AppError> {
        let question = self.questions.get(index).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Question index {} is out of range (exam has {} questions)",
                index,
                self.questions.len()
            ))
        })?;

        if option >= question.options.len() {
            return Err(AppError::BadRequest(format!(
                "Option {} does not exist for question {}",
                option, question.id
            )));
        }

        self.answers[index] = Some(option);
        Ok(())
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Moves to the next question. Returns `false` on the last one.
    pub fn next(&mut self) -> bool {
        if self.current + 1 >= self.questions.len() {
            return false;
        }
        self.current += 1;
        true
    }

    /// Moves to the previous question. Returns `false` on the first one.
    pub fn previous(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.answered_count() == self.questions.len()
    }

    pub fn score(&self) -> Score {
        score_answers(&self.questions, &self.answers)
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            user: self.user.clone(),
            questions: self.questions.iter().map(|q| PublicQuestion::from(*q)).collect(),
            answers: self.answers.clone(),
            answered: self.answered_count(),
            total: self.questions.len(),
            current: self.current,
        }
    }

    /// Assembles the result record for this attempt.
    pub fn finish(&self, finished_at: DateTime<Utc>) -> ExamResult {
        let score = self.score();

        ExamResult {
            user_id: self.user.id.clone(),
            score: score.percentage,
            correct_count: score.correct as i32,
            incorrect_count: score.incorrect as i32,
            answers: self
                .questions
                .iter()
                .zip(&self.answers)
                .map(|(question, answer)| AnsweredQuestion {
                    question_id: question.id,
                    answer: *answer,
                })
                .collect(),
            created_at: finished_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::question_bank::QUESTION_BANK;
    use rand::{SeedableRng, rngs::StdRng};
    use std::collections::HashSet;

    fn session(count: usize, seed: u64) -> ExamSession {
        let mut rng = StdRng::seed_from_u64(seed);
        ExamSession::start(User::new("Ada", "A0001"), QUESTION_BANK, count, &mut rng)
    }

    fn wrong_option(question: &Question) -> usize {
        (question.correct_index + 1) % question.options.len()
    }

    #[test]
    fn test_selection_is_without_replacement() {
        for seed in 0..20 {
            let s = session(10, seed);
            let ids: HashSet<i64> = s.questions().iter().map(|q| q.id).collect();
            assert_eq!(ids.len(), 10);
        }

        let s = session(4, 7);
        assert_eq!(s.questions().len(), 4);
    }

    #[test]
    fn test_count_is_capped_by_bank_size() {
        let s = session(50, 1);
        assert_eq!(s.questions().len(), QUESTION_BANK.len());
    }

    #[test]
    fn test_seven_of_ten_scores_seventy() {
        let mut s = session(10, 42);
        let questions: Vec<&Question> = s.questions().to_vec();
        for (i, question) in questions.iter().enumerate() {
            let option = if i < 7 {
                question.correct_index
            } else {
                wrong_option(question)
            };
            s.answer(i, option).unwrap();
        }

        assert!(s.is_complete());
        let result = s.finish(Utc::now());
        assert_eq!(result.score, 70.0);
        assert_eq!(result.correct_count, 7);
        assert_eq!(result.incorrect_count, 3);
        assert_eq!(result.answers.len(), 10);
        assert_eq!(result.user_id, s.user().id);
    }

    #[test]
    fn test_counts_always_sum_to_total() {
        let mut rng = StdRng::seed_from_u64(99);
        for n in 1..=QUESTION_BANK.len() {
            let mut s = ExamSession::start(User::new("Ada", "A0001"), QUESTION_BANK, n, &mut rng);
            let questions: Vec<&Question> = s.questions().to_vec();
            for (i, question) in questions.iter().enumerate() {
                // Leave every third question unanswered.
                if i % 3 == 2 {
                    continue;
                }
                let option = rng.gen_range(0..question.options.len());
                s.answer(i, option).unwrap();
            }

            let score = s.score();
            assert_eq!(score.correct + score.incorrect, n);
            assert_eq!(score.percentage, 100.0 * score.correct as f64 / n as f64);
        }
    }

    #[test]
    fn test_unanswered_questions_are_incorrect() {
        let s = session(3, 5);
        let result = s.finish(Utc::now());
        assert_eq!(result.correct_count, 0);
        assert_eq!(result.incorrect_count, 3);
        assert_eq!(result.score, 0.0);
        assert!(result.answers.iter().all(|a| a.answer.is_none()));
    }

    #[test]
    fn test_answer_can_be_changed() {
        let mut s = session(2, 3);
        let question = s.questions()[0];
        s.answer(0, wrong_option(question)).unwrap();
        s.answer(0, question.correct_index).unwrap();
        assert_eq!(s.score().correct, 1);
        assert_eq!(s.answered_count(), 1);
    }

    #[test]
    fn test_answer_rejects_out_of_range() {
        let mut s = session(2, 3);
        assert!(matches!(s.answer(2, 0), Err(AppError::BadRequest(_))));
        assert!(matches!(s.answer(0, 9), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_navigation_stays_in_bounds() {
        let mut s = session(3, 8);
        assert_eq!(s.current_index(), 0);
        assert!(!s.previous());

        assert!(s.next());
        assert!(s.next());
        assert!(!s.next());
        assert_eq!(s.current_index(), 2);

        assert!(s.previous());
        assert_eq!(s.view().current, 1);
    }

    #[test]
    fn test_empty_sheet_scores_zero() {
        let score = score_answers(&[], &[]);
        assert_eq!(score.percentage, 0.0);
        assert_eq!(score.correct + score.incorrect, 0);
    }

    #[test]
    fn test_view_hides_answer_key() {
        let s = session(3, 11);
        let json = serde_json::to_value(s.view()).unwrap();
        assert_eq!(json["total"], 3);
        assert!(json["questions"][0].get("correct_index").is_none());
    }
}
