//! In-progress quiz attempt.
//!
//! `QuizAttemptState` holds everything one student's pass through a quiz needs:
//! the question pointer, one answer slot per question and the countdown. It is
//! a plain state machine; invalid transitions leave the state untouched and
//! report `false` (or `None`) instead of failing.

use serde::Serialize;
use std::sync::Arc;

use crate::models::quiz::Quiz;
use crate::services::grading_service::GradingService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizPhase {
    InProgress,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuizOutcome {
    pub correct_count: u32,
    pub total_questions: u32,
    pub timed_out: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running { remaining_seconds: u32 },
    Expired(QuizOutcome),
    /// The attempt was already submitted; the tick had no effect.
    Stopped,
}

#[derive(Debug, Clone)]
pub struct QuizAttemptState {
    quiz: Arc<Quiz>,
    current_index: usize,
    answers: Vec<Option<usize>>,
    remaining_seconds: u32,
    phase: QuizPhase,
    outcome: Option<QuizOutcome>,
}

impl QuizAttemptState {
    pub fn new(quiz: Arc<Quiz>, time_budget_seconds: u32) -> Self {
        let answers = vec![None; quiz.questions.len()];
        Self {
            quiz,
            current_index: 0,
            answers,
            remaining_seconds: time_budget_seconds,
            phase: QuizPhase::InProgress,
            outcome: None,
        }
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    pub fn is_in_progress(&self) -> bool {
        self.phase == QuizPhase::InProgress
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn outcome(&self) -> Option<QuizOutcome> {
        self.outcome
    }

    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    pub fn all_answered(&self) -> bool {
        self.answers.iter().all(Option::is_some)
    }

    pub fn timer_expired(&self) -> bool {
        self.remaining_seconds == 0
    }

    /// Submission needs every answer, unless the countdown already ran out.
    pub fn can_submit(&self) -> bool {
        self.is_in_progress() && (self.all_answered() || self.timer_expired())
    }

    pub fn can_go_next(&self) -> bool {
        self.is_in_progress()
            && self.current_index + 1 < self.answers.len()
            && self.answers[self.current_index].is_some()
    }

    pub fn select_answer(&mut self, question_index: usize, option_index: usize) -> bool {
        if !self.is_in_progress() {
            return false;
        }
        let Some(question) = self.quiz.questions.get(question_index) else {
            return false;
        };
        if option_index >= question.options.len() {
            return false;
        }
        self.answers[question_index] = Some(option_index);
        true
    }

    pub fn next(&mut self) -> bool {
        if !self.can_go_next() {
            return false;
        }
        self.current_index += 1;
        true
    }

    pub fn previous(&mut self) -> bool {
        if !self.is_in_progress() || self.current_index == 0 {
            return false;
        }
        self.current_index -= 1;
        true
    }

    /// Direct navigation; answer completeness is not required.
    pub fn jump_to(&mut self, question_index: usize) -> bool {
        if !self.is_in_progress() || question_index >= self.answers.len() {
            return false;
        }
        self.current_index = question_index;
        true
    }

    pub fn tick(&mut self) -> TickOutcome {
        if !self.is_in_progress() {
            return TickOutcome::Stopped;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            let outcome = self.finish(true);
            return TickOutcome::Expired(outcome);
        }
        TickOutcome::Running {
            remaining_seconds: self.remaining_seconds,
        }
    }

    pub fn submit(&mut self) -> Option<QuizOutcome> {
        if !self.can_submit() {
            return None;
        }
        let timed_out = self.timer_expired();
        Some(self.finish(timed_out))
    }

    fn finish(&mut self, timed_out: bool) -> QuizOutcome {
        let outcome = QuizOutcome {
            correct_count: GradingService::count_correct(&self.quiz.questions, &self.answers),
            total_questions: self.answers.len() as u32,
            timed_out,
        };
        self.phase = QuizPhase::Submitted;
        self.outcome = Some(outcome);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::{Question, DEFAULT_PASSING_SCORE};
    use chrono::Utc;
    use uuid::Uuid;

    fn quiz_with(correct: &[usize]) -> Arc<Quiz> {
        let now = Utc::now();
        Arc::new(Quiz {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            title: "Python Basics".into(),
            description: None,
            passing_score: DEFAULT_PASSING_SCORE,
            time_limit_minutes: None,
            questions: correct
                .iter()
                .enumerate()
                .map(|(i, c)| Question {
                    id: Uuid::new_v4(),
                    text: format!("Question {}", i + 1),
                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    correct_option_index: *c,
                })
                .collect(),
            created_at: now,
            updated_at: now,
        })
    }

    #[test]
    fn counts_matching_positions_on_submit() {
        let mut s = QuizAttemptState::new(quiz_with(&[0, 1, 2]), 360);
        assert!(s.select_answer(0, 0));
        assert!(s.select_answer(1, 3));
        assert!(s.select_answer(2, 2));

        let outcome = s.submit().expect("all answered");
        assert_eq!(outcome.correct_count, 2);
        assert_eq!(outcome.total_questions, 3);
        assert!(!outcome.timed_out);
        assert_eq!(s.phase(), QuizPhase::Submitted);
    }

    #[test]
    fn submit_requires_every_answer_before_timeout() {
        let mut s = QuizAttemptState::new(quiz_with(&[0, 1]), 240);
        s.select_answer(0, 0);
        assert!(s.submit().is_none());
        assert!(s.is_in_progress());
    }

    #[test]
    fn select_answer_overwrites_and_is_idempotent() {
        let mut s = QuizAttemptState::new(quiz_with(&[0, 1]), 240);
        s.select_answer(1, 2);
        s.select_answer(1, 2);
        assert_eq!(s.answers(), &[None, Some(2)]);
        s.select_answer(1, 1);
        assert_eq!(s.answers(), &[None, Some(1)]);
        assert_eq!(s.current_index(), 0);
    }

    #[test]
    fn select_answer_ignores_out_of_range_indices() {
        let mut s = QuizAttemptState::new(quiz_with(&[0]), 120);
        assert!(!s.select_answer(1, 0));
        assert!(!s.select_answer(0, 4));
        assert_eq!(s.answers(), &[None]);
    }

    #[test]
    fn next_needs_an_answer_and_clamps() {
        let mut s = QuizAttemptState::new(quiz_with(&[0, 1]), 240);
        assert!(!s.next());
        s.select_answer(0, 1);
        assert!(s.next());
        assert_eq!(s.current_index(), 1);
        s.select_answer(1, 1);
        assert!(!s.next());
        assert_eq!(s.current_index(), 1);
        assert!(s.previous());
        assert!(!s.previous());
        assert_eq!(s.current_index(), 0);
    }

    #[test]
    fn jump_ignores_answer_completeness() {
        let mut s = QuizAttemptState::new(quiz_with(&[0, 1, 2]), 360);
        assert!(s.jump_to(2));
        assert_eq!(s.current_index(), 2);
        assert!(!s.jump_to(3));
        assert_eq!(s.current_index(), 2);
    }

    #[test]
    fn timer_expiry_forces_submission() {
        let mut s = QuizAttemptState::new(quiz_with(&[0, 1]), 2);
        assert_eq!(s.tick(), TickOutcome::Running { remaining_seconds: 1 });
        let TickOutcome::Expired(outcome) = s.tick() else {
            panic!("expected expiry");
        };
        assert_eq!(outcome.correct_count, 0);
        assert_eq!(outcome.total_questions, 2);
        assert!(outcome.timed_out);
        assert_eq!(s.tick(), TickOutcome::Stopped);
    }

    #[test]
    fn transitions_after_submit_are_no_ops() {
        let mut s = QuizAttemptState::new(quiz_with(&[0]), 120);
        s.select_answer(0, 0);
        s.submit().expect("submit");
        assert!(!s.select_answer(0, 1));
        assert!(!s.jump_to(0));
        assert!(s.submit().is_none());
        assert_eq!(s.answers(), &[Some(0)]);
    }
}
