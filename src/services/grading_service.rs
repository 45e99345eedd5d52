use serde::Serialize;
use uuid::Uuid;

use crate::models::quiz::{Question, Quiz};
use crate::session::quiz::QuizOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradedAnswer {
    pub question_id: Uuid,
    pub question_text: String,
    pub selected_option: Option<String>,
    pub correct_option: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizResult {
    pub correct_count: u32,
    pub total_questions: u32,
    pub score_percentage: u32,
    pub passing_score: u8,
    pub passed: bool,
    pub timed_out: bool,
    pub graded: Vec<GradedAnswer>,
}

pub struct GradingService;

impl GradingService {
    pub fn count_correct(questions: &[Question], answers: &[Option<usize>]) -> u32 {
        questions
            .iter()
            .zip(answers)
            .filter(|(q, a)| **a == Some(q.correct_option_index))
            .count() as u32
    }

    /// `round(100 * correct / total)`, halves rounded up; an empty quiz scores 0.
    pub fn score_percentage(correct: u32, total: u32) -> u32 {
        if total == 0 {
            return 0;
        }
        let correct = correct.min(total) as u64;
        let total = total as u64;
        ((200 * correct + total) / (2 * total)) as u32
    }

    pub fn passed(score_percentage: u32, passing_score: u8) -> bool {
        score_percentage >= passing_score as u32
    }

    pub fn grade(quiz: &Quiz, answers: &[Option<usize>], outcome: QuizOutcome) -> QuizResult {
        let graded = quiz
            .questions
            .iter()
            .enumerate()
            .map(|(idx, q)| {
                let selected = answers.get(idx).copied().flatten();
                GradedAnswer {
                    question_id: q.id,
                    question_text: q.text.clone(),
                    selected_option: selected.and_then(|i| q.options.get(i).cloned()),
                    correct_option: q
                        .options
                        .get(q.correct_option_index)
                        .cloned()
                        .unwrap_or_default(),
                    is_correct: selected == Some(q.correct_option_index),
                }
            })
            .collect();

        let score_percentage =
            Self::score_percentage(outcome.correct_count, outcome.total_questions);
        QuizResult {
            correct_count: outcome.correct_count,
            total_questions: outcome.total_questions,
            score_percentage,
            passing_score: quiz.passing_score,
            passed: Self::passed(score_percentage, quiz.passing_score),
            timed_out: outcome.timed_out,
            graded,
        }
    }
}
