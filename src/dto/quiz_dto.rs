use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::models::certificate::Certificate;
use crate::models::quiz::PublicQuestion;
use crate::services::grading_service::QuizResult;
use crate::session::quiz::QuizPhase;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuestionPayload {
    pub text: String,
    #[validate(length(min = 2, message = "Each question needs at least two options"))]
    pub options: Vec<String>,
    pub correct_option_index: usize,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuizPayload {
    #[validate(length(min = 3, message = "Title must be at least 3 characters"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(range(min = 1, max = 100, message = "Passing score must be between 1 and 100"))]
    pub passing_score: Option<u8>,
    #[validate(range(min = 1, message = "Time limit must be at least 1 minute"))]
    pub time_limit_minutes: Option<u32>,
    #[validate(length(min = 1, message = "Please add at least one question to your quiz"), nested)]
    pub questions: Vec<QuestionPayload>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateQuizPayload {
    #[validate(length(min = 3, message = "Title must be at least 3 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, max = 100, message = "Passing score must be between 1 and 100"))]
    pub passing_score: Option<u8>,
    /// Absent keeps the current limit, `null` removes it.
    #[serde(default, deserialize_with = "present")]
    pub time_limit_minutes: Option<Option<u32>>,
    pub questions: Option<Vec<QuestionPayload>>,
}

/// Marks a field as present even when its value is `null`.
fn present<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectAnswerPayload {
    pub question_index: usize,
    pub option_index: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JumpPayload {
    pub question_index: usize,
}

/// What a student sees of a running or finished quiz session.
#[derive(Debug, Clone, Serialize)]
pub struct QuizSessionView {
    pub session_id: uuid::Uuid,
    pub quiz_id: uuid::Uuid,
    pub course_id: uuid::Uuid,
    pub quiz_title: String,
    pub phase: QuizPhase,
    pub current_index: usize,
    pub question_count: usize,
    pub current_question: Option<PublicQuestion>,
    pub answers: Vec<Option<usize>>,
    pub answered_count: usize,
    pub remaining_seconds: u32,
    pub can_go_next: bool,
    pub can_submit: bool,
    pub result: Option<QuizResult>,
    pub certificate: Option<Certificate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransitionResponse {
    /// `false` when the state machine refused the transition.
    pub applied: bool,
    pub session: QuizSessionView,
}
