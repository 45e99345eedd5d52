use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of one submitted quiz session, kept for the student's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAttemptRecord {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub student_id: Uuid,
    pub correct_count: u32,
    pub total_questions: u32,
    pub score_percentage: u32,
    pub passed: bool,
    pub timed_out: bool,
    pub time_taken_seconds: u32,
    pub completed_at: DateTime<Utc>,
}
