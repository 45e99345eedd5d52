//! Raw table rows and their conversion into domain types.
//!
//! Every row goes through a checked conversion here; a row that breaks a
//! domain invariant surfaces as `Error::InvalidRecord` instead of leaking a
//! half-valid value into the services.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::certificate::Certificate;
use crate::models::community::{ChatMessage, DiscussionReply};
use crate::models::course::{Course, Lecture, LectureResource};
use crate::models::profile::{Profile, Role};
use crate::models::progress::VideoProgressEntry;
use crate::models::quiz::{Question, Quiz};
use crate::models::quiz_attempt::QuizAttemptRecord;

fn to_u32(field: &str, value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::InvalidRecord(format!("{} is negative: {}", field, value)))
}

fn parse_role(value: &str) -> Result<Role> {
    value.parse().map_err(Error::InvalidRecord)
}

#[derive(Debug, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = Error;

    fn try_from(row: ProfileRow) -> Result<Self> {
        Ok(Profile {
            id: row.id,
            full_name: row.full_name,
            email: row.email,
            role: parse_role(&row.role)?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct CourseRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub instructor_id: Uuid,
    pub instructor_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        Course {
            id: row.id,
            title: row.title,
            description: row.description,
            image_url: row.image_url,
            category: row.category,
            instructor_id: row.instructor_id,
            instructor_name: row.instructor_name,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct LectureRow {
    pub id: Uuid,
    pub course_id: Uuid,
    pub position: i32,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub duration_seconds: Option<i32>,
    pub resources: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<LectureRow> for Lecture {
    type Error = Error;

    fn try_from(row: LectureRow) -> Result<Self> {
        let resources: Vec<LectureResource> = serde_json::from_value(row.resources)
            .map_err(|e| Error::InvalidRecord(format!("lecture {} resources: {}", row.id, e)))?;
        Ok(Lecture {
            id: row.id,
            course_id: row.course_id,
            position: row.position,
            title: row.title,
            description: row.description,
            video_url: row.video_url,
            duration_seconds: row.duration_seconds,
            resources,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct QuizRow {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub passing_score: Option<i32>,
    pub time_limit_minutes: Option<i32>,
    pub questions: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuizRow {
    /// Null passing scores fall back to `default_passing_score`.
    pub fn into_quiz(self, default_passing_score: u8) -> Result<Quiz> {
        let questions: Vec<Question> = serde_json::from_value(self.questions)
            .map_err(|e| Error::InvalidRecord(format!("quiz {} questions: {}", self.id, e)))?;
        let passing_score = match self.passing_score {
            Some(score) => u8::try_from(score).map_err(|_| {
                Error::InvalidRecord(format!("quiz {} passing score {}", self.id, score))
            })?,
            None => default_passing_score,
        };
        let time_limit_minutes = self
            .time_limit_minutes
            .map(|m| to_u32("time_limit_minutes", m))
            .transpose()?;

        let quiz = Quiz {
            id: self.id,
            course_id: self.course_id,
            title: self.title,
            description: self.description,
            passing_score,
            time_limit_minutes,
            questions,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        quiz.check()
            .map_err(|e| Error::InvalidRecord(format!("quiz {}: {}", quiz.id, e)))?;
        Ok(quiz)
    }
}

#[derive(Debug, FromRow)]
pub struct QuizAttemptRow {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub student_id: Uuid,
    pub correct_count: i32,
    pub total_questions: i32,
    pub score_percentage: i32,
    pub passed: bool,
    pub timed_out: bool,
    pub time_taken_seconds: i32,
    pub completed_at: DateTime<Utc>,
}

impl TryFrom<QuizAttemptRow> for QuizAttemptRecord {
    type Error = Error;

    fn try_from(row: QuizAttemptRow) -> Result<Self> {
        Ok(QuizAttemptRecord {
            id: row.id,
            quiz_id: row.quiz_id,
            student_id: row.student_id,
            correct_count: to_u32("correct_count", row.correct_count)?,
            total_questions: to_u32("total_questions", row.total_questions)?,
            score_percentage: to_u32("score_percentage", row.score_percentage)?,
            passed: row.passed,
            timed_out: row.timed_out,
            time_taken_seconds: to_u32("time_taken_seconds", row.time_taken_seconds)?,
            completed_at: row.completed_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct VideoProgressRow {
    pub lecture_id: Uuid,
    pub student_id: Uuid,
    pub watched: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<VideoProgressRow> for VideoProgressEntry {
    fn from(row: VideoProgressRow) -> Self {
        VideoProgressEntry {
            lecture_id: row.lecture_id,
            student_id: row.student_id,
            watched: row.watched,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct CommentRow {
    pub id: Uuid,
    pub course_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct ReplyRow {
    pub id: Uuid,
    pub comment_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl From<ReplyRow> for DiscussionReply {
    fn from(row: ReplyRow) -> Self {
        DiscussionReply {
            id: row.id,
            comment_id: row.comment_id,
            author_id: row.author_id,
            author_name: row.author_name,
            text: row.text,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct ChatMessageRow {
    pub id: Uuid,
    pub course_id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub sender_role: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

impl TryFrom<ChatMessageRow> for ChatMessage {
    type Error = Error;

    fn try_from(row: ChatMessageRow) -> Result<Self> {
        Ok(ChatMessage {
            id: row.id,
            course_id: row.course_id,
            sender_id: row.sender_id,
            sender_name: row.sender_name,
            sender_role: parse_role(&row.sender_role)?,
            content: row.content,
            sent_at: row.sent_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct CertificateRow {
    pub id: Uuid,
    pub code: String,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub quiz_id: Uuid,
    pub student_name: String,
    pub course_title: String,
    pub instructor_name: String,
    pub issued_at: DateTime<Utc>,
}

impl From<CertificateRow> for Certificate {
    fn from(row: CertificateRow) -> Self {
        Certificate {
            id: row.id,
            code: row.code,
            student_id: row.student_id,
            course_id: row.course_id,
            quiz_id: row.quiz_id,
            student_name: row.student_name,
            course_title: row.course_title,
            instructor_name: row.instructor_name,
            issued_at: row.issued_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn quiz_row(questions: JsonValue, passing_score: Option<i32>) -> QuizRow {
        QuizRow {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            title: "React Fundamentals".into(),
            description: None,
            passing_score,
            time_limit_minutes: None,
            questions,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn quiz_row_applies_default_passing_score() {
        let questions = json!([{
            "id": Uuid::new_v4(),
            "text": "What hook stores state?",
            "options": ["useStore", "useState"],
            "correct_option_index": 1
        }]);
        let quiz = quiz_row(questions, None).into_quiz(70).expect("valid quiz");
        assert_eq!(quiz.passing_score, 70);
        assert_eq!(quiz.questions.len(), 1);
    }

    #[test]
    fn quiz_row_with_bad_answer_index_is_rejected() {
        let questions = json!([{
            "id": Uuid::new_v4(),
            "text": "What hook stores state?",
            "options": ["useStore", "useState"],
            "correct_option_index": 5
        }]);
        let err = quiz_row(questions, Some(80)).into_quiz(70).unwrap_err();
        assert!(matches!(err, Error::InvalidRecord(_)));
    }

    #[test]
    fn loosely_shaped_questions_are_rejected() {
        let err = quiz_row(json!({"not": "a list"}), None).into_quiz(70).unwrap_err();
        assert!(matches!(err, Error::InvalidRecord(_)));
    }
}
