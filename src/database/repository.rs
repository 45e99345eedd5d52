//! Persistence contracts.
//!
//! Services depend on these traits only; `main` wires in `PgRepository`, tests
//! use `InMemoryRepository`. Lookups that may miss return `Option` so callers
//! decide how "absent" is reported.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::certificate::Certificate;
use crate::models::community::{ChatMessage, DiscussionComment, DiscussionReply};
use crate::models::course::{Course, Lecture};
use crate::models::profile::Profile;
use crate::models::progress::VideoProgressEntry;
use crate::models::quiz::Quiz;
use crate::models::quiz_attempt::QuizAttemptRecord;

#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn upsert_profile(&self, profile: &Profile) -> Result<()>;

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>>;

    async fn list_courses(&self) -> Result<Vec<Course>>;

    async fn get_course(&self, id: Uuid) -> Result<Option<Course>>;

    async fn insert_course(&self, course: &Course) -> Result<()>;

    async fn update_course(&self, course: &Course) -> Result<()>;

    /// Returns `false` when no course had that id.
    async fn delete_course(&self, id: Uuid) -> Result<bool>;

    /// Lectures of a course ordered by position.
    async fn list_lectures(&self, course_id: Uuid) -> Result<Vec<Lecture>>;

    async fn get_lecture(&self, id: Uuid) -> Result<Option<Lecture>>;

    async fn insert_lecture(&self, lecture: &Lecture) -> Result<()>;

    async fn update_lecture(&self, lecture: &Lecture) -> Result<()>;

    async fn delete_lecture(&self, id: Uuid) -> Result<bool>;

    async fn is_enrolled(&self, course_id: Uuid, student_id: Uuid) -> Result<bool>;

    /// Returns `false` if the student was already enrolled.
    async fn enroll(&self, course_id: Uuid, student_id: Uuid, at: DateTime<Utc>) -> Result<bool>;

    async fn enrollment_count(&self, course_id: Uuid) -> Result<i64>;

    async fn enrolled_course_ids(&self, student_id: Uuid) -> Result<Vec<Uuid>>;
}

#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn list_quizzes(&self, course_id: Uuid) -> Result<Vec<Quiz>>;

    async fn get_quiz(&self, id: Uuid) -> Result<Option<Quiz>>;

    async fn insert_quiz(&self, quiz: &Quiz) -> Result<()>;

    async fn update_quiz(&self, quiz: &Quiz) -> Result<()>;

    async fn delete_quiz(&self, id: Uuid) -> Result<bool>;

    async fn record_attempt(&self, attempt: &QuizAttemptRecord) -> Result<()>;

    /// Newest first.
    async fn list_attempts(&self, quiz_id: Uuid, student_id: Uuid) -> Result<Vec<QuizAttemptRecord>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Idempotent on (lecture_id, student_id).
    async fn upsert_watched(&self, entry: &VideoProgressEntry) -> Result<()>;

    async fn is_watched(&self, lecture_id: Uuid, student_id: Uuid) -> Result<bool>;

    /// Every watched flag the student has, across all courses.
    async fn watched_entries(&self, student_id: Uuid) -> Result<Vec<VideoProgressEntry>>;

    async fn clear_watched(&self, lecture_id: Uuid, student_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait CommunityRepository: Send + Sync {
    async fn insert_comment(&self, comment: &DiscussionComment) -> Result<()>;

    async fn get_comment(&self, id: Uuid) -> Result<Option<DiscussionComment>>;

    /// Newest comment first, replies oldest first.
    async fn list_comments(&self, course_id: Uuid) -> Result<Vec<DiscussionComment>>;

    async fn insert_reply(&self, reply: &DiscussionReply) -> Result<()>;

    async fn insert_chat_message(&self, message: &ChatMessage) -> Result<()>;

    /// Oldest first, at most `limit` of the most recent messages.
    async fn list_chat_messages(&self, course_id: Uuid, limit: i64) -> Result<Vec<ChatMessage>>;
}

#[async_trait]
pub trait CertificateRepository: Send + Sync {
    async fn find_certificate(&self, student_id: Uuid, course_id: Uuid) -> Result<Option<Certificate>>;

    async fn get_certificate(&self, id: Uuid) -> Result<Option<Certificate>>;

    /// Inserts unless a certificate for the same (student, course) exists;
    /// returns whichever certificate is stored afterwards.
    async fn insert_certificate(&self, certificate: &Certificate) -> Result<Certificate>;

    async fn list_certificates(&self, student_id: Uuid) -> Result<Vec<Certificate>>;
}

/// Everything the application needs from its store.
pub trait Repository:
    CourseRepository + QuizRepository + ProgressRepository + CommunityRepository + CertificateRepository
{
}

impl<T> Repository for T where
    T: CourseRepository
        + QuizRepository
        + ProgressRepository
        + CommunityRepository
        + CertificateRepository
{
}
