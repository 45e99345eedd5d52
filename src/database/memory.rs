use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::database::repository::{
    CertificateRepository, CommunityRepository, CourseRepository, ProgressRepository,
    QuizRepository,
};
use crate::error::{Error, Result};
use crate::models::certificate::Certificate;
use crate::models::community::{ChatMessage, DiscussionComment, DiscussionReply};
use crate::models::course::{Course, Enrollment, Lecture};
use crate::models::profile::Profile;
use crate::models::progress::VideoProgressEntry;
use crate::models::quiz::Quiz;
use crate::models::quiz_attempt::QuizAttemptRecord;

#[derive(Default)]
struct Store {
    profiles: HashMap<Uuid, Profile>,
    courses: HashMap<Uuid, Course>,
    lectures: HashMap<Uuid, Lecture>,
    enrollments: HashMap<(Uuid, Uuid), Enrollment>,
    quizzes: HashMap<Uuid, Quiz>,
    attempts: Vec<QuizAttemptRecord>,
    progress: HashMap<(Uuid, Uuid), VideoProgressEntry>,
    comments: HashMap<Uuid, DiscussionComment>,
    chat: Vec<ChatMessage>,
    certificates: HashMap<Uuid, Certificate>,
}

/// Process-local store used by tests and local demos.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    store: Arc<Mutex<Store>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored watched-flag rows, across all students.
    pub fn progress_row_count(&self) -> Result<usize> {
        Ok(self.lock()?.progress.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Store>> {
        self.store
            .lock()
            .map_err(|e| Error::Internal(format!("in-memory store poisoned: {}", e)))
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        self.lock()?.profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        Ok(self.lock()?.profiles.get(&id).cloned())
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        let mut courses: Vec<Course> = self.lock()?.courses.values().cloned().collect();
        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(courses)
    }

    async fn get_course(&self, id: Uuid) -> Result<Option<Course>> {
        Ok(self.lock()?.courses.get(&id).cloned())
    }

    async fn insert_course(&self, course: &Course) -> Result<()> {
        self.lock()?.courses.insert(course.id, course.clone());
        Ok(())
    }

    async fn update_course(&self, course: &Course) -> Result<()> {
        let mut store = self.lock()?;
        let Some(existing) = store.courses.get_mut(&course.id) else {
            return Err(Error::NotFound("Course not found".to_string()));
        };
        *existing = course.clone();
        Ok(())
    }

    async fn delete_course(&self, id: Uuid) -> Result<bool> {
        let mut store = self.lock()?;
        if store.courses.remove(&id).is_none() {
            return Ok(false);
        }
        let lecture_ids: Vec<Uuid> = store
            .lectures
            .values()
            .filter(|l| l.course_id == id)
            .map(|l| l.id)
            .collect();
        store.lectures.retain(|_, l| l.course_id != id);
        store.progress.retain(|(lecture_id, _), _| !lecture_ids.contains(lecture_id));
        store.enrollments.retain(|(course_id, _), _| *course_id != id);
        let quiz_ids: Vec<Uuid> = store
            .quizzes
            .values()
            .filter(|q| q.course_id == id)
            .map(|q| q.id)
            .collect();
        store.quizzes.retain(|_, q| q.course_id != id);
        store.attempts.retain(|a| !quiz_ids.contains(&a.quiz_id));
        store.comments.retain(|_, c| c.course_id != id);
        store.chat.retain(|m| m.course_id != id);
        store.certificates.retain(|_, c| c.course_id != id);
        Ok(true)
    }

    async fn list_lectures(&self, course_id: Uuid) -> Result<Vec<Lecture>> {
        let mut lectures: Vec<Lecture> = self
            .lock()?
            .lectures
            .values()
            .filter(|l| l.course_id == course_id)
            .cloned()
            .collect();
        lectures.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(lectures)
    }

    async fn get_lecture(&self, id: Uuid) -> Result<Option<Lecture>> {
        Ok(self.lock()?.lectures.get(&id).cloned())
    }

    async fn insert_lecture(&self, lecture: &Lecture) -> Result<()> {
        self.lock()?.lectures.insert(lecture.id, lecture.clone());
        Ok(())
    }

    async fn update_lecture(&self, lecture: &Lecture) -> Result<()> {
        let mut store = self.lock()?;
        let Some(existing) = store.lectures.get_mut(&lecture.id) else {
            return Err(Error::NotFound("Lecture not found".to_string()));
        };
        *existing = lecture.clone();
        Ok(())
    }

    async fn delete_lecture(&self, id: Uuid) -> Result<bool> {
        let mut store = self.lock()?;
        if store.lectures.remove(&id).is_none() {
            return Ok(false);
        }
        store.progress.retain(|(lecture_id, _), _| *lecture_id != id);
        Ok(true)
    }

    async fn is_enrolled(&self, course_id: Uuid, student_id: Uuid) -> Result<bool> {
        Ok(self
            .lock()?
            .enrollments
            .contains_key(&(course_id, student_id)))
    }

    async fn enroll(&self, course_id: Uuid, student_id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let mut store = self.lock()?;
        if store.enrollments.contains_key(&(course_id, student_id)) {
            return Ok(false);
        }
        store.enrollments.insert(
            (course_id, student_id),
            Enrollment {
                course_id,
                student_id,
                enrolled_at: at,
            },
        );
        Ok(true)
    }

    async fn enrollment_count(&self, course_id: Uuid) -> Result<i64> {
        let count = self
            .lock()?
            .enrollments
            .keys()
            .filter(|(c, _)| *c == course_id)
            .count();
        Ok(count as i64)
    }

    async fn enrolled_course_ids(&self, student_id: Uuid) -> Result<Vec<Uuid>> {
        let store = self.lock()?;
        let mut enrollments: Vec<&Enrollment> = store
            .enrollments
            .values()
            .filter(|e| e.student_id == student_id)
            .collect();
        enrollments.sort_by_key(|e| e.enrolled_at);
        Ok(enrollments.into_iter().map(|e| e.course_id).collect())
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn list_quizzes(&self, course_id: Uuid) -> Result<Vec<Quiz>> {
        let mut quizzes: Vec<Quiz> = self
            .lock()?
            .quizzes
            .values()
            .filter(|q| q.course_id == course_id)
            .cloned()
            .collect();
        quizzes.sort_by_key(|q| q.created_at);
        Ok(quizzes)
    }

    async fn get_quiz(&self, id: Uuid) -> Result<Option<Quiz>> {
        Ok(self.lock()?.quizzes.get(&id).cloned())
    }

    async fn insert_quiz(&self, quiz: &Quiz) -> Result<()> {
        self.lock()?.quizzes.insert(quiz.id, quiz.clone());
        Ok(())
    }

    async fn update_quiz(&self, quiz: &Quiz) -> Result<()> {
        let mut store = self.lock()?;
        let Some(existing) = store.quizzes.get_mut(&quiz.id) else {
            return Err(Error::NotFound("Quiz not found".to_string()));
        };
        *existing = quiz.clone();
        Ok(())
    }

    async fn delete_quiz(&self, id: Uuid) -> Result<bool> {
        let mut store = self.lock()?;
        if store.quizzes.remove(&id).is_none() {
            return Ok(false);
        }
        store.attempts.retain(|a| a.quiz_id != id);
        Ok(true)
    }

    async fn record_attempt(&self, attempt: &QuizAttemptRecord) -> Result<()> {
        self.lock()?.attempts.push(attempt.clone());
        Ok(())
    }

    async fn list_attempts(&self, quiz_id: Uuid, student_id: Uuid) -> Result<Vec<QuizAttemptRecord>> {
        let mut attempts: Vec<QuizAttemptRecord> = self
            .lock()?
            .attempts
            .iter()
            .filter(|a| a.quiz_id == quiz_id && a.student_id == student_id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(attempts)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn upsert_watched(&self, entry: &VideoProgressEntry) -> Result<()> {
        self.lock()?
            .progress
            .insert((entry.lecture_id, entry.student_id), entry.clone());
        Ok(())
    }

    async fn is_watched(&self, lecture_id: Uuid, student_id: Uuid) -> Result<bool> {
        Ok(self
            .lock()?
            .progress
            .get(&(lecture_id, student_id))
            .map(|e| e.watched)
            .unwrap_or(false))
    }

    async fn watched_entries(&self, student_id: Uuid) -> Result<Vec<VideoProgressEntry>> {
        Ok(self
            .lock()?
            .progress
            .values()
            .filter(|e| e.student_id == student_id && e.watched)
            .cloned()
            .collect())
    }

    async fn clear_watched(&self, lecture_id: Uuid, student_id: Uuid) -> Result<bool> {
        Ok(self
            .lock()?
            .progress
            .remove(&(lecture_id, student_id))
            .is_some())
    }
}

#[async_trait]
impl CommunityRepository for InMemoryRepository {
    async fn insert_comment(&self, comment: &DiscussionComment) -> Result<()> {
        self.lock()?.comments.insert(comment.id, comment.clone());
        Ok(())
    }

    async fn get_comment(&self, id: Uuid) -> Result<Option<DiscussionComment>> {
        Ok(self.lock()?.comments.get(&id).cloned())
    }

    async fn list_comments(&self, course_id: Uuid) -> Result<Vec<DiscussionComment>> {
        let mut comments: Vec<DiscussionComment> = self
            .lock()?
            .comments
            .values()
            .filter(|c| c.course_id == course_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        for comment in &mut comments {
            comment.replies.sort_by_key(|r| r.created_at);
        }
        Ok(comments)
    }

    async fn insert_reply(&self, reply: &DiscussionReply) -> Result<()> {
        let mut store = self.lock()?;
        let Some(comment) = store.comments.get_mut(&reply.comment_id) else {
            return Err(Error::NotFound("Comment not found".to_string()));
        };
        comment.replies.push(reply.clone());
        Ok(())
    }

    async fn insert_chat_message(&self, message: &ChatMessage) -> Result<()> {
        self.lock()?.chat.push(message.clone());
        Ok(())
    }

    async fn list_chat_messages(&self, course_id: Uuid, limit: i64) -> Result<Vec<ChatMessage>> {
        let mut messages: Vec<ChatMessage> = self
            .lock()?
            .chat
            .iter()
            .filter(|m| m.course_id == course_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.sent_at);
        let keep = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        let skip = messages.len().saturating_sub(keep);
        Ok(messages.split_off(skip))
    }
}

#[async_trait]
impl CertificateRepository for InMemoryRepository {
    async fn find_certificate(&self, student_id: Uuid, course_id: Uuid) -> Result<Option<Certificate>> {
        Ok(self
            .lock()?
            .certificates
            .values()
            .find(|c| c.student_id == student_id && c.course_id == course_id)
            .cloned())
    }

    async fn get_certificate(&self, id: Uuid) -> Result<Option<Certificate>> {
        Ok(self.lock()?.certificates.get(&id).cloned())
    }

    async fn insert_certificate(&self, certificate: &Certificate) -> Result<Certificate> {
        let mut store = self.lock()?;
        if let Some(existing) = store
            .certificates
            .values()
            .find(|c| c.student_id == certificate.student_id && c.course_id == certificate.course_id)
        {
            return Ok(existing.clone());
        }
        store
            .certificates
            .insert(certificate.id, certificate.clone());
        Ok(certificate.clone())
    }

    async fn list_certificates(&self, student_id: Uuid) -> Result<Vec<Certificate>> {
        let mut certificates: Vec<Certificate> = self
            .lock()?
            .certificates
            .values()
            .filter(|c| c.student_id == student_id)
            .cloned()
            .collect();
        certificates.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(certificates)
    }
}
