use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::repository::{
    CertificateRepository, CommunityRepository, CourseRepository, ProgressRepository,
    QuizRepository,
};
use crate::database::rows::{
    CertificateRow, ChatMessageRow, CommentRow, CourseRow, LectureRow, ProfileRow,
    QuizAttemptRow, QuizRow, ReplyRow, VideoProgressRow,
};
use crate::error::{Error, Result};
use crate::models::certificate::Certificate;
use crate::models::community::{ChatMessage, DiscussionComment, DiscussionReply};
use crate::models::course::{Course, Lecture};
use crate::models::profile::Profile;
use crate::models::progress::VideoProgressEntry;
use crate::models::quiz::Quiz;
use crate::models::quiz_attempt::QuizAttemptRecord;

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
    default_passing_score: u8,
}

impl PgRepository {
    pub fn new(pool: PgPool, default_passing_score: u8) -> Self {
        Self {
            pool,
            default_passing_score,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CourseRepository for PgRepository {
    async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, full_name, email, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET full_name = EXCLUDED.full_name, email = EXCLUDED.email, role = EXCLUDED.role
            "#,
        )
        .bind(profile.id)
        .bind(&profile.full_name)
        .bind(&profile.email)
        .bind(profile.role.as_str())
        .bind(profile.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(r#"SELECT * FROM profiles WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Profile::try_from).transpose()
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        let rows = sqlx::query_as::<_, CourseRow>(
            r#"SELECT * FROM courses ORDER BY created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Course::from).collect())
    }

    async fn get_course(&self, id: Uuid) -> Result<Option<Course>> {
        let row = sqlx::query_as::<_, CourseRow>(r#"SELECT * FROM courses WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Course::from))
    }

    async fn insert_course(&self, course: &Course) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO courses (id, title, description, image_url, category, instructor_id, instructor_name, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(course.id)
        .bind(&course.title)
        .bind(&course.description)
        .bind(&course.image_url)
        .bind(&course.category)
        .bind(course.instructor_id)
        .bind(&course.instructor_name)
        .bind(course.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_course(&self, course: &Course) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE courses
            SET title = $2, description = $3, image_url = $4, category = $5
            WHERE id = $1
            "#,
        )
        .bind(course.id)
        .bind(&course.title)
        .bind(&course.description)
        .bind(&course.image_url)
        .bind(&course.category)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Course not found".to_string()));
        }
        Ok(())
    }

    async fn delete_course(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM courses WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_lectures(&self, course_id: Uuid) -> Result<Vec<Lecture>> {
        let rows = sqlx::query_as::<_, LectureRow>(
            r#"SELECT * FROM lectures WHERE course_id = $1 ORDER BY position ASC, created_at ASC"#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Lecture::try_from).collect()
    }

    async fn get_lecture(&self, id: Uuid) -> Result<Option<Lecture>> {
        let row = sqlx::query_as::<_, LectureRow>(r#"SELECT * FROM lectures WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Lecture::try_from).transpose()
    }

    async fn insert_lecture(&self, lecture: &Lecture) -> Result<()> {
        let resources = serde_json::to_value(&lecture.resources)?;
        sqlx::query(
            r#"
            INSERT INTO lectures (id, course_id, position, title, description, video_url, duration_seconds, resources, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(lecture.id)
        .bind(lecture.course_id)
        .bind(lecture.position)
        .bind(&lecture.title)
        .bind(&lecture.description)
        .bind(&lecture.video_url)
        .bind(lecture.duration_seconds)
        .bind(resources)
        .bind(lecture.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_lecture(&self, lecture: &Lecture) -> Result<()> {
        let resources = serde_json::to_value(&lecture.resources)?;
        let result = sqlx::query(
            r#"
            UPDATE lectures
            SET position = $2, title = $3, description = $4, video_url = $5,
                duration_seconds = $6, resources = $7
            WHERE id = $1
            "#,
        )
        .bind(lecture.id)
        .bind(lecture.position)
        .bind(&lecture.title)
        .bind(&lecture.description)
        .bind(&lecture.video_url)
        .bind(lecture.duration_seconds)
        .bind(resources)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Lecture not found".to_string()));
        }
        Ok(())
    }

    async fn delete_lecture(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM lectures WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_enrolled(&self, course_id: Uuid, student_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"SELECT EXISTS (SELECT 1 FROM enrollments WHERE course_id = $1 AND student_id = $2)"#,
        )
        .bind(course_id)
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn enroll(&self, course_id: Uuid, student_id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO enrollments (course_id, student_id, enrolled_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (course_id, student_id) DO NOTHING
            "#,
        )
        .bind(course_id)
        .bind(student_id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn enrollment_count(&self, course_id: Uuid) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM enrollments WHERE course_id = $1"#)
                .bind(course_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn enrolled_course_ids(&self, student_id: Uuid) -> Result<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"SELECT course_id FROM enrollments WHERE student_id = $1 ORDER BY enrolled_at ASC"#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

#[async_trait]
impl QuizRepository for PgRepository {
    async fn list_quizzes(&self, course_id: Uuid) -> Result<Vec<Quiz>> {
        let rows = sqlx::query_as::<_, QuizRow>(
            r#"SELECT * FROM quizzes WHERE course_id = $1 ORDER BY created_at ASC"#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| row.into_quiz(self.default_passing_score))
            .collect()
    }

    async fn get_quiz(&self, id: Uuid) -> Result<Option<Quiz>> {
        let row = sqlx::query_as::<_, QuizRow>(r#"SELECT * FROM quizzes WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.into_quiz(self.default_passing_score)).transpose()
    }

    async fn insert_quiz(&self, quiz: &Quiz) -> Result<()> {
        let questions = serde_json::to_value(&quiz.questions)?;
        sqlx::query(
            r#"
            INSERT INTO quizzes (id, course_id, title, description, passing_score, time_limit_minutes, questions, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(quiz.id)
        .bind(quiz.course_id)
        .bind(&quiz.title)
        .bind(&quiz.description)
        .bind(quiz.passing_score as i32)
        .bind(quiz.time_limit_minutes.map(|m| m as i32))
        .bind(questions)
        .bind(quiz.created_at)
        .bind(quiz.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_quiz(&self, quiz: &Quiz) -> Result<()> {
        let questions = serde_json::to_value(&quiz.questions)?;
        let result = sqlx::query(
            r#"
            UPDATE quizzes
            SET title = $2, description = $3, passing_score = $4, time_limit_minutes = $5,
                questions = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(quiz.id)
        .bind(&quiz.title)
        .bind(&quiz.description)
        .bind(quiz.passing_score as i32)
        .bind(quiz.time_limit_minutes.map(|m| m as i32))
        .bind(questions)
        .bind(quiz.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Quiz not found".to_string()));
        }
        Ok(())
    }

    async fn delete_quiz(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM quizzes WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_attempt(&self, attempt: &QuizAttemptRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO quiz_attempts (
                id, quiz_id, student_id, correct_count, total_questions, score_percentage,
                passed, timed_out, time_taken_seconds, completed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(attempt.id)
        .bind(attempt.quiz_id)
        .bind(attempt.student_id)
        .bind(attempt.correct_count as i32)
        .bind(attempt.total_questions as i32)
        .bind(attempt.score_percentage as i32)
        .bind(attempt.passed)
        .bind(attempt.timed_out)
        .bind(attempt.time_taken_seconds as i32)
        .bind(attempt.completed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_attempts(&self, quiz_id: Uuid, student_id: Uuid) -> Result<Vec<QuizAttemptRecord>> {
        let rows = sqlx::query_as::<_, QuizAttemptRow>(
            r#"
            SELECT * FROM quiz_attempts
            WHERE quiz_id = $1 AND student_id = $2
            ORDER BY completed_at DESC
            "#,
        )
        .bind(quiz_id)
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(QuizAttemptRecord::try_from).collect()
    }
}

#[async_trait]
impl ProgressRepository for PgRepository {
    async fn upsert_watched(&self, entry: &VideoProgressEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO video_progress (lecture_id, student_id, watched, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (lecture_id, student_id)
            DO UPDATE SET watched = EXCLUDED.watched, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(entry.lecture_id)
        .bind(entry.student_id)
        .bind(entry.watched)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_watched(&self, lecture_id: Uuid, student_id: Uuid) -> Result<bool> {
        let watched: Option<bool> = sqlx::query_scalar(
            r#"SELECT watched FROM video_progress WHERE lecture_id = $1 AND student_id = $2"#,
        )
        .bind(lecture_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(watched.unwrap_or(false))
    }

    async fn watched_entries(&self, student_id: Uuid) -> Result<Vec<VideoProgressEntry>> {
        let rows = sqlx::query_as::<_, VideoProgressRow>(
            r#"SELECT * FROM video_progress WHERE student_id = $1 AND watched = TRUE"#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(VideoProgressEntry::from).collect())
    }

    async fn clear_watched(&self, lecture_id: Uuid, student_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"DELETE FROM video_progress WHERE lecture_id = $1 AND student_id = $2"#,
        )
        .bind(lecture_id)
        .bind(student_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CommunityRepository for PgRepository {
    async fn insert_comment(&self, comment: &DiscussionComment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO discussion_comments (id, course_id, author_id, author_name, text, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(comment.id)
        .bind(comment.course_id)
        .bind(comment.author_id)
        .bind(&comment.author_name)
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_comment(&self, id: Uuid) -> Result<Option<DiscussionComment>> {
        let Some(row) = sqlx::query_as::<_, CommentRow>(
            r#"SELECT * FROM discussion_comments WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let replies = sqlx::query_as::<_, ReplyRow>(
            r#"SELECT * FROM discussion_replies WHERE comment_id = $1 ORDER BY created_at ASC"#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(DiscussionComment {
            id: row.id,
            course_id: row.course_id,
            author_id: row.author_id,
            author_name: row.author_name,
            text: row.text,
            created_at: row.created_at,
            replies: replies.into_iter().map(DiscussionReply::from).collect(),
        }))
    }

    async fn list_comments(&self, course_id: Uuid) -> Result<Vec<DiscussionComment>> {
        let comments = sqlx::query_as::<_, CommentRow>(
            r#"SELECT * FROM discussion_comments WHERE course_id = $1 ORDER BY created_at DESC"#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        let replies = sqlx::query_as::<_, ReplyRow>(
            r#"
            SELECT r.* FROM discussion_replies r
            JOIN discussion_comments c ON c.id = r.comment_id
            WHERE c.course_id = $1
            ORDER BY r.created_at ASC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_comment: HashMap<Uuid, Vec<DiscussionReply>> = HashMap::new();
        for reply in replies {
            by_comment
                .entry(reply.comment_id)
                .or_default()
                .push(DiscussionReply::from(reply));
        }

        Ok(comments
            .into_iter()
            .map(|c| DiscussionComment {
                replies: by_comment.remove(&c.id).unwrap_or_default(),
                id: c.id,
                course_id: c.course_id,
                author_id: c.author_id,
                author_name: c.author_name,
                text: c.text,
                created_at: c.created_at,
            })
            .collect())
    }

    async fn insert_reply(&self, reply: &DiscussionReply) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO discussion_replies (id, comment_id, author_id, author_name, text, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(reply.id)
        .bind(reply.comment_id)
        .bind(reply.author_id)
        .bind(&reply.author_name)
        .bind(&reply.text)
        .bind(reply.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_chat_message(&self, message: &ChatMessage) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO chat_messages (id, course_id, sender_id, sender_name, sender_role, content, sent_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(message.id)
        .bind(message.course_id)
        .bind(message.sender_id)
        .bind(&message.sender_name)
        .bind(message.sender_role.as_str())
        .bind(&message.content)
        .bind(message.sent_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_chat_messages(&self, course_id: Uuid, limit: i64) -> Result<Vec<ChatMessage>> {
        let rows = sqlx::query_as::<_, ChatMessageRow>(
            r#"
            SELECT * FROM (
                SELECT * FROM chat_messages WHERE course_id = $1
                ORDER BY sent_at DESC
                LIMIT $2
            ) recent
            ORDER BY sent_at ASC
            "#,
        )
        .bind(course_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ChatMessage::try_from).collect()
    }
}

#[async_trait]
impl CertificateRepository for PgRepository {
    async fn find_certificate(&self, student_id: Uuid, course_id: Uuid) -> Result<Option<Certificate>> {
        let row = sqlx::query_as::<_, CertificateRow>(
            r#"SELECT * FROM certificates WHERE student_id = $1 AND course_id = $2"#,
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Certificate::from))
    }

    async fn get_certificate(&self, id: Uuid) -> Result<Option<Certificate>> {
        let row = sqlx::query_as::<_, CertificateRow>(r#"SELECT * FROM certificates WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Certificate::from))
    }

    async fn insert_certificate(&self, certificate: &Certificate) -> Result<Certificate> {
        sqlx::query(
            r#"
            INSERT INTO certificates (
                id, code, student_id, course_id, quiz_id, student_name, course_title,
                instructor_name, issued_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (student_id, course_id) DO NOTHING
            "#,
        )
        .bind(certificate.id)
        .bind(&certificate.code)
        .bind(certificate.student_id)
        .bind(certificate.course_id)
        .bind(certificate.quiz_id)
        .bind(&certificate.student_name)
        .bind(&certificate.course_title)
        .bind(&certificate.instructor_name)
        .bind(certificate.issued_at)
        .execute(&self.pool)
        .await?;

        self.find_certificate(certificate.student_id, certificate.course_id)
            .await?
            .ok_or_else(|| Error::Internal("Certificate vanished after insert".to_string()))
    }

    async fn list_certificates(&self, student_id: Uuid) -> Result<Vec<Certificate>> {
        let rows = sqlx::query_as::<_, CertificateRow>(
            r#"SELECT * FROM certificates WHERE student_id = $1 ORDER BY issued_at DESC"#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Certificate::from).collect())
    }
}
