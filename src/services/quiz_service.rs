use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::database::repository::QuizRepository;
use crate::dto::quiz_dto::{CreateQuizPayload, QuestionPayload, UpdateQuizPayload};
use crate::error::{Error, Result};
use crate::middleware::auth::CurrentUser;
use crate::models::quiz::{Question, Quiz, QuizSummary};
use crate::models::quiz_attempt::QuizAttemptRecord;
use crate::services::course_service::CourseService;
use crate::services::notification_service::{NoticeLevel, NotificationService};
use crate::utils::time::now;
use crate::utils::validation::require_text;

#[derive(Clone)]
pub struct QuizService {
    repo: Arc<dyn QuizRepository>,
    courses: CourseService,
    notifications: NotificationService,
    default_passing_score: u8,
}

impl QuizService {
    pub fn new(
        repo: Arc<dyn QuizRepository>,
        courses: CourseService,
        notifications: NotificationService,
        default_passing_score: u8,
    ) -> Self {
        Self {
            repo,
            courses,
            notifications,
            default_passing_score,
        }
    }

    pub fn repository(&self) -> &Arc<dyn QuizRepository> {
        &self.repo
    }

    pub async fn get_quiz(&self, quiz_id: Uuid) -> Result<Quiz> {
        self.repo
            .get_quiz(quiz_id)
            .await?
            .ok_or_else(|| Error::NotFound("Quiz not found".to_string()))
    }

    /// Quiz listings are visible to anyone who can see the course page.
    pub async fn list_for_course(&self, course_id: Uuid) -> Result<Vec<QuizSummary>> {
        self.courses.get_course(course_id).await?;
        let quizzes = self.repo.list_quizzes(course_id).await?;
        Ok(quizzes.iter().map(Quiz::summary).collect())
    }

    pub async fn create_quiz(
        &self,
        user: &CurrentUser,
        course_id: Uuid,
        payload: CreateQuizPayload,
    ) -> Result<Quiz> {
        payload.validate()?;
        let course = self.courses.require_owner(course_id, user).await?;

        let at = now();
        let quiz = Quiz {
            id: Uuid::new_v4(),
            course_id: course.id,
            title: payload.title.trim().to_string(),
            description: payload.description.filter(|d| !d.trim().is_empty()),
            passing_score: payload.passing_score.unwrap_or(self.default_passing_score),
            time_limit_minutes: payload.time_limit_minutes,
            questions: build_questions(payload.questions)?,
            created_at: at,
            updated_at: at,
        };
        quiz.check().map_err(|e| Error::BadRequest(e.to_string()))?;

        self.repo.insert_quiz(&quiz).await?;
        tracing::info!(quiz_id = %quiz.id, %course_id, questions = quiz.question_count(), "quiz created");
        self.notifications.push(
            user.id,
            NoticeLevel::Success,
            "Quiz created",
            "Your quiz has been created successfully",
        );
        Ok(quiz)
    }

    pub async fn update_quiz(
        &self,
        user: &CurrentUser,
        quiz_id: Uuid,
        payload: UpdateQuizPayload,
    ) -> Result<Quiz> {
        payload.validate()?;
        let mut quiz = self.get_quiz(quiz_id).await?;
        self.courses.require_owner(quiz.course_id, user).await?;

        if let Some(title) = payload.title {
            quiz.title = title.trim().to_string();
        }
        if let Some(description) = payload.description {
            quiz.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(passing_score) = payload.passing_score {
            quiz.passing_score = passing_score;
        }
        if let Some(time_limit) = payload.time_limit_minutes {
            if time_limit == Some(0) {
                return Err(Error::BadRequest(
                    "Time limit must be at least 1 minute".to_string(),
                ));
            }
            quiz.time_limit_minutes = time_limit;
        }
        if let Some(questions) = payload.questions {
            for question in &questions {
                question.validate()?;
            }
            quiz.questions = build_questions(questions)?;
        }
        quiz.check().map_err(|e| Error::BadRequest(e.to_string()))?;
        quiz.updated_at = now();

        self.repo.update_quiz(&quiz).await?;
        tracing::info!(%quiz_id, "quiz updated");
        Ok(quiz)
    }

    pub async fn delete_quiz(&self, user: &CurrentUser, quiz_id: Uuid) -> Result<()> {
        let quiz = self.get_quiz(quiz_id).await?;
        self.courses.require_owner(quiz.course_id, user).await?;
        if !self.repo.delete_quiz(quiz_id).await? {
            return Err(Error::NotFound("Quiz not found".to_string()));
        }
        tracing::info!(%quiz_id, "quiz deleted");
        self.notifications.push(
            user.id,
            NoticeLevel::Success,
            "Quiz deleted",
            "The quiz has been removed from your course",
        );
        Ok(())
    }

    /// The caller's own attempts, newest first.
    pub async fn my_attempts(&self, user: &CurrentUser, quiz_id: Uuid) -> Result<Vec<QuizAttemptRecord>> {
        let quiz = self.get_quiz(quiz_id).await?;
        self.courses.require_member(quiz.course_id, user).await?;
        self.repo.list_attempts(quiz_id, user.id).await
    }

    pub async fn record_attempt(&self, attempt: &QuizAttemptRecord) -> Result<()> {
        self.repo.record_attempt(attempt).await
    }
}

fn build_questions(payloads: Vec<QuestionPayload>) -> Result<Vec<Question>> {
    payloads
        .into_iter()
        .enumerate()
        .map(|(index, q)| {
            let text = require_text(&format!("Question {}", index + 1), &q.text)?;
            Ok(Question {
                id: Uuid::new_v4(),
                text,
                options: q.options.iter().map(|o| o.trim().to_string()).collect(),
                correct_option_index: q.correct_option_index,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::InMemoryRepository;
    use crate::dto::course_dto::CreateCoursePayload;
    use crate::models::profile::Role;

    fn instructor() -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            role: Role::Instructor,
            name: "Priya Nair".into(),
            email: "priya@example.com".into(),
        }
    }

    fn question(correct: usize) -> QuestionPayload {
        QuestionPayload {
            text: "Which keyword declares an immutable binding?".into(),
            options: vec!["let".into(), "mut".into(), "var".into()],
            correct_option_index: correct,
        }
    }

    async fn setup() -> (QuizService, CurrentUser, Uuid) {
        let repo = Arc::new(InMemoryRepository::new());
        let notifications = NotificationService::new();
        let courses = CourseService::new(repo.clone(), notifications.clone());
        let quizzes = QuizService::new(repo, courses.clone(), notifications, 70);
        let owner = instructor();
        let course = courses
            .create_course(
                &owner,
                CreateCoursePayload {
                    title: "Rust for Beginners".into(),
                    description: "Learn the language one chapter at a time.".into(),
                    image_url: None,
                    category: None,
                },
            )
            .await
            .unwrap();
        (quizzes, owner, course.id)
    }

    #[tokio::test]
    async fn missing_passing_score_uses_default() {
        let (svc, owner, course_id) = setup().await;
        let quiz = svc
            .create_quiz(
                &owner,
                course_id,
                CreateQuizPayload {
                    title: "Chapter 1".into(),
                    description: None,
                    passing_score: None,
                    time_limit_minutes: None,
                    questions: vec![question(0)],
                },
            )
            .await
            .unwrap();
        assert_eq!(quiz.passing_score, 70);
        assert_eq!(svc.list_for_course(course_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn quizzes_without_questions_are_rejected() {
        let (svc, owner, course_id) = setup().await;
        let err = svc
            .create_quiz(
                &owner,
                course_id,
                CreateQuizPayload {
                    title: "Chapter 1".into(),
                    description: None,
                    passing_score: Some(80),
                    time_limit_minutes: None,
                    questions: vec![],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn correct_answer_must_point_at_an_option() {
        let (svc, owner, course_id) = setup().await;
        let err = svc
            .create_quiz(
                &owner,
                course_id,
                CreateQuizPayload {
                    title: "Chapter 1".into(),
                    description: None,
                    passing_score: None,
                    time_limit_minutes: None,
                    questions: vec![question(3)],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[tokio::test]
    async fn time_limit_can_be_removed_and_kept() {
        let (svc, owner, course_id) = setup().await;
        let quiz = svc
            .create_quiz(
                &owner,
                course_id,
                CreateQuizPayload {
                    title: "Chapter 2".into(),
                    description: None,
                    passing_score: None,
                    time_limit_minutes: Some(10),
                    questions: vec![question(0)],
                },
            )
            .await
            .unwrap();

        let renamed = svc
            .update_quiz(
                &owner,
                quiz.id,
                UpdateQuizPayload {
                    title: Some("Chapter 2 review".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.time_limit_minutes, Some(10));

        let zero = svc
            .update_quiz(
                &owner,
                quiz.id,
                UpdateQuizPayload {
                    time_limit_minutes: Some(Some(0)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(zero, Error::BadRequest(_)));

        let cleared = svc
            .update_quiz(
                &owner,
                quiz.id,
                UpdateQuizPayload {
                    time_limit_minutes: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.time_limit_minutes, None);
        assert_eq!(svc.get_quiz(quiz.id).await.unwrap().time_limit_minutes, None);
    }
}
