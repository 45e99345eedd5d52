//! Live quiz sessions.
//!
//! Each started quiz gets a `QuizAttemptState` in a process-local registry and
//! a one-second countdown task. Every transition runs under the registry lock,
//! so a manual submit and the timer's forced submit cannot both apply; the
//! loser sees a no-op. The winning transition grades the attempt under that
//! same lock; the attempt record and certificate follow once, outside it.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::dto::quiz_dto::{QuizSessionView, TransitionResponse};
use crate::error::{Error, Result};
use crate::middleware::auth::CurrentUser;
use crate::models::certificate::Certificate;
use crate::models::course::Course;
use crate::models::quiz::PublicQuestion;
use crate::models::quiz_attempt::QuizAttemptRecord;
use crate::services::certificate_service::CertificateService;
use crate::services::course_service::{CourseService, Membership};
use crate::services::grading_service::{GradingService, QuizResult};
use crate::services::notification_service::{NoticeLevel, NotificationService};
use crate::services::quiz_service::QuizService;
use crate::session::quiz::{QuizAttemptState, QuizOutcome, TickOutcome};
use crate::utils::time::{elapsed_seconds, idle_cutoff, now};

const TICK: Duration = Duration::from_secs(1);

struct SessionEntry {
    student_id: Uuid,
    student_name: String,
    course: Course,
    state: QuizAttemptState,
    started_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    result: Option<QuizResult>,
    certificate: Option<Certificate>,
    cancel: CancellationToken,
}

/// A graded attempt waiting to be recorded.
struct GradedAttempt {
    student_name: String,
    course: Course,
    record: QuizAttemptRecord,
    result: QuizResult,
}

enum TimerStep {
    Running,
    Expired(GradedAttempt),
    Stopped,
}

impl SessionEntry {
    /// Grades the finished attempt and keeps the result on the entry, so the
    /// session never reads as submitted without one.
    fn conclude(&mut self, outcome: QuizOutcome) -> GradedAttempt {
        let quiz_id = self.state.quiz().id;
        let result = GradingService::grade(self.state.quiz(), self.state.answers(), outcome);
        let completed_at = now();
        let record = QuizAttemptRecord {
            id: Uuid::new_v4(),
            quiz_id,
            student_id: self.student_id,
            correct_count: result.correct_count,
            total_questions: result.total_questions,
            score_percentage: result.score_percentage,
            passed: result.passed,
            timed_out: result.timed_out,
            time_taken_seconds: elapsed_seconds(self.started_at, completed_at),
            completed_at,
        };
        self.result = Some(result.clone());
        self.last_activity = completed_at;
        GradedAttempt {
            student_name: self.student_name.clone(),
            course: self.course.clone(),
            record,
            result,
        }
    }

    fn view(&self, session_id: Uuid) -> QuizSessionView {
        let quiz = self.state.quiz();
        QuizSessionView {
            session_id,
            quiz_id: quiz.id,
            course_id: quiz.course_id,
            quiz_title: quiz.title.clone(),
            phase: self.state.phase(),
            current_index: self.state.current_index(),
            question_count: quiz.question_count(),
            current_question: quiz
                .questions
                .get(self.state.current_index())
                .map(PublicQuestion::from),
            answers: self.state.answers().to_vec(),
            answered_count: self.state.answered_count(),
            remaining_seconds: self.state.remaining_seconds(),
            can_go_next: self.state.can_go_next(),
            can_submit: self.state.can_submit(),
            result: self.result.clone(),
            certificate: self.certificate.clone(),
        }
    }
}

#[derive(Clone)]
pub struct QuizSessionService {
    sessions: Arc<Mutex<HashMap<Uuid, SessionEntry>>>,
    quizzes: QuizService,
    courses: CourseService,
    certificates: CertificateService,
    notifications: NotificationService,
    seconds_per_question: u32,
    idle_minutes: i64,
}

impl QuizSessionService {
    pub fn new(
        quizzes: QuizService,
        courses: CourseService,
        certificates: CertificateService,
        notifications: NotificationService,
        seconds_per_question: u32,
        idle_minutes: i64,
    ) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            quizzes,
            courses,
            certificates,
            notifications,
            seconds_per_question,
            idle_minutes,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, SessionEntry>>> {
        self.sessions
            .lock()
            .map_err(|e| Error::Internal(format!("quiz session registry poisoned: {}", e)))
    }

    fn with_owned_session<T>(
        &self,
        user: &CurrentUser,
        session_id: Uuid,
        f: impl FnOnce(&mut SessionEntry) -> T,
    ) -> Result<T> {
        let mut sessions = self.lock()?;
        let entry = sessions
            .get_mut(&session_id)
            .filter(|e| e.student_id == user.id)
            .ok_or_else(|| Error::NotFound("Quiz session not found".to_string()))?;
        entry.last_activity = now();
        Ok(f(entry))
    }

    pub fn session_count(&self) -> usize {
        self.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Starts a fresh attempt. Any earlier session the student still holds
    /// for the same quiz is discarded.
    pub async fn start(&self, user: &CurrentUser, course_id: Uuid, quiz_id: Uuid) -> Result<QuizSessionView> {
        let quiz = self.quizzes.get_quiz(quiz_id).await?;
        if quiz.course_id != course_id {
            return Err(Error::NotFound("Quiz not found".to_string()));
        }
        let (course, membership) = self.courses.require_member(course_id, user).await?;
        if membership != Membership::Enrolled {
            return Err(Error::Forbidden(
                "Only enrolled students can take this quiz".to_string(),
            ));
        }
        quiz.check().map_err(|e| Error::BadRequest(e.to_string()))?;
        let student_name = self.courses.display_name(user).await?;

        let budget = quiz.time_budget_seconds(self.seconds_per_question);
        let session_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let started_at = now();
        let entry = SessionEntry {
            student_id: user.id,
            student_name,
            course,
            state: QuizAttemptState::new(Arc::new(quiz), budget),
            started_at,
            last_activity: started_at,
            result: None,
            certificate: None,
            cancel: cancel.clone(),
        };
        let view = entry.view(session_id);

        {
            let mut sessions = self.lock()?;
            sessions.retain(|_, e| {
                let stale = e.student_id == user.id && e.state.quiz().id == quiz_id;
                if stale {
                    e.cancel.cancel();
                }
                !stale
            });
            sessions.insert(session_id, entry);
        }
        self.spawn_timer(session_id, cancel);

        tracing::info!(%session_id, %quiz_id, student_id = %user.id, budget_seconds = budget, "quiz session started");
        Ok(view)
    }

    pub fn snapshot(&self, user: &CurrentUser, session_id: Uuid) -> Result<QuizSessionView> {
        self.with_owned_session(user, session_id, |e| e.view(session_id))
    }

    pub fn select_answer(
        &self,
        user: &CurrentUser,
        session_id: Uuid,
        question_index: usize,
        option_index: usize,
    ) -> Result<TransitionResponse> {
        self.with_owned_session(user, session_id, |e| TransitionResponse {
            applied: e.state.select_answer(question_index, option_index),
            session: e.view(session_id),
        })
    }

    pub fn next_question(&self, user: &CurrentUser, session_id: Uuid) -> Result<TransitionResponse> {
        self.with_owned_session(user, session_id, |e| TransitionResponse {
            applied: e.state.next(),
            session: e.view(session_id),
        })
    }

    pub fn previous_question(&self, user: &CurrentUser, session_id: Uuid) -> Result<TransitionResponse> {
        self.with_owned_session(user, session_id, |e| TransitionResponse {
            applied: e.state.previous(),
            session: e.view(session_id),
        })
    }

    pub fn jump_to_question(
        &self,
        user: &CurrentUser,
        session_id: Uuid,
        question_index: usize,
    ) -> Result<TransitionResponse> {
        self.with_owned_session(user, session_id, |e| TransitionResponse {
            applied: e.state.jump_to(question_index),
            session: e.view(session_id),
        })
    }

    pub async fn submit(&self, user: &CurrentUser, session_id: Uuid) -> Result<TransitionResponse> {
        let (graded, mut view) = self.with_owned_session(user, session_id, |e| {
            let graded = e.state.submit().map(|outcome| {
                e.cancel.cancel();
                e.conclude(outcome)
            });
            (graded, e.view(session_id))
        })?;

        let Some(graded) = graded else {
            return Ok(TransitionResponse {
                applied: false,
                session: view,
            });
        };

        view.certificate = self.finish(session_id, graded).await;
        Ok(TransitionResponse {
            applied: true,
            session: view,
        })
    }

    /// Drops the session whatever its phase; an unsubmitted attempt is not recorded.
    pub fn discard(&self, user: &CurrentUser, session_id: Uuid) -> Result<()> {
        let mut sessions = self.lock()?;
        match sessions.get(&session_id) {
            Some(entry) if entry.student_id == user.id => {}
            _ => return Err(Error::NotFound("Quiz session not found".to_string())),
        }
        if let Some(entry) = sessions.remove(&session_id) {
            entry.cancel.cancel();
            tracing::info!(%session_id, in_progress = entry.state.is_in_progress(), "quiz session discarded");
        }
        Ok(())
    }

    /// Removes submitted sessions nobody has looked at for the idle window.
    /// Running sessions stay until their countdown submits them.
    pub fn sweep_idle(&self) -> Result<usize> {
        let cutoff = idle_cutoff(now(), self.idle_minutes);
        let mut sessions = self.lock()?;
        let before = sessions.len();
        sessions.retain(|_, e| e.state.is_in_progress() || e.last_activity >= cutoff);
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, "idle quiz sessions swept");
        }
        Ok(removed)
    }

    fn spawn_timer(&self, session_id: Uuid, cancel: CancellationToken) {
        let svc = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK, TICK);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => match svc.tick(session_id) {
                        TimerStep::Running => {}
                        TimerStep::Expired(graded) => {
                            tracing::info!(%session_id, "quiz session timed out");
                            svc.finish(session_id, graded).await;
                            break;
                        }
                        TimerStep::Stopped => break,
                    },
                }
            }
        });
    }

    fn tick(&self, session_id: Uuid) -> TimerStep {
        let Ok(mut sessions) = self.sessions.lock() else {
            return TimerStep::Stopped;
        };
        let Some(entry) = sessions.get_mut(&session_id) else {
            return TimerStep::Stopped;
        };
        match entry.state.tick() {
            TickOutcome::Running { .. } => TimerStep::Running,
            TickOutcome::Expired(outcome) => TimerStep::Expired(entry.conclude(outcome)),
            TickOutcome::Stopped => TimerStep::Stopped,
        }
    }

    /// Records a graded attempt and issues the certificate on a pass. Works
    /// from the graded copy, so a session discarded meanwhile changes nothing.
    async fn finish(&self, session_id: Uuid, graded: GradedAttempt) -> Option<Certificate> {
        let GradedAttempt {
            student_name,
            course,
            record,
            result,
        } = graded;
        let student_id = record.student_id;
        let quiz_id = record.quiz_id;

        if let Err(err) = self.quizzes.record_attempt(&record).await {
            tracing::error!(%session_id, error = %err, "failed to record quiz attempt");
            self.notifications.push(
                student_id,
                NoticeLevel::Warning,
                "Attempt not saved",
                "Your result could not be saved to your quiz history",
            );
        }

        let certificate = if result.passed {
            match self
                .certificates
                .issue(student_id, &student_name, &course, quiz_id)
                .await
            {
                Ok(certificate) => Some(certificate),
                Err(err) => {
                    tracing::error!(%session_id, error = %err, "failed to issue certificate");
                    self.notifications.push(
                        student_id,
                        NoticeLevel::Warning,
                        "Certificate unavailable",
                        "Your certificate could not be issued right now",
                    );
                    None
                }
            }
        } else {
            None
        };

        if result.timed_out {
            self.notifications.push(
                student_id,
                NoticeLevel::Info,
                "Time's up!",
                "Your quiz was submitted automatically",
            );
        }
        if result.passed {
            self.notifications.push(
                student_id,
                NoticeLevel::Success,
                "Congratulations! You passed the quiz.",
                format!("You scored {}%", result.score_percentage),
            );
        } else {
            self.notifications.push(
                student_id,
                NoticeLevel::Info,
                "You didn't pass this time",
                format!(
                    "You scored {}%. The passing score is {}%.",
                    result.score_percentage, result.passing_score
                ),
            );
        }
        if let Some(certificate) = &certificate {
            self.notifications.push(
                student_id,
                NoticeLevel::Success,
                "Certificate earned",
                format!("{} for {}", certificate.code, certificate.course_title),
            );
        }

        tracing::info!(
            %session_id,
            %quiz_id,
            %student_id,
            correct = result.correct_count,
            total = result.total_questions,
            score = result.score_percentage,
            passed = result.passed,
            timed_out = result.timed_out,
            "quiz session finished"
        );

        if let Some(certificate) = &certificate {
            if let Ok(mut sessions) = self.lock() {
                if let Some(entry) = sessions.get_mut(&session_id) {
                    entry.certificate = Some(certificate.clone());
                }
            }
        }
        certificate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::InMemoryRepository;
    use crate::database::repository::QuizRepository;
    use crate::dto::course_dto::CreateCoursePayload;
    use crate::dto::quiz_dto::{CreateQuizPayload, QuestionPayload};
    use crate::models::profile::Role;
    use crate::session::quiz::QuizPhase;

    struct Fixture {
        svc: QuizSessionService,
        repo: Arc<InMemoryRepository>,
        notifications: NotificationService,
        student: CurrentUser,
        course_id: Uuid,
        quiz_id: Uuid,
    }

    fn person(role: Role, name: &str) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            role,
            name: name.into(),
            email: String::new(),
        }
    }

    async fn fixture(time_limit_minutes: Option<u32>) -> Fixture {
        let repo = Arc::new(InMemoryRepository::new());
        let notifications = NotificationService::new();
        let courses = CourseService::new(repo.clone(), notifications.clone());
        let quizzes = QuizService::new(repo.clone(), courses.clone(), notifications.clone(), 70);
        let certificates = CertificateService::new(repo.clone());

        let instructor = person(Role::Instructor, "Ada Byron");
        let course = courses
            .create_course(
                &instructor,
                CreateCoursePayload {
                    title: "Web Development Basics".into(),
                    description: "Build and style your first web page.".into(),
                    image_url: None,
                    category: None,
                },
            )
            .await
            .unwrap();
        let quiz = quizzes
            .create_quiz(
                &instructor,
                course.id,
                CreateQuizPayload {
                    title: "HTML".into(),
                    description: None,
                    passing_score: None,
                    time_limit_minutes,
                    questions: vec![
                        QuestionPayload {
                            text: "Which tag makes a paragraph?".into(),
                            options: vec!["<p>".into(), "<para>".into()],
                            correct_option_index: 0,
                        },
                        QuestionPayload {
                            text: "Which tag makes a link?".into(),
                            options: vec!["<link>".into(), "<a>".into()],
                            correct_option_index: 1,
                        },
                    ],
                },
            )
            .await
            .unwrap();

        let student = person(Role::Student, "Grace Hopper");
        courses.enroll(&student, course.id).await.unwrap();
        notifications.drain(student.id);

        let svc = QuizSessionService::new(
            quizzes,
            courses,
            certificates,
            notifications.clone(),
            120,
            120,
        );
        Fixture {
            svc,
            repo,
            notifications,
            student,
            course_id: course.id,
            quiz_id: quiz.id,
        }
    }

    #[tokio::test]
    async fn passing_submit_records_and_certifies() {
        let f = fixture(None).await;
        let view = f.svc.start(&f.student, f.course_id, f.quiz_id).await.unwrap();
        assert_eq!(view.remaining_seconds, 240);
        let id = view.session_id;

        assert!(f.svc.select_answer(&f.student, id, 0, 0).unwrap().applied);
        assert!(f.svc.next_question(&f.student, id).unwrap().applied);
        assert!(f.svc.select_answer(&f.student, id, 1, 1).unwrap().applied);

        let done = f.svc.submit(&f.student, id).await.unwrap();
        assert!(done.applied);
        assert_eq!(done.session.phase, QuizPhase::Submitted);
        let result = done.session.result.expect("graded");
        assert_eq!((result.correct_count, result.score_percentage), (2, 100));
        assert!(result.passed);
        assert!(done.session.certificate.is_some());

        let attempts = f.repo.list_attempts(f.quiz_id, f.student.id).await.unwrap();
        assert_eq!(attempts.len(), 1);
        let titles: Vec<String> = f
            .notifications
            .drain(f.student.id)
            .into_iter()
            .map(|n| n.title)
            .collect();
        assert!(titles.contains(&"Certificate earned".to_string()));

        assert!(!f.svc.submit(&f.student, id).await.unwrap().applied);
    }

    #[tokio::test]
    async fn half_right_fails_without_certificate() {
        let f = fixture(None).await;
        let id = f
            .svc
            .start(&f.student, f.course_id, f.quiz_id)
            .await
            .unwrap()
            .session_id;
        f.svc.select_answer(&f.student, id, 0, 0).unwrap();
        f.svc.select_answer(&f.student, id, 1, 0).unwrap();

        let done = f.svc.submit(&f.student, id).await.unwrap();
        let result = done.session.result.expect("graded");
        assert_eq!(result.score_percentage, 50);
        assert!(!result.passed);
        assert!(done.session.certificate.is_none());
    }

    #[tokio::test]
    async fn incomplete_submit_is_refused() {
        let f = fixture(None).await;
        let id = f
            .svc
            .start(&f.student, f.course_id, f.quiz_id)
            .await
            .unwrap()
            .session_id;
        f.svc.select_answer(&f.student, id, 0, 0).unwrap();

        let refused = f.svc.submit(&f.student, id).await.unwrap();
        assert!(!refused.applied);
        assert_eq!(refused.session.phase, QuizPhase::InProgress);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_forces_submission() {
        let f = fixture(Some(1)).await;
        let id = f
            .svc
            .start(&f.student, f.course_id, f.quiz_id)
            .await
            .unwrap()
            .session_id;

        tokio::time::sleep(Duration::from_secs(61)).await;

        let view = f.svc.snapshot(&f.student, id).unwrap();
        assert_eq!(view.phase, QuizPhase::Submitted);
        assert_eq!(view.remaining_seconds, 0);
        let result = view.result.expect("graded on timeout");
        assert!(result.timed_out);
        assert_eq!(result.correct_count, 0);
        assert_eq!(f.repo.list_attempts(f.quiz_id, f.student.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sessions_belong_to_their_student() {
        let f = fixture(None).await;
        let id = f
            .svc
            .start(&f.student, f.course_id, f.quiz_id)
            .await
            .unwrap()
            .session_id;
        let stranger = person(Role::Student, "Someone Else");
        assert!(matches!(
            f.svc.snapshot(&stranger, id),
            Err(Error::NotFound(_))
        ));

        f.svc.discard(&f.student, id).unwrap();
        assert!(matches!(f.svc.snapshot(&f.student, id), Err(Error::NotFound(_))));
        assert_eq!(f.svc.session_count(), 0);
    }

    #[tokio::test]
    async fn restarting_replaces_the_previous_session() {
        let f = fixture(None).await;
        let first = f.svc.start(&f.student, f.course_id, f.quiz_id).await.unwrap();
        let second = f.svc.start(&f.student, f.course_id, f.quiz_id).await.unwrap();
        assert_ne!(first.session_id, second.session_id);
        assert_eq!(f.svc.session_count(), 1);
    }

    #[tokio::test]
    async fn sweep_drops_only_idle_submitted_sessions() {
        let f = fixture(None).await;
        let stale = f.svc.start(&f.student, f.course_id, f.quiz_id).await.unwrap().session_id;
        f.svc.select_answer(&f.student, stale, 0, 0).unwrap();
        f.svc.select_answer(&f.student, stale, 1, 1).unwrap();
        assert!(f.svc.submit(&f.student, stale).await.unwrap().applied);
        assert_eq!(f.svc.sweep_idle().unwrap(), 0);

        f.svc.lock().unwrap().get_mut(&stale).unwrap().last_activity =
            now() - chrono::Duration::minutes(121);
        assert_eq!(f.svc.sweep_idle().unwrap(), 1);
        assert_eq!(f.svc.session_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_leaves_a_long_running_attempt_to_its_countdown() {
        let f = fixture(Some(180)).await;
        let id = f.svc.start(&f.student, f.course_id, f.quiz_id).await.unwrap().session_id;

        f.svc.lock().unwrap().get_mut(&id).unwrap().last_activity =
            now() - chrono::Duration::minutes(121);
        assert_eq!(f.svc.sweep_idle().unwrap(), 0);
        assert_eq!(f.svc.session_count(), 1);

        tokio::time::sleep(Duration::from_secs(180 * 60 + 5)).await;

        let view = f.svc.snapshot(&f.student, id).unwrap();
        assert_eq!(view.phase, QuizPhase::Submitted);
        assert!(view.result.expect("graded on timeout").timed_out);
        assert_eq!(f.repo.list_attempts(f.quiz_id, f.student.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn graded_result_shows_before_the_attempt_is_stored() {
        let f = fixture(None).await;
        let id = f.svc.start(&f.student, f.course_id, f.quiz_id).await.unwrap().session_id;
        f.svc.select_answer(&f.student, id, 0, 0).unwrap();
        f.svc.select_answer(&f.student, id, 1, 1).unwrap();

        let graded = {
            let mut sessions = f.svc.lock().unwrap();
            let entry = sessions.get_mut(&id).unwrap();
            let outcome = entry.state.submit().expect("complete attempt submits");
            entry.conclude(outcome)
        };
        let view = f.svc.snapshot(&f.student, id).unwrap();
        assert_eq!(view.phase, QuizPhase::Submitted);
        assert!(view.result.expect("graded under the lock").passed);
        assert!(view.certificate.is_none());

        f.svc.discard(&f.student, id).unwrap();
        let certificate = f.svc.finish(id, graded).await;
        assert!(certificate.is_some());
        assert_eq!(f.repo.list_attempts(f.quiz_id, f.student.id).await.unwrap().len(), 1);
    }
}
