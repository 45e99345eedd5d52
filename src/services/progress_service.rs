use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::database::repository::ProgressRepository;
use crate::dto::progress_dto::{ProgressUpdate, WatchOpened};
use crate::error::{Error, Result};
use crate::middleware::auth::CurrentUser;
use crate::models::progress::{CourseCompletion, VideoProgressEntry};
use crate::services::course_service::CourseService;
use crate::services::notification_service::{NoticeLevel, NotificationService};
use crate::session::watch::{PlaybackOutcome, WatchSession};
use crate::utils::time::{idle_cutoff, now};
use crate::utils::video::{classify_video_url, VideoSource};

struct OpenLecture {
    course_id: Uuid,
    session: WatchSession,
    last_activity: DateTime<Utc>,
}

/// Read-through copy of one student's watched lectures in one course.
#[derive(Debug, Clone)]
struct WatchedCache {
    lecture_ids: HashSet<Uuid>,
    loaded_at: DateTime<Utc>,
    last_used: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ProgressService {
    repo: Arc<dyn ProgressRepository>,
    courses: CourseService,
    notifications: NotificationService,
    /// Keyed by (lecture, student).
    viewing: Arc<Mutex<HashMap<(Uuid, Uuid), OpenLecture>>>,
    /// Keyed by (student, course).
    cache: Arc<Mutex<HashMap<(Uuid, Uuid), WatchedCache>>>,
    idle_minutes: i64,
}

impl ProgressService {
    pub fn new(
        repo: Arc<dyn ProgressRepository>,
        courses: CourseService,
        notifications: NotificationService,
        idle_minutes: i64,
    ) -> Self {
        Self {
            repo,
            courses,
            notifications,
            viewing: Arc::new(Mutex::new(HashMap::new())),
            cache: Arc::new(Mutex::new(HashMap::new())),
            idle_minutes,
        }
    }

    fn viewing(&self) -> Result<MutexGuard<'_, HashMap<(Uuid, Uuid), OpenLecture>>> {
        self.viewing
            .lock()
            .map_err(|e| Error::Internal(format!("viewing registry poisoned: {}", e)))
    }

    fn cache(&self) -> Result<MutexGuard<'_, HashMap<(Uuid, Uuid), WatchedCache>>> {
        self.cache
            .lock()
            .map_err(|e| Error::Internal(format!("watched cache poisoned: {}", e)))
    }

    /// Starts a viewing session. Previews and instructors get an untracked
    /// response and no session.
    pub async fn open_lecture(&self, user: &CurrentUser, lecture_id: Uuid) -> Result<WatchOpened> {
        let (lecture, preview) = self.courses.open_lecture(user, lecture_id).await?;
        if preview || !user.is_student() {
            return Ok(WatchOpened {
                lecture_id,
                tracked: false,
                already_watched: false,
            });
        }

        let already_watched = self.repo.is_watched(lecture.id, user.id).await?;
        let source = classify_video_url(&lecture.video_url);
        let session = WatchSession::new(lecture.id, user.id, source, already_watched);
        self.viewing()?.insert(
            (lecture.id, user.id),
            OpenLecture {
                course_id: lecture.course_id,
                session,
                last_activity: now(),
            },
        );

        tracing::debug!(%lecture_id, student_id = %user.id, ?source, already_watched, "viewing session opened");
        Ok(WatchOpened {
            lecture_id,
            tracked: source == VideoSource::Hosted,
            already_watched,
        })
    }

    pub fn close_lecture(&self, user: &CurrentUser, lecture_id: Uuid) -> Result<bool> {
        Ok(self.viewing()?.remove(&(lecture_id, user.id)).is_some())
    }

    /// Feeds one playback report into the open viewing session, opening one
    /// first if needed.
    pub async fn on_video_progress(
        &self,
        user: &CurrentUser,
        lecture_id: Uuid,
        position_seconds: f64,
        duration_seconds: f64,
    ) -> Result<ProgressUpdate> {
        let is_open = self.viewing()?.contains_key(&(lecture_id, user.id));
        if !is_open {
            self.open_lecture(user, lecture_id).await?;
        }

        let observed = {
            let mut viewing = self.viewing()?;
            viewing.get_mut(&(lecture_id, user.id)).map(|open| {
                open.last_activity = now();
                (
                    open.course_id,
                    open.session.observe(position_seconds, duration_seconds),
                )
            })
        };
        let Some((course_id, outcome)) = observed else {
            return Ok(ProgressUpdate {
                outcome: PlaybackOutcome::Ignored,
                persisted: None,
            });
        };

        let persisted = match outcome {
            PlaybackOutcome::Completed { .. } => {
                Some(self.persist_watched(user.id, course_id, lecture_id).await)
            }
            _ => None,
        };
        Ok(ProgressUpdate { outcome, persisted })
    }

    /// Writes the watched flag once a viewing session completes. A failed
    /// write leaves the session's completed flag set; the next viewing
    /// session is seeded from storage and will try again.
    async fn persist_watched(&self, student_id: Uuid, course_id: Uuid, lecture_id: Uuid) -> bool {
        let entry = VideoProgressEntry {
            lecture_id,
            student_id,
            watched: true,
            updated_at: now(),
        };
        if let Err(err) = self.repo.upsert_watched(&entry).await {
            tracing::warn!(%lecture_id, %student_id, error = %err, "failed to save watched flag");
            self.notifications.push(
                student_id,
                NoticeLevel::Warning,
                "Progress not saved",
                "We couldn't save your progress for this lecture. Watch it again to retry.",
            );
            return false;
        }

        if let Ok(mut cache) = self.cache() {
            if let Some(cached) = cache.get_mut(&(student_id, course_id)) {
                cached.lecture_ids.insert(lecture_id);
            }
        }
        tracing::info!(%lecture_id, %student_id, "lecture watched");
        self.notifications.push(
            student_id,
            NoticeLevel::Success,
            "Lecture completed!",
            "Great job! You've completed this lecture.",
        );

        match self.course_completion(student_id, course_id).await {
            Ok(completion) if completion.complete => {
                self.notifications.push(
                    student_id,
                    NoticeLevel::Success,
                    "Course completed",
                    "You've watched every lecture in this course",
                );
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(%course_id, %student_id, error = %err, "completion check failed");
            }
        }
        true
    }

    /// Recomputed from storage on every call.
    pub async fn course_completion(&self, student_id: Uuid, course_id: Uuid) -> Result<CourseCompletion> {
        let lecture_ids: Vec<Uuid> = self
            .courses
            .list_lectures(course_id)
            .await?
            .into_iter()
            .map(|l| l.id)
            .collect();
        let watched: HashSet<Uuid> = self
            .repo
            .watched_entries(student_id)
            .await?
            .into_iter()
            .filter(|e| e.watched)
            .map(|e| e.lecture_id)
            .collect();
        Ok(CourseCompletion::compute(
            course_id,
            student_id,
            &lecture_ids,
            &watched,
        ))
    }

    /// Watched lecture ids for rendering lecture lists, served from the cache
    /// once loaded.
    pub async fn watched_lecture_ids(&self, student_id: Uuid, course_id: Uuid) -> Result<Vec<Uuid>> {
        if let Some(cached) = self.cache()?.get_mut(&(student_id, course_id)) {
            cached.last_used = now();
            return Ok(cached.lecture_ids.iter().copied().collect());
        }

        let course_lectures: HashSet<Uuid> = self
            .courses
            .list_lectures(course_id)
            .await?
            .into_iter()
            .map(|l| l.id)
            .collect();
        let lecture_ids: HashSet<Uuid> = self
            .repo
            .watched_entries(student_id)
            .await?
            .into_iter()
            .filter(|e| e.watched && course_lectures.contains(&e.lecture_id))
            .map(|e| e.lecture_id)
            .collect();

        let ids = lecture_ids.iter().copied().collect();
        let loaded_at = now();
        self.cache()?.insert(
            (student_id, course_id),
            WatchedCache {
                lecture_ids,
                loaded_at,
                last_used: loaded_at,
            },
        );
        Ok(ids)
    }

    pub async fn refresh_cache(&self, student_id: Uuid, course_id: Uuid) -> Result<Vec<Uuid>> {
        if let Some(stale) = self.cache()?.remove(&(student_id, course_id)) {
            tracing::debug!(%student_id, %course_id, loaded_at = %stale.loaded_at, "watched cache invalidated");
        }
        self.watched_lecture_ids(student_id, course_id).await
    }

    /// Marks a lecture as unwatched again for the student.
    pub async fn clear_watched(&self, student_id: Uuid, course_id: Uuid, lecture_id: Uuid) -> Result<bool> {
        let cleared = self.repo.clear_watched(lecture_id, student_id).await?;
        if let Some(cached) = self.cache()?.get_mut(&(student_id, course_id)) {
            cached.lecture_ids.remove(&lecture_id);
        }
        Ok(cleared)
    }

    /// Drops viewing sessions with no report and cached watched sets with no
    /// read for the idle window. Returns how many entries went.
    pub fn sweep_idle(&self) -> Result<usize> {
        let cutoff = idle_cutoff(now(), self.idle_minutes);

        let mut viewing = self.viewing()?;
        let before = viewing.len();
        viewing.retain(|_, open| open.last_activity >= cutoff);
        let closed = before - viewing.len();
        drop(viewing);

        let mut cache = self.cache()?;
        let before = cache.len();
        cache.retain(|_, cached| cached.last_used >= cutoff);
        let evicted = before - cache.len();

        if closed + evicted > 0 {
            tracing::info!(closed, evicted, "idle progress state swept");
        }
        Ok(closed + evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::InMemoryRepository;
    use crate::database::repository::MockProgressRepository;
    use crate::dto::course_dto::{CreateCoursePayload, CreateLecturePayload};
    use crate::models::course::Lecture;
    use crate::models::profile::Role;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn person(role: Role) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            role,
            name: "Robin Tan".into(),
            email: String::new(),
        }
    }

    struct Fixture {
        courses: CourseService,
        notifications: NotificationService,
        instructor: CurrentUser,
        student: CurrentUser,
        course_id: Uuid,
    }

    async fn fixture(repo: Arc<InMemoryRepository>) -> Fixture {
        let notifications = NotificationService::new();
        let courses = CourseService::new(repo, notifications.clone());
        let instructor = person(Role::Instructor);
        let course = courses
            .create_course(
                &instructor,
                CreateCoursePayload {
                    title: "Python Basics".into(),
                    description: "Variables, loops and functions in Python.".into(),
                    image_url: None,
                    category: None,
                },
            )
            .await
            .unwrap();
        let student = person(Role::Student);
        courses.enroll(&student, course.id).await.unwrap();
        notifications.drain(student.id);
        Fixture {
            courses,
            notifications,
            instructor,
            student,
            course_id: course.id,
        }
    }

    async fn add_lecture(f: &Fixture, video_url: &str) -> Lecture {
        f.courses
            .create_lecture(
                &f.instructor,
                f.course_id,
                CreateLecturePayload {
                    title: "Loops".into(),
                    description: "for and while loops".into(),
                    video_url: video_url.into(),
                    duration_seconds: Some(300),
                    position: None,
                    resources: vec![],
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn failed_write_keeps_local_flag_and_warns() {
        let f = fixture(Arc::new(InMemoryRepository::new())).await;
        let lecture = add_lecture(&f, "https://cdn.example.com/loops.mp4").await;

        let mut mock = MockProgressRepository::new();
        mock.expect_is_watched().returning(|_, _| Ok(false));
        mock.expect_upsert_watched()
            .times(1)
            .returning(|_| Err(Error::Internal("connection reset".into())));
        let svc = ProgressService::new(Arc::new(mock), f.courses.clone(), f.notifications.clone(), 30);

        svc.open_lecture(&f.student, lecture.id).await.unwrap();
        let first = svc
            .on_video_progress(&f.student, lecture.id, 285.0, 300.0)
            .await
            .unwrap();
        assert_eq!(first.outcome, PlaybackOutcome::Completed { percentage: 95.0 });
        assert_eq!(first.persisted, Some(false));

        let again = svc
            .on_video_progress(&f.student, lecture.id, 299.0, 300.0)
            .await
            .unwrap();
        assert!(matches!(again.outcome, PlaybackOutcome::AlreadyCompleted { .. }));
        assert_eq!(again.persisted, None);

        let notices = f.notifications.drain(f.student.id);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
    }

    #[tokio::test]
    async fn failed_write_is_retried_by_the_next_viewing_session() {
        let f = fixture(Arc::new(InMemoryRepository::new())).await;
        let lecture = add_lecture(&f, "https://cdn.example.com/loops.mp4").await;

        let writes = Arc::new(AtomicUsize::new(0));
        let counter = writes.clone();
        let mut mock = MockProgressRepository::new();
        mock.expect_is_watched().returning(|_, _| Ok(false));
        mock.expect_upsert_watched().times(2).returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(Error::Internal("connection reset".into()))
            } else {
                Ok(())
            }
        });
        mock.expect_watched_entries().returning(|_| Ok(vec![]));
        let svc = ProgressService::new(Arc::new(mock), f.courses.clone(), f.notifications.clone(), 30);

        let first = svc
            .on_video_progress(&f.student, lecture.id, 285.0, 300.0)
            .await
            .unwrap();
        assert_eq!(first.persisted, Some(false));

        assert!(svc.close_lecture(&f.student, lecture.id).unwrap());
        let reopened = svc.open_lecture(&f.student, lecture.id).await.unwrap();
        assert!(!reopened.already_watched);

        let second = svc
            .on_video_progress(&f.student, lecture.id, 290.0, 300.0)
            .await
            .unwrap();
        assert!(matches!(second.outcome, PlaybackOutcome::Completed { .. }));
        assert_eq!(second.persisted, Some(true));
        assert_eq!(writes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn sweep_forgets_abandoned_viewers() {
        let repo = Arc::new(InMemoryRepository::new());
        let f = fixture(repo.clone()).await;
        let svc = ProgressService::new(repo.clone(), f.courses.clone(), f.notifications.clone(), 30);
        let lecture = add_lecture(&f, "https://cdn.example.com/a.mp4").await;

        svc.on_video_progress(&f.student, lecture.id, 10.0, 300.0).await.unwrap();
        svc.watched_lecture_ids(f.student.id, f.course_id).await.unwrap();
        assert_eq!(svc.sweep_idle().unwrap(), 0);

        let stale = now() - chrono::Duration::minutes(31);
        for open in svc.viewing().unwrap().values_mut() {
            open.last_activity = stale;
        }
        for cached in svc.cache().unwrap().values_mut() {
            cached.last_used = stale;
        }
        assert_eq!(svc.sweep_idle().unwrap(), 2);
        assert!(svc.viewing().unwrap().is_empty());
        assert!(svc.cache().unwrap().is_empty());

        let resumed = svc.on_video_progress(&f.student, lecture.id, 280.0, 300.0).await.unwrap();
        assert!(matches!(resumed.outcome, PlaybackOutcome::Completed { .. }));
    }

    #[tokio::test]
    async fn completion_tracks_every_lecture() {
        let repo = Arc::new(InMemoryRepository::new());
        let f = fixture(repo.clone()).await;
        let svc = ProgressService::new(repo.clone(), f.courses.clone(), f.notifications.clone(), 30);

        let empty = svc.course_completion(f.student.id, f.course_id).await.unwrap();
        assert!(!empty.complete);

        let a = add_lecture(&f, "https://cdn.example.com/a.mp4").await;
        let b = add_lecture(&f, "https://cdn.example.com/b.mp4").await;

        svc.on_video_progress(&f.student, a.id, 95.0, 100.0).await.unwrap();
        assert!(!svc.course_completion(f.student.id, f.course_id).await.unwrap().complete);

        let done = svc.on_video_progress(&f.student, b.id, 90.0, 100.0).await.unwrap();
        assert_eq!(done.persisted, Some(true));
        assert!(svc.course_completion(f.student.id, f.course_id).await.unwrap().complete);
        assert!(f
            .notifications
            .drain(f.student.id)
            .iter()
            .any(|n| n.title == "Course completed"));

        assert!(svc.clear_watched(f.student.id, f.course_id, a.id).await.unwrap());
        let flipped = svc.course_completion(f.student.id, f.course_id).await.unwrap();
        assert!(!flipped.complete);
        assert_eq!(flipped.watched_lectures, 1);
    }

    #[tokio::test]
    async fn cache_serves_until_refreshed() {
        let repo = Arc::new(InMemoryRepository::new());
        let f = fixture(repo.clone()).await;
        let svc = ProgressService::new(repo.clone(), f.courses.clone(), f.notifications.clone(), 30);
        let lecture = add_lecture(&f, "https://cdn.example.com/a.mp4").await;

        assert!(svc.watched_lecture_ids(f.student.id, f.course_id).await.unwrap().is_empty());

        repo.upsert_watched(&VideoProgressEntry {
            lecture_id: lecture.id,
            student_id: f.student.id,
            watched: true,
            updated_at: now(),
        })
        .await
        .unwrap();
        assert!(svc.watched_lecture_ids(f.student.id, f.course_id).await.unwrap().is_empty());
        assert_eq!(
            svc.refresh_cache(f.student.id, f.course_id).await.unwrap(),
            vec![lecture.id]
        );
    }

    #[tokio::test]
    async fn embedded_videos_are_not_tracked() {
        let repo = Arc::new(InMemoryRepository::new());
        let f = fixture(repo.clone()).await;
        let svc = ProgressService::new(repo.clone(), f.courses.clone(), f.notifications.clone(), 30);
        let lecture = add_lecture(&f, "https://www.youtube.com/embed/qz0aGYrrlhU").await;

        let opened = svc.open_lecture(&f.student, lecture.id).await.unwrap();
        assert!(!opened.tracked);
        let update = svc
            .on_video_progress(&f.student, lecture.id, 100.0, 100.0)
            .await
            .unwrap();
        assert_eq!(update.outcome, PlaybackOutcome::Ignored);
        assert_eq!(repo.progress_row_count().unwrap(), 0);
    }
}
