use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::database::repository::CourseRepository;
use crate::dto::course_dto::{
    CreateCoursePayload, CreateLecturePayload, LectureResourcePayload, UpdateCoursePayload,
    UpdateLecturePayload,
};
use crate::error::{Error, Result};
use crate::middleware::auth::CurrentUser;
use crate::models::course::{Course, Enrollment, Lecture, LectureResource, ResourceKind};
use crate::models::profile::Profile;
use crate::services::notification_service::{NoticeLevel, NotificationService};
use crate::utils::time::now;

/// How the caller relates to a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Owner,
    Enrolled,
    Outsider,
}

impl Membership {
    pub fn is_member(self) -> bool {
        !matches!(self, Membership::Outsider)
    }
}

#[derive(Clone)]
pub struct CourseService {
    repo: Arc<dyn CourseRepository>,
    notifications: NotificationService,
}

impl CourseService {
    pub fn new(repo: Arc<dyn CourseRepository>, notifications: NotificationService) -> Self {
        Self { repo, notifications }
    }

    pub fn repository(&self) -> &Arc<dyn CourseRepository> {
        &self.repo
    }

    /// Keeps the stored profile in step with the latest token claims.
    pub async fn sync_profile(&self, user: &CurrentUser) -> Result<Profile> {
        let created_at = match self.repo.get_profile(user.id).await? {
            Some(existing) => existing.created_at,
            None => now(),
        };
        let profile = Profile {
            id: user.id,
            full_name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            created_at,
        };
        self.repo.upsert_profile(&profile).await?;
        Ok(profile)
    }

    pub async fn display_name(&self, user: &CurrentUser) -> Result<String> {
        Ok(self
            .repo
            .get_profile(user.id)
            .await?
            .map(|p| p.full_name)
            .unwrap_or_else(|| user.name.clone()))
    }

    pub async fn list_courses(&self) -> Result<Vec<Course>> {
        self.repo.list_courses().await
    }

    pub async fn get_course(&self, id: Uuid) -> Result<Course> {
        self.repo
            .get_course(id)
            .await?
            .ok_or_else(|| Error::NotFound("Course not found".to_string()))
    }

    pub async fn membership(&self, course: &Course, user: &CurrentUser) -> Result<Membership> {
        if course.instructor_id == user.id {
            return Ok(Membership::Owner);
        }
        if self.repo.is_enrolled(course.id, user.id).await? {
            return Ok(Membership::Enrolled);
        }
        Ok(Membership::Outsider)
    }

    /// Enrolled students and the owning instructor pass; everyone else is forbidden.
    pub async fn require_member(&self, course_id: Uuid, user: &CurrentUser) -> Result<(Course, Membership)> {
        let course = self.get_course(course_id).await?;
        let membership = self.membership(&course, user).await?;
        if !membership.is_member() {
            return Err(Error::Forbidden(
                "You must be enrolled in this course".to_string(),
            ));
        }
        Ok((course, membership))
    }

    pub async fn require_owner(&self, course_id: Uuid, user: &CurrentUser) -> Result<Course> {
        let course = self.get_course(course_id).await?;
        if !user.is_instructor() || course.instructor_id != user.id {
            return Err(Error::Forbidden(
                "Only the course instructor can do this".to_string(),
            ));
        }
        Ok(course)
    }

    pub async fn create_course(&self, user: &CurrentUser, payload: CreateCoursePayload) -> Result<Course> {
        payload.validate()?;
        if !user.is_instructor() {
            return Err(Error::Forbidden(
                "Only instructors can create courses".to_string(),
            ));
        }
        let profile = self.sync_profile(user).await?;

        let course = Course {
            id: Uuid::new_v4(),
            title: payload.title.trim().to_string(),
            description: payload.description.trim().to_string(),
            image_url: payload.image_url,
            category: payload.category.filter(|c| !c.trim().is_empty()),
            instructor_id: user.id,
            instructor_name: profile.full_name,
            created_at: now(),
        };
        self.repo.insert_course(&course).await?;
        tracing::info!(course_id = %course.id, instructor_id = %user.id, "course created");
        self.notifications.push(
            user.id,
            NoticeLevel::Success,
            "Course created",
            "Your course has been created successfully",
        );
        Ok(course)
    }

    pub async fn update_course(
        &self,
        user: &CurrentUser,
        course_id: Uuid,
        payload: UpdateCoursePayload,
    ) -> Result<Course> {
        payload.validate()?;
        let mut course = self.require_owner(course_id, user).await?;
        if let Some(title) = payload.title {
            course.title = title.trim().to_string();
        }
        if let Some(description) = payload.description {
            course.description = description.trim().to_string();
        }
        if let Some(image_url) = payload.image_url {
            course.image_url = Some(image_url);
        }
        if let Some(category) = payload.category {
            course.category = Some(category).filter(|c| !c.trim().is_empty());
        }
        self.repo.update_course(&course).await?;
        tracing::info!(course_id = %course.id, "course updated");
        Ok(course)
    }

    pub async fn delete_course(&self, user: &CurrentUser, course_id: Uuid) -> Result<()> {
        self.require_owner(course_id, user).await?;
        if !self.repo.delete_course(course_id).await? {
            return Err(Error::NotFound("Course not found".to_string()));
        }
        tracing::info!(%course_id, "course deleted");
        self.notifications.push(
            user.id,
            NoticeLevel::Success,
            "Course deleted",
            "The course has been deleted successfully",
        );
        Ok(())
    }

    pub async fn instructor_courses(&self, user: &CurrentUser) -> Result<Vec<Course>> {
        let courses = self.repo.list_courses().await?;
        Ok(courses
            .into_iter()
            .filter(|c| c.instructor_id == user.id)
            .collect())
    }

    pub async fn enrolled_courses(&self, user: &CurrentUser) -> Result<Vec<Course>> {
        let ids = self.repo.enrolled_course_ids(user.id).await?;
        let mut courses = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(course) = self.repo.get_course(id).await? {
                courses.push(course);
            }
        }
        Ok(courses)
    }

    pub async fn enroll(&self, user: &CurrentUser, course_id: Uuid) -> Result<Enrollment> {
        if !user.is_student() {
            return Err(Error::Forbidden(
                "Only students can enroll in courses".to_string(),
            ));
        }
        let course = self.get_course(course_id).await?;
        self.sync_profile(user).await?;

        let enrolled_at = now();
        if !self.repo.enroll(course.id, user.id, enrolled_at).await? {
            return Err(Error::Conflict(
                "Already enrolled in this course".to_string(),
            ));
        }
        tracing::info!(%course_id, student_id = %user.id, "student enrolled");
        self.notifications.push(
            user.id,
            NoticeLevel::Success,
            "Enrollment successful",
            "You have been enrolled in the course",
        );
        Ok(Enrollment {
            course_id: course.id,
            student_id: user.id,
            enrolled_at,
        })
    }

    pub async fn enrollment_count(&self, course_id: Uuid) -> Result<i64> {
        self.repo.enrollment_count(course_id).await
    }

    pub async fn list_lectures(&self, course_id: Uuid) -> Result<Vec<Lecture>> {
        self.repo.list_lectures(course_id).await
    }

    pub async fn find_lecture(&self, lecture_id: Uuid) -> Result<Lecture> {
        self.repo
            .get_lecture(lecture_id)
            .await?
            .ok_or_else(|| Error::NotFound("Lecture not found".to_string()))
    }

    /// Returns the lecture and whether it was opened as a preview. Outsiders
    /// may only open the first lecture of a course.
    pub async fn open_lecture(&self, user: &CurrentUser, lecture_id: Uuid) -> Result<(Lecture, bool)> {
        let lecture = self.find_lecture(lecture_id).await?;
        let course = self.get_course(lecture.course_id).await?;
        if self.membership(&course, user).await?.is_member() {
            return Ok((lecture, false));
        }

        let lectures = self.repo.list_lectures(course.id).await?;
        match lectures.first() {
            Some(first) if first.id == lecture.id => Ok((lecture, true)),
            _ => Err(Error::Forbidden(
                "Enroll in this course to access this lecture".to_string(),
            )),
        }
    }

    pub async fn create_lecture(
        &self,
        user: &CurrentUser,
        course_id: Uuid,
        payload: CreateLecturePayload,
    ) -> Result<Lecture> {
        payload.validate()?;
        let course = self.require_owner(course_id, user).await?;

        let position = match payload.position {
            Some(position) => position,
            None => self
                .repo
                .list_lectures(course.id)
                .await?
                .iter()
                .map(|l| l.position + 1)
                .max()
                .unwrap_or(0),
        };

        let lecture = Lecture {
            id: Uuid::new_v4(),
            course_id: course.id,
            position,
            title: payload.title.trim().to_string(),
            description: payload.description.trim().to_string(),
            video_url: payload.video_url.trim().to_string(),
            duration_seconds: payload.duration_seconds,
            resources: to_resources(payload.resources),
            created_at: now(),
        };
        self.repo.insert_lecture(&lecture).await?;
        tracing::info!(lecture_id = %lecture.id, %course_id, "lecture created");
        self.notifications.push(
            user.id,
            NoticeLevel::Success,
            "Lecture created",
            "Your lecture has been added to the course",
        );
        Ok(lecture)
    }

    pub async fn update_lecture(
        &self,
        user: &CurrentUser,
        lecture_id: Uuid,
        payload: UpdateLecturePayload,
    ) -> Result<Lecture> {
        payload.validate()?;
        if let Some(resources) = &payload.resources {
            for resource in resources {
                resource.validate()?;
            }
        }
        let mut lecture = self.find_lecture(lecture_id).await?;
        self.require_owner(lecture.course_id, user).await?;

        if let Some(title) = payload.title {
            lecture.title = title.trim().to_string();
        }
        if let Some(description) = payload.description {
            lecture.description = description.trim().to_string();
        }
        if let Some(video_url) = payload.video_url {
            lecture.video_url = video_url.trim().to_string();
        }
        if payload.duration_seconds.is_some() {
            lecture.duration_seconds = payload.duration_seconds;
        }
        if let Some(position) = payload.position {
            lecture.position = position;
        }
        if let Some(resources) = payload.resources {
            lecture.resources = to_resources(resources);
        }
        self.repo.update_lecture(&lecture).await?;
        tracing::info!(%lecture_id, "lecture updated");
        Ok(lecture)
    }

    pub async fn delete_lecture(&self, user: &CurrentUser, lecture_id: Uuid) -> Result<()> {
        let lecture = self.find_lecture(lecture_id).await?;
        self.require_owner(lecture.course_id, user).await?;
        if !self.repo.delete_lecture(lecture_id).await? {
            return Err(Error::NotFound("Lecture not found".to_string()));
        }
        tracing::info!(%lecture_id, "lecture deleted");
        Ok(())
    }
}

fn to_resources(payloads: Vec<LectureResourcePayload>) -> Vec<LectureResource> {
    payloads
        .into_iter()
        .map(|r| LectureResource {
            id: Uuid::new_v4(),
            name: r.name.trim().to_string(),
            file_url: r.file_url,
            kind: r.kind.unwrap_or(ResourceKind::Other),
        })
        .collect()
}
