use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::course::{Course, Lecture, ResourceKind};
use crate::models::progress::CourseCompletion;
use crate::models::quiz::QuizSummary;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCoursePayload {
    #[validate(length(min = 5, message = "Title must be at least 5 characters"))]
    pub title: String,
    #[validate(length(min = 20, message = "Description must be at least 20 characters"))]
    pub description: String,
    #[validate(url(message = "Image must be a valid URL"))]
    pub image_url: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCoursePayload {
    #[validate(length(min = 5, message = "Title must be at least 5 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 20, message = "Description must be at least 20 characters"))]
    pub description: Option<String>,
    #[validate(url(message = "Image must be a valid URL"))]
    pub image_url: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LectureResourcePayload {
    #[validate(length(min = 1, message = "Resource name cannot be empty"))]
    pub name: String,
    #[validate(url(message = "Resource must be a valid URL"))]
    pub file_url: String,
    #[serde(rename = "type")]
    pub kind: Option<ResourceKind>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLecturePayload {
    #[validate(length(min = 3, message = "Title must be at least 3 characters"))]
    pub title: String,
    #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
    pub description: String,
    #[validate(url(message = "Please enter a valid URL"))]
    pub video_url: String,
    #[validate(range(min = 0, message = "Duration cannot be negative"))]
    pub duration_seconds: Option<i32>,
    /// Appended after the last lecture when absent.
    pub position: Option<i32>,
    #[serde(default)]
    #[validate(nested)]
    pub resources: Vec<LectureResourcePayload>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateLecturePayload {
    #[validate(length(min = 3, message = "Title must be at least 3 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
    pub description: Option<String>,
    #[validate(url(message = "Please enter a valid URL"))]
    pub video_url: Option<String>,
    #[validate(range(min = 0, message = "Duration cannot be negative"))]
    pub duration_seconds: Option<i32>,
    pub position: Option<i32>,
    pub resources: Option<Vec<LectureResourcePayload>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseDetailResponse {
    pub course: Course,
    pub lectures: Vec<Lecture>,
    pub quizzes: Vec<QuizSummary>,
    pub enrollment_count: i64,
    pub is_enrolled: bool,
    pub is_owner: bool,
    pub watched_lecture_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LectureView {
    pub lecture: Lecture,
    /// Opened without enrollment; only the first lecture allows this.
    pub preview: bool,
    pub watched: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionResponse {
    #[serde(flatten)]
    pub completion: CourseCompletion,
    pub watched_lecture_ids: Vec<Uuid>,
}
