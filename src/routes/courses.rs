use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::dto::course_dto::{CourseDetailResponse, CreateCoursePayload, UpdateCoursePayload};
use crate::middleware::auth::CurrentUser;
use crate::services::course_service::Membership;
use crate::AppState;

#[axum::debug_handler]
pub async fn list_courses(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> crate::error::Result<impl IntoResponse> {
    let courses = state.course_service.list_courses().await?;
    Ok(Json(courses))
}

#[axum::debug_handler]
pub async fn create_course(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateCoursePayload>,
) -> crate::error::Result<impl IntoResponse> {
    let course = state.course_service.create_course(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

#[axum::debug_handler]
pub async fn get_course(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> crate::error::Result<impl IntoResponse> {
    let course = state.course_service.get_course(id).await?;
    let membership = state.course_service.membership(&course, &user).await?;
    let lectures = state.course_service.list_lectures(id).await?;
    let quizzes = state.quiz_service.list_for_course(id).await?;
    let enrollment_count = state.course_service.enrollment_count(id).await?;
    let watched_lecture_ids = if membership == Membership::Enrolled {
        state.progress_service.watched_lecture_ids(user.id, id).await?
    } else {
        Vec::new()
    };

    Ok(Json(CourseDetailResponse {
        course,
        lectures,
        quizzes,
        enrollment_count,
        is_enrolled: membership == Membership::Enrolled,
        is_owner: membership == Membership::Owner,
        watched_lecture_ids,
    }))
}

#[axum::debug_handler]
pub async fn update_course(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCoursePayload>,
) -> crate::error::Result<impl IntoResponse> {
    let course = state.course_service.update_course(&user, id, payload).await?;
    Ok(Json(course))
}

#[axum::debug_handler]
pub async fn delete_course(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> crate::error::Result<impl IntoResponse> {
    state.course_service.delete_course(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn instructor_courses(
    State(state): State<AppState>,
    user: CurrentUser,
) -> crate::error::Result<impl IntoResponse> {
    let courses = state.course_service.instructor_courses(&user).await?;
    Ok(Json(courses))
}

#[axum::debug_handler]
pub async fn my_courses(
    State(state): State<AppState>,
    user: CurrentUser,
) -> crate::error::Result<impl IntoResponse> {
    let courses = state.course_service.enrolled_courses(&user).await?;
    Ok(Json(courses))
}

#[axum::debug_handler]
pub async fn enroll(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> crate::error::Result<impl IntoResponse> {
    let enrollment = state.course_service.enroll(&user, id).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}
