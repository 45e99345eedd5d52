use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::dto::course_dto::{CreateLecturePayload, LectureView, UpdateLecturePayload};
use crate::middleware::auth::CurrentUser;
use crate::AppState;

#[axum::debug_handler]
pub async fn create_lecture(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<CreateLecturePayload>,
) -> crate::error::Result<impl IntoResponse> {
    let lecture = state
        .course_service
        .create_lecture(&user, course_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(lecture)))
}

#[axum::debug_handler]
pub async fn get_lecture(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> crate::error::Result<impl IntoResponse> {
    let (lecture, preview) = state.course_service.open_lecture(&user, id).await?;
    let watched = if preview || !user.is_student() {
        false
    } else {
        state
            .progress_service
            .watched_lecture_ids(user.id, lecture.course_id)
            .await?
            .contains(&lecture.id)
    };
    Ok(Json(LectureView {
        lecture,
        preview,
        watched,
    }))
}

#[axum::debug_handler]
pub async fn update_lecture(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLecturePayload>,
) -> crate::error::Result<impl IntoResponse> {
    let lecture = state.course_service.update_lecture(&user, id, payload).await?;
    Ok(Json(lecture))
}

#[axum::debug_handler]
pub async fn delete_lecture(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> crate::error::Result<impl IntoResponse> {
    state.course_service.delete_lecture(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
