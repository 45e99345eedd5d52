use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::dto::course_dto::CompletionResponse;
use crate::dto::progress_dto::VideoProgressPayload;
use crate::middleware::auth::CurrentUser;
use crate::AppState;

#[axum::debug_handler]
pub async fn open_lecture(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(lecture_id): Path<Uuid>,
) -> crate::error::Result<impl IntoResponse> {
    let opened = state.progress_service.open_lecture(&user, lecture_id).await?;
    Ok(Json(opened))
}

#[axum::debug_handler]
pub async fn close_lecture(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(lecture_id): Path<Uuid>,
) -> crate::error::Result<impl IntoResponse> {
    state.progress_service.close_lecture(&user, lecture_id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn report_progress(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(lecture_id): Path<Uuid>,
    Json(payload): Json<VideoProgressPayload>,
) -> crate::error::Result<impl IntoResponse> {
    let update = state
        .progress_service
        .on_video_progress(
            &user,
            lecture_id,
            payload.position_seconds,
            payload.duration_seconds,
        )
        .await?;
    Ok(Json(update))
}

#[axum::debug_handler]
pub async fn mark_unwatched(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(lecture_id): Path<Uuid>,
) -> crate::error::Result<impl IntoResponse> {
    let lecture = state.course_service.find_lecture(lecture_id).await?;
    state
        .course_service
        .require_member(lecture.course_id, &user)
        .await?;
    let cleared = state
        .progress_service
        .clear_watched(user.id, lecture.course_id, lecture.id)
        .await?;
    Ok(Json(json!({ "cleared": cleared })))
}

#[axum::debug_handler]
pub async fn course_completion(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(course_id): Path<Uuid>,
) -> crate::error::Result<impl IntoResponse> {
    state.course_service.require_member(course_id, &user).await?;
    let completion = state
        .progress_service
        .course_completion(user.id, course_id)
        .await?;
    let watched_lecture_ids = state
        .progress_service
        .watched_lecture_ids(user.id, course_id)
        .await?;
    Ok(Json(CompletionResponse {
        completion,
        watched_lecture_ids,
    }))
}

#[axum::debug_handler]
pub async fn refresh_progress(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(course_id): Path<Uuid>,
) -> crate::error::Result<impl IntoResponse> {
    state.course_service.require_member(course_id, &user).await?;
    let watched_lecture_ids = state
        .progress_service
        .refresh_cache(user.id, course_id)
        .await?;
    Ok(Json(json!({ "watched_lecture_ids": watched_lecture_ids })))
}
