use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::dto::quiz_dto::{CreateQuizPayload, UpdateQuizPayload};
use crate::middleware::auth::CurrentUser;
use crate::AppState;

#[axum::debug_handler]
pub async fn list_quizzes(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(course_id): Path<Uuid>,
) -> crate::error::Result<impl IntoResponse> {
    let quizzes = state.quiz_service.list_for_course(course_id).await?;
    Ok(Json(quizzes))
}

#[axum::debug_handler]
pub async fn create_quiz(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<CreateQuizPayload>,
) -> crate::error::Result<impl IntoResponse> {
    let quiz = state
        .quiz_service
        .create_quiz(&user, course_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

#[axum::debug_handler]
pub async fn update_quiz(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateQuizPayload>,
) -> crate::error::Result<impl IntoResponse> {
    let quiz = state.quiz_service.update_quiz(&user, id, payload).await?;
    Ok(Json(quiz))
}

#[axum::debug_handler]
pub async fn delete_quiz(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> crate::error::Result<impl IntoResponse> {
    state.quiz_service.delete_quiz(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn my_attempts(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> crate::error::Result<impl IntoResponse> {
    let attempts = state.quiz_service.my_attempts(&user, id).await?;
    Ok(Json(attempts))
}
