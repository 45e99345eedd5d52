use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::dto::quiz_dto::{JumpPayload, SelectAnswerPayload};
use crate::middleware::auth::CurrentUser;
use crate::AppState;

#[axum::debug_handler]
pub async fn start_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((course_id, quiz_id)): Path<(Uuid, Uuid)>,
) -> crate::error::Result<impl IntoResponse> {
    let session = state
        .quiz_session_service
        .start(&user, course_id, quiz_id)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[axum::debug_handler]
pub async fn get_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> crate::error::Result<impl IntoResponse> {
    let session = state.quiz_session_service.snapshot(&user, id)?;
    Ok(Json(session))
}

#[axum::debug_handler]
pub async fn discard_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> crate::error::Result<impl IntoResponse> {
    state.quiz_session_service.discard(&user, id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn select_answer(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SelectAnswerPayload>,
) -> crate::error::Result<impl IntoResponse> {
    let response = state.quiz_session_service.select_answer(
        &user,
        id,
        payload.question_index,
        payload.option_index,
    )?;
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn next_question(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> crate::error::Result<impl IntoResponse> {
    let response = state.quiz_session_service.next_question(&user, id)?;
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn previous_question(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> crate::error::Result<impl IntoResponse> {
    let response = state.quiz_session_service.previous_question(&user, id)?;
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn jump_to_question(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<JumpPayload>,
) -> crate::error::Result<impl IntoResponse> {
    let response = state
        .quiz_session_service
        .jump_to_question(&user, id, payload.question_index)?;
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn submit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> crate::error::Result<impl IntoResponse> {
    let response = state.quiz_session_service.submit(&user, id).await?;
    Ok(Json(response))
}
