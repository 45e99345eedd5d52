use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::dto::community_dto::{ChatPayload, ChatQuery, CommentPayload};
use crate::middleware::auth::CurrentUser;
use crate::AppState;

#[axum::debug_handler]
pub async fn list_discussion(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(course_id): Path<Uuid>,
) -> crate::error::Result<impl IntoResponse> {
    let comments = state
        .community_service
        .list_discussion(&user, course_id)
        .await?;
    Ok(Json(comments))
}

#[axum::debug_handler]
pub async fn post_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<CommentPayload>,
) -> crate::error::Result<impl IntoResponse> {
    let comment = state
        .community_service
        .post_comment(&user, course_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[axum::debug_handler]
pub async fn post_reply(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((course_id, comment_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CommentPayload>,
) -> crate::error::Result<impl IntoResponse> {
    let reply = state
        .community_service
        .post_reply(&user, course_id, comment_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(reply)))
}

#[axum::debug_handler]
pub async fn list_chat(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(course_id): Path<Uuid>,
    Query(query): Query<ChatQuery>,
) -> crate::error::Result<impl IntoResponse> {
    let messages = state
        .community_service
        .list_chat(&user, course_id, query.limit)
        .await?;
    Ok(Json(messages))
}

#[axum::debug_handler]
pub async fn send_chat(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<ChatPayload>,
) -> crate::error::Result<impl IntoResponse> {
    let message = state
        .community_service
        .send_chat(&user, course_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}
