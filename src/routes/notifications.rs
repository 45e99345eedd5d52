use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::middleware::auth::CurrentUser;
use crate::AppState;

#[axum::debug_handler]
pub async fn poll_notifications(
    State(state): State<AppState>,
    user: CurrentUser,
) -> impl IntoResponse {
    let notices = state.notification_service.drain(user.id);
    Json(json!({ "notices": notices }))
}
