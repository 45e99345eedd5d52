use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::middleware::auth::CurrentUser;
use crate::AppState;

#[axum::debug_handler]
pub async fn my_certificates(
    State(state): State<AppState>,
    user: CurrentUser,
) -> crate::error::Result<impl IntoResponse> {
    let certificates = state.certificate_service.list_mine(&user).await?;
    Ok(Json(certificates))
}

/// Any signed-in user may look a certificate up, so it can be verified.
#[axum::debug_handler]
pub async fn get_certificate(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> crate::error::Result<impl IntoResponse> {
    let certificate = state.certificate_service.get(id).await?;
    Ok(Json(certificate))
}
