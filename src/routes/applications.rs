use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use crate::{
    dto::candidate_dto::CreateApplicationPayload, error::Result, middleware::auth::Claims,
    models::enums::Permission, AppState,
};

#[utoipa::path(
    post,
    path = "/api/applications",
    responses(
        (status = 201, description = "Application recorded"),
        (status = 400, description = "Unknown candidate or job"),
        (status = 409, description = "Candidate has already applied to this job")
    )
)]
#[axum::debug_handler]
pub async fn create_application(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateApplicationPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageCandidates)?;
    let application = state
        .application_service
        .apply(claims.actor(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(application)))
}

#[axum::debug_handler]
pub async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let application = state.application_service.get_by_id(id).await?;
    Ok(Json(application))
}

#[axum::debug_handler]
pub async fn withdraw_application(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageCandidates)?;
    state
        .application_service
        .withdraw(claims.actor(), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
