use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::interview_dto::{
        AddInterviewerPayload, CreateInterviewPayload, UpdateInterviewPayload,
        UpsertChecklistPayload,
    },
    error::Result,
    middleware::auth::Claims,
    models::enums::Permission,
    AppState,
};

#[axum::debug_handler]
pub async fn schedule_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateInterviewPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageInterviews)?;
    payload.validate()?;
    let interview = state
        .interview_service
        .schedule(claims.actor(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(interview)))
}

#[axum::debug_handler]
pub async fn get_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let interview = state.interview_service.get_by_id(id).await?;
    Ok(Json(interview))
}

#[axum::debug_handler]
pub async fn update_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInterviewPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageInterviews)?;
    payload.validate()?;
    let interview = state
        .interview_service
        .update(claims.actor(), id, payload)
        .await?;
    Ok(Json(interview))
}

#[axum::debug_handler]
pub async fn delete_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageInterviews)?;
    let report = state.interview_service.delete(claims.actor(), id).await?;
    Ok(Json(report))
}

#[axum::debug_handler]
pub async fn add_interviewer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddInterviewerPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageInterviews)?;
    let participant = state
        .interview_service
        .add_interviewer(claims.actor(), id, payload.interviewer_id)
        .await?;
    Ok((StatusCode::CREATED, Json(participant)))
}

#[axum::debug_handler]
pub async fn remove_interviewer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, interviewer_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageInterviews)?;
    state
        .interview_service
        .remove_interviewer(claims.actor(), id, interviewer_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn upsert_checklist(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpsertChecklistPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageInterviews)?;
    payload.validate()?;
    let checklist = state
        .interview_service
        .upsert_checklist(claims.actor(), id, payload)
        .await?;
    Ok(Json(checklist))
}
