use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::candidate_dto::{
        CandidateListQuery, CreateAttachmentPayload, CreateCandidatePayload, CreateNotePayload,
        UpdateCandidatePayload, UpdateCandidateStatusPayload,
    },
    error::{Error, Result},
    middleware::auth::Claims,
    models::enums::Permission,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/candidates",
    responses(
        (status = 201, description = "Candidate created and applied to the referred or given job"),
        (status = 400, description = "Invalid payload or reference"),
        (status = 404, description = "Referral token not found or expired"),
        (status = 409, description = "Email already in use")
    )
)]
#[axum::debug_handler]
pub async fn create_candidate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCandidatePayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageCandidates)?;
    payload.validate()?;
    let candidate = state
        .candidate_service
        .create(claims.actor(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(candidate)))
}

#[axum::debug_handler]
pub async fn list_candidates(
    State(state): State<AppState>,
    Query(query): Query<CandidateListQuery>,
) -> Result<impl IntoResponse> {
    let page = state.candidate_service.list(query).await?;
    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn candidate_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ViewReports)?;
    let stats = state.candidate_service.stats().await?;
    Ok(Json(stats))
}

#[axum::debug_handler]
pub async fn get_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let candidate = state.candidate_service.get_by_id(id).await?;
    Ok(Json(candidate))
}

#[axum::debug_handler]
pub async fn get_candidate_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let detail = state
        .aggregation_service
        .candidate_detail(id)
        .await?
        .ok_or_else(|| Error::NotFound("Candidate not found".into()))?;
    Ok(Json(detail))
}

#[axum::debug_handler]
pub async fn update_candidate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCandidatePayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageCandidates)?;
    payload.validate()?;
    let candidate = state
        .candidate_service
        .update(claims.actor(), id, payload)
        .await?;
    Ok(Json(candidate))
}

#[utoipa::path(
    patch,
    path = "/api/candidates/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Candidate ID")
    ),
    responses(
        (status = 200, description = "Status changed"),
        (status = 404, description = "Candidate not found"),
        (status = 409, description = "Transition not allowed from the current status")
    )
)]
#[axum::debug_handler]
pub async fn update_candidate_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCandidateStatusPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageCandidates)?;
    let candidate = state
        .candidate_service
        .update_status(claims.actor(), id, payload.status)
        .await?;
    Ok(Json(candidate))
}

#[axum::debug_handler]
pub async fn delete_candidate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageCandidates)?;
    let report = state.candidate_service.delete(claims.actor(), id).await?;
    Ok(Json(report))
}

#[axum::debug_handler]
pub async fn list_candidate_applications(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let applications = state.application_service.list_for_candidate(id).await?;
    Ok(Json(applications))
}

#[axum::debug_handler]
pub async fn list_candidate_interviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let interviews = state.interview_service.list_for_candidate(id).await?;
    Ok(Json(interviews))
}

#[axum::debug_handler]
pub async fn add_note(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateNotePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let note = state.note_service.add_note(claims.actor(), id, payload).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

#[axum::debug_handler]
pub async fn list_notes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let notes = state.note_service.list_notes(id).await?;
    Ok(Json(notes))
}

#[axum::debug_handler]
pub async fn delete_note(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, note_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageCandidates)?;
    state.note_service.delete_note(id, note_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn add_attachment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateAttachmentPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageCandidates)?;
    payload.validate()?;
    let attachment = state
        .note_service
        .add_attachment(claims.actor(), id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

#[axum::debug_handler]
pub async fn list_attachments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let attachments = state.note_service.list_attachments(id).await?;
    Ok(Json(attachments))
}

#[axum::debug_handler]
pub async fn delete_attachment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, attachment_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageCandidates)?;
    state
        .note_service
        .delete_attachment(id, attachment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
