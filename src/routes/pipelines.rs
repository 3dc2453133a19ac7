use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::pipeline_dto::{
        CreatePipelinePayload, CreateStagePayload, EnrollParticipantPayload, PipelineListQuery,
        RecordStageResultPayload, UpdatePipelinePayload, UpdateStagePayload,
    },
    error::{Error, Result},
    middleware::auth::Claims,
    models::enums::Permission,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/pipelines",
    responses(
        (status = 201, description = "Pipeline created; mandatory stages are prepended"),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn create_pipeline(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreatePipelinePayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManagePipelines)?;
    payload.validate()?;
    let pipeline = state.pipeline_service.create(claims.actor(), payload).await?;
    Ok((StatusCode::CREATED, Json(pipeline)))
}

#[axum::debug_handler]
pub async fn list_pipelines(
    State(state): State<AppState>,
    Query(query): Query<PipelineListQuery>,
) -> Result<impl IntoResponse> {
    let page = state.pipeline_service.list(query).await?;
    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn get_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let pipeline = state.pipeline_service.get_by_id(id).await?;
    Ok(Json(pipeline))
}

#[axum::debug_handler]
pub async fn get_pipeline_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let detail = state
        .aggregation_service
        .pipeline_detail(id)
        .await?
        .ok_or_else(|| Error::NotFound("Pipeline not found".into()))?;
    Ok(Json(detail))
}

/// Replaces the stage list. Stages left out are deleted with their
/// participants and interviews; mandatory stages cannot be left out.
#[axum::debug_handler]
pub async fn update_pipeline(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePipelinePayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManagePipelines)?;
    payload.validate()?;
    let pipeline = state
        .pipeline_service
        .update(claims.actor(), id, payload)
        .await?;
    Ok(Json(pipeline))
}

#[axum::debug_handler]
pub async fn delete_pipeline(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManagePipelines)?;
    let report = state.pipeline_service.delete(claims.actor(), id).await?;
    Ok(Json(report))
}

#[axum::debug_handler]
pub async fn create_stage(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(pipeline_id): Path<Uuid>,
    Json(payload): Json<CreateStagePayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManagePipelines)?;
    payload.validate()?;
    let stage = state
        .pipeline_service
        .create_stage(claims.actor(), pipeline_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(stage)))
}

#[axum::debug_handler]
pub async fn update_stage(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(stage_id): Path<Uuid>,
    Json(payload): Json<UpdateStagePayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManagePipelines)?;
    payload.validate()?;
    let stage = state
        .pipeline_service
        .update_stage(claims.actor(), stage_id, payload)
        .await?;
    Ok(Json(stage))
}

#[utoipa::path(
    delete,
    path = "/api/stages/{id}",
    params(
        ("id" = Uuid, Path, description = "Stage ID")
    ),
    responses(
        (status = 200, description = "Stage removed with its participants and interviews"),
        (status = 404, description = "Stage not found"),
        (status = 409, description = "Stage is mandatory")
    )
)]
#[axum::debug_handler]
pub async fn delete_stage(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(stage_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManagePipelines)?;
    let report = state
        .pipeline_service
        .delete_stage(claims.actor(), stage_id)
        .await?;
    Ok(Json(report))
}

#[axum::debug_handler]
pub async fn list_participants(
    State(state): State<AppState>,
    Path(stage_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let participants = state
        .stage_participant_service
        .list_for_stage(stage_id)
        .await?;
    Ok(Json(participants))
}

#[axum::debug_handler]
pub async fn enroll_participant(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(stage_id): Path<Uuid>,
    Json(payload): Json<EnrollParticipantPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageCandidates)?;
    let participant = state
        .stage_participant_service
        .enroll(claims.actor(), stage_id, payload.candidate_id)
        .await?;
    Ok((StatusCode::CREATED, Json(participant)))
}

#[axum::debug_handler]
pub async fn record_result(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((stage_id, candidate_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<RecordStageResultPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageInterviews)?;
    payload.validate()?;
    let participant = state
        .stage_participant_service
        .record_result(claims.actor(), stage_id, candidate_id, payload)
        .await?;
    Ok(Json(participant))
}

#[axum::debug_handler]
pub async fn withdraw_participant(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((stage_id, candidate_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageCandidates)?;
    state
        .stage_participant_service
        .withdraw(claims.actor(), stage_id, candidate_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
