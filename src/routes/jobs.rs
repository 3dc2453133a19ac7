use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        candidate_dto::CreateReferralPayload,
        job_dto::{CreateJobPayload, JobListQuery, UpdateJobPayload},
        matching_dto::MatchJobPayload,
    },
    error::{Error, Result},
    middleware::auth::Claims,
    models::enums::Permission,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/jobs",
    responses(
        (status = 201, description = "Job created"),
        (status = 400, description = "Invalid payload, salary range or reference")
    )
)]
#[axum::debug_handler]
pub async fn create_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateJobPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageJobs)?;
    payload.validate()?;
    let job = state.job_service.create(claims.actor(), payload).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

#[utoipa::path(
    get,
    path = "/api/jobs",
    params(
        ("page" = Option<i64>, Query, description = "Page number"),
        ("per_page" = Option<i64>, Query, description = "Items per page"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("department_id" = Option<Uuid>, Query, description = "Filter by department"),
        ("search" = Option<String>, Query, description = "Title or location contains")
    ),
    responses(
        (status = 200, description = "Paged list of jobs")
    )
)]
#[axum::debug_handler]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> Result<impl IntoResponse> {
    let page = state.job_service.list(query).await?;
    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = state.job_service.get_by_id(id).await?;
    Ok(Json(job))
}

#[axum::debug_handler]
pub async fn get_job_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let detail = state
        .aggregation_service
        .job_detail(id)
        .await?
        .ok_or_else(|| Error::NotFound("Job not found".into()))?;
    Ok(Json(detail))
}

#[axum::debug_handler]
pub async fn update_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateJobPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageJobs)?;
    payload.validate()?;
    let job = state.job_service.update(claims.actor(), id, payload).await?;
    Ok(Json(job))
}

#[axum::debug_handler]
pub async fn delete_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageJobs)?;
    let report = state.job_service.delete(claims.actor(), id).await?;
    Ok(Json(report))
}

#[axum::debug_handler]
pub async fn list_job_applications(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let applications = state.application_service.list_for_job(id).await?;
    Ok(Json(applications))
}

#[axum::debug_handler]
pub async fn issue_referral(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateReferralPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let referral = state
        .referral_service
        .issue(claims.actor(), id, payload.ttl_days)
        .await?;
    Ok((StatusCode::CREATED, Json(referral)))
}

#[axum::debug_handler]
pub async fn list_referrals(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageJobs)?;
    let referrals = state.referral_service.list_for_job(id).await?;
    Ok(Json(referrals))
}

/// Scores the job's applicants against their resumes. Individual failures
/// are reported per candidate; the request itself succeeds.
#[utoipa::path(
    post,
    path = "/api/jobs/{id}/match",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Per-candidate scores and failures"),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn match_candidates(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MatchJobPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageCandidates)?;
    let report = state.matching_service.match_job(id, payload).await?;
    tracing::info!(
        job_id = %id,
        scored = report.scored,
        failed = report.failed,
        "resume matching finished"
    );
    Ok(Json(report))
}
