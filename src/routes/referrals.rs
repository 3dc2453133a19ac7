use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    middleware::auth::Claims,
    models::enums::Permission,
    AppState,
};

/// Public lookup used by the application form before a candidate signs up.
#[axum::debug_handler]
pub async fn resolve_referral(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse> {
    let referral = state.referral_service.resolve(&token).await?;
    let job = state.job_service.get_by_id(referral.job_id).await?;
    Ok(Json(serde_json::json!({
        "job_id": job.id,
        "job_title": job.title,
        "expires_at": referral.expires_at,
    })))
}

#[axum::debug_handler]
pub async fn revoke_referral(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((job_id, id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageJobs)?;
    let issued = state.referral_service.list_for_job(job_id).await?;
    if !issued.iter().any(|r| r.id == id) {
        return Err(Error::NotFound("Referral token not found".into()));
    }
    let report = state.referral_service.revoke(claims.actor(), id).await?;
    Ok(Json(report))
}
