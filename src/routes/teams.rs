use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::team_dto::{AddMemberPayload, CreateTeamPayload, UpdateTeamPayload},
    error::Result,
    middleware::auth::Claims,
    models::enums::Permission,
    AppState,
};

#[axum::debug_handler]
pub async fn create_team(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTeamPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageTeams)?;
    payload.validate()?;
    let team = state.team_service.create(claims.actor(), payload).await?;
    Ok((StatusCode::CREATED, Json(team)))
}

#[axum::debug_handler]
pub async fn list_teams(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let teams = state.team_service.list().await?;
    Ok(Json(teams))
}

#[axum::debug_handler]
pub async fn get_team(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let team = state.team_service.get_by_id(id).await?;
    Ok(Json(team))
}

#[axum::debug_handler]
pub async fn update_team(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTeamPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageTeams)?;
    payload.validate()?;
    let team = state.team_service.update(claims.actor(), id, payload).await?;
    Ok(Json(team))
}

#[axum::debug_handler]
pub async fn delete_team(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageTeams)?;
    let report = state.team_service.delete(claims.actor(), id).await?;
    Ok(Json(report))
}

#[axum::debug_handler]
pub async fn add_member(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddMemberPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageTeams)?;
    let member = state
        .team_service
        .add_member(claims.actor(), id, payload.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(member)))
}

#[axum::debug_handler]
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageTeams)?;
    state
        .team_service
        .remove_member(claims.actor(), id, user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
