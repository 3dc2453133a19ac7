use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::auth_dto::{UpdateRolePayload, UpdateUserPayload, UserListQuery},
    error::Result,
    middleware::auth::Claims,
    models::enums::Permission,
    AppState,
};

#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.get_by_id(claims.user_id()?).await?;
    Ok(Json(user))
}

#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<UserListQuery>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageUsers)?;
    let page = state.user_service.list(query).await?;
    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn get_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    if claims.user_id()? != id {
        claims.require(Permission::ManageUsers)?;
    }
    let user = state.user_service.get_by_id(id).await?;
    Ok(Json(user))
}

/// Users may edit their own profile; role and status need `manage_users`.
#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User updated"),
        (status = 400, description = "Invalid payload or unknown role"),
        (status = 403, description = "Missing permission"),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let privileged = payload.role.is_some() || payload.status.is_some();
    if privileged || claims.user_id()? != id {
        claims.require(Permission::ManageUsers)?;
    }
    let user = state.user_service.update(claims.actor(), id, payload).await?;
    Ok(Json(user))
}

#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    if claims.user_id()? != id {
        claims.require(Permission::ManageUsers)?;
    }
    let report = state.user_service.delete(claims.actor(), id).await?;
    Ok(Json(report))
}

#[axum::debug_handler]
pub async fn list_roles(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let roles = state.role_service.list().await?;
    Ok(Json(roles))
}

#[axum::debug_handler]
pub async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let role = state.role_service.get_by_id(id).await?;
    Ok(Json(role))
}

#[axum::debug_handler]
pub async fn update_role(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRolePayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageRoles)?;
    payload.validate()?;
    let role = state.role_service.update(id, payload).await?;
    Ok(Json(role))
}
