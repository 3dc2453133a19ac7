use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::department_dto::{CreateDepartmentPayload, DepartmentListQuery, UpdateDepartmentPayload},
    error::Result,
    middleware::auth::Claims,
    models::enums::Permission,
    AppState,
};

/// Creates the department together with any jobs listed in the payload.
#[utoipa::path(
    post,
    path = "/api/departments",
    responses(
        (status = 201, description = "Department created with its jobs"),
        (status = 400, description = "Invalid payload or reference"),
        (status = 409, description = "Department name already taken")
    )
)]
#[axum::debug_handler]
pub async fn create_department(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateDepartmentPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageDepartments)?;
    payload.validate()?;
    let department = state
        .department_service
        .create(claims.actor(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(department)))
}

#[axum::debug_handler]
pub async fn list_departments(
    State(state): State<AppState>,
    Query(query): Query<DepartmentListQuery>,
) -> Result<impl IntoResponse> {
    let page = state.department_service.list(query).await?;
    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn get_department(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let department = state.department_service.get_by_id(id).await?;
    Ok(Json(department))
}

#[axum::debug_handler]
pub async fn update_department(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDepartmentPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageDepartments)?;
    payload.validate()?;
    let department = state
        .department_service
        .update(claims.actor(), id, payload)
        .await?;
    Ok(Json(department))
}

#[utoipa::path(
    delete,
    path = "/api/departments/{id}",
    params(
        ("id" = Uuid, Path, description = "Department ID")
    ),
    responses(
        (status = 200, description = "Department and dependent rows removed; body lists counts per table"),
        (status = 404, description = "Department not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_department(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageDepartments)?;
    let report = state.department_service.delete(claims.actor(), id).await?;
    Ok(Json(report))
}
