use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Extension, Json,
};

use crate::{
    dto::activity_dto::ActivityListQuery, error::Result, middleware::auth::Claims,
    models::enums::Permission, AppState,
};

#[utoipa::path(
    get,
    path = "/api/activity",
    params(
        ("page" = Option<i64>, Query, description = "Page number"),
        ("per_page" = Option<i64>, Query, description = "Items per page"),
        ("target_type" = Option<String>, Query, description = "Filter by target kind"),
        ("target_id" = Option<String>, Query, description = "Filter by target id (UUID)"),
        ("actor_id" = Option<String>, Query, description = "Filter by actor id (UUID)")
    ),
    responses(
        (status = 200, description = "Activity entries, newest first"),
        (status = 403, description = "Missing view_reports permission")
    )
)]
#[axum::debug_handler]
pub async fn list_activity(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ActivityListQuery>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ViewReports)?;
    let page = state.activity_service.list(query).await?;
    Ok(Json(page))
}
