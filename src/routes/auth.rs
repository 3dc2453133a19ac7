use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use validator::Validate;

use crate::{
    dto::auth_dto::{
        ForgotPasswordPayload, LoginPayload, RegisterPayload, ResetPasswordPayload,
        VerifyEmailPayload,
    },
    error::Result,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/auth/register",
    responses(
        (status = 201, description = "Account created, verification code sent"),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Email already registered")
    )
)]
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = state.user_service.register(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[axum::debug_handler]
pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = state.user_service.verify_email(payload).await?;
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    responses(
        (status = 200, description = "Bearer token issued"),
        (status = 401, description = "Invalid email or password"),
        (status = 403, description = "Account not verified or suspended")
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let session = state.user_service.login(payload).await?;
    Ok(Json(session))
}

/// Always answers 202 so the response does not reveal registered emails.
#[axum::debug_handler]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state.user_service.forgot_password(payload).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "If the account exists, a reset code has been sent" })),
    ))
}

#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state.user_service.reset_password(payload).await?;
    Ok(StatusCode::NO_CONTENT)
}
