use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::enums::{Permission, RoleName};
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: RoleName,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| Error::Unauthorized("invalid subject".into()))
    }

    /// Actor id for activity entries written on behalf of this token.
    pub fn actor(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    pub fn require(&self, permission: Permission) -> Result<()> {
        if self.permissions.contains(&permission) {
            Ok(())
        } else {
            Err(Error::Forbidden(format!("missing permission {}", permission)))
        }
    }
}

/// Signs an HS256 token. Returns the token and its lifetime in seconds.
pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    role: RoleName,
    permissions: Vec<Permission>,
    ttl_hours: i64,
) -> Result<(String, i64)> {
    let ttl = Duration::hours(ttl_hours);
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + ttl).timestamp() as usize,
        role,
        permissions,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("token signing failed: {}", e)))?;
    Ok((token, ttl.num_seconds()))
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| Error::Unauthorized("invalid_token".into()))
}

pub async fn require_bearer_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return reject("missing_authorization");
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return reject("bad_authorization");
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return reject("unsupported_scheme");
    };

    let Ok(claims) = decode_token(&state.config.jwt_secret, token) else {
        return reject("invalid_token");
    };
    match state.user_service.refresh_claims(claims).await {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(err) => err.into_response(),
    }
}

fn reject(code: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": code }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_decodes_with_same_secret() {
        let user = Uuid::new_v4();
        let (token, expires_in) = issue_token(
            "secret",
            user,
            RoleName::Recruiter,
            RoleName::Recruiter.default_permissions(),
            2,
        )
        .unwrap();
        assert_eq!(expires_in, 7200);

        let claims = decode_token("secret", &token).unwrap();
        assert_eq!(claims.user_id().unwrap(), user);
        assert_eq!(claims.role, RoleName::Recruiter);
        assert!(claims.require(Permission::ManageCandidates).is_ok());
        assert!(matches!(
            claims.require(Permission::ManageUsers),
            Err(Error::Forbidden(_))
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let (token, _) =
            issue_token("secret", Uuid::new_v4(), RoleName::Admin, vec![], 1).unwrap();
        assert!(matches!(
            decode_token("other", &token),
            Err(Error::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let (token, _) =
            issue_token("secret", Uuid::new_v4(), RoleName::Admin, vec![], -2).unwrap();
        assert!(decode_token("secret", &token).is_err());
    }
}
