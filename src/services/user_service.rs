use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::dto::auth_dto::{
    ForgotPasswordPayload, LoginPayload, LoginResponse, RegisterPayload, ResetPasswordPayload,
    UpdateUserPayload, UserListQuery, VerifyEmailPayload,
};
use crate::dto::common::{Page, PageWindow};
use crate::error::{Error, Result};
use crate::integrity::cascade::{self, CascadeReport};
use crate::integrity::EntityKind;
use crate::middleware::auth::{issue_token, Claims};
use crate::models::activity_log::ActivityTarget;
use crate::models::enums::{ActivityAction, Permission, RoleName, UserStatus};
use crate::models::role::Role;
use crate::models::user::{Credential, User};
use crate::services::activity_service::ActivityService;
use crate::services::notification_service::{CodePurpose, Notifier};
use crate::services::role_service;
use crate::utils::crypto::{code_matches, hash_code, hash_password, verify_password};
use crate::utils::token::generate_numeric_code;

const COLUMNS: &str = "id, name, email, avatar_url, role_id, status, joining_date, created_at, updated_at";
const CREDENTIAL_COLUMNS: &str = "id, user_id, password_hash, verify_code_hash, verify_code_expires_at, \
    forgot_code_hash, forgot_code_expires_at, code_attempts, created_at, updated_at";

const CODE_TTL_MINUTES: i64 = 15;
/// Wrong guesses allowed before the outstanding code is discarded.
const MAX_CODE_ATTEMPTS: i32 = 5;

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
    notifier: Arc<dyn Notifier>,
    jwt_secret: String,
    jwt_ttl_hours: i64,
}

impl UserService {
    pub fn new(
        pool: PgPool,
        notifier: Arc<dyn Notifier>,
        jwt_secret: String,
        jwt_ttl_hours: i64,
    ) -> Self {
        Self {
            pool,
            notifier,
            jwt_secret,
            jwt_ttl_hours,
        }
    }

    /// Registers an unverified user and sends a verification code. The first
    /// account on an empty system becomes admin, later ones recruiters.
    pub async fn register(&self, payload: RegisterPayload) -> Result<User> {
        let email = payload.email.trim().to_lowercase();
        let password_hash = hash_password(&payload.password)?;
        let code = generate_numeric_code();

        let mut tx = self.pool.begin().await?;
        // Serializes concurrent first registrations.
        sqlx::query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        if find_by_email(&mut tx, &email).await?.is_some() {
            return Err(Error::Conflict("A user with this email already exists".into()));
        }

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *tx)
            .await?;
        let role_name = if existing == 0 {
            RoleName::Admin
        } else {
            RoleName::Recruiter
        };
        let role_id: Uuid = sqlx::query_scalar("SELECT id FROM roles WHERE name = $1")
            .bind(role_name)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::Internal(format!("role {} is not seeded", role_name)))?;

        let user: User = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (id, name, email, role_id, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(payload.name.trim())
        .bind(&email)
        .bind(role_id)
        .bind(UserStatus::Unverified)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO credentials (id, user_id, password_hash, verify_code_hash, verify_code_expires_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.id)
        .bind(&password_hash)
        .bind(hash_code(&code))
        .bind(code_expiry())
        .execute(&mut *tx)
        .await?;

        ActivityService::record_in(
            &mut tx,
            Some(user.id),
            ActivityAction::Created,
            ActivityTarget::User(user.id),
            Some(json!({ "role": role_name })),
        )
        .await?;
        tx.commit().await?;

        self.notifier
            .send_code(&user.email, CodePurpose::VerifyEmail, &code)
            .await?;
        tracing::info!(user_id = %user.id, role = %role_name, "user registered");
        Ok(user)
    }

    pub async fn verify_email(&self, payload: VerifyEmailPayload) -> Result<User> {
        let email = payload.email.trim().to_lowercase();
        let mut tx = self.pool.begin().await?;
        let (user, credential) = load_account(&mut tx, &email)
            .await?
            .ok_or_else(invalid_code)?;

        if user.status == UserStatus::Verified {
            return Ok(user);
        }
        if let Err(err) = check_code(
            &payload.code,
            credential.verify_code_hash.as_deref(),
            credential.verify_code_expires_at,
            credential.code_attempts,
        ) {
            record_failed_attempt(&mut tx, user.id, CodePurpose::VerifyEmail).await?;
            tx.commit().await?;
            return Err(err);
        }

        sqlx::query(
            r#"
            UPDATE credentials
            SET verify_code_hash = NULL, verify_code_expires_at = NULL, code_attempts = 0, updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user.id)
        .execute(&mut *tx)
        .await?;
        let user: User = sqlx::query_as(&format!(
            "UPDATE users SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(user.id)
        .bind(UserStatus::Verified)
        .fetch_one(&mut *tx)
        .await?;

        ActivityService::record_in(
            &mut tx,
            Some(user.id),
            ActivityAction::StatusChanged,
            ActivityTarget::User(user.id),
            Some(json!({ "to": UserStatus::Verified })),
        )
        .await?;
        tx.commit().await?;
        Ok(user)
    }

    pub async fn login(&self, payload: LoginPayload) -> Result<LoginResponse> {
        let email = payload.email.trim().to_lowercase();
        let mut conn = self.pool.acquire().await?;
        let Some((user, credential)) = load_account(&mut conn, &email).await? else {
            return Err(bad_credentials());
        };
        if !verify_password(&payload.password, &credential.password_hash)? {
            tracing::debug!(user_id = %user.id, "password mismatch");
            return Err(bad_credentials());
        }
        match user.status {
            UserStatus::Verified => {}
            UserStatus::Unverified => return Err(Error::Forbidden("Email is not verified".into())),
            UserStatus::Suspended => return Err(Error::Forbidden("Account is suspended".into())),
        }

        let role: Role = sqlx::query_as(&format!(
            "SELECT {} FROM roles WHERE id = $1",
            role_service::COLUMNS
        ))
        .bind(user.role_id)
        .fetch_one(&mut *conn)
        .await?;

        let permissions = role.permissions.0.clone();
        let (token, expires_in) = issue_token(
            &self.jwt_secret,
            user.id,
            role.name,
            permissions.clone(),
            self.jwt_ttl_hours,
        )?;
        Ok(LoginResponse {
            token,
            expires_in,
            user,
            role: role.name,
            permissions,
        })
    }

    /// Always succeeds so the endpoint does not reveal which emails are registered.
    pub async fn forgot_password(&self, payload: ForgotPasswordPayload) -> Result<()> {
        let email = payload.email.trim().to_lowercase();
        let mut conn = self.pool.acquire().await?;
        let Some(user) = find_by_email(&mut conn, &email).await? else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(());
        };

        let code = generate_numeric_code();
        sqlx::query(
            r#"
            UPDATE credentials
            SET forgot_code_hash = $2, forgot_code_expires_at = $3, code_attempts = 0, updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user.id)
        .bind(hash_code(&code))
        .bind(code_expiry())
        .execute(&mut *conn)
        .await?;

        self.notifier
            .send_code(&user.email, CodePurpose::ResetPassword, &code)
            .await
    }

    pub async fn reset_password(&self, payload: ResetPasswordPayload) -> Result<()> {
        let email = payload.email.trim().to_lowercase();
        let mut tx = self.pool.begin().await?;
        let (user, credential) = load_account(&mut tx, &email)
            .await?
            .ok_or_else(invalid_code)?;
        if let Err(err) = check_code(
            &payload.code,
            credential.forgot_code_hash.as_deref(),
            credential.forgot_code_expires_at,
            credential.code_attempts,
        ) {
            record_failed_attempt(&mut tx, user.id, CodePurpose::ResetPassword).await?;
            tx.commit().await?;
            return Err(err);
        }
        // Only hash once the code is known good.
        let password_hash = hash_password(&payload.new_password)?;

        sqlx::query(
            r#"
            UPDATE credentials
            SET password_hash = $2, forgot_code_hash = NULL, forgot_code_expires_at = NULL,
                code_attempts = 0, updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user.id)
        .bind(&password_hash)
        .execute(&mut *tx)
        .await?;
        ActivityService::record_in(
            &mut tx,
            Some(user.id),
            ActivityAction::Updated,
            ActivityTarget::User(user.id),
            Some(json!({ "password_reset": true })),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Re-reads the token holder's account. Suspended, unverified or
    /// deleted users are refused, and role and permissions come from the
    /// current role row rather than from the token.
    pub async fn refresh_claims(&self, mut claims: Claims) -> Result<Claims> {
        let user_id = claims.user_id()?;
        let row: Option<(UserStatus, RoleName, Json<Vec<Permission>>)> = sqlx::query_as(
            r#"
            SELECT u.status, r.name, r.permissions
            FROM users u
            JOIN roles r ON r.id = u.role_id
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((status, role, permissions)) = row else {
            return Err(Error::Unauthorized("unknown_user".into()));
        };
        match status {
            UserStatus::Verified => {}
            UserStatus::Suspended => return Err(Error::Forbidden("Account is suspended".into())),
            UserStatus::Unverified => return Err(Error::Forbidden("Email is not verified".into())),
        }
        claims.role = role;
        claims.permissions = permissions.0;
        Ok(claims)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".into()))
    }

    pub async fn list(&self, query: UserListQuery) -> Result<Page<User>> {
        let window = PageWindow::from_query(query.page, query.per_page);

        let mut items_sql: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM users WHERE TRUE"));
        let mut count_sql: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM users WHERE TRUE");
        for builder in [&mut items_sql, &mut count_sql] {
            if let Some(status) = query.status {
                builder.push(" AND status = ").push_bind(status);
            }
            if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
                let pattern = format!("%{}%", search.trim());
                builder
                    .push(" AND (name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR email ILIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
        }
        items_sql
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(window.per_page)
            .push(" OFFSET ")
            .push_bind(window.offset());

        let items: Vec<User> = items_sql.build_query_as().fetch_all(&self.pool).await?;
        let total: i64 = count_sql.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(Page::new(items, total, window))
    }

    pub async fn update(&self, actor: Option<Uuid>, id: Uuid, payload: UpdateUserPayload) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let role_id: Option<Uuid> = match payload.role {
            Some(name) => Some(
                sqlx::query_scalar("SELECT id FROM roles WHERE name = $1")
                    .bind(name)
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or_else(|| Error::InvalidReference("role".into()))?,
            ),
            None => None,
        };

        let user: User = sqlx::query_as(&format!(
            r#"
            UPDATE users
            SET
                name = COALESCE($2, name),
                avatar_url = COALESCE($3, avatar_url),
                role_id = COALESCE($4, role_id),
                status = COALESCE($5, status),
                joining_date = COALESCE($6, joining_date),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(payload.name.as_deref().map(str::trim))
        .bind(&payload.avatar_url)
        .bind(role_id)
        .bind(payload.status)
        .bind(payload.joining_date)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".into()))?;

        let action = if payload.role.is_some() || payload.status.is_some() {
            ActivityAction::StatusChanged
        } else {
            ActivityAction::Updated
        };
        ActivityService::record_in(
            &mut tx,
            actor,
            action,
            ActivityTarget::User(id),
            Some(json!({ "role": payload.role, "status": payload.status })),
        )
        .await?;
        tx.commit().await?;
        Ok(user)
    }

    /// Removes the account with its credentials and memberships. Rows the
    /// user authored stay, with the author reference cleared.
    pub async fn delete(&self, actor: Option<Uuid>, id: Uuid) -> Result<CascadeReport> {
        let mut tx = self.pool.begin().await?;
        let report = cascade::cascade_delete_in(&mut tx, EntityKind::User, id).await?;
        ActivityService::record_in(
            &mut tx,
            actor.filter(|a| *a != id),
            ActivityAction::Deleted,
            ActivityTarget::User(id),
            Some(serde_json::to_value(&report)?),
        )
        .await?;
        tx.commit().await?;
        Ok(report)
    }
}

async fn find_by_email(conn: &mut PgConnection, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE email = $1"))
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(user)
}

async fn load_account(conn: &mut PgConnection, email: &str) -> Result<Option<(User, Credential)>> {
    let Some(user) = find_by_email(&mut *conn, email).await? else {
        return Ok(None);
    };
    let credential = sqlx::query_as::<_, Credential>(&format!(
        "SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE user_id = $1 FOR UPDATE"
    ))
    .bind(user.id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(credential.map(|c| (user, c)))
}

fn code_expiry() -> DateTime<Utc> {
    Utc::now() + Duration::minutes(CODE_TTL_MINUTES)
}

/// Counts a wrong guess and discards the outstanding code once the limit is
/// reached, so a fresh code has to be requested.
async fn record_failed_attempt(conn: &mut PgConnection, user_id: Uuid, purpose: CodePurpose) -> Result<()> {
    let attempts: i32 = sqlx::query_scalar(
        "UPDATE credentials SET code_attempts = code_attempts + 1, updated_at = NOW() WHERE user_id = $1 RETURNING code_attempts",
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    if attempts >= MAX_CODE_ATTEMPTS {
        let (hash_column, expiry_column) = match purpose {
            CodePurpose::VerifyEmail => ("verify_code_hash", "verify_code_expires_at"),
            CodePurpose::ResetPassword => ("forgot_code_hash", "forgot_code_expires_at"),
        };
        sqlx::query(&format!(
            "UPDATE credentials SET {hash_column} = NULL, {expiry_column} = NULL WHERE user_id = $1"
        ))
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
        tracing::warn!(%user_id, ?purpose, attempts, "one-time code discarded after repeated failures");
    }
    Ok(())
}

fn check_code(
    code: &str,
    stored: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
    attempts: i32,
) -> Result<()> {
    let live = attempts < MAX_CODE_ATTEMPTS && expires_at.is_some_and(|at| at > Utc::now());
    match stored {
        Some(hash) if live && code_matches(code, hash) => Ok(()),
        _ => Err(invalid_code()),
    }
}

fn invalid_code() -> Error {
    Error::BadRequest("Invalid or expired code".into())
}

fn bad_credentials() -> Error {
    Error::Unauthorized("Invalid email or password".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_check_requires_match_and_freshness() {
        let hash = hash_code("123456");
        let later = Some(Utc::now() + Duration::minutes(5));
        let earlier = Some(Utc::now() - Duration::minutes(5));

        assert!(check_code("123456", Some(&hash), later, 0).is_ok());
        assert!(check_code("654321", Some(&hash), later, 0).is_err());
        assert!(check_code("123456", Some(&hash), earlier, 0).is_err());
        assert!(check_code("123456", None, later, 0).is_err());
        assert!(check_code("123456", Some(&hash), None, 0).is_err());
    }

    #[test]
    fn exhausted_code_is_refused_even_when_correct() {
        let hash = hash_code("123456");
        let later = Some(Utc::now() + Duration::minutes(5));

        assert!(check_code("123456", Some(&hash), later, MAX_CODE_ATTEMPTS - 1).is_ok());
        assert!(check_code("123456", Some(&hash), later, MAX_CODE_ATTEMPTS).is_err());
    }
}
