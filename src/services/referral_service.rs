use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::integrity::cascade::{self, CascadeReport};
use crate::integrity::references::ensure_exists;
use crate::integrity::EntityKind;
use crate::models::activity_log::ActivityTarget;
use crate::models::enums::ActivityAction;
use crate::models::referral::ReferralToken;
use crate::services::activity_service::ActivityService;
use crate::utils::token::generate_referral_token;

const COLUMNS: &str = "id, token, referred_by_id, job_id, expires_at, created_at, updated_at";

#[derive(Clone)]
pub struct ReferralService {
    pool: PgPool,
    default_ttl_days: i64,
}

impl ReferralService {
    pub fn new(pool: PgPool, default_ttl_days: i64) -> Self {
        Self {
            pool,
            default_ttl_days,
        }
    }

    pub async fn issue(
        &self,
        actor: Option<Uuid>,
        job_id: Uuid,
        ttl_days: Option<i64>,
    ) -> Result<ReferralToken> {
        let ttl = Duration::days(ttl_days.unwrap_or(self.default_ttl_days));
        let mut tx = self.pool.begin().await?;
        ensure_exists(&mut tx, EntityKind::Job, job_id, "job_id").await?;

        let token: ReferralToken = sqlx::query_as(&format!(
            r#"
            INSERT INTO referral_tokens (id, token, referred_by_id, job_id, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(generate_referral_token())
        .bind(actor)
        .bind(job_id)
        .bind(Utc::now() + ttl)
        .fetch_one(&mut *tx)
        .await?;

        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Created,
            ActivityTarget::Referral(token.id),
            Some(json!({ "job_id": job_id, "expires_at": token.expires_at })),
        )
        .await?;
        tx.commit().await?;
        Ok(token)
    }

    /// Looks up a live token. An expired token is reported exactly like a
    /// missing one, whether or not the purge job has removed it yet.
    pub async fn resolve(&self, token: &str) -> Result<ReferralToken> {
        let mut conn = self.pool.acquire().await?;
        resolve_in(&mut conn, token).await
    }

    pub async fn list_for_job(&self, job_id: Uuid) -> Result<Vec<ReferralToken>> {
        let tokens = sqlx::query_as::<_, ReferralToken>(&format!(
            "SELECT {COLUMNS} FROM referral_tokens WHERE job_id = $1 ORDER BY created_at DESC"
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tokens)
    }

    pub async fn revoke(&self, actor: Option<Uuid>, id: Uuid) -> Result<CascadeReport> {
        let mut tx = self.pool.begin().await?;
        let report = cascade::cascade_delete_in(&mut tx, EntityKind::ReferralToken, id).await?;
        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Deleted,
            ActivityTarget::Referral(id),
            Some(serde_json::to_value(&report)?),
        )
        .await?;
        tx.commit().await?;
        Ok(report)
    }
}

/// Resolves and key-share locks a token inside the caller's transaction.
pub(crate) async fn resolve_in(conn: &mut PgConnection, token: &str) -> Result<ReferralToken> {
    let found = sqlx::query_as::<_, ReferralToken>(&format!(
        "SELECT {COLUMNS} FROM referral_tokens WHERE token = $1 FOR KEY SHARE"
    ))
    .bind(token.trim())
    .fetch_optional(&mut *conn)
    .await?;

    match found {
        Some(t) if !t.is_expired_at(Utc::now()) => Ok(t),
        Some(t) => {
            tracing::debug!(referral_id = %t.id, "expired referral token presented");
            Err(Error::NotFound("Referral token not found".into()))
        }
        None => Err(Error::NotFound("Referral token not found".into())),
    }
}
