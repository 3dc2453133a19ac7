//! Scheduled cleanup of rows that outlive their time-to-live.

use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Serialize)]
pub struct PurgeReport {
    pub referral_tokens: u64,
    pub candidates_detached: u64,
    pub expired_codes: u64,
    pub activity_logs: u64,
}

/// Removes expired referral tokens, stale one-time codes and activity
/// older than `activity_retention_days`, in one transaction.
pub async fn purge_expired(pool: &PgPool, activity_retention_days: i64) -> Result<PurgeReport> {
    let now = Utc::now();
    let cutoff = now - Duration::days(activity_retention_days.max(1));
    let mut tx = pool.begin().await?;

    let detached = sqlx::query(
        r#"
        UPDATE candidates SET referral_token_id = NULL, updated_at = NOW()
        WHERE referral_token_id IN (SELECT id FROM referral_tokens WHERE expires_at <= $1)
        "#,
    )
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let tokens = sqlx::query("DELETE FROM referral_tokens WHERE expires_at <= $1")
        .bind(now)
        .execute(&mut *tx)
        .await?;

    let verify_codes = sqlx::query(
        r#"
        UPDATE credentials SET verify_code_hash = NULL, verify_code_expires_at = NULL, updated_at = NOW()
        WHERE verify_code_expires_at <= $1
        "#,
    )
    .bind(now)
    .execute(&mut *tx)
    .await?;
    let forgot_codes = sqlx::query(
        r#"
        UPDATE credentials SET forgot_code_hash = NULL, forgot_code_expires_at = NULL, updated_at = NOW()
        WHERE forgot_code_expires_at <= $1
        "#,
    )
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let logs = sqlx::query("DELETE FROM activity_logs WHERE created_at < $1")
        .bind(cutoff)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(PurgeReport {
        referral_tokens: tokens.rows_affected(),
        candidates_detached: detached.rows_affected(),
        expired_codes: verify_codes.rows_affected() + forgot_codes.rows_affected(),
        activity_logs: logs.rows_affected(),
    })
}

/// Starts a scheduler running [`purge_expired`] on `schedule` (six-field
/// cron, seconds first). The returned handle must be kept alive.
pub async fn start_scheduler(
    pool: PgPool,
    schedule: &str,
    activity_retention_days: i64,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await.map_err(scheduler_error)?;

    let job = CronJob::new_async(schedule, move |_id, _scheduler| {
        let pool = pool.clone();
        Box::pin(async move {
            match purge_expired(&pool, activity_retention_days).await {
                Ok(report) => tracing::info!(
                    referral_tokens = report.referral_tokens,
                    candidates_detached = report.candidates_detached,
                    expired_codes = report.expired_codes,
                    activity_logs = report.activity_logs,
                    "expiry purge finished"
                ),
                Err(e) => tracing::error!(error = %e, "expiry purge failed"),
            }
        })
    })
    .map_err(scheduler_error)?;

    scheduler.add(job).await.map_err(scheduler_error)?;
    scheduler.start().await.map_err(scheduler_error)?;
    Ok(scheduler)
}

fn scheduler_error(e: impl std::fmt::Debug) -> Error {
    Error::Internal(format!("scheduler: {:?}", e))
}
