use serde_json::json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::dto::candidate_dto::CreateApplicationPayload;
use crate::error::{Error, Result};
use crate::integrity::references::{check_references, Reference};
use crate::integrity::EntityKind;
use crate::models::activity_log::ActivityTarget;
use crate::models::candidate::JobApplication;
use crate::models::enums::{ActivityAction, ApplicationSource};
use crate::services::activity_service::ActivityService;

pub(crate) const COLUMNS: &str = "id, candidate_id, job_id, applied_at, source, match_score, \
    match_summary, created_at, updated_at";

#[derive(Clone)]
pub struct ApplicationService {
    pool: PgPool,
}

impl ApplicationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn apply(
        &self,
        actor: Option<Uuid>,
        payload: CreateApplicationPayload,
    ) -> Result<JobApplication> {
        let mut tx = self.pool.begin().await?;
        let application = Self::apply_in(
            &mut tx,
            actor,
            payload.candidate_id,
            payload.job_id,
            payload.source.unwrap_or(ApplicationSource::Direct),
        )
        .await?;
        tx.commit().await?;
        Ok(application)
    }

    /// A candidate applies to a job at most once.
    pub(crate) async fn apply_in(
        conn: &mut PgConnection,
        actor: Option<Uuid>,
        candidate_id: Uuid,
        job_id: Uuid,
        source: ApplicationSource,
    ) -> Result<JobApplication> {
        check_references(
            &mut *conn,
            [
                Reference::new(EntityKind::Candidate, candidate_id, "candidate_id"),
                Reference::new(EntityKind::Job, job_id, "job_id"),
            ],
        )
        .await?;

        let existing: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM job_applications WHERE candidate_id = $1 AND job_id = $2",
        )
        .bind(candidate_id)
        .bind(job_id)
        .fetch_optional(&mut *conn)
        .await?;
        if existing.is_some() {
            return Err(Error::Conflict("Candidate has already applied to this job".into()));
        }

        let application: JobApplication = sqlx::query_as(&format!(
            r#"
            INSERT INTO job_applications (id, candidate_id, job_id, source)
            VALUES ($1, $2, $3, $4)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(candidate_id)
        .bind(job_id)
        .bind(source)
        .fetch_one(&mut *conn)
        .await?;

        ActivityService::record_in(
            conn,
            actor,
            ActivityAction::Created,
            ActivityTarget::Application(application.id),
            Some(json!({ "candidate_id": candidate_id, "job_id": job_id, "source": source })),
        )
        .await?;
        Ok(application)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<JobApplication> {
        sqlx::query_as::<_, JobApplication>(&format!(
            "SELECT {COLUMNS} FROM job_applications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Job application not found".into()))
    }

    pub async fn list_for_job(&self, job_id: Uuid) -> Result<Vec<JobApplication>> {
        let rows = sqlx::query_as::<_, JobApplication>(&format!(
            "SELECT {COLUMNS} FROM job_applications WHERE job_id = $1 \
             ORDER BY match_score DESC NULLS LAST, applied_at"
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_for_candidate(&self, candidate_id: Uuid) -> Result<Vec<JobApplication>> {
        let rows = sqlx::query_as::<_, JobApplication>(&format!(
            "SELECT {COLUMNS} FROM job_applications WHERE candidate_id = $1 ORDER BY applied_at DESC"
        ))
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn withdraw(&self, actor: Option<Uuid>, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let removed: Option<(Uuid, Uuid)> = sqlx::query_as(
            "DELETE FROM job_applications WHERE id = $1 RETURNING candidate_id, job_id",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let (candidate_id, job_id) =
            removed.ok_or_else(|| Error::NotFound("Job application not found".into()))?;

        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Deleted,
            ActivityTarget::Application(id),
            Some(json!({ "candidate_id": candidate_id, "job_id": job_id })),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Stores a resume match score on the candidate's application to the job.
    pub async fn record_match(
        &self,
        candidate_id: Uuid,
        job_id: Uuid,
        score: i32,
        summary: &str,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let updated: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE job_applications
            SET match_score = $3, match_summary = $4, updated_at = NOW()
            WHERE candidate_id = $1 AND job_id = $2
            RETURNING id
            "#,
        )
        .bind(candidate_id)
        .bind(job_id)
        .bind(score.clamp(0, 100))
        .bind(summary)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(application_id) = updated {
            ActivityService::record_in(
                &mut tx,
                None,
                ActivityAction::Scored,
                ActivityTarget::Application(application_id),
                Some(json!({ "score": score })),
            )
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
