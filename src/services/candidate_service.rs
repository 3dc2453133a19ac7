use serde_json::json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::dto::candidate_dto::{
    CandidateListQuery, CandidateStats, CreateCandidatePayload, UpdateCandidatePayload,
};
use crate::dto::common::{Page, PageWindow};
use crate::error::{Error, Result};
use crate::integrity::cascade::{self, CascadeReport};
use crate::integrity::transitions::check_transition;
use crate::integrity::EntityKind;
use crate::models::activity_log::ActivityTarget;
use crate::models::candidate::Candidate;
use crate::models::enums::{ActivityAction, ApplicationSource, CandidateStatus};
use crate::services::activity_service::ActivityService;
use crate::services::application_service::ApplicationService;
use crate::services::referral_service;
use crate::services::skill_service::{replace_skills, SkillOwner};

pub(crate) const COLUMNS: &str = "id, name, email, phone, age, resume_url, referral_token_id, \
    status, created_at, updated_at";

#[derive(Clone)]
pub struct CandidateService {
    pool: PgPool,
}

impl CandidateService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a candidate. A referral token is redeemed in the same
    /// transaction and the candidate is applied to the token's job; an
    /// explicit `job_id` adds a second application when it differs.
    pub async fn create(&self, actor: Option<Uuid>, payload: CreateCandidatePayload) -> Result<Candidate> {
        let email = payload.email.trim().to_lowercase();
        let mut tx = self.pool.begin().await?;

        ensure_email_free(&mut tx, &email, None).await?;

        let referral = match payload.referral_token.as_deref() {
            Some(token) => Some(referral_service::resolve_in(&mut tx, token).await?),
            None => None,
        };

        let candidate: Candidate = sqlx::query_as(&format!(
            r#"
            INSERT INTO candidates (id, name, email, phone, age, resume_url, referral_token_id, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(payload.name.trim())
        .bind(&email)
        .bind(&payload.phone)
        .bind(payload.age)
        .bind(&payload.resume_url)
        .bind(referral.as_ref().map(|r| r.id))
        .bind(CandidateStatus::default())
        .fetch_one(&mut *tx)
        .await?;

        replace_skills(&mut tx, SkillOwner::Candidate(candidate.id), &payload.skills).await?;
        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Created,
            ActivityTarget::Candidate(candidate.id),
            Some(json!({ "email": candidate.email, "referral_token_id": candidate.referral_token_id })),
        )
        .await?;

        let referred_job = referral.as_ref().map(|r| r.job_id);
        if let Some(job_id) = referred_job {
            ApplicationService::apply_in(&mut tx, actor, candidate.id, job_id, ApplicationSource::Referral)
                .await?;
        }
        if let Some(job_id) = payload.job_id.filter(|id| Some(*id) != referred_job) {
            let source = payload.source.unwrap_or(ApplicationSource::Direct);
            ApplicationService::apply_in(&mut tx, actor, candidate.id, job_id, source).await?;
        }

        tx.commit().await?;
        tracing::info!(candidate_id = %candidate.id, referred = referral.is_some(), "candidate created");
        Ok(candidate)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Candidate> {
        sqlx::query_as::<_, Candidate>(&format!("SELECT {COLUMNS} FROM candidates WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Candidate not found".into()))
    }

    pub async fn list(&self, query: CandidateListQuery) -> Result<Page<Candidate>> {
        let window = PageWindow::from_query(query.page, query.per_page);

        let mut items_sql: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM candidates c WHERE TRUE"));
        let mut count_sql: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM candidates c WHERE TRUE");
        for builder in [&mut items_sql, &mut count_sql] {
            if let Some(status) = query.status {
                builder.push(" AND c.status = ").push_bind(status);
            }
            if let Some(job_id) = query.job_id {
                builder
                    .push(" AND EXISTS (SELECT 1 FROM job_applications a WHERE a.candidate_id = c.id AND a.job_id = ")
                    .push_bind(job_id)
                    .push(")");
            }
            if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
                let pattern = format!("%{}%", search.trim());
                builder
                    .push(" AND (c.name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR c.email ILIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
        }
        items_sql
            .push(" ORDER BY c.created_at DESC LIMIT ")
            .push_bind(window.per_page)
            .push(" OFFSET ")
            .push_bind(window.offset());

        let items: Vec<Candidate> = items_sql.build_query_as().fetch_all(&self.pool).await?;
        let total: i64 = count_sql.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(Page::new(items, total, window))
    }

    pub async fn update(
        &self,
        actor: Option<Uuid>,
        id: Uuid,
        payload: UpdateCandidatePayload,
    ) -> Result<Candidate> {
        let email = payload.email.as_deref().map(|e| e.trim().to_lowercase());
        let mut tx = self.pool.begin().await?;

        if let Some(email) = &email {
            ensure_email_free(&mut tx, email, Some(id)).await?;
        }

        let candidate: Candidate = sqlx::query_as(&format!(
            r#"
            UPDATE candidates
            SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                age = COALESCE($5, age),
                resume_url = COALESCE($6, resume_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(payload.name.as_deref().map(str::trim))
        .bind(&email)
        .bind(&payload.phone)
        .bind(payload.age)
        .bind(&payload.resume_url)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Candidate not found".into()))?;

        if let Some(skills) = &payload.skills {
            replace_skills(&mut tx, SkillOwner::Candidate(id), skills).await?;
        }
        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Updated,
            ActivityTarget::Candidate(id),
            None,
        )
        .await?;
        tx.commit().await?;
        Ok(candidate)
    }

    /// Moves a candidate along the status graph. The row is locked first so
    /// two concurrent moves cannot both validate against the same state.
    pub async fn update_status(
        &self,
        actor: Option<Uuid>,
        id: Uuid,
        status: CandidateStatus,
    ) -> Result<Candidate> {
        let mut tx = self.pool.begin().await?;

        let current: CandidateStatus =
            sqlx::query_scalar("SELECT status FROM candidates WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| Error::NotFound("Candidate not found".into()))?;

        check_transition(current, status)?;

        let candidate: Candidate = sqlx::query_as(&format!(
            "UPDATE candidates SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::StatusChanged,
            ActivityTarget::Candidate(id),
            Some(json!({ "from": current, "to": status })),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(candidate_id = %id, from = %current, to = %status, "candidate status changed");
        Ok(candidate)
    }

    pub async fn stats(&self) -> Result<CandidateStats> {
        let counts: Vec<(CandidateStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM candidates GROUP BY status")
                .fetch_all(&self.pool)
                .await?;
        Ok(CandidateStats::from_counts(&counts))
    }

    pub async fn delete(&self, actor: Option<Uuid>, id: Uuid) -> Result<CascadeReport> {
        let mut tx = self.pool.begin().await?;
        let report = cascade::cascade_delete_in(&mut tx, EntityKind::Candidate, id).await?;
        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Deleted,
            ActivityTarget::Candidate(id),
            Some(serde_json::to_value(&report)?),
        )
        .await?;
        tx.commit().await?;
        Ok(report)
    }
}

async fn ensure_email_free(conn: &mut PgConnection, email: &str, except: Option<Uuid>) -> Result<()> {
    let taken: Option<Uuid> = sqlx::query_scalar(
        "SELECT id FROM candidates WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2)",
    )
    .bind(email)
    .bind(except)
    .fetch_optional(&mut *conn)
    .await?;
    if taken.is_some() {
        return Err(Error::Conflict("A candidate with this email already exists".into()));
    }
    Ok(())
}
