use serde_json::json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::dto::common::{Page, PageWindow};
use crate::dto::job_dto::{salary_range_errors, CreateJobPayload, JobFields, JobListQuery, UpdateJobPayload};
use crate::error::{Error, Result};
use crate::integrity::cascade::{self, CascadeReport};
use crate::integrity::references::{check_references, Reference};
use crate::integrity::EntityKind;
use crate::models::activity_log::ActivityTarget;
use crate::models::enums::{ActivityAction, JobStatus};
use crate::models::job::Job;
use crate::services::activity_service::ActivityService;
use crate::services::skill_service::{replace_skills, SkillOwner};

pub(crate) const COLUMNS: &str = "id, title, description, location, department_id, hiring_manager_id, \
    hiring_pipeline_id, work_type, contract, head_count, minimum_salary, maximum_salary, currency, \
    status, created_by_id, created_at, updated_at";

#[derive(Clone)]
pub struct JobService {
    pool: PgPool,
}

impl JobService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, actor: Option<Uuid>, payload: CreateJobPayload) -> Result<Job> {
        let mut tx = self.pool.begin().await?;
        let job = Self::insert_in(&mut tx, actor, payload.department_id, payload.job).await?;
        tx.commit().await?;
        tracing::info!(job_id = %job.id, department_id = %job.department_id, "job created");
        Ok(job)
    }

    /// Validates references and persists a job inside an open transaction.
    /// Department creation reuses this for the jobs it opens.
    pub(crate) async fn insert_in(
        conn: &mut PgConnection,
        actor: Option<Uuid>,
        department_id: Uuid,
        fields: JobFields,
    ) -> Result<Job> {
        salary_range_errors(fields.minimum_salary, fields.maximum_salary)?;

        let refs = [
            Reference::new(EntityKind::Department, department_id, "department_id"),
            Reference::new(EntityKind::User, fields.hiring_manager_id, "hiring_manager_id"),
        ]
        .into_iter()
        .chain(Reference::optional(
            EntityKind::Pipeline,
            fields.hiring_pipeline_id,
            "hiring_pipeline_id",
        ));
        check_references(&mut *conn, refs).await?;

        let job: Job = sqlx::query_as(&format!(
            r#"
            INSERT INTO jobs (
                id, title, description, location, department_id, hiring_manager_id,
                hiring_pipeline_id, work_type, contract, head_count, minimum_salary,
                maximum_salary, currency, status, created_by_id
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.location)
        .bind(department_id)
        .bind(fields.hiring_manager_id)
        .bind(fields.hiring_pipeline_id)
        .bind(fields.work_type)
        .bind(fields.contract)
        .bind(fields.head_count)
        .bind(fields.minimum_salary)
        .bind(fields.maximum_salary)
        .bind(&fields.currency)
        .bind(fields.status.unwrap_or(JobStatus::Draft))
        .bind(actor)
        .fetch_one(&mut *conn)
        .await?;

        replace_skills(&mut *conn, SkillOwner::Job(job.id), &fields.skills).await?;
        ActivityService::record_in(
            conn,
            actor,
            ActivityAction::Created,
            ActivityTarget::Job(job.id),
            Some(json!({ "title": job.title, "department_id": department_id })),
        )
        .await?;
        Ok(job)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Job> {
        sqlx::query_as::<_, Job>(&format!("SELECT {COLUMNS} FROM jobs WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".into()))
    }

    pub async fn list(&self, query: JobListQuery) -> Result<Page<Job>> {
        let window = PageWindow::from_query(query.page, query.per_page);

        let mut items_sql: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM jobs WHERE TRUE"));
        let mut count_sql: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM jobs WHERE TRUE");
        for builder in [&mut items_sql, &mut count_sql] {
            if let Some(status) = query.status {
                builder.push(" AND status = ").push_bind(status);
            }
            if let Some(department_id) = query.department_id {
                builder.push(" AND department_id = ").push_bind(department_id);
            }
            if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
                let pattern = format!("%{}%", search.trim());
                builder
                    .push(" AND (title ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR location ILIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
        }
        items_sql
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(window.per_page)
            .push(" OFFSET ")
            .push_bind(window.offset());

        let items: Vec<Job> = items_sql.build_query_as().fetch_all(&self.pool).await?;
        let total: i64 = count_sql.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(Page::new(items, total, window))
    }

    pub async fn update(&self, actor: Option<Uuid>, id: Uuid, payload: UpdateJobPayload) -> Result<Job> {
        let mut tx = self.pool.begin().await?;

        let current: Job = sqlx::query_as(&format!("SELECT {COLUMNS} FROM jobs WHERE id = $1 FOR UPDATE"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".into()))?;

        salary_range_errors(
            payload.minimum_salary.or(current.minimum_salary),
            payload.maximum_salary.or(current.maximum_salary),
        )?;

        let refs = [
            Reference::optional(EntityKind::Department, payload.department_id, "department_id"),
            Reference::optional(EntityKind::User, payload.hiring_manager_id, "hiring_manager_id"),
            Reference::optional(EntityKind::Pipeline, payload.hiring_pipeline_id, "hiring_pipeline_id"),
        ]
        .into_iter()
        .flatten();
        check_references(&mut tx, refs).await?;

        let job: Job = sqlx::query_as(&format!(
            r#"
            UPDATE jobs
            SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                location = COALESCE($4, location),
                department_id = COALESCE($5, department_id),
                hiring_manager_id = COALESCE($6, hiring_manager_id),
                hiring_pipeline_id = COALESCE($7, hiring_pipeline_id),
                work_type = COALESCE($8, work_type),
                contract = COALESCE($9, contract),
                head_count = COALESCE($10, head_count),
                minimum_salary = COALESCE($11, minimum_salary),
                maximum_salary = COALESCE($12, maximum_salary),
                currency = COALESCE($13, currency),
                status = COALESCE($14, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(&payload.location)
        .bind(payload.department_id)
        .bind(payload.hiring_manager_id)
        .bind(payload.hiring_pipeline_id)
        .bind(payload.work_type)
        .bind(payload.contract)
        .bind(payload.head_count)
        .bind(payload.minimum_salary)
        .bind(payload.maximum_salary)
        .bind(&payload.currency)
        .bind(payload.status)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(skills) = &payload.skills {
            replace_skills(&mut tx, SkillOwner::Job(id), skills).await?;
        }

        let action = if payload.status.is_some_and(|s| s != current.status) {
            ActivityAction::StatusChanged
        } else {
            ActivityAction::Updated
        };
        ActivityService::record_in(
            &mut tx,
            actor,
            action,
            ActivityTarget::Job(id),
            Some(json!({ "from": current.status, "to": job.status })),
        )
        .await?;

        tx.commit().await?;
        Ok(job)
    }

    pub async fn delete(&self, actor: Option<Uuid>, id: Uuid) -> Result<CascadeReport> {
        let mut tx = self.pool.begin().await?;
        let report = cascade::cascade_delete_in(&mut tx, EntityKind::Job, id).await?;
        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Deleted,
            ActivityTarget::Job(id),
            Some(serde_json::to_value(&report)?),
        )
        .await?;
        tx.commit().await?;
        Ok(report)
    }
}
