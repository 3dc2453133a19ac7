use serde_json::json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::dto::common::{Page, PageWindow};
use crate::dto::department_dto::{
    CreateDepartmentPayload, DepartmentListQuery, DepartmentWithJobs, UpdateDepartmentPayload,
};
use crate::error::{Error, Result};
use crate::integrity::cascade::{self, CascadeReport};
use crate::integrity::references::{ensure_exists, ensure_optional};
use crate::integrity::EntityKind;
use crate::models::activity_log::ActivityTarget;
use crate::models::department::Department;
use crate::models::enums::ActivityAction;
use crate::services::activity_service::ActivityService;
use crate::services::job_service::JobService;

pub(crate) const COLUMNS: &str = "id, name, description, hiring_manager_id, created_at, updated_at";

#[derive(Clone)]
pub struct DepartmentService {
    pool: PgPool,
}

impl DepartmentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the department and its initial jobs together. A bad job
    /// reference rolls back the department as well.
    pub async fn create(
        &self,
        actor: Option<Uuid>,
        payload: CreateDepartmentPayload,
    ) -> Result<DepartmentWithJobs> {
        let mut tx = self.pool.begin().await?;

        ensure_exists(&mut tx, EntityKind::User, payload.hiring_manager_id, "hiring_manager_id").await?;
        ensure_name_free(&mut tx, &payload.name, None).await?;

        let department: Department = sqlx::query_as(&format!(
            r#"
            INSERT INTO departments (id, name, description, hiring_manager_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(payload.name.trim())
        .bind(&payload.description)
        .bind(payload.hiring_manager_id)
        .fetch_one(&mut *tx)
        .await?;

        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Created,
            ActivityTarget::Department(department.id),
            Some(json!({ "name": department.name, "jobs": payload.jobs.len() })),
        )
        .await?;

        let mut jobs = Vec::with_capacity(payload.jobs.len());
        for fields in payload.jobs {
            jobs.push(JobService::insert_in(&mut tx, actor, department.id, fields).await?);
        }

        tx.commit().await?;
        tracing::info!(department_id = %department.id, jobs = jobs.len(), "department created");
        Ok(DepartmentWithJobs { department, jobs })
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Department> {
        sqlx::query_as::<_, Department>(&format!("SELECT {COLUMNS} FROM departments WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Department not found".into()))
    }

    pub async fn list(&self, query: DepartmentListQuery) -> Result<Page<Department>> {
        let window = PageWindow::from_query(query.page, query.per_page);

        let mut items_sql: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM departments WHERE TRUE"));
        let mut count_sql: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM departments WHERE TRUE");
        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            for builder in [&mut items_sql, &mut count_sql] {
                builder.push(" AND name ILIKE ").push_bind(pattern.clone());
            }
        }
        items_sql
            .push(" ORDER BY name ASC LIMIT ")
            .push_bind(window.per_page)
            .push(" OFFSET ")
            .push_bind(window.offset());

        let items: Vec<Department> = items_sql.build_query_as().fetch_all(&self.pool).await?;
        let total: i64 = count_sql.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(Page::new(items, total, window))
    }

    pub async fn update(
        &self,
        actor: Option<Uuid>,
        id: Uuid,
        payload: UpdateDepartmentPayload,
    ) -> Result<Department> {
        let mut tx = self.pool.begin().await?;

        ensure_optional(&mut tx, EntityKind::User, payload.hiring_manager_id, "hiring_manager_id").await?;
        if let Some(name) = &payload.name {
            ensure_name_free(&mut tx, name, Some(id)).await?;
        }

        let department: Department = sqlx::query_as(&format!(
            r#"
            UPDATE departments
            SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                hiring_manager_id = COALESCE($4, hiring_manager_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(payload.name.as_deref().map(str::trim))
        .bind(&payload.description)
        .bind(payload.hiring_manager_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Department not found".into()))?;

        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Updated,
            ActivityTarget::Department(id),
            None,
        )
        .await?;
        tx.commit().await?;
        Ok(department)
    }

    /// Removes the department with its jobs and everything hanging off them.
    pub async fn delete(&self, actor: Option<Uuid>, id: Uuid) -> Result<CascadeReport> {
        let mut tx = self.pool.begin().await?;
        let report = cascade::cascade_delete_in(&mut tx, EntityKind::Department, id).await?;
        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Deleted,
            ActivityTarget::Department(id),
            Some(serde_json::to_value(&report)?),
        )
        .await?;
        tx.commit().await?;
        Ok(report)
    }
}

async fn ensure_name_free(conn: &mut PgConnection, name: &str, except: Option<Uuid>) -> Result<()> {
    let taken: Option<Uuid> = sqlx::query_scalar(
        "SELECT id FROM departments WHERE lower(name) = lower($1) AND ($2::uuid IS NULL OR id <> $2)",
    )
    .bind(name.trim())
    .bind(except)
    .fetch_optional(&mut *conn)
    .await?;
    match taken {
        Some(_) => Err(Error::Conflict(format!(
            "A department named '{}' already exists",
            name.trim()
        ))),
        None => Ok(()),
    }
}
