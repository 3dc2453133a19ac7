use std::collections::HashSet;

use serde_json::json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::dto::common::{Page, PageWindow};
use crate::dto::pipeline_dto::{
    CreatePipelinePayload, CreateStagePayload, PipelineListQuery, PipelineWithStages,
    StagePayload, UpdatePipelinePayload, UpdateStagePayload,
};
use crate::error::{Error, Result};
use crate::integrity::cascade::{self, CascadeReport};
use crate::integrity::references::ensure_optional;
use crate::integrity::stages::{check_stage_state, MandatoryStages};
use crate::integrity::EntityKind;
use crate::models::activity_log::ActivityTarget;
use crate::models::enums::{ActivityAction, PipelineStatus, StageStatus};
use crate::models::pipeline::{HiringPipeline, HiringStage};
use crate::services::activity_service::ActivityService;

pub(crate) const COLUMNS: &str = "id, name, description, status, created_by_id, created_at, updated_at";
pub(crate) const STAGE_COLUMNS: &str = "id, pipeline_id, name, description, position, mandatory, \
    schedule, status, max_candidates_allowed, assigned_to_id, created_at, updated_at";

#[derive(Clone)]
pub struct PipelineService {
    pool: PgPool,
    mandatory: MandatoryStages,
}

impl PipelineService {
    pub fn new(pool: PgPool, mandatory: MandatoryStages) -> Self {
        Self { pool, mandatory }
    }

    /// Creates the pipeline with its stages in list order. Configured
    /// mandatory stages the caller left out are added at the front.
    pub async fn create(
        &self,
        actor: Option<Uuid>,
        payload: CreatePipelinePayload,
    ) -> Result<PipelineWithStages> {
        let stages = self.mandatory.normalize(payload.stages);
        for stage in &stages {
            check_stage_state(
                &stage.name,
                stage.mandatory,
                stage.status.unwrap_or(StageStatus::Upcoming),
            )?;
        }

        let mut tx = self.pool.begin().await?;
        let pipeline: HiringPipeline = sqlx::query_as(&format!(
            r#"
            INSERT INTO hiring_pipelines (id, name, description, status, created_by_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&payload.name)
        .bind(&payload.description)
        .bind(payload.status.unwrap_or(PipelineStatus::Upcoming))
        .bind(actor)
        .fetch_one(&mut *tx)
        .await?;

        let mut created = Vec::with_capacity(stages.len());
        for (position, stage) in stages.iter().enumerate() {
            created.push(insert_stage(&mut tx, pipeline.id, position as i32, stage).await?);
        }

        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Created,
            ActivityTarget::Pipeline(pipeline.id),
            Some(json!({ "name": pipeline.name, "stages": created.len() })),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(pipeline_id = %pipeline.id, stages = created.len(), "pipeline created");
        Ok(PipelineWithStages {
            pipeline,
            stages: created,
        })
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<PipelineWithStages> {
        let pipeline = sqlx::query_as::<_, HiringPipeline>(&format!(
            "SELECT {COLUMNS} FROM hiring_pipelines WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Hiring pipeline not found".into()))?;

        let stages = sqlx::query_as::<_, HiringStage>(&format!(
            "SELECT {STAGE_COLUMNS} FROM hiring_stages WHERE pipeline_id = $1 ORDER BY position, created_at"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(PipelineWithStages { pipeline, stages })
    }

    pub async fn list(&self, query: PipelineListQuery) -> Result<Page<HiringPipeline>> {
        let window = PageWindow::from_query(query.page, query.per_page);

        let mut items_sql: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM hiring_pipelines WHERE TRUE"));
        let mut count_sql: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM hiring_pipelines WHERE TRUE");
        if let Some(status) = query.status {
            for builder in [&mut items_sql, &mut count_sql] {
                builder.push(" AND status = ").push_bind(status);
            }
        }
        items_sql
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(window.per_page)
            .push(" OFFSET ")
            .push_bind(window.offset());

        let items: Vec<HiringPipeline> = items_sql.build_query_as().fetch_all(&self.pool).await?;
        let total: i64 = count_sql.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(Page::new(items, total, window))
    }

    /// Updates pipeline fields and, when `stages` is given, reconciles the
    /// stage list against it: unlisted stages are deleted (mandatory ones
    /// refuse), listed ones are updated, entries without an id are created.
    pub async fn update(
        &self,
        actor: Option<Uuid>,
        id: Uuid,
        payload: UpdatePipelinePayload,
    ) -> Result<PipelineWithStages> {
        let mut tx = self.pool.begin().await?;

        let pipeline: HiringPipeline = sqlx::query_as(&format!(
            r#"
            UPDATE hiring_pipelines
            SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&payload.name)
        .bind(&payload.description)
        .bind(payload.status)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Hiring pipeline not found".into()))?;

        let mut report = None;
        if let Some(desired) = payload.stages {
            report = Some(self.reconcile_stages(&mut tx, id, desired).await?);
        }

        let stages: Vec<HiringStage> = sqlx::query_as(&format!(
            "SELECT {STAGE_COLUMNS} FROM hiring_stages WHERE pipeline_id = $1 ORDER BY position, created_at"
        ))
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Updated,
            ActivityTarget::Pipeline(id),
            report.map(|r| json!({ "removed_stages": r.deleted_from("hiring_stages") })),
        )
        .await?;
        tx.commit().await?;

        Ok(PipelineWithStages { pipeline, stages })
    }

    async fn reconcile_stages(
        &self,
        conn: &mut PgConnection,
        pipeline_id: Uuid,
        desired: Vec<StagePayload>,
    ) -> Result<CascadeReport> {
        let existing: Vec<HiringStage> = sqlx::query_as(&format!(
            "SELECT {STAGE_COLUMNS} FROM hiring_stages WHERE pipeline_id = $1 FOR UPDATE"
        ))
        .bind(pipeline_id)
        .fetch_all(&mut *conn)
        .await?;

        let kept: HashSet<Uuid> = desired.iter().filter_map(|s| s.id).collect();
        for stage_id in &kept {
            if !existing.iter().any(|s| s.id == *stage_id) {
                return Err(Error::InvalidReference("stages.id".into()));
            }
        }

        let mut report = CascadeReport::default();
        for stage in existing.iter().filter(|s| !kept.contains(&s.id)) {
            self.mandatory.check_removable(stage)?;
            let removed = cascade::cascade_delete_in(&mut *conn, EntityKind::Stage, stage.id).await?;
            for (table, rows) in removed.deleted {
                *report.deleted.entry(table).or_insert(0) += rows;
            }
        }

        for (position, mut stage) in desired.into_iter().enumerate() {
            match stage.id.and_then(|id| existing.iter().find(|s| s.id == id)) {
                Some(current) => {
                    self.mandatory.check_rename(current, &stage.name)?;
                    let mandatory = self
                        .mandatory
                        .is_mandatory(&stage.name, stage.mandatory || current.mandatory);
                    let status = stage.status.unwrap_or(current.status);
                    check_stage_state(&stage.name, mandatory, status)?;
                    ensure_optional(&mut *conn, EntityKind::User, stage.assigned_to_id, "assigned_to_id")
                        .await?;

                    sqlx::query(
                        r#"
                        UPDATE hiring_stages
                        SET name = $2, description = COALESCE($3, description), position = $4,
                            mandatory = $5, schedule = COALESCE($6, schedule), status = $7,
                            max_candidates_allowed = COALESCE($8, max_candidates_allowed),
                            assigned_to_id = COALESCE($9, assigned_to_id), updated_at = NOW()
                        WHERE id = $1
                        "#,
                    )
                    .bind(current.id)
                    .bind(stage.name.trim())
                    .bind(&stage.description)
                    .bind(position as i32)
                    .bind(mandatory)
                    .bind(stage.schedule)
                    .bind(status)
                    .bind(stage.max_candidates_allowed)
                    .bind(stage.assigned_to_id)
                    .execute(&mut *conn)
                    .await?;
                }
                None => {
                    stage.mandatory = self.mandatory.is_mandatory(&stage.name, stage.mandatory);
                    check_stage_state(
                        &stage.name,
                        stage.mandatory,
                        stage.status.unwrap_or(StageStatus::Upcoming),
                    )?;
                    insert_stage(&mut *conn, pipeline_id, position as i32, &stage).await?;
                }
            }
        }
        Ok(report)
    }

    pub async fn delete(&self, actor: Option<Uuid>, id: Uuid) -> Result<CascadeReport> {
        let mut tx = self.pool.begin().await?;
        let report = cascade::cascade_delete_in(&mut tx, EntityKind::Pipeline, id).await?;
        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Deleted,
            ActivityTarget::Pipeline(id),
            Some(serde_json::to_value(&report)?),
        )
        .await?;
        tx.commit().await?;
        Ok(report)
    }

    pub async fn create_stage(
        &self,
        actor: Option<Uuid>,
        pipeline_id: Uuid,
        payload: CreateStagePayload,
    ) -> Result<HiringStage> {
        let mut stage = payload.stage;
        stage.mandatory = self.mandatory.is_mandatory(&stage.name, stage.mandatory);
        check_stage_state(
            &stage.name,
            stage.mandatory,
            stage.status.unwrap_or(StageStatus::Upcoming),
        )?;

        let mut tx = self.pool.begin().await?;
        lock_pipeline(&mut tx, pipeline_id).await?;

        let next: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM hiring_stages WHERE pipeline_id = $1",
        )
        .bind(pipeline_id)
        .fetch_one(&mut *tx)
        .await?;
        let position = payload.position.map_or(next, |p| p.min(next));
        sqlx::query(
            "UPDATE hiring_stages SET position = position + 1 WHERE pipeline_id = $1 AND position >= $2",
        )
        .bind(pipeline_id)
        .bind(position)
        .execute(&mut *tx)
        .await?;

        let created = insert_stage(&mut tx, pipeline_id, position, &stage).await?;
        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Created,
            ActivityTarget::Stage(created.id),
            Some(json!({ "pipeline_id": pipeline_id, "name": created.name })),
        )
        .await?;
        tx.commit().await?;
        Ok(created)
    }

    pub async fn update_stage(
        &self,
        actor: Option<Uuid>,
        stage_id: Uuid,
        payload: UpdateStagePayload,
    ) -> Result<HiringStage> {
        let mut tx = self.pool.begin().await?;
        let current = lock_stage(&mut tx, stage_id).await?;

        let name = payload.name.as_deref().unwrap_or(&current.name).trim().to_string();
        self.mandatory.check_rename(&current, &name)?;
        let mandatory = self
            .mandatory
            .is_mandatory(&name, payload.mandatory.unwrap_or(current.mandatory));
        let status = payload.status.unwrap_or(current.status);
        check_stage_state(&name, mandatory, status)?;
        ensure_optional(&mut tx, EntityKind::User, payload.assigned_to_id, "assigned_to_id").await?;

        if let Some(position) = payload.position.filter(|p| *p != current.position) {
            move_stage(&mut tx, &current, position).await?;
        }

        let stage: HiringStage = sqlx::query_as(&format!(
            r#"
            UPDATE hiring_stages
            SET
                name = $2,
                description = COALESCE($3, description),
                mandatory = $4,
                schedule = COALESCE($5, schedule),
                status = $6,
                max_candidates_allowed = COALESCE($7, max_candidates_allowed),
                assigned_to_id = COALESCE($8, assigned_to_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {STAGE_COLUMNS}
            "#
        ))
        .bind(stage_id)
        .bind(&name)
        .bind(&payload.description)
        .bind(mandatory)
        .bind(payload.schedule)
        .bind(status)
        .bind(payload.max_candidates_allowed)
        .bind(payload.assigned_to_id)
        .fetch_one(&mut *tx)
        .await?;

        let action = if status != current.status {
            ActivityAction::StatusChanged
        } else {
            ActivityAction::Updated
        };
        ActivityService::record_in(
            &mut tx,
            actor,
            action,
            ActivityTarget::Stage(stage_id),
            Some(json!({ "from": current.status, "to": stage.status })),
        )
        .await?;
        tx.commit().await?;
        Ok(stage)
    }

    /// Deletes a non-mandatory stage with its participants and interviews
    /// and closes the gap it leaves in the ordering.
    pub async fn delete_stage(&self, actor: Option<Uuid>, stage_id: Uuid) -> Result<CascadeReport> {
        let mut tx = self.pool.begin().await?;
        let stage = lock_stage(&mut tx, stage_id).await?;
        self.mandatory.check_removable(&stage)?;

        let report = cascade::cascade_delete_in(&mut tx, EntityKind::Stage, stage_id).await?;
        sqlx::query(
            "UPDATE hiring_stages SET position = position - 1 WHERE pipeline_id = $1 AND position > $2",
        )
        .bind(stage.pipeline_id)
        .bind(stage.position)
        .execute(&mut *tx)
        .await?;

        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Deleted,
            ActivityTarget::Stage(stage_id),
            Some(json!({ "pipeline_id": stage.pipeline_id, "name": stage.name })),
        )
        .await?;
        tx.commit().await?;
        Ok(report)
    }
}

async fn insert_stage(
    conn: &mut PgConnection,
    pipeline_id: Uuid,
    position: i32,
    stage: &StagePayload,
) -> Result<HiringStage> {
    ensure_optional(&mut *conn, EntityKind::User, stage.assigned_to_id, "assigned_to_id").await?;
    let created = sqlx::query_as::<_, HiringStage>(&format!(
        r#"
        INSERT INTO hiring_stages (
            id, pipeline_id, name, description, position, mandatory, schedule,
            status, max_candidates_allowed, assigned_to_id
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {STAGE_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(pipeline_id)
    .bind(stage.name.trim())
    .bind(&stage.description)
    .bind(position)
    .bind(stage.mandatory)
    .bind(stage.schedule)
    .bind(stage.status.unwrap_or(StageStatus::Upcoming))
    .bind(stage.max_candidates_allowed)
    .bind(stage.assigned_to_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(created)
}

async fn lock_pipeline(conn: &mut PgConnection, id: Uuid) -> Result<()> {
    let found: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM hiring_pipelines WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    found
        .map(|_| ())
        .ok_or_else(|| Error::NotFound("Hiring pipeline not found".into()))
}

pub(crate) async fn lock_stage(conn: &mut PgConnection, id: Uuid) -> Result<HiringStage> {
    sqlx::query_as::<_, HiringStage>(&format!(
        "SELECT {STAGE_COLUMNS} FROM hiring_stages WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| Error::NotFound("Hiring stage not found".into()))
}

/// Shifts the stages between the old and new slot by one so positions stay
/// contiguous.
async fn move_stage(conn: &mut PgConnection, stage: &HiringStage, target: i32) -> Result<()> {
    let last: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(position), 0) FROM hiring_stages WHERE pipeline_id = $1",
    )
    .bind(stage.pipeline_id)
    .fetch_one(&mut *conn)
    .await?;
    let target = target.clamp(0, last);

    let shift = if target < stage.position {
        "UPDATE hiring_stages SET position = position + 1 \
         WHERE pipeline_id = $1 AND position >= $2 AND position < $3"
    } else {
        "UPDATE hiring_stages SET position = position - 1 \
         WHERE pipeline_id = $1 AND position <= $2 AND position > $3"
    };
    sqlx::query(shift)
        .bind(stage.pipeline_id)
        .bind(target)
        .bind(stage.position)
        .execute(&mut *conn)
        .await?;
    sqlx::query("UPDATE hiring_stages SET position = $2 WHERE id = $1")
        .bind(stage.id)
        .bind(target)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
