use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::pipeline_dto::RecordStageResultPayload;
use crate::error::{Error, Result};
use crate::integrity::references::ensure_exists;
use crate::integrity::EntityKind;
use crate::models::activity_log::ActivityTarget;
use crate::models::enums::{ActivityAction, StageStatus};
use crate::models::stage_participant::StageParticipant;
use crate::services::activity_service::ActivityService;
use crate::services::pipeline_service::lock_stage;

pub(crate) const COLUMNS: &str =
    "id, candidate_id, stage_id, appeared, qualified, score, feedback, created_at, updated_at";

#[derive(Clone)]
pub struct StageParticipantService {
    pool: PgPool,
}

impl StageParticipantService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enrolls a candidate in a stage. The stage row stays locked for the
    /// rest of the transaction so concurrent enrollments see each other
    /// when checking `max_candidates_allowed`.
    pub async fn enroll(
        &self,
        actor: Option<Uuid>,
        stage_id: Uuid,
        candidate_id: Uuid,
    ) -> Result<StageParticipant> {
        let mut tx = self.pool.begin().await?;
        let stage = lock_stage(&mut tx, stage_id).await?;
        ensure_exists(&mut tx, EntityKind::Candidate, candidate_id, "candidate_id").await?;

        if matches!(stage.status, StageStatus::Completed | StageStatus::Terminated) {
            return Err(Error::Conflict(format!(
                "Stage '{}' is {} and does not accept candidates",
                stage.name, stage.status
            )));
        }

        let enrolled: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM stage_participants WHERE stage_id = $1 AND candidate_id = $2",
        )
        .bind(stage_id)
        .bind(candidate_id)
        .fetch_optional(&mut *tx)
        .await?;
        if enrolled.is_some() {
            return Err(Error::Conflict("Candidate is already enrolled in this stage".into()));
        }

        if let Some(max) = stage.max_candidates_allowed {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM stage_participants WHERE stage_id = $1")
                    .bind(stage_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if count >= i64::from(max) {
                return Err(Error::Conflict(format!(
                    "Stage '{}' is full ({} of {} candidates)",
                    stage.name, count, max
                )));
            }
        }

        let participant: StageParticipant = sqlx::query_as(&format!(
            r#"
            INSERT INTO stage_participants (id, candidate_id, stage_id)
            VALUES ($1, $2, $3)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(candidate_id)
        .bind(stage_id)
        .fetch_one(&mut *tx)
        .await?;

        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Assigned,
            ActivityTarget::Stage(stage_id),
            Some(json!({ "candidate_id": candidate_id })),
        )
        .await?;
        tx.commit().await?;
        Ok(participant)
    }

    pub async fn record_result(
        &self,
        actor: Option<Uuid>,
        stage_id: Uuid,
        candidate_id: Uuid,
        payload: RecordStageResultPayload,
    ) -> Result<StageParticipant> {
        let mut tx = self.pool.begin().await?;
        let participant: StageParticipant = sqlx::query_as(&format!(
            r#"
            UPDATE stage_participants
            SET
                appeared = COALESCE($3, appeared),
                qualified = COALESCE($4, qualified),
                score = COALESCE($5, score),
                feedback = COALESCE($6, feedback),
                updated_at = NOW()
            WHERE stage_id = $1 AND candidate_id = $2
            RETURNING {COLUMNS}
            "#
        ))
        .bind(stage_id)
        .bind(candidate_id)
        .bind(payload.appeared)
        .bind(payload.qualified)
        .bind(payload.score)
        .bind(&payload.feedback)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Stage participant not found".into()))?;

        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Scored,
            ActivityTarget::Stage(stage_id),
            Some(json!({
                "candidate_id": candidate_id,
                "qualified": participant.qualified,
                "score": participant.score,
            })),
        )
        .await?;
        tx.commit().await?;
        Ok(participant)
    }

    pub async fn withdraw(&self, actor: Option<Uuid>, stage_id: Uuid, candidate_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query("DELETE FROM stage_participants WHERE stage_id = $1 AND candidate_id = $2")
            .bind(stage_id)
            .bind(candidate_id)
            .execute(&mut *tx)
            .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound("Stage participant not found".into()));
        }
        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Unassigned,
            ActivityTarget::Stage(stage_id),
            Some(json!({ "candidate_id": candidate_id })),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn list_for_stage(&self, stage_id: Uuid) -> Result<Vec<StageParticipant>> {
        let rows = sqlx::query_as::<_, StageParticipant>(&format!(
            "SELECT {COLUMNS} FROM stage_participants WHERE stage_id = $1 ORDER BY created_at"
        ))
        .bind(stage_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
