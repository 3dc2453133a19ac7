use serde_json::json;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::dto::interview_dto::{
    CreateInterviewPayload, InterviewWithParticipants, UpdateInterviewPayload,
    UpsertChecklistPayload,
};
use crate::error::{Error, Result};
use crate::integrity::cascade::{self, CascadeReport};
use crate::integrity::references::{check_references, ensure_all_exist, ensure_exists, Reference};
use crate::integrity::EntityKind;
use crate::models::activity_log::ActivityTarget;
use crate::models::enums::{ActivityAction, InterviewStatus};
use crate::models::interview::{Checklist, Interview, InterviewParticipant};
use crate::services::activity_service::ActivityService;

pub(crate) const COLUMNS: &str =
    "id, candidate_id, stage_id, scheduled_at, duration_minutes, location, status, created_at, updated_at";
const PARTICIPANT_COLUMNS: &str = "id, interview_id, interviewer_id, created_at, updated_at";
const CHECKLIST_COLUMNS: &str = "id, interview_id, updated_by_id, items, created_at, updated_at";

const DEFAULT_DURATION_MINUTES: i32 = 60;

#[derive(Clone)]
pub struct InterviewService {
    pool: PgPool,
}

impl InterviewService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn schedule(
        &self,
        actor: Option<Uuid>,
        payload: CreateInterviewPayload,
    ) -> Result<InterviewWithParticipants> {
        let mut tx = self.pool.begin().await?;
        check_references(
            &mut tx,
            [
                Reference::new(EntityKind::Candidate, payload.candidate_id, "candidate_id"),
                Reference::new(EntityKind::Stage, payload.stage_id, "stage_id"),
            ],
        )
        .await?;
        ensure_all_exist(&mut tx, EntityKind::User, &payload.interviewer_ids, "interviewer_ids").await?;

        let interview: Interview = sqlx::query_as(&format!(
            r#"
            INSERT INTO interviews (id, candidate_id, stage_id, scheduled_at, duration_minutes, location, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(payload.candidate_id)
        .bind(payload.stage_id)
        .bind(payload.scheduled_at)
        .bind(payload.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES))
        .bind(&payload.location)
        .bind(InterviewStatus::Scheduled)
        .fetch_one(&mut *tx)
        .await?;

        let mut interviewers = payload.interviewer_ids.clone();
        interviewers.sort_unstable();
        interviewers.dedup();
        let mut participants = Vec::with_capacity(interviewers.len());
        for interviewer_id in interviewers {
            participants.push(insert_participant(&mut tx, interview.id, interviewer_id).await?);
        }

        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Created,
            ActivityTarget::Interview(interview.id),
            Some(json!({
                "candidate_id": interview.candidate_id,
                "stage_id": interview.stage_id,
                "scheduled_at": interview.scheduled_at,
            })),
        )
        .await?;
        tx.commit().await?;

        Ok(InterviewWithParticipants {
            interview,
            participants,
            checklist: None,
        })
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<InterviewWithParticipants> {
        let interview = sqlx::query_as::<_, Interview>(&format!(
            "SELECT {COLUMNS} FROM interviews WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Interview not found".into()))?;

        let participants = sqlx::query_as::<_, InterviewParticipant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM interview_participants WHERE interview_id = $1 ORDER BY created_at"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let checklist = sqlx::query_as::<_, Checklist>(&format!(
            "SELECT {CHECKLIST_COLUMNS} FROM checklists WHERE interview_id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(InterviewWithParticipants {
            interview,
            participants,
            checklist,
        })
    }

    pub async fn list_for_candidate(&self, candidate_id: Uuid) -> Result<Vec<Interview>> {
        let rows = sqlx::query_as::<_, Interview>(&format!(
            "SELECT {COLUMNS} FROM interviews WHERE candidate_id = $1 ORDER BY scheduled_at"
        ))
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn update(
        &self,
        actor: Option<Uuid>,
        id: Uuid,
        payload: UpdateInterviewPayload,
    ) -> Result<Interview> {
        let mut tx = self.pool.begin().await?;
        let previous: InterviewStatus =
            sqlx::query_scalar("SELECT status FROM interviews WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| Error::NotFound("Interview not found".into()))?;

        let interview: Interview = sqlx::query_as(&format!(
            r#"
            UPDATE interviews
            SET
                scheduled_at = COALESCE($2, scheduled_at),
                duration_minutes = COALESCE($3, duration_minutes),
                location = COALESCE($4, location),
                status = COALESCE($5, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(payload.scheduled_at)
        .bind(payload.duration_minutes)
        .bind(&payload.location)
        .bind(payload.status)
        .fetch_one(&mut *tx)
        .await?;

        let action = if interview.status != previous {
            ActivityAction::StatusChanged
        } else {
            ActivityAction::Updated
        };
        ActivityService::record_in(
            &mut tx,
            actor,
            action,
            ActivityTarget::Interview(id),
            Some(json!({ "from": previous, "to": interview.status })),
        )
        .await?;
        tx.commit().await?;
        Ok(interview)
    }

    pub async fn add_interviewer(
        &self,
        actor: Option<Uuid>,
        interview_id: Uuid,
        interviewer_id: Uuid,
    ) -> Result<InterviewParticipant> {
        let mut tx = self.pool.begin().await?;
        check_references(
            &mut tx,
            [
                Reference::new(EntityKind::Interview, interview_id, "interview_id"),
                Reference::new(EntityKind::User, interviewer_id, "interviewer_id"),
            ],
        )
        .await?;

        let existing: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM interview_participants WHERE interview_id = $1 AND interviewer_id = $2",
        )
        .bind(interview_id)
        .bind(interviewer_id)
        .fetch_optional(&mut *tx)
        .await?;
        if existing.is_some() {
            return Err(Error::Conflict("Interviewer is already on this interview".into()));
        }

        let participant = insert_participant(&mut tx, interview_id, interviewer_id).await?;
        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Assigned,
            ActivityTarget::Interview(interview_id),
            Some(json!({ "interviewer_id": interviewer_id })),
        )
        .await?;
        tx.commit().await?;
        Ok(participant)
    }

    pub async fn remove_interviewer(
        &self,
        actor: Option<Uuid>,
        interview_id: Uuid,
        interviewer_id: Uuid,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query(
            "DELETE FROM interview_participants WHERE interview_id = $1 AND interviewer_id = $2",
        )
        .bind(interview_id)
        .bind(interviewer_id)
        .execute(&mut *tx)
        .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound("Interviewer is not on this interview".into()));
        }
        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Unassigned,
            ActivityTarget::Interview(interview_id),
            Some(json!({ "interviewer_id": interviewer_id })),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Each interview carries at most one checklist; writing replaces it.
    pub async fn upsert_checklist(
        &self,
        actor: Option<Uuid>,
        interview_id: Uuid,
        payload: UpsertChecklistPayload,
    ) -> Result<Checklist> {
        let mut tx = self.pool.begin().await?;
        ensure_exists(&mut tx, EntityKind::Interview, interview_id, "interview_id").await?;

        let checklist: Checklist = sqlx::query_as(&format!(
            r#"
            INSERT INTO checklists (id, interview_id, updated_by_id, items)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (interview_id) DO UPDATE
            SET items = EXCLUDED.items, updated_by_id = EXCLUDED.updated_by_id, updated_at = NOW()
            RETURNING {CHECKLIST_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(interview_id)
        .bind(actor)
        .bind(Json(&payload.items))
        .fetch_one(&mut *tx)
        .await?;

        let done = checklist.items.0.iter().filter(|i| i.done).count();
        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Updated,
            ActivityTarget::Interview(interview_id),
            Some(json!({ "checklist_items": checklist.items.0.len(), "done": done })),
        )
        .await?;
        tx.commit().await?;
        Ok(checklist)
    }

    pub async fn delete(&self, actor: Option<Uuid>, id: Uuid) -> Result<CascadeReport> {
        let mut tx = self.pool.begin().await?;
        let report = cascade::cascade_delete_in(&mut tx, EntityKind::Interview, id).await?;
        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Deleted,
            ActivityTarget::Interview(id),
            Some(serde_json::to_value(&report)?),
        )
        .await?;
        tx.commit().await?;
        Ok(report)
    }
}

async fn insert_participant(
    conn: &mut PgConnection,
    interview_id: Uuid,
    interviewer_id: Uuid,
) -> Result<InterviewParticipant> {
    let participant = sqlx::query_as::<_, InterviewParticipant>(&format!(
        r#"
        INSERT INTO interview_participants (id, interview_id, interviewer_id)
        VALUES ($1, $2, $3)
        RETURNING {PARTICIPANT_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(interview_id)
    .bind(interviewer_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(participant)
}
