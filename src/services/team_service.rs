use serde_json::json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::dto::team_dto::{CreateTeamPayload, TeamWithMembers, UpdateTeamPayload};
use crate::error::{Error, Result};
use crate::integrity::cascade::{self, CascadeReport};
use crate::integrity::references::{check_references, ensure_all_exist, ensure_optional, Reference};
use crate::integrity::EntityKind;
use crate::models::activity_log::ActivityTarget;
use crate::models::enums::ActivityAction;
use crate::models::team::{Team, TeamMember};
use crate::services::activity_service::ActivityService;

const COLUMNS: &str = "id, name, description, lead_id, created_at, updated_at";
const MEMBER_COLUMNS: &str = "id, team_id, user_id, created_at, updated_at";

#[derive(Clone)]
pub struct TeamService {
    pool: PgPool,
}

impl TeamService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, actor: Option<Uuid>, payload: CreateTeamPayload) -> Result<TeamWithMembers> {
        let mut tx = self.pool.begin().await?;
        ensure_optional(&mut tx, EntityKind::User, payload.lead_id, "lead_id").await?;
        ensure_all_exist(&mut tx, EntityKind::User, &payload.member_ids, "member_ids").await?;

        let team: Team = sqlx::query_as(&format!(
            "INSERT INTO teams (id, name, description, lead_id) VALUES ($1, $2, $3, $4) RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(payload.name.trim())
        .bind(&payload.description)
        .bind(payload.lead_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut member_ids = payload.member_ids.clone();
        member_ids.extend(payload.lead_id);
        member_ids.sort_unstable();
        member_ids.dedup();
        let mut members = Vec::with_capacity(member_ids.len());
        for user_id in member_ids {
            members.push(insert_member(&mut tx, team.id, user_id).await?);
        }

        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Created,
            ActivityTarget::Team(team.id),
            Some(json!({ "name": team.name, "members": members.len() })),
        )
        .await?;
        tx.commit().await?;
        Ok(TeamWithMembers { team, members })
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<TeamWithMembers> {
        let team = sqlx::query_as::<_, Team>(&format!("SELECT {COLUMNS} FROM teams WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Team not found".into()))?;
        let members = sqlx::query_as::<_, TeamMember>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM team_members WHERE team_id = $1 ORDER BY created_at"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(TeamWithMembers { team, members })
    }

    pub async fn list(&self) -> Result<Vec<Team>> {
        let teams = sqlx::query_as::<_, Team>(&format!("SELECT {COLUMNS} FROM teams ORDER BY name"))
            .fetch_all(&self.pool)
            .await?;
        Ok(teams)
    }

    pub async fn update(&self, actor: Option<Uuid>, id: Uuid, payload: UpdateTeamPayload) -> Result<Team> {
        let mut tx = self.pool.begin().await?;
        ensure_optional(&mut tx, EntityKind::User, payload.lead_id, "lead_id").await?;

        let team: Team = sqlx::query_as(&format!(
            r#"
            UPDATE teams
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                lead_id = COALESCE($4, lead_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(payload.name.as_deref().map(str::trim))
        .bind(&payload.description)
        .bind(payload.lead_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Team not found".into()))?;

        ActivityService::record_in(&mut tx, actor, ActivityAction::Updated, ActivityTarget::Team(id), None)
            .await?;
        tx.commit().await?;
        Ok(team)
    }

    pub async fn add_member(&self, actor: Option<Uuid>, team_id: Uuid, user_id: Uuid) -> Result<TeamMember> {
        let mut tx = self.pool.begin().await?;
        check_references(
            &mut tx,
            [
                Reference::new(EntityKind::Team, team_id, "team_id"),
                Reference::new(EntityKind::User, user_id, "user_id"),
            ],
        )
        .await?;

        let existing: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM team_members WHERE team_id = $1 AND user_id = $2")
                .bind(team_id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_some() {
            return Err(Error::Conflict("User is already a member of this team".into()));
        }

        let member = insert_member(&mut tx, team_id, user_id).await?;
        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Assigned,
            ActivityTarget::Team(team_id),
            Some(json!({ "user_id": user_id })),
        )
        .await?;
        tx.commit().await?;
        Ok(member)
    }

    pub async fn remove_member(&self, actor: Option<Uuid>, team_id: Uuid, user_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query("DELETE FROM team_members WHERE team_id = $1 AND user_id = $2")
            .bind(team_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound("Team member not found".into()));
        }
        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Unassigned,
            ActivityTarget::Team(team_id),
            Some(json!({ "user_id": user_id })),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn delete(&self, actor: Option<Uuid>, id: Uuid) -> Result<CascadeReport> {
        let mut tx = self.pool.begin().await?;
        let report = cascade::cascade_delete_in(&mut tx, EntityKind::Team, id).await?;
        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Deleted,
            ActivityTarget::Team(id),
            Some(serde_json::to_value(&report)?),
        )
        .await?;
        tx.commit().await?;
        Ok(report)
    }
}

async fn insert_member(conn: &mut PgConnection, team_id: Uuid, user_id: Uuid) -> Result<TeamMember> {
    let member = sqlx::query_as::<_, TeamMember>(&format!(
        "INSERT INTO team_members (id, team_id, user_id) VALUES ($1, $2, $3) RETURNING {MEMBER_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(team_id)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(member)
}
