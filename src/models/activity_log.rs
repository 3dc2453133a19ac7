use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

use super::enums::{ActivityAction, ActivityTargetKind};

/// What an activity entry is about. Each variant names its own table, so a
/// log entry can never point at an unknown kind of record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ActivityTarget {
    User(Uuid),
    Team(Uuid),
    Department(Uuid),
    Job(Uuid),
    Pipeline(Uuid),
    Stage(Uuid),
    Candidate(Uuid),
    Application(Uuid),
    Interview(Uuid),
    Referral(Uuid),
}

impl ActivityTarget {
    pub fn kind(&self) -> ActivityTargetKind {
        match self {
            ActivityTarget::User(_) => ActivityTargetKind::User,
            ActivityTarget::Team(_) => ActivityTargetKind::Team,
            ActivityTarget::Department(_) => ActivityTargetKind::Department,
            ActivityTarget::Job(_) => ActivityTargetKind::Job,
            ActivityTarget::Pipeline(_) => ActivityTargetKind::Pipeline,
            ActivityTarget::Stage(_) => ActivityTargetKind::Stage,
            ActivityTarget::Candidate(_) => ActivityTargetKind::Candidate,
            ActivityTarget::Application(_) => ActivityTargetKind::Application,
            ActivityTarget::Interview(_) => ActivityTargetKind::Interview,
            ActivityTarget::Referral(_) => ActivityTargetKind::Referral,
        }
    }

    pub fn id(&self) -> Uuid {
        match *self {
            ActivityTarget::User(id)
            | ActivityTarget::Team(id)
            | ActivityTarget::Department(id)
            | ActivityTarget::Job(id)
            | ActivityTarget::Pipeline(id)
            | ActivityTarget::Stage(id)
            | ActivityTarget::Candidate(id)
            | ActivityTarget::Application(id)
            | ActivityTarget::Interview(id)
            | ActivityTarget::Referral(id) => id,
        }
    }

    pub fn from_parts(kind: ActivityTargetKind, id: Uuid) -> Self {
        match kind {
            ActivityTargetKind::User => ActivityTarget::User(id),
            ActivityTargetKind::Team => ActivityTarget::Team(id),
            ActivityTargetKind::Department => ActivityTarget::Department(id),
            ActivityTargetKind::Job => ActivityTarget::Job(id),
            ActivityTargetKind::Pipeline => ActivityTarget::Pipeline(id),
            ActivityTargetKind::Stage => ActivityTarget::Stage(id),
            ActivityTargetKind::Candidate => ActivityTarget::Candidate(id),
            ActivityTargetKind::Application => ActivityTarget::Application(id),
            ActivityTargetKind::Interview => ActivityTarget::Interview(id),
            ActivityTargetKind::Referral => ActivityTarget::Referral(id),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ActivityLogRow {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: ActivityAction,
    pub target_type: ActivityTargetKind,
    pub target_id: Uuid,
    pub details: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: ActivityAction,
    pub target: ActivityTarget,
    pub details: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

impl From<ActivityLogRow> for ActivityLog {
    fn from(row: ActivityLogRow) -> Self {
        Self {
            id: row.id,
            actor_id: row.actor_id,
            action: row.action,
            target: ActivityTarget::from_parts(row.target_type, row.target_id),
            details: row.details,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_survives_the_column_split() {
        let id = Uuid::new_v4();
        for kind in ActivityTargetKind::ALL {
            let target = ActivityTarget::from_parts(*kind, id);
            assert_eq!(target.kind(), *kind);
            assert_eq!(target.id(), id);
        }
    }

    #[test]
    fn target_serializes_as_tagged_object() {
        let id = Uuid::nil();
        let json = serde_json::to_value(ActivityTarget::Candidate(id)).unwrap();
        assert_eq!(json["type"], "candidate");
        assert_eq!(json["id"], id.to_string());
    }
}
