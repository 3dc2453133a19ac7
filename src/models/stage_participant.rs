use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StageParticipant {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub stage_id: Uuid,
    pub appeared: bool,
    pub qualified: bool,
    pub score: Option<i32>,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
