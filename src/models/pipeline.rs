use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::enums::{PipelineStatus, StageStatus};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HiringPipeline {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: PipelineStatus,
    pub created_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HiringStage {
    pub id: Uuid,
    pub pipeline_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub position: i32,
    pub mandatory: bool,
    pub schedule: Option<DateTime<Utc>>,
    pub status: StageStatus,
    pub max_candidates_allowed: Option<i32>,
    pub assigned_to_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
