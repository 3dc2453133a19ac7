use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::enums::{PipelineStatus, StageStatus};
use crate::models::pipeline::{HiringPipeline, HiringStage};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StagePayload {
    /// Present when a pipeline update keeps an existing stage.
    pub id: Option<Uuid>,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default)]
    pub mandatory: bool,
    pub schedule: Option<DateTime<Utc>>,
    pub status: Option<StageStatus>,
    #[validate(range(min = 1))]
    pub max_candidates_allowed: Option<i32>,
    pub assigned_to_id: Option<Uuid>,
}

impl StagePayload {
    pub fn named(name: String, mandatory: bool) -> Self {
        Self {
            id: None,
            name,
            description: None,
            mandatory,
            schedule: None,
            status: None,
            max_candidates_allowed: None,
            assigned_to_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePipelinePayload {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub status: Option<PipelineStatus>,
    #[serde(default)]
    #[validate(nested)]
    pub stages: Vec<StagePayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdatePipelinePayload {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub status: Option<PipelineStatus>,
    /// Full desired stage list. Stages left out are deleted, new entries
    /// (without `id`) are created, order follows the list.
    #[validate(nested)]
    pub stages: Option<Vec<StagePayload>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateStagePayload {
    #[serde(flatten)]
    #[validate(nested)]
    pub stage: StagePayload,
    #[validate(range(min = 0))]
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateStagePayload {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub mandatory: Option<bool>,
    pub schedule: Option<DateTime<Utc>>,
    pub status: Option<StageStatus>,
    #[validate(range(min = 1))]
    pub max_candidates_allowed: Option<i32>,
    pub assigned_to_id: Option<Uuid>,
    #[validate(range(min = 0))]
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<PipelineStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollParticipantPayload {
    pub candidate_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordStageResultPayload {
    pub appeared: Option<bool>,
    pub qualified: Option<bool>,
    #[validate(range(min = 0, max = 100))]
    pub score: Option<i32>,
    #[validate(length(max = 5000))]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineWithStages {
    #[serde(flatten)]
    pub pipeline: HiringPipeline,
    pub stages: Vec<HiringStage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stage_list_is_validated_per_entry() {
        let payload: CreatePipelinePayload = serde_json::from_value(json!({
            "name": "Engineering",
            "stages": [{ "name": "" }],
        }))
        .unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn stage_score_is_bounded() {
        let payload = RecordStageResultPayload {
            appeared: Some(true),
            qualified: None,
            score: Some(101),
            feedback: None,
        };
        assert!(payload.validate().is_err());
    }
}
