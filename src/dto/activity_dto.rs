use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::ActivityTargetKind;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ActivityListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub target_type: Option<ActivityTargetKind>,
    pub target_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
}
