use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::enums::{ContractType, JobStatus, WorkType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub department_id: Uuid,
    pub hiring_manager_id: Option<Uuid>,
    pub hiring_pipeline_id: Option<Uuid>,
    pub work_type: WorkType,
    pub contract: ContractType,
    pub head_count: i32,
    pub minimum_salary: Option<Decimal>,
    pub maximum_salary: Option<Decimal>,
    pub currency: Option<String>,
    pub status: JobStatus,
    pub created_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobSkill {
    pub id: Uuid,
    pub job_id: Uuid,
    pub skill_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
