use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::job_dto::JobFields;
use crate::models::department::Department;
use crate::models::job::Job;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateDepartmentPayload {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub hiring_manager_id: Uuid,
    /// Jobs opened together with the department, in the same transaction.
    #[serde(default)]
    #[validate(nested)]
    pub jobs: Vec<JobFields>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateDepartmentPayload {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub hiring_manager_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentWithJobs {
    #[serde(flatten)]
    pub department: Department,
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DepartmentListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
}
