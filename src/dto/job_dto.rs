use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::models::enums::{ContractType, JobStatus, WorkType};

/// Job attributes shared by standalone job creation and jobs created
/// alongside their department.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_job_salary"))]
pub struct JobFields {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 10000))]
    pub description: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    pub hiring_manager_id: Uuid,
    pub hiring_pipeline_id: Option<Uuid>,
    pub work_type: WorkType,
    pub contract: ContractType,
    #[validate(range(min = 1, max = 10000))]
    pub head_count: i32,
    #[validate(custom(function = "non_negative"))]
    pub minimum_salary: Option<Decimal>,
    #[validate(custom(function = "non_negative"))]
    pub maximum_salary: Option<Decimal>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateJobPayload {
    pub department_id: Uuid,
    #[serde(flatten)]
    #[validate(nested)]
    pub job: JobFields,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_update_salary"))]
pub struct UpdateJobPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 10000))]
    pub description: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    pub department_id: Option<Uuid>,
    pub hiring_manager_id: Option<Uuid>,
    pub hiring_pipeline_id: Option<Uuid>,
    pub work_type: Option<WorkType>,
    pub contract: Option<ContractType>,
    #[validate(range(min = 1, max = 10000))]
    pub head_count: Option<i32>,
    #[validate(custom(function = "non_negative"))]
    pub minimum_salary: Option<Decimal>,
    #[validate(custom(function = "non_negative"))]
    pub maximum_salary: Option<Decimal>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub status: Option<JobStatus>,
    pub skills: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JobListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<JobStatus>,
    pub department_id: Option<Uuid>,
    pub search: Option<String>,
}

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("salary cannot be negative".into());
        return Err(err);
    }
    Ok(())
}

/// The salary band is closed: a minimum above the maximum is rejected.
pub fn check_salary_range(
    minimum: Option<Decimal>,
    maximum: Option<Decimal>,
) -> Result<(), ValidationError> {
    match (minimum, maximum) {
        (Some(min), Some(max)) if min > max => {
            let mut err = ValidationError::new("salary_range");
            err.message = Some("minimum_salary must not exceed maximum_salary".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

/// Wraps a salary-range failure the same way a derived rule would report it.
pub fn salary_range_errors(
    minimum: Option<Decimal>,
    maximum: Option<Decimal>,
) -> Result<(), ValidationErrors> {
    check_salary_range(minimum, maximum).map_err(|err| {
        let mut errors = ValidationErrors::new();
        errors.add("minimum_salary", err);
        errors
    })
}

fn validate_job_salary(job: &JobFields) -> Result<(), ValidationError> {
    check_salary_range(job.minimum_salary, job.maximum_salary)
}

fn validate_update_salary(job: &UpdateJobPayload) -> Result<(), ValidationError> {
    check_salary_range(job.minimum_salary, job.maximum_salary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(min: i64, max: i64) -> CreateJobPayload {
        serde_json::from_value(json!({
            "department_id": Uuid::new_v4(),
            "title": "Backend Engineer",
            "hiring_manager_id": Uuid::new_v4(),
            "work_type": "remote",
            "contract": "full_time",
            "head_count": 2,
            "minimum_salary": min,
            "maximum_salary": max,
        }))
        .unwrap()
    }

    #[test]
    fn inverted_salary_band_fails_validation() {
        assert!(payload(80, 60).validate().is_err());
    }

    #[test]
    fn ordered_salary_band_passes_validation() {
        assert!(payload(60, 80).validate().is_ok());
        assert!(payload(70, 70).validate().is_ok());
    }

    #[test]
    fn negative_salary_is_rejected() {
        let mut p = payload(0, 80);
        p.job.minimum_salary = Some(Decimal::from(-5));
        assert!(p.validate().is_err());
    }

    #[test]
    fn partial_update_checks_only_supplied_pair() {
        let update: UpdateJobPayload = serde_json::from_value(json!({
            "minimum_salary": 90,
        }))
        .unwrap();
        assert!(update.validate().is_ok());
        assert!(salary_range_errors(Some(Decimal::from(90)), Some(Decimal::from(60))).is_err());
    }

    #[test]
    fn head_count_must_be_positive() {
        let mut p = payload(1, 2);
        p.job.head_count = 0;
        assert!(p.validate().is_err());
    }
}
