use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::enums::{ApplicationSource, CandidateStatus};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCandidatePayload {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 5, max = 32))]
    pub phone: Option<String>,
    #[validate(range(min = 16, max = 100))]
    pub age: Option<i32>,
    #[validate(url)]
    pub resume_url: Option<String>,
    /// Redeems a referral; the token's job is applied to automatically.
    pub referral_token: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Applies to this job right away.
    pub job_id: Option<Uuid>,
    pub source: Option<ApplicationSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateCandidatePayload {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 5, max = 32))]
    pub phone: Option<String>,
    #[validate(range(min = 16, max = 100))]
    pub age: Option<i32>,
    #[validate(url)]
    pub resume_url: Option<String>,
    pub skills: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCandidateStatusPayload {
    pub status: CandidateStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CandidateListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<CandidateStatus>,
    pub job_id: Option<Uuid>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApplicationPayload {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub source: Option<ApplicationSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateNotePayload {
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAttachmentPayload {
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    #[validate(url)]
    pub file_url: String,
    #[validate(length(max = 100))]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateReferralPayload {
    #[validate(range(min = 1, max = 90))]
    pub ttl_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: CandidateStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateStats {
    pub total: i64,
    /// One entry per status, zero counts included.
    pub by_status: Vec<StatusCount>,
}

impl CandidateStats {
    pub fn from_counts(counts: &[(CandidateStatus, i64)]) -> Self {
        let by_status: Vec<StatusCount> = CandidateStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: *status,
                count: counts
                    .iter()
                    .filter(|(s, _)| s == status)
                    .map(|(_, c)| *c)
                    .sum(),
            })
            .collect();
        Self {
            total: by_status.iter().map(|s| s.count).sum(),
            by_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn email_and_age_are_checked() {
        let bad: CreateCandidatePayload = serde_json::from_value(json!({
            "name": "Ada",
            "email": "not-an-email",
            "age": 12,
        }))
        .unwrap();
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("age"));
    }

    #[test]
    fn minimal_candidate_is_valid() {
        let ok: CreateCandidatePayload = serde_json::from_value(json!({
            "name": "Ada",
            "email": "ada@example.com",
        }))
        .unwrap();
        assert!(ok.validate().is_ok());
        assert!(ok.skills.is_empty());
    }

    #[test]
    fn stats_fill_missing_statuses_with_zero() {
        let stats = CandidateStats::from_counts(&[
            (CandidateStatus::Applied, 4),
            (CandidateStatus::Rejected, 1),
        ]);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.by_status.len(), CandidateStatus::ALL.len());
        let offered = stats
            .by_status
            .iter()
            .find(|s| s.status == CandidateStatus::Offered)
            .unwrap();
        assert_eq!(offered.count, 0);
    }

    #[test]
    fn unknown_status_does_not_deserialize() {
        let parsed = serde_json::from_value::<UpdateCandidateStatusPayload>(json!({
            "status": "hired"
        }));
        assert!(parsed.is_err());
    }
}
