use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::enums::InterviewStatus;
use crate::models::interview::{Checklist, ChecklistItem, Interview, InterviewParticipant};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateInterviewPayload {
    pub candidate_id: Uuid,
    pub stage_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    #[validate(range(min = 15, max = 480))]
    pub duration_minutes: Option<i32>,
    #[validate(length(max = 500))]
    pub location: Option<String>,
    #[serde(default)]
    pub interviewer_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateInterviewPayload {
    pub scheduled_at: Option<DateTime<Utc>>,
    #[validate(range(min = 15, max = 480))]
    pub duration_minutes: Option<i32>,
    #[validate(length(max = 500))]
    pub location: Option<String>,
    pub status: Option<InterviewStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddInterviewerPayload {
    pub interviewer_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpsertChecklistPayload {
    #[validate(length(min = 1, max = 100), custom(function = "labelled_items"))]
    pub items: Vec<ChecklistItem>,
}

#[allow(clippy::ptr_arg)]
fn labelled_items(items: &Vec<ChecklistItem>) -> Result<(), ValidationError> {
    if items.iter().any(|i| i.label.trim().is_empty()) {
        let mut err = ValidationError::new("label");
        err.message = Some("every checklist item needs a label".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewWithParticipants {
    #[serde(flatten)]
    pub interview: Interview,
    pub participants: Vec<InterviewParticipant>,
    pub checklist: Option<Checklist>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_checklist_labels_are_rejected() {
        let payload = UpsertChecklistPayload {
            items: vec![ChecklistItem {
                label: "  ".into(),
                done: false,
                comment: None,
            }],
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn empty_checklist_is_rejected() {
        assert!(UpsertChecklistPayload { items: vec![] }.validate().is_err());
    }
}
