//! Read-side views that stitch an entity together with its related rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::candidate_dto::StatusCount;
use super::pipeline_dto::PipelineWithStages;
use crate::models::candidate::{Candidate, JobApplication};
use crate::models::department::Department;
use crate::models::interview::Interview;
use crate::models::job::Job;
use crate::models::note::{Attachment, Note};
use crate::models::pipeline::{HiringPipeline, HiringStage};
use crate::models::skill::Skill;
use crate::models::stage_participant::StageParticipant;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationWithJob {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub application: JobApplication,
    pub job_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StageParticipation {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub participant: StageParticipant,
    pub stage_name: String,
    pub pipeline_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDetail {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub skills: Vec<Skill>,
    pub applications: Vec<ApplicationWithJob>,
    pub stages: Vec<StageParticipation>,
    pub interviews: Vec<Interview>,
    pub notes: Vec<Note>,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: Job,
    pub department: Department,
    pub pipeline: Option<PipelineWithStages>,
    pub skills: Vec<Skill>,
    pub total_applications: i64,
    /// Applicants grouped by their current candidate status.
    pub applications_by_status: Vec<StatusCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StageSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub stage: HiringStage,
    pub participant_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDetail {
    #[serde(flatten)]
    pub pipeline: HiringPipeline,
    pub stages: Vec<StageSummary>,
    pub job_ids: Vec<Uuid>,
}
