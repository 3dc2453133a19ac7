pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod integrity;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use sqlx::PgPool;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::integrity::stages::MandatoryStages;
use crate::services::{
    activity_service::ActivityService,
    aggregation_service::AggregationService,
    application_service::ApplicationService,
    candidate_service::CandidateService,
    department_service::DepartmentService,
    interview_service::InterviewService,
    job_service::JobService,
    matching_service::{MatchingService, OpenAiAnalyzer, ResumeAnalyzer},
    note_service::NoteService,
    notification_service::{LogNotifier, Notifier},
    pipeline_service::PipelineService,
    referral_service::ReferralService,
    role_service::RoleService,
    stage_participant_service::StageParticipantService,
    team_service::TeamService,
    user_service::UserService,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub user_service: UserService,
    pub role_service: RoleService,
    pub team_service: TeamService,
    pub department_service: DepartmentService,
    pub pipeline_service: PipelineService,
    pub stage_participant_service: StageParticipantService,
    pub job_service: JobService,
    pub referral_service: ReferralService,
    pub candidate_service: CandidateService,
    pub application_service: ApplicationService,
    pub note_service: NoteService,
    pub interview_service: InterviewService,
    pub activity_service: ActivityService,
    pub aggregation_service: AggregationService,
    pub matching_service: MatchingService,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Internal(format!("http client: {}", e)))?;
        let analyzer: Arc<dyn ResumeAnalyzer> = Arc::new(OpenAiAnalyzer::new(
            config.openai_api_key.clone(),
            config.openai_model.clone(),
            http_client,
        ));
        Ok(Self::with_collaborators(pool, config, Arc::new(LogNotifier), analyzer))
    }

    /// Same as [`AppState::new`] with the outbound collaborators supplied by
    /// the caller.
    pub fn with_collaborators(
        pool: PgPool,
        config: Config,
        notifier: Arc<dyn Notifier>,
        analyzer: Arc<dyn ResumeAnalyzer>,
    ) -> Self {
        let mandatory = MandatoryStages::new(config.mandatory_stages.iter().cloned());

        Self {
            user_service: UserService::new(
                pool.clone(),
                notifier,
                config.jwt_secret.clone(),
                config.jwt_ttl_hours,
            ),
            role_service: RoleService::new(pool.clone()),
            team_service: TeamService::new(pool.clone()),
            department_service: DepartmentService::new(pool.clone()),
            pipeline_service: PipelineService::new(pool.clone(), mandatory),
            stage_participant_service: StageParticipantService::new(pool.clone()),
            job_service: JobService::new(pool.clone()),
            referral_service: ReferralService::new(pool.clone(), config.referral_ttl_days),
            candidate_service: CandidateService::new(pool.clone()),
            application_service: ApplicationService::new(pool.clone()),
            note_service: NoteService::new(pool.clone()),
            interview_service: InterviewService::new(pool.clone()),
            activity_service: ActivityService::new(pool.clone()),
            aggregation_service: AggregationService::new(pool.clone()),
            matching_service: MatchingService::new(pool.clone(), analyzer),
            config: Arc::new(config),
            pool,
        }
    }
}
