pub mod activity_service;
pub mod aggregation_service;
pub mod application_service;
pub mod candidate_service;
pub mod department_service;
pub mod expiry_service;
pub mod interview_service;
pub mod job_service;
pub mod matching_service;
pub mod note_service;
pub mod notification_service;
pub mod pipeline_service;
pub mod referral_service;
pub mod role_service;
pub mod skill_service;
pub mod stage_participant_service;
pub mod team_service;
pub mod user_service;
