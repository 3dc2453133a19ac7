pub mod activity_dto;
pub mod auth_dto;
pub mod candidate_dto;
pub mod common;
pub mod department_dto;
pub mod detail_dto;
pub mod interview_dto;
pub mod job_dto;
pub mod matching_dto;
pub mod pipeline_dto;
pub mod team_dto;
