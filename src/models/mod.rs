pub mod activity_log;
pub mod candidate;
pub mod department;
pub mod enums;
pub mod interview;
pub mod job;
pub mod note;
pub mod pipeline;
pub mod referral;
pub mod role;
pub mod skill;
pub mod stage_participant;
pub mod team;
pub mod user;
