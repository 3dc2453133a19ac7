//! Write-path invariants: reference checks, cascading deletes, the candidate
//! status graph and the mandatory-stage guard.
//!
//! Nothing in here runs implicitly. Services call these functions from their
//! create/update/delete paths, inside the transaction that performs the write.

pub mod cascade;
pub mod references;
pub mod stages;
pub mod transitions;

/// Tables that other rows point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Role,
    User,
    Team,
    TeamMember,
    Department,
    Pipeline,
    Stage,
    Skill,
    Job,
    ReferralToken,
    Candidate,
    Application,
    StageParticipant,
    Interview,
    Note,
    Attachment,
}

impl EntityKind {
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Role => "roles",
            EntityKind::User => "users",
            EntityKind::Team => "teams",
            EntityKind::TeamMember => "team_members",
            EntityKind::Department => "departments",
            EntityKind::Pipeline => "hiring_pipelines",
            EntityKind::Stage => "hiring_stages",
            EntityKind::Skill => "skills",
            EntityKind::Job => "jobs",
            EntityKind::ReferralToken => "referral_tokens",
            EntityKind::Candidate => "candidates",
            EntityKind::Application => "job_applications",
            EntityKind::StageParticipant => "stage_participants",
            EntityKind::Interview => "interviews",
            EntityKind::Note => "notes",
            EntityKind::Attachment => "attachments",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Role => "Role",
            EntityKind::User => "User",
            EntityKind::Team => "Team",
            EntityKind::TeamMember => "Team member",
            EntityKind::Department => "Department",
            EntityKind::Pipeline => "Hiring pipeline",
            EntityKind::Stage => "Hiring stage",
            EntityKind::Skill => "Skill",
            EntityKind::Job => "Job",
            EntityKind::ReferralToken => "Referral token",
            EntityKind::Candidate => "Candidate",
            EntityKind::Application => "Job application",
            EntityKind::StageParticipant => "Stage participant",
            EntityKind::Interview => "Interview",
            EntityKind::Note => "Note",
            EntityKind::Attachment => "Attachment",
        }
    }
}
