//! Closed tag sets shared by the entity rows and payloads.
//!
//! Every enum is mirrored by a Postgres enum type of the same name (see the
//! init migration) and travels as snake_case text on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! tag_enum {
    (
        $(#[$meta:meta])*
        $name:ident : $pg:literal { $($variant:ident => $tag:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
        #[sqlx(type_name = $pg, rename_all = "snake_case")]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $tag),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($tag => Ok($name::$variant),)+
                    other => Err(format!("unknown {} '{}'", $pg, other)),
                }
            }
        }
    };
}

tag_enum! {
    RoleName: "role_name" {
        Admin => "admin",
        HrManager => "hr_manager",
        Recruiter => "recruiter",
        Interviewer => "interviewer",
    }
}

tag_enum! {
    Permission: "permission" {
        ManageUsers => "manage_users",
        ManageRoles => "manage_roles",
        ManageTeams => "manage_teams",
        ManageDepartments => "manage_departments",
        ManageJobs => "manage_jobs",
        ManagePipelines => "manage_pipelines",
        ManageCandidates => "manage_candidates",
        ManageInterviews => "manage_interviews",
        ViewReports => "view_reports",
    }
}

tag_enum! {
    UserStatus: "user_status" {
        Unverified => "unverified",
        Verified => "verified",
        Suspended => "suspended",
    }
}

tag_enum! {
    PipelineStatus: "pipeline_status" {
        Upcoming => "upcoming",
        Ongoing => "ongoing",
        Completed => "completed",
    }
}

tag_enum! {
    StageStatus: "stage_status" {
        Upcoming => "upcoming",
        Ongoing => "ongoing",
        Completed => "completed",
        Skipped => "skipped",
        Terminated => "terminated",
    }
}

tag_enum! {
    JobStatus: "job_status" {
        Draft => "draft",
        Open => "open",
        Closed => "closed",
        Cancelled => "cancelled",
    }
}

tag_enum! {
    WorkType: "work_type" {
        Onsite => "onsite",
        Remote => "remote",
        Hybrid => "hybrid",
    }
}

tag_enum! {
    ContractType: "contract_type" {
        FullTime => "full_time",
        PartTime => "part_time",
        Contract => "contract",
        Internship => "internship",
        Temporary => "temporary",
    }
}

tag_enum! {
    /// Candidate progress through hiring. Moves are restricted, see
    /// [`crate::integrity::transitions`].
    CandidateStatus: "candidate_status" {
        Applied => "applied",
        Shortlisted => "shortlisted",
        Interviewed => "interviewed",
        Offered => "offered",
        Rejected => "rejected",
    }
}

tag_enum! {
    InterviewStatus: "interview_status" {
        Scheduled => "scheduled",
        Completed => "completed",
        Cancelled => "cancelled",
        NoShow => "no_show",
    }
}

tag_enum! {
    ApplicationSource: "application_source" {
        Direct => "direct",
        Referral => "referral",
        JobBoard => "job_board",
        Agency => "agency",
        Other => "other",
    }
}

tag_enum! {
    ActivityAction: "activity_action" {
        Created => "created",
        Updated => "updated",
        Deleted => "deleted",
        StatusChanged => "status_changed",
        Assigned => "assigned",
        Unassigned => "unassigned",
        Scored => "scored",
    }
}

tag_enum! {
    ActivityTargetKind: "activity_target" {
        User => "user",
        Team => "team",
        Department => "department",
        Job => "job",
        Pipeline => "pipeline",
        Stage => "stage",
        Candidate => "candidate",
        Application => "application",
        Interview => "interview",
        Referral => "referral",
    }
}

impl Default for CandidateStatus {
    fn default() -> Self {
        CandidateStatus::Applied
    }
}

impl RoleName {
    /// Permissions granted to a freshly seeded role.
    pub fn default_permissions(&self) -> Vec<Permission> {
        use Permission::*;
        match self {
            RoleName::Admin => Permission::ALL.to_vec(),
            RoleName::HrManager => vec![
                ManageTeams,
                ManageDepartments,
                ManageJobs,
                ManagePipelines,
                ManageCandidates,
                ManageInterviews,
                ViewReports,
            ],
            RoleName::Recruiter => vec![ManageCandidates, ManageInterviews, ViewReports],
            RoleName::Interviewer => vec![ManageInterviews],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_parse_back_to_variants() {
        for status in CandidateStatus::ALL {
            assert_eq!(status.as_str().parse::<CandidateStatus>().ok(), Some(*status));
        }
        assert!("hired".parse::<CandidateStatus>().is_err());
    }

    #[test]
    fn wire_format_is_snake_case() {
        let json = serde_json::to_string(&ContractType::FullTime).unwrap();
        assert_eq!(json, "\"full_time\"");
        let parsed: InterviewStatus = serde_json::from_str("\"no_show\"").unwrap();
        assert_eq!(parsed, InterviewStatus::NoShow);
    }

    #[test]
    fn only_admin_manages_users_and_roles() {
        for role in RoleName::ALL {
            let perms = role.default_permissions();
            let manages_users = perms.contains(&Permission::ManageUsers);
            assert_eq!(manages_users, *role == RoleName::Admin, "{}", role);
            assert_eq!(perms.contains(&Permission::ManageRoles), *role == RoleName::Admin);
        }
    }
}
