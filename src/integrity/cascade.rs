//! Cascading deletes.
//!
//! Each deletable root kind owns a static tree of dependents. A plan is the
//! post-order walk of that tree: grandchildren go before children, children
//! before the root. Optional back-references that must survive the delete
//! (a candidate's referral token, a job's pipeline, authorship columns) are
//! set to NULL instead of removed.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::PgConnection;
use uuid::Uuid;

use super::EntityKind;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    Cascade,
    Nullify,
}

#[derive(Debug)]
pub struct Dependent {
    pub table: &'static str,
    pub column: &'static str,
    pub on_delete: OnDelete,
    pub children: &'static [Dependent],
}

const fn cascade(
    table: &'static str,
    column: &'static str,
    children: &'static [Dependent],
) -> Dependent {
    Dependent {
        table,
        column,
        on_delete: OnDelete::Cascade,
        children,
    }
}

const fn nullify(table: &'static str, column: &'static str) -> Dependent {
    Dependent {
        table,
        column,
        on_delete: OnDelete::Nullify,
        children: &[],
    }
}

const INTERVIEW: &[Dependent] = &[
    cascade("interview_participants", "interview_id", &[]),
    cascade("checklists", "interview_id", &[]),
];

const STAGE: &[Dependent] = &[
    cascade("stage_participants", "stage_id", &[]),
    cascade("interviews", "stage_id", INTERVIEW),
];

const PIPELINE: &[Dependent] = &[
    cascade("hiring_stages", "pipeline_id", STAGE),
    nullify("jobs", "hiring_pipeline_id"),
];

const REFERRAL_TOKEN: &[Dependent] = &[nullify("candidates", "referral_token_id")];

const JOB: &[Dependent] = &[
    cascade("job_skills", "job_id", &[]),
    cascade("job_applications", "job_id", &[]),
    cascade("referral_tokens", "job_id", REFERRAL_TOKEN),
];

const DEPARTMENT: &[Dependent] = &[cascade("jobs", "department_id", JOB)];

const TEAM: &[Dependent] = &[cascade("team_members", "team_id", &[])];

const CANDIDATE: &[Dependent] = &[
    cascade("job_applications", "candidate_id", &[]),
    cascade("candidate_skills", "candidate_id", &[]),
    cascade("stage_participants", "candidate_id", &[]),
    cascade("interviews", "candidate_id", INTERVIEW),
    cascade("notes", "candidate_id", &[]),
    cascade("attachments", "candidate_id", &[]),
];

const USER: &[Dependent] = &[
    cascade("credentials", "user_id", &[]),
    cascade("team_members", "user_id", &[]),
    cascade("interview_participants", "interviewer_id", &[]),
    nullify("teams", "lead_id"),
    nullify("departments", "hiring_manager_id"),
    nullify("jobs", "hiring_manager_id"),
    nullify("jobs", "created_by_id"),
    nullify("hiring_pipelines", "created_by_id"),
    nullify("hiring_stages", "assigned_to_id"),
    nullify("referral_tokens", "referred_by_id"),
    nullify("checklists", "updated_by_id"),
    nullify("notes", "author_id"),
    nullify("attachments", "uploaded_by_id"),
    nullify("activity_logs", "actor_id"),
];

/// Dependents removed or detached when a row of `kind` is deleted.
pub fn dependents(kind: EntityKind) -> &'static [Dependent] {
    match kind {
        EntityKind::User => USER,
        EntityKind::Team => TEAM,
        EntityKind::Department => DEPARTMENT,
        EntityKind::Pipeline => PIPELINE,
        EntityKind::Stage => STAGE,
        EntityKind::Job => JOB,
        EntityKind::ReferralToken => REFERRAL_TOKEN,
        EntityKind::Candidate => CANDIDATE,
        EntityKind::Interview => INTERVIEW,
        _ => &[],
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub table: &'static str,
    pub on_delete: OnDelete,
    pub sql: String,
}

/// Ordered statements that delete a `kind` row bound as `$1` together with
/// everything that depends on it.
pub fn cascade_plan(kind: EntityKind) -> Vec<Statement> {
    let mut plan = Vec::new();
    push_dependents(dependents(kind), "$1", &mut plan);
    plan.push(Statement {
        table: kind.table(),
        on_delete: OnDelete::Cascade,
        sql: format!("DELETE FROM {} WHERE id = $1", kind.table()),
    });
    plan
}

fn push_dependents(deps: &'static [Dependent], parent_ids: &str, plan: &mut Vec<Statement>) {
    for dep in deps {
        let filter = format!("{} IN ({})", dep.column, parent_ids);
        match dep.on_delete {
            OnDelete::Cascade => {
                let ids = format!("SELECT id FROM {} WHERE {}", dep.table, filter);
                push_dependents(dep.children, &ids, plan);
                plan.push(Statement {
                    table: dep.table,
                    on_delete: OnDelete::Cascade,
                    sql: format!("DELETE FROM {} WHERE {}", dep.table, filter),
                });
            }
            OnDelete::Nullify => plan.push(Statement {
                table: dep.table,
                on_delete: OnDelete::Nullify,
                sql: format!(
                    "UPDATE {} SET {} = NULL, updated_at = NOW() WHERE {}",
                    dep.table, dep.column, filter
                ),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CascadeReport {
    pub deleted: BTreeMap<&'static str, u64>,
    pub detached: BTreeMap<&'static str, u64>,
}

impl CascadeReport {
    fn record(&mut self, stmt: &Statement, rows: u64) {
        let bucket = match stmt.on_delete {
            OnDelete::Cascade => &mut self.deleted,
            OnDelete::Nullify => &mut self.detached,
        };
        *bucket.entry(stmt.table).or_insert(0) += rows;
    }

    pub fn deleted_from(&self, table: &str) -> u64 {
        self.deleted.get(table).copied().unwrap_or(0)
    }
}

/// Deletes the row and its dependents inside the caller's transaction. Any
/// error leaves the transaction for the caller to roll back.
pub async fn cascade_delete_in(
    conn: &mut PgConnection,
    kind: EntityKind,
    id: Uuid,
) -> Result<CascadeReport> {
    let lock = format!("SELECT id FROM {} WHERE id = $1 FOR UPDATE", kind.table());
    let found: Option<Uuid> = sqlx::query_scalar(&lock)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    if found.is_none() {
        return Err(Error::NotFound(format!("{} not found", kind.label())));
    }

    let mut report = CascadeReport::default();
    for stmt in cascade_plan(kind) {
        let res = sqlx::query(&stmt.sql).bind(id).execute(&mut *conn).await?;
        report.record(&stmt, res.rows_affected());
    }

    tracing::info!(
        table = kind.table(),
        %id,
        deleted = ?report.deleted,
        detached = ?report.detached,
        "cascade delete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(plan: &[Statement], table: &str, on_delete: OnDelete) -> usize {
        plan.iter()
            .position(|s| s.table == table && s.on_delete == on_delete)
            .unwrap_or_else(|| panic!("{} missing from plan", table))
    }

    fn tables(plan: &[Statement]) -> Vec<&'static str> {
        plan.iter().map(|s| s.table).collect()
    }

    #[test]
    fn department_plan_clears_jobs_and_their_dependents_first() {
        let plan = cascade_plan(EntityKind::Department);
        assert_eq!(
            tables(&plan),
            vec![
                "job_skills",
                "job_applications",
                "candidates",
                "referral_tokens",
                "jobs",
                "departments"
            ]
        );
        let jobs = position(&plan, "jobs", OnDelete::Cascade);
        for child in ["job_skills", "job_applications", "referral_tokens"] {
            assert!(position(&plan, child, OnDelete::Cascade) < jobs);
        }
        assert_eq!(
            plan[position(&plan, "candidates", OnDelete::Nullify)].sql,
            "UPDATE candidates SET referral_token_id = NULL, updated_at = NOW() WHERE referral_token_id IN \
             (SELECT id FROM referral_tokens WHERE job_id IN \
             (SELECT id FROM jobs WHERE department_id IN ($1)))"
        );
    }

    #[test]
    fn root_row_is_always_deleted_last() {
        for kind in [
            EntityKind::User,
            EntityKind::Team,
            EntityKind::Department,
            EntityKind::Pipeline,
            EntityKind::Stage,
            EntityKind::Job,
            EntityKind::Candidate,
            EntityKind::Interview,
        ] {
            let plan = cascade_plan(kind);
            let last = plan.last().unwrap();
            assert_eq!(last.table, kind.table());
            assert_eq!(last.sql, format!("DELETE FROM {} WHERE id = $1", kind.table()));
        }
    }

    #[test]
    fn pipeline_plan_reaches_interview_children_through_stages() {
        let plan = cascade_plan(EntityKind::Pipeline);
        let participants = position(&plan, "interview_participants", OnDelete::Cascade);
        let checklists = position(&plan, "checklists", OnDelete::Cascade);
        let interviews = position(&plan, "interviews", OnDelete::Cascade);
        let stage_participants = position(&plan, "stage_participants", OnDelete::Cascade);
        let stages = position(&plan, "hiring_stages", OnDelete::Cascade);
        assert!(participants < interviews && checklists < interviews);
        assert!(interviews < stages && stage_participants < stages);
        assert!(plan[position(&plan, "jobs", OnDelete::Nullify)]
            .sql
            .starts_with("UPDATE jobs SET hiring_pipeline_id = NULL"));
    }

    #[test]
    fn candidate_plan_covers_every_owned_collection() {
        let plan = cascade_plan(EntityKind::Candidate);
        for table in [
            "job_applications",
            "candidate_skills",
            "stage_participants",
            "interviews",
            "interview_participants",
            "checklists",
            "notes",
            "attachments",
        ] {
            position(&plan, table, OnDelete::Cascade);
        }
        assert!(
            position(&plan, "interview_participants", OnDelete::Cascade)
                < position(&plan, "interviews", OnDelete::Cascade)
        );
    }

    #[test]
    fn user_plan_only_deletes_owned_rows() {
        let plan = cascade_plan(EntityKind::User);
        let deleted: Vec<_> = plan
            .iter()
            .filter(|s| s.on_delete == OnDelete::Cascade)
            .map(|s| s.table)
            .collect();
        assert_eq!(
            deleted,
            vec!["credentials", "team_members", "interview_participants", "users"]
        );
    }

    #[test]
    fn leaf_kinds_delete_only_themselves() {
        let plan = cascade_plan(EntityKind::Note);
        assert_eq!(tables(&plan), vec!["notes"]);
    }

    #[test]
    fn report_buckets_by_action() {
        let mut report = CascadeReport::default();
        let plan = cascade_plan(EntityKind::Job);
        for stmt in &plan {
            report.record(stmt, 2);
        }
        assert_eq!(report.deleted_from("job_skills"), 2);
        assert_eq!(report.detached.get("candidates"), Some(&2));
        assert_eq!(report.deleted_from("candidates"), 0);
    }
}
