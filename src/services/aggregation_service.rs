//! Read-only views across several tables. A missing root yields `None`;
//! callers decide whether that is a 404.

use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::candidate_dto::CandidateStats;
use crate::dto::detail_dto::{
    ApplicationWithJob, CandidateDetail, JobDetail, PipelineDetail, StageParticipation,
    StageSummary,
};
use crate::dto::pipeline_dto::PipelineWithStages;
use crate::error::{Error, Result};
use crate::models::candidate::Candidate;
use crate::models::department::Department;
use crate::models::enums::CandidateStatus;
use crate::models::interview::Interview;
use crate::models::job::Job;
use crate::models::note::{Attachment, Note};
use crate::models::pipeline::{HiringPipeline, HiringStage};
use crate::services::skill_service::{skills_of, SkillOwner};
use crate::services::{
    application_service, candidate_service, department_service, interview_service, job_service,
    note_service, pipeline_service, stage_participant_service,
};

/// Prefixes each column of a `COLUMNS` list with a table alias.
fn qualified(columns: &str, alias: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{}.{}", alias, c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Clone)]
pub struct AggregationService {
    pool: PgPool,
}

impl AggregationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn candidate_detail(&self, id: Uuid) -> Result<Option<CandidateDetail>> {
        let Some(candidate) = sqlx::query_as::<_, Candidate>(&format!(
            "SELECT {} FROM candidates WHERE id = $1",
            candidate_service::COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let applications_sql = format!(
            "SELECT {}, j.title AS job_title FROM job_applications a JOIN jobs j ON j.id = a.job_id \
             WHERE a.candidate_id = $1 ORDER BY a.applied_at DESC",
            qualified(application_service::COLUMNS, "a")
        );
        let stages_sql = format!(
            "SELECT {}, s.name AS stage_name, s.pipeline_id FROM stage_participants p \
             JOIN hiring_stages s ON s.id = p.stage_id \
             WHERE p.candidate_id = $1 ORDER BY s.pipeline_id, s.position",
            qualified(stage_participant_service::COLUMNS, "p")
        );
        let interviews_sql = format!(
            "SELECT {} FROM interviews WHERE candidate_id = $1 ORDER BY scheduled_at",
            interview_service::COLUMNS
        );
        let notes_sql = format!(
            "SELECT {} FROM notes WHERE candidate_id = $1 ORDER BY created_at DESC",
            note_service::NOTE_COLUMNS
        );
        let attachments_sql = format!(
            "SELECT {} FROM attachments WHERE candidate_id = $1 ORDER BY created_at DESC",
            note_service::ATTACHMENT_COLUMNS
        );

        let (skills, applications, stages, interviews, notes, attachments) = tokio::try_join!(
            skills_of(&self.pool, SkillOwner::Candidate(id)),
            async {
                sqlx::query_as::<_, ApplicationWithJob>(&applications_sql)
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(Error::from)
            },
            async {
                sqlx::query_as::<_, StageParticipation>(&stages_sql)
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(Error::from)
            },
            async {
                sqlx::query_as::<_, Interview>(&interviews_sql)
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(Error::from)
            },
            async {
                sqlx::query_as::<_, Note>(&notes_sql)
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(Error::from)
            },
            async {
                sqlx::query_as::<_, Attachment>(&attachments_sql)
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(Error::from)
            },
        )?;

        Ok(Some(CandidateDetail {
            candidate,
            skills,
            applications,
            stages,
            interviews,
            notes,
            attachments,
        }))
    }

    pub async fn job_detail(&self, id: Uuid) -> Result<Option<JobDetail>> {
        let Some(job) = sqlx::query_as::<_, Job>(&format!(
            "SELECT {} FROM jobs WHERE id = $1",
            job_service::COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let department = sqlx::query_as::<_, Department>(&format!(
            "SELECT {} FROM departments WHERE id = $1",
            department_service::COLUMNS
        ))
        .bind(job.department_id)
        .fetch_one(&self.pool)
        .await?;

        let pipeline = match job.hiring_pipeline_id {
            Some(pipeline_id) => self.pipeline_with_stages(pipeline_id).await?,
            None => None,
        };

        let skills = skills_of(&self.pool, SkillOwner::Job(id)).await?;
        let counts: Vec<(CandidateStatus, i64)> = sqlx::query_as(
            r#"
            SELECT c.status, COUNT(*)
            FROM job_applications a
            JOIN candidates c ON c.id = a.candidate_id
            WHERE a.job_id = $1
            GROUP BY c.status
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        let stats = CandidateStats::from_counts(&counts);

        Ok(Some(JobDetail {
            job,
            department,
            pipeline,
            skills,
            total_applications: stats.total,
            applications_by_status: stats.by_status,
        }))
    }

    pub async fn pipeline_detail(&self, id: Uuid) -> Result<Option<PipelineDetail>> {
        let Some(pipeline) = sqlx::query_as::<_, HiringPipeline>(&format!(
            "SELECT {} FROM hiring_pipelines WHERE id = $1",
            pipeline_service::COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let stages = sqlx::query_as::<_, StageSummary>(&format!(
            r#"
            SELECT {},
                (SELECT COUNT(*) FROM stage_participants p WHERE p.stage_id = s.id) AS participant_count
            FROM hiring_stages s
            WHERE s.pipeline_id = $1
            ORDER BY s.position, s.created_at
            "#,
            qualified(pipeline_service::STAGE_COLUMNS, "s")
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let job_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM jobs WHERE hiring_pipeline_id = $1 ORDER BY created_at")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;

        Ok(Some(PipelineDetail {
            pipeline,
            stages,
            job_ids,
        }))
    }

    async fn pipeline_with_stages(&self, id: Uuid) -> Result<Option<PipelineWithStages>> {
        let Some(pipeline) = sqlx::query_as::<_, HiringPipeline>(&format!(
            "SELECT {} FROM hiring_pipelines WHERE id = $1",
            pipeline_service::COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };
        let stages = sqlx::query_as::<_, HiringStage>(&format!(
            "SELECT {} FROM hiring_stages WHERE pipeline_id = $1 ORDER BY position, created_at",
            pipeline_service::STAGE_COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(Some(PipelineWithStages { pipeline, stages }))
    }
}

#[cfg(test)]
mod tests {
    use super::qualified;

    #[test]
    fn column_lists_are_prefixed() {
        assert_eq!(qualified("id, name,\n    status", "s"), "s.id, s.name, s.status");
    }
}
