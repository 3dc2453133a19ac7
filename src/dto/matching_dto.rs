use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MatchJobPayload {
    /// Candidates to score. Empty means every applicant of the job.
    #[serde(default)]
    pub candidate_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchScore {
    pub score: i32,
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub gaps: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchOutcome {
    Scored {
        #[serde(flatten)]
        score: MatchScore,
        attempts: u8,
    },
    Failed {
        error: String,
        attempts: u8,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub candidate_id: Uuid,
    pub candidate_name: String,
    #[serde(flatten)]
    pub outcome: MatchOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    pub job_id: Uuid,
    pub scored: usize,
    pub failed: usize,
    pub results: Vec<MatchResult>,
}

impl MatchReport {
    pub fn new(job_id: Uuid, results: Vec<MatchResult>) -> Self {
        let scored = results
            .iter()
            .filter(|r| matches!(r.outcome, MatchOutcome::Scored { .. }))
            .count();
        Self {
            job_id,
            scored,
            failed: results.len() - scored,
            results,
        }
    }
}
