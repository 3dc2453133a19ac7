//! Resume matching: fetch each applicant's resume, have the LLM score it
//! against the job, store the score on the application.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value as JsonValue};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::dto::matching_dto::{MatchJobPayload, MatchOutcome, MatchReport, MatchResult, MatchScore};
use crate::error::{Error, Result};
use crate::models::job::Job;
use crate::services::application_service::ApplicationService;
use crate::services::job_service;

/// Resume text beyond this many characters is cut before scoring.
const MAX_RESUME_CHARS: usize = 24_000;
/// Larger downloads are refused; the body is never buffered past this.
const MAX_RESUME_BYTES: usize = 10 * 1024 * 1024;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResumeAnalyzer: Send + Sync {
    async fn extract_text(&self, resume_url: &str) -> Result<String>;

    async fn score(&self, resume_text: &str, job_title: &str, job_description: &str) -> Result<MatchScore>;
}

#[derive(Clone)]
pub struct OpenAiAnalyzer {
    client: Client,
    api_key: Option<String>,
    model: String,
}

impl OpenAiAnalyzer {
    pub fn new(api_key: Option<String>, model: String, client: Client) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }

    async fn chat_openai(&self, payload: JsonValue) -> Result<JsonValue> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Upstream("OPENAI_API_KEY is not configured".into()))?;

        let res = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(api_key)
            .json(&payload)
            .timeout(Duration::from_secs(120))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!("OpenAI API error {}: {}", status, text)));
        }

        let body: JsonValue = res.json().await?;
        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .and_then(|s| serde_json::from_str(s).ok())
            .ok_or_else(|| Error::Upstream("Invalid OpenAI response format".into()))
    }
}

#[async_trait]
impl ResumeAnalyzer for OpenAiAnalyzer {
    async fn extract_text(&self, resume_url: &str) -> Result<String> {
        let mut res = self
            .client
            .get(resume_url)
            .timeout(Duration::from_secs(30))
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(Error::Upstream(format!(
                "resume download failed with {}",
                res.status()
            )));
        }
        let is_pdf_type = res
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("pdf"));
        if let Some(len) = res.content_length() {
            check_resume_size(usize::try_from(len).unwrap_or(usize::MAX))?;
        }
        let mut bytes = Vec::new();
        while let Some(chunk) = res.chunk().await? {
            check_resume_size(bytes.len() + chunk.len())?;
            bytes.extend_from_slice(&chunk);
        }

        let text = if is_pdf_type || bytes.starts_with(b"%PDF") {
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                .await
                .map_err(|e| Error::Internal(format!("pdf extraction task failed: {}", e)))?
                .map_err(|e| Error::Upstream(format!("could not read PDF resume: {}", e)))?
        } else {
            String::from_utf8_lossy(&bytes).into_owned()
        };

        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            return Err(Error::Upstream("resume contains no extractable text".into()));
        }
        Ok(text)
    }

    async fn score(&self, resume_text: &str, job_title: &str, job_description: &str) -> Result<MatchScore> {
        let system_prompt = r#"You are a strict, unbiased technical recruiter.
Score how well the resume matches the job on a 0-100 scale.
0-30: core profession or experience is missing.
31-60: partial overlap, key requirements missing.
61-80: strong match with minor gaps.
81-100: near perfect match.
Return JSON: { "score": <0-100>, "summary": "<two sentences>", "strengths": ["..."], "gaps": ["..."] }"#;

        let resume: String = resume_text.chars().take(MAX_RESUME_CHARS).collect();
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                {
                    "role": "user",
                    "content": format!("Job: {}\n{}\n\nResume:\n{}", job_title, job_description, resume)
                }
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.2
        });

        let resp = self.chat_openai(payload).await?;
        let mut score: MatchScore = serde_json::from_value(resp)
            .map_err(|e| Error::Upstream(format!("unexpected scoring payload: {}", e)))?;
        score.score = score.score.clamp(0, 100);
        Ok(score)
    }
}

/// One applicant queued for scoring.
#[derive(Debug, Clone, FromRow)]
pub struct MatchItem {
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub resume_url: Option<String>,
}

#[derive(Clone)]
pub struct MatchingService {
    pool: PgPool,
    analyzer: Arc<dyn ResumeAnalyzer>,
    applications: ApplicationService,
}

impl MatchingService {
    pub fn new(pool: PgPool, analyzer: Arc<dyn ResumeAnalyzer>) -> Self {
        Self {
            applications: ApplicationService::new(pool.clone()),
            pool,
            analyzer,
        }
    }

    /// Scores the job's applicants, or only `candidate_ids` when given.
    pub async fn match_job(&self, job_id: Uuid, payload: MatchJobPayload) -> Result<MatchReport> {
        let job = sqlx::query_as::<_, Job>(&format!(
            "SELECT {} FROM jobs WHERE id = $1",
            job_service::COLUMNS
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Job not found".into()))?;

        let items: Vec<MatchItem> = sqlx::query_as(
            r#"
            SELECT c.id AS candidate_id, c.name AS candidate_name, c.resume_url
            FROM job_applications a
            JOIN candidates c ON c.id = a.candidate_id
            WHERE a.job_id = $1 AND (cardinality($2::uuid[]) = 0 OR c.id = ANY($2))
            ORDER BY a.applied_at
            "#,
        )
        .bind(job_id)
        .bind(&payload.candidate_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(self.run_batch(&job, items).await)
    }

    /// Never fails as a whole: each item ends up scored or failed.
    pub async fn run_batch(&self, job: &Job, items: Vec<MatchItem>) -> MatchReport {
        let mut results = score_items(self.analyzer.as_ref(), job, items).await;

        for result in &mut results {
            if let MatchOutcome::Scored { score, attempts } = &result.outcome {
                if let Err(e) = self
                    .applications
                    .record_match(result.candidate_id, job.id, score.score, &score.summary)
                    .await
                {
                    tracing::warn!(candidate_id = %result.candidate_id, error = %e, "match score not stored");
                    result.outcome = MatchOutcome::Failed {
                        error: e.to_string(),
                        attempts: *attempts,
                    };
                }
            }
        }

        MatchReport::new(job.id, results)
    }
}

async fn score_once(analyzer: &dyn ResumeAnalyzer, job: &Job, url: &str) -> Result<MatchScore> {
    let text = analyzer.extract_text(url).await?;
    analyzer
        .score(&text, &job.title, job.description.as_deref().unwrap_or_default())
        .await
}

/// Sequential scoring with a single retry pass over the items that failed
/// the first time round.
pub(crate) async fn score_items(
    analyzer: &dyn ResumeAnalyzer,
    job: &Job,
    items: Vec<MatchItem>,
) -> Vec<MatchResult> {
    let mut results = Vec::with_capacity(items.len());
    let mut retry = Vec::new();

    for (idx, item) in items.iter().enumerate() {
        let Some(url) = item.resume_url.as_deref() else {
            results.push(MatchResult {
                candidate_id: item.candidate_id,
                candidate_name: item.candidate_name.clone(),
                outcome: MatchOutcome::Failed {
                    error: "Candidate has no resume on file".into(),
                    attempts: 0,
                },
            });
            continue;
        };
        let outcome = match score_once(analyzer, job, url).await {
            Ok(score) => MatchOutcome::Scored { score, attempts: 1 },
            Err(e) => {
                tracing::warn!(candidate_id = %item.candidate_id, error = %e, "resume scoring failed, will retry");
                retry.push(idx);
                MatchOutcome::Failed {
                    error: e.to_string(),
                    attempts: 1,
                }
            }
        };
        results.push(MatchResult {
            candidate_id: item.candidate_id,
            candidate_name: item.candidate_name.clone(),
            outcome,
        });
    }

    for idx in retry {
        let (item, result) = (&items[idx], &mut results[idx]);
        let url = item.resume_url.as_deref().unwrap_or_default();
        result.outcome = match score_once(analyzer, job, url).await {
            Ok(score) => MatchOutcome::Scored { score, attempts: 2 },
            Err(e) => {
                tracing::error!(candidate_id = %item.candidate_id, error = %e, "resume scoring failed permanently");
                MatchOutcome::Failed {
                    error: e.to_string(),
                    attempts: 2,
                }
            }
        };
    }

    results
}

fn check_resume_size(len: usize) -> Result<()> {
    if len > MAX_RESUME_BYTES {
        return Err(Error::Upstream(format!(
            "resume is larger than {} bytes",
            MAX_RESUME_BYTES
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{ContractType, JobStatus, WorkType};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn job() -> Job {
        Job {
            id: Uuid::new_v4(),
            title: "Backend Engineer".into(),
            description: Some("Rust, Postgres".into()),
            location: None,
            department_id: Uuid::new_v4(),
            hiring_manager_id: None,
            hiring_pipeline_id: None,
            work_type: WorkType::Remote,
            contract: ContractType::FullTime,
            head_count: 1,
            minimum_salary: None,
            maximum_salary: None,
            currency: None,
            status: JobStatus::Open,
            created_by_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(name: &str, url: Option<&str>) -> MatchItem {
        MatchItem {
            candidate_id: Uuid::new_v4(),
            candidate_name: name.into(),
            resume_url: url.map(str::to_string),
        }
    }

    fn score(value: i32) -> MatchScore {
        MatchScore {
            score: value,
            summary: "ok".into(),
            strengths: vec![],
            gaps: vec![],
        }
    }

    #[tokio::test]
    async fn transient_failure_is_retried_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let mut analyzer = MockResumeAnalyzer::new();
        analyzer.expect_extract_text().returning(move |_| {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(Error::Upstream("timeout".into()))
            } else {
                Ok("resume".into())
            }
        });
        analyzer.expect_score().returning(|_, _, _| Ok(score(72)));

        let results = score_items(&analyzer, &job(), vec![item("Ada", Some("https://cv/ada.pdf"))]).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        match &results[0].outcome {
            MatchOutcome::Scored { score, attempts } => {
                assert_eq!(score.score, 72);
                assert_eq!(*attempts, 2);
            }
            other => panic!("expected score, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn persistent_failure_is_reported_without_aborting_batch() {
        let mut analyzer = MockResumeAnalyzer::new();
        analyzer.expect_extract_text().returning(|url| {
            if url.contains("broken") {
                Err(Error::Upstream("bad pdf".into()))
            } else {
                Ok("resume".into())
            }
        });
        analyzer.expect_score().returning(|_, _, _| Ok(score(55)));

        let items = vec![
            item("Broken", Some("https://cv/broken.pdf")),
            item("Grace", Some("https://cv/grace.pdf")),
            item("NoCv", None),
        ];
        let results = score_items(&analyzer, &job(), items).await;
        assert_eq!(results.len(), 3);

        assert!(matches!(
            &results[0].outcome,
            MatchOutcome::Failed { attempts: 2, error } if error.contains("bad pdf")
        ));
        assert!(matches!(&results[1].outcome, MatchOutcome::Scored { attempts: 1, .. }));
        assert!(matches!(&results[2].outcome, MatchOutcome::Failed { attempts: 0, .. }));

        let report = MatchReport::new(Uuid::nil(), results);
        assert_eq!((report.scored, report.failed), (1, 2));
    }

    #[tokio::test]
    async fn job_text_is_passed_to_scorer() {
        let mut analyzer = MockResumeAnalyzer::new();
        analyzer.expect_extract_text().returning(|_| Ok("resume".into()));
        analyzer
            .expect_score()
            .withf(|text, title, description| {
                text == "resume" && title == "Backend Engineer" && description == "Rust, Postgres"
            })
            .times(1)
            .returning(|_, _, _| Ok(score(90)));

        let results = score_items(&analyzer, &job(), vec![item("Ada", Some("https://cv/ada"))]).await;
        assert!(matches!(&results[0].outcome, MatchOutcome::Scored { .. }));
    }

    /// Answers one HTTP request with `head` followed by `body`.
    async fn serve_once(head: String, body: Vec<u8>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&body).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{}/resume", addr)
    }

    fn analyzer() -> OpenAiAnalyzer {
        let client = Client::builder().no_proxy().build().unwrap();
        OpenAiAnalyzer::new(None, "gpt-4o".into(), client)
    }

    #[test]
    fn resume_size_limit() {
        assert!(check_resume_size(MAX_RESUME_BYTES).is_ok());
        assert!(matches!(
            check_resume_size(MAX_RESUME_BYTES + 1),
            Err(Error::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn oversized_resume_is_refused_from_its_length_header() {
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            MAX_RESUME_BYTES + 1
        );
        let url = serve_once(head, b"Rust engineer".to_vec()).await;

        let err = analyzer().extract_text(&url).await.unwrap_err();
        assert!(matches!(err, Error::Upstream(ref msg) if msg.contains("larger than")), "{:?}", err);
    }

    #[tokio::test]
    async fn plain_text_resume_is_normalized() {
        let body = b"Ada   Lovelace\n\nRust,  Postgres\n".to_vec();
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let url = serve_once(head, body).await;

        let text = analyzer().extract_text(&url).await.unwrap();
        assert_eq!(text, "Ada Lovelace Rust, Postgres");
    }
}
