mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use common::id_of;
use hiring_backend::{
    integrity::{references::ensure_all_exist, EntityKind},
    middleware::auth::issue_token,
    models::enums::RoleName,
    utils::crypto::hash_code,
};

#[tokio::test]
async fn health_and_auth_gate() {
    let Some(app) = common::spawn().await else { return };

    let (status, body) = app.request_as(None, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "up");

    let (status, body) = app.request_as(None, Method::GET, "/api/jobs", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_authorization");

    let (status, _) = app
        .request_as(Some("not-a-jwt"), Method::GET, "/api/jobs", None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn second_application_for_same_pair_conflicts() {
    let Some(app) = common::spawn().await else { return };
    let (_, _, job_id) = app.seed_job().await;
    let candidate_id = app.seed_candidate().await;

    let body = json!({ "candidate_id": candidate_id, "job_id": job_id });
    let (status, first) = app
        .request(Method::POST, "/api/applications", Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", first);
    assert_eq!(first["source"], "direct");

    let (status, second) = app
        .request(Method::POST, "/api/applications", Some(body))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(second["error"], "Candidate has already applied to this job");

    let (status, apps) = app
        .request(Method::GET, &format!("/api/jobs/{}/applications", job_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(apps.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn application_with_unknown_job_is_rejected() {
    let Some(app) = common::spawn().await else { return };
    let candidate_id = app.seed_candidate().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/applications",
            Some(json!({ "candidate_id": candidate_id, "job_id": Uuid::new_v4() })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid job_id");
}

#[tokio::test]
async fn candidate_status_follows_the_graph() {
    let Some(app) = common::spawn().await else { return };
    let candidate_id = app.seed_candidate().await;
    let uri = format!("/api/candidates/{}/status", candidate_id);

    let (status, body) = app
        .request(Method::PATCH, &uri, Some(json!({ "status": "offered" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Invalid status transition from applied to offered");

    for next in ["shortlisted", "interviewed", "offered", "rejected"] {
        let (status, body) = app
            .request(Method::PATCH, &uri, Some(json!({ "status": next })))
            .await;
        assert_eq!(status, StatusCode::OK, "{}: {}", next, body);
        assert_eq!(body["status"], next);
    }

    let (status, _) = app
        .request(Method::PATCH, &uri, Some(json!({ "status": "applied" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn duplicate_candidate_email_conflicts() {
    let Some(app) = common::spawn().await else { return };
    let email = format!("grace-{}@example.com", Uuid::new_v4());

    let (status, _) = app
        .request(
            Method::POST,
            "/api/candidates",
            Some(json!({ "name": "Grace Hopper", "email": email })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/candidates",
            Some(json!({ "name": "Grace H.", "email": email.to_uppercase() })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);
}

#[tokio::test]
async fn inverted_salary_range_is_a_validation_error() {
    let Some(app) = common::spawn().await else { return };
    let (department_id, _, _) = app.seed_job().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/jobs",
            Some(json!({
                "department_id": department_id,
                "title": "Data Engineer",
                "hiring_manager_id": app.admin_id,
                "work_type": "onsite",
                "contract": "contract",
                "head_count": 1,
                "minimum_salary": "80",
                "maximum_salary": "60"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");
}

#[tokio::test]
async fn mandatory_stage_cannot_be_skipped_or_removed() {
    let Some(app) = common::spawn().await else { return };
    let (_, pipeline_id, _) = app.seed_job().await;

    let (status, pipeline) = app
        .request(Method::GET, &format!("/api/pipelines/{}", pipeline_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let stages = pipeline["stages"].as_array().unwrap();
    assert_eq!(stages.len(), 3);
    let application = stages.iter().find(|s| s["name"] == "Application").unwrap();
    assert_eq!(application["mandatory"], true);
    let application_id = id_of(application);

    let (status, _) = app
        .request(
            Method::PATCH,
            &format!("/api/stages/{}", application_id),
            Some(json!({ "status": "skipped" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/stages/{}", application_id), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let tech = stages.iter().find(|s| s["name"] == "Tech Interview").unwrap();
    let (status, report) = app
        .request(Method::DELETE, &format!("/api/stages/{}", id_of(tech)), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", report);
}

#[tokio::test]
async fn deleting_department_cascades_to_jobs_and_their_dependents() {
    let Some(app) = common::spawn().await else { return };
    let (_, pipeline_id, _) = app.seed_job().await;
    let job = |title: &str| {
        json!({
            "title": title,
            "hiring_manager_id": app.admin_id,
            "hiring_pipeline_id": pipeline_id,
            "work_type": "hybrid",
            "contract": "full_time",
            "head_count": 1,
            "status": "open",
            "skills": ["Rust", "Kubernetes"]
        })
    };
    let (status, department) = app
        .request(
            Method::POST,
            "/api/departments",
            Some(json!({
                "name": format!("Platform {}", Uuid::new_v4()),
                "hiring_manager_id": app.admin_id,
                "jobs": [job("Platform Engineer"), job("Site Reliability Engineer")]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", department);
    let department_id = id_of(&department);
    let job_ids: Vec<Uuid> = department["jobs"]
        .as_array()
        .unwrap()
        .iter()
        .map(id_of)
        .collect();
    assert_eq!(job_ids.len(), 2);

    let candidate_id = app.seed_candidate().await;
    for job_id in &job_ids {
        let (status, _) = app
            .request(
                Method::POST,
                "/api/applications",
                Some(json!({ "candidate_id": candidate_id, "job_id": job_id })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = app
            .request(
                Method::POST,
                &format!("/api/jobs/{}/referrals", job_id),
                Some(json!({})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    assert_eq!(app.count_where("job_skills", "job_id", &job_ids).await, 4);
    assert_eq!(app.count_where("job_applications", "job_id", &job_ids).await, 2);
    assert_eq!(app.count_where("referral_tokens", "job_id", &job_ids).await, 2);

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/departments/{}", department_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(app.count_where("departments", "id", &[department_id]).await, 0);
    assert_eq!(app.count_where("jobs", "id", &job_ids).await, 0);
    assert_eq!(app.count_where("job_skills", "job_id", &job_ids).await, 0);
    assert_eq!(app.count_where("job_applications", "job_id", &job_ids).await, 0);
    assert_eq!(app.count_where("referral_tokens", "job_id", &job_ids).await, 0);

    // Candidate and pipeline are not owned by the department.
    let (status, _) = app
        .request(Method::GET, &format!("/api/candidates/{}", candidate_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.count_where("candidate_skills", "candidate_id", &[candidate_id]).await, 2);
    let (status, detail) = app
        .request(Method::GET, &format!("/api/pipelines/{}/detail", pipeline_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(detail["job_ids"]
        .as_array()
        .unwrap()
        .iter()
        .all(|id| !job_ids.iter().any(|j| id == &json!(j))));
}

/// Stage ids of a pipeline keyed by name, in position order.
async fn stages_of(app: &common::TestApp, pipeline_id: Uuid) -> Vec<(String, Uuid, i64)> {
    let (status, pipeline) = app
        .request(Method::GET, &format!("/api/pipelines/{}", pipeline_id), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", pipeline);
    pipeline["stages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| {
            (
                s["name"].as_str().unwrap().to_string(),
                id_of(s),
                s["position"].as_i64().unwrap(),
            )
        })
        .collect()
}

#[tokio::test]
async fn pipeline_update_cannot_drop_a_mandatory_stage() {
    let Some(app) = common::spawn().await else { return };
    let (_, pipeline_id, _) = app.seed_job().await;
    let before = stages_of(&app, pipeline_id).await;
    let names: Vec<&str> = before.iter().map(|(n, _, _)| n.as_str()).collect();
    assert_eq!(names, ["Application", "Screening", "Tech Interview"]);

    let (status, body) = app
        .request(
            Method::PATCH,
            &format!("/api/pipelines/{}", pipeline_id),
            Some(json!({
                "name": "Renamed while dropping Screening",
                "stages": [
                    { "id": before[0].1, "name": "Application" },
                    { "id": before[2].1, "name": "Tech Interview" }
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);

    assert_eq!(stages_of(&app, pipeline_id).await, before);
    let (_, pipeline) = app
        .request(Method::GET, &format!("/api/pipelines/{}", pipeline_id), None)
        .await;
    assert_ne!(pipeline["name"], "Renamed while dropping Screening");
}

#[tokio::test]
async fn pipeline_update_reorders_and_inserts_with_contiguous_positions() {
    let Some(app) = common::spawn().await else { return };
    let (_, pipeline_id, _) = app.seed_job().await;
    let before = stages_of(&app, pipeline_id).await;

    let (status, body) = app
        .request(
            Method::PATCH,
            &format!("/api/pipelines/{}", pipeline_id),
            Some(json!({
                "stages": [
                    { "id": before[1].1, "name": "Screening" },
                    { "id": before[0].1, "name": "Application" },
                    { "name": "Take-home" },
                    { "id": before[2].1, "name": "Tech Interview" }
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let after = stages_of(&app, pipeline_id).await;
    let names: Vec<&str> = after.iter().map(|(n, _, _)| n.as_str()).collect();
    assert_eq!(names, ["Screening", "Application", "Take-home", "Tech Interview"]);
    let positions: Vec<i64> = after.iter().map(|(_, _, p)| *p).collect();
    assert_eq!(positions, [0, 1, 2, 3]);
    // Existing stages keep their identity.
    assert_eq!(after[0].1, before[1].1);
    assert_eq!(after[3].1, before[2].1);
}

/// Enrolls `candidate_id` in `stage_id` and schedules an interview there
/// with a checklist. Returns the interview id.
async fn seed_interview(app: &common::TestApp, candidate_id: Uuid, stage_id: Uuid) -> Uuid {
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/stages/{}/participants", stage_id),
            Some(json!({ "candidate_id": candidate_id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, interview) = app
        .request(
            Method::POST,
            "/api/interviews",
            Some(json!({
                "candidate_id": candidate_id,
                "stage_id": stage_id,
                "scheduled_at": "2030-01-15T10:00:00Z",
                "interviewer_ids": [app.admin_id]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", interview);
    let interview_id = id_of(&interview);

    let (status, checklist) = app
        .request(
            Method::PUT,
            &format!("/api/interviews/{}/checklist", interview_id),
            Some(json!({ "items": [{ "label": "System design" }] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", checklist);
    interview_id
}

#[tokio::test]
async fn deleting_pipeline_cascades_through_stages_and_interviews() {
    let Some(app) = common::spawn().await else { return };
    let (_, pipeline_id, job_id) = app.seed_job().await;
    let stage_ids: Vec<Uuid> = stages_of(&app, pipeline_id)
        .await
        .into_iter()
        .map(|(_, id, _)| id)
        .collect();
    let candidate_id = app.seed_candidate().await;
    let interview_id = seed_interview(&app, candidate_id, stage_ids[2]).await;

    let (status, report) = app
        .request(Method::DELETE, &format!("/api/pipelines/{}", pipeline_id), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", report);

    assert_eq!(app.count_where("hiring_pipelines", "id", &[pipeline_id]).await, 0);
    assert_eq!(app.count_where("hiring_stages", "pipeline_id", &[pipeline_id]).await, 0);
    assert_eq!(app.count_where("stage_participants", "stage_id", &stage_ids).await, 0);
    assert_eq!(app.count_where("interviews", "id", &[interview_id]).await, 0);
    assert_eq!(
        app.count_where("interview_participants", "interview_id", &[interview_id]).await,
        0
    );
    assert_eq!(app.count_where("checklists", "interview_id", &[interview_id]).await, 0);

    // The job survives with its pipeline reference cleared.
    let (status, job) = app
        .request(Method::GET, &format!("/api/jobs/{}", job_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(job["hiring_pipeline_id"].is_null());
    let (status, _) = app
        .request(Method::GET, &format!("/api/candidates/{}", candidate_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn deleting_candidate_removes_everything_attached_to_it() {
    let Some(app) = common::spawn().await else { return };
    let (_, pipeline_id, job_id) = app.seed_job().await;
    let stage_id = stages_of(&app, pipeline_id).await[2].1;
    let candidate_id = app.seed_candidate().await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/applications",
            Some(json!({ "candidate_id": candidate_id, "job_id": job_id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let interview_id = seed_interview(&app, candidate_id, stage_id).await;
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/candidates/{}/notes", candidate_id),
            Some(json!({ "content": "Strong systems background" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/candidates/{}/attachments", candidate_id),
            Some(json!({ "file_name": "cv.pdf", "file_url": "https://files.example.com/cv.pdf" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, report) = app
        .request(Method::DELETE, &format!("/api/candidates/{}", candidate_id), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", report);

    let ids = [candidate_id];
    assert_eq!(app.count_where("candidates", "id", &ids).await, 0);
    for table in [
        "job_applications",
        "candidate_skills",
        "stage_participants",
        "interviews",
        "notes",
        "attachments",
    ] {
        assert_eq!(app.count_where(table, "candidate_id", &ids).await, 0, "{}", table);
    }
    assert_eq!(
        app.count_where("interview_participants", "interview_id", &[interview_id]).await,
        0
    );
    assert_eq!(app.count_where("checklists", "interview_id", &[interview_id]).await, 0);

    // The job and its stage are untouched.
    assert_eq!(app.count_where("jobs", "id", &[job_id]).await, 1);
    assert_eq!(app.count_where("hiring_stages", "id", &[stage_id]).await, 1);
}

/// Requests a reset code for `email` and pins it to `code`, since the mailed
/// one is random.
async fn issue_known_reset_code(app: &common::TestApp, email: &str, code: &str) {
    let (status, _) = app
        .request_as(
            None,
            Method::POST,
            "/api/auth/forgot-password",
            Some(json!({ "email": email })),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    sqlx::query(
        r#"
        UPDATE credentials
        SET forgot_code_hash = $2, forgot_code_expires_at = NOW() + INTERVAL '15 minutes'
        WHERE user_id = (SELECT id FROM users WHERE email = $1)
        "#,
    )
    .bind(email)
    .bind(hash_code(code))
    .execute(&app.pool)
    .await
    .unwrap();
}

async fn reset_with(app: &common::TestApp, email: &str, code: &str) -> StatusCode {
    let (status, _) = app
        .request_as(
            None,
            Method::POST,
            "/api/auth/reset-password",
            Some(json!({ "email": email, "code": code, "new_password": "second-password" })),
        )
        .await;
    status
}

#[tokio::test]
async fn reset_code_is_discarded_after_repeated_wrong_guesses() {
    let Some(app) = common::spawn().await else { return };
    let email = format!("lockout-{}@example.com", Uuid::new_v4());

    let (status, body) = app
        .request_as(
            None,
            Method::POST,
            "/api/auth/register",
            Some(json!({ "name": "Lin", "email": email, "password": "first-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    issue_known_reset_code(&app, &email, "424242").await;
    for _ in 0..5 {
        assert_eq!(reset_with(&app, &email, "000000").await, StatusCode::BAD_REQUEST);
    }
    // The right code no longer works once the attempts are used up.
    assert_eq!(reset_with(&app, &email, "424242").await, StatusCode::BAD_REQUEST);
    let cleared: Option<String> = sqlx::query_scalar(
        "SELECT forgot_code_hash FROM credentials WHERE user_id = (SELECT id FROM users WHERE email = $1)",
    )
    .bind(&email)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert!(cleared.is_none());

    // A freshly issued code starts a new allowance.
    issue_known_reset_code(&app, &email, "515151").await;
    assert_eq!(reset_with(&app, &email, "000000").await, StatusCode::BAD_REQUEST);
    assert_eq!(reset_with(&app, &email, "515151").await, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn auth_routes_are_rate_limited() {
    let Some(app) = common::spawn_with(|config| config.auth_rps = 3).await else { return };

    let mut statuses = Vec::new();
    for _ in 0..10 {
        let (status, _) = app
            .request_as(
                None,
                Method::POST,
                "/api/auth/login",
                Some(json!({ "email": "nobody@example.com", "password": "whatever-pass" })),
            )
            .await;
        statuses.push(status);
    }
    assert!(statuses.contains(&StatusCode::UNAUTHORIZED), "{:?}", statuses);
    assert!(statuses.contains(&StatusCode::TOO_MANY_REQUESTS), "{:?}", statuses);

    // Only the auth routes share the budget.
    let (status, _) = app.request_as(None, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn token_access_follows_the_current_account_state() {
    let Some(app) = common::spawn().await else { return };
    let (user_id, token) = app.seed_user(RoleName::Recruiter).await;
    let new_candidate = || {
        json!({
            "name": "Barbara Liskov",
            "email": format!("barbara-{}@example.com", Uuid::new_v4())
        })
    };

    let (status, _) = app
        .request_as(Some(&token), Method::POST, "/api/candidates", Some(new_candidate()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // Permissions come from the role row, not from what the token claims.
    let (forged, _) = issue_token(
        common::JWT_SECRET,
        user_id,
        RoleName::Admin,
        RoleName::Admin.default_permissions(),
        1,
    )
    .unwrap();
    let (status, _) = app
        .request_as(Some(&forged), Method::GET, "/api/users", None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            Method::PATCH,
            &format!("/api/users/{}", user_id),
            Some(json!({ "status": "suspended" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app
        .request_as(Some(&token), Method::POST, "/api/candidates", Some(new_candidate()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Account is suspended");

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/users/{}", user_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app
        .request_as(Some(&token), Method::POST, "/api/candidates", Some(new_candidate()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unknown_user");
}

#[tokio::test]
async fn member_reference_check_locks_the_referenced_users() {
    let Some(app) = common::spawn().await else { return };
    let (user_id, _) = app.seed_user(RoleName::Interviewer).await;

    let mut tx = app.pool.begin().await.unwrap();
    ensure_all_exist(&mut tx, EntityKind::User, &[user_id, user_id], "member_ids")
        .await
        .unwrap();

    let mut other = app.pool.acquire().await.unwrap();
    sqlx::query("SET lock_timeout = '200ms'")
        .execute(&mut *other)
        .await
        .unwrap();
    let blocked = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&mut *other)
        .await;
    assert!(blocked.is_err(), "delete should wait on the key-share lock");
    tx.rollback().await.unwrap();

    let missing = Uuid::new_v4();
    let mut tx = app.pool.begin().await.unwrap();
    let err = ensure_all_exist(&mut tx, EntityKind::User, &[user_id, missing], "member_ids")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid member_ids");
}

#[tokio::test]
async fn referral_redeem_applies_to_referred_job() {
    let Some(app) = common::spawn().await else { return };
    let (_, _, job_id) = app.seed_job().await;

    let (status, referral) = app
        .request(
            Method::POST,
            &format!("/api/jobs/{}/referrals", job_id),
            Some(json!({ "ttl_days": 3 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", referral);
    let token = referral["token"].as_str().unwrap().to_string();

    let (status, lookup) = app
        .request_as(None, Method::GET, &format!("/api/referrals/{}", token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lookup["job_id"], job_id.to_string());

    let (status, candidate) = app
        .request(
            Method::POST,
            "/api/candidates",
            Some(json!({
                "name": "Referred Person",
                "email": format!("ref-{}@example.com", Uuid::new_v4()),
                "referral_token": token
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", candidate);

    let (status, detail) = app
        .request(
            Method::GET,
            &format!("/api/candidates/{}/detail", id_of(&candidate)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let applications = detail["applications"].as_array().unwrap();
    assert_eq!(applications.len(), 1);
    assert_eq!(applications[0]["source"], "referral");
    assert_eq!(applications[0]["job_title"], "Backend Engineer");

    let (status, _) = app
        .request_as(None, Method::GET, "/api/referrals/does-not-exist", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stage_capacity_is_enforced() {
    let Some(app) = common::spawn().await else { return };
    let (_, pipeline_id, _) = app.seed_job().await;

    let (status, stage) = app
        .request(
            Method::POST,
            &format!("/api/pipelines/{}/stages", pipeline_id),
            Some(json!({ "name": "Onsite", "max_candidates_allowed": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", stage);
    let uri = format!("/api/stages/{}/participants", id_of(&stage));

    let first = app.seed_candidate().await;
    let second = app.seed_candidate().await;
    let (status, _) = app
        .request(Method::POST, &uri, Some(json!({ "candidate_id": first })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .request(Method::POST, &uri, Some(json!({ "candidate_id": first })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, body) = app
        .request(Method::POST, &uri, Some(json!({ "candidate_id": second })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);
}

#[tokio::test]
async fn activity_is_recorded_for_writes() {
    let Some(app) = common::spawn().await else { return };
    let candidate_id = app.seed_candidate().await;

    let (status, page) = app
        .request(
            Method::GET,
            &format!("/api/activity?target_type=candidate&target_id={}", candidate_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let items = page["items"].as_array().unwrap();
    assert!(!items.is_empty());
    assert_eq!(items[0]["action"], "created");
    assert_eq!(items[0]["actor_id"], app.admin_id.to_string());
}
