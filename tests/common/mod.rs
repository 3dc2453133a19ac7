use std::env;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use hiring_backend::{
    config::Config,
    middleware::auth::issue_token,
    models::enums::RoleName,
    services::{matching_service::OpenAiAnalyzer, notification_service::LogNotifier},
    AppState,
};
use serde_json::{json, Value as JsonValue};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test_secret_key";
const ADMIN_ROLE_ID: &str = "00000000-0000-0000-0000-000000000001";

pub struct TestApp {
    pub router: Router,
    pub pool: PgPool,
    pub admin_id: Uuid,
    pub token: String,
}

fn test_config(database_url: String) -> Config {
    Config {
        server_address: "127.0.0.1:0".into(),
        database_url,
        db_max_connections: 5,
        jwt_secret: JWT_SECRET.into(),
        jwt_ttl_hours: 1,
        openai_api_key: None,
        openai_model: "gpt-4o".into(),
        mandatory_stages: vec!["Application".into(), "Screening".into()],
        referral_ttl_days: 14,
        activity_retention_days: 365,
        expiry_schedule: "0 0 * * * *".into(),
        cors_allowed_origins: vec![],
        auth_rps: 50,
    }
}

/// Builds the app against `TEST_DATABASE_URL`, or returns `None` when it is
/// unset so database tests are skipped on machines without Postgres.
pub async fn spawn() -> Option<TestApp> {
    spawn_with(|_| {}).await
}

pub async fn spawn_with(configure: impl FnOnce(&mut Config)) -> Option<TestApp> {
    dotenvy::dotenv().ok();
    let Ok(database_url) = env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("connect test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    let admin_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO users (id, name, email, role_id, status) VALUES ($1, $2, $3, $4, 'verified')",
    )
    .bind(admin_id)
    .bind("Test Admin")
    .bind(format!("admin-{}@example.com", admin_id))
    .bind(Uuid::parse_str(ADMIN_ROLE_ID).unwrap())
    .execute(&pool)
    .await
    .expect("seed admin");

    let (token, _) = issue_token(
        JWT_SECRET,
        admin_id,
        RoleName::Admin,
        RoleName::Admin.default_permissions(),
        1,
    )
    .expect("token");

    let mut config = test_config(database_url);
    configure(&mut config);
    let state = AppState::with_collaborators(
        pool.clone(),
        config,
        Arc::new(LogNotifier),
        Arc::new(OpenAiAnalyzer::new(None, "gpt-4o".into(), reqwest::Client::new())),
    );

    Some(TestApp {
        router: hiring_backend::routes::router(state),
        pool,
        admin_id,
        token,
    })
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<JsonValue>,
    ) -> (StatusCode, JsonValue) {
        self.request_as(Some(&self.token), method, uri, body).await
    }

    pub async fn request_as(
        &self,
        token: Option<&str>,
        method: Method,
        uri: &str,
        body: Option<JsonValue>,
    ) -> (StatusCode, JsonValue) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
        };
        (status, json)
    }

    /// Department with one open job attached to a fresh pipeline.
    pub async fn seed_job(&self) -> (Uuid, Uuid, Uuid) {
        let suffix = Uuid::new_v4();
        let (status, pipeline) = self
            .request(
                Method::POST,
                "/api/pipelines",
                Some(json!({
                    "name": format!("Pipeline {}", suffix),
                    "stages": [
                        { "name": "Application", "mandatory": true },
                        { "name": "Screening", "mandatory": true },
                        { "name": "Tech Interview" }
                    ]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", pipeline);
        let pipeline_id = id_of(&pipeline);

        let (status, department) = self
            .request(
                Method::POST,
                "/api/departments",
                Some(json!({
                    "name": format!("Engineering {}", suffix),
                    "hiring_manager_id": self.admin_id,
                    "jobs": [{
                        "title": "Backend Engineer",
                        "hiring_manager_id": self.admin_id,
                        "hiring_pipeline_id": pipeline_id,
                        "work_type": "remote",
                        "contract": "full_time",
                        "head_count": 2,
                        "minimum_salary": "60000",
                        "maximum_salary": "80000",
                        "status": "open"
                    }]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", department);
        let job_id = Uuid::parse_str(department["jobs"][0]["id"].as_str().unwrap()).unwrap();
        (id_of(&department), pipeline_id, job_id)
    }

    /// Verified user holding `role`, with a token carrying that role's
    /// default permissions.
    pub async fn seed_user(&self, role: RoleName) -> (Uuid, String) {
        let user_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, role_id, status)
            SELECT $1, $2, $3, id, 'verified' FROM roles WHERE name = $4
            "#,
        )
        .bind(user_id)
        .bind(format!("User {}", role))
        .bind(format!("user-{}@example.com", user_id))
        .bind(role)
        .execute(&self.pool)
        .await
        .expect("seed user");

        let (token, _) =
            issue_token(JWT_SECRET, user_id, role, role.default_permissions(), 1).expect("token");
        (user_id, token)
    }

    /// Rows of `table` whose `column` matches any of `ids`.
    pub async fn count_where(&self, table: &str, column: &str, ids: &[Uuid]) -> i64 {
        sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ANY($1)",
            table, column
        ))
        .bind(ids)
        .fetch_one(&self.pool)
        .await
        .expect("count rows")
    }

    pub async fn seed_candidate(&self) -> Uuid {
        let (status, candidate) = self
            .request(
                Method::POST,
                "/api/candidates",
                Some(json!({
                    "name": "Ada Lovelace",
                    "email": format!("ada-{}@example.com", Uuid::new_v4()),
                    "skills": ["Rust", "Postgres"]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", candidate);
        id_of(&candidate)
    }
}

pub fn id_of(value: &JsonValue) -> Uuid {
    Uuid::parse_str(value["id"].as_str().expect("id field")).unwrap()
}
