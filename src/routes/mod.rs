pub mod activity;
pub mod applications;
pub mod auth;
pub mod candidates;
pub mod departments;
pub mod health;
pub mod interviews;
pub mod jobs;
pub mod pipelines;
pub mod referrals;
pub mod teams;
pub mod users;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{
    auth::require_bearer_auth,
    cors::cors_layer,
    rate_limit::{rps_middleware, RateLimiter},
};
use crate::AppState;

/// Full HTTP surface. Everything under `/api` except auth and referral
/// lookup sits behind the bearer-token layer; auth is rate limited.
pub fn router(state: AppState) -> Router {
    let auth_api = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/verify", post(auth::verify_email))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .layer(axum::middleware::from_fn_with_state(
            RateLimiter::new(state.config.auth_rps),
            rps_middleware,
        ));

    let public_api = Router::new()
        .route("/health", get(health::health))
        .route("/api/referrals/:token", get(referrals::resolve_referral))
        .merge(auth_api);

    let protected_api = Router::new()
        .route("/api/users", get(users::list_users))
        .route("/api/users/me", get(users::me))
        .route(
            "/api/users/:id",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route("/api/roles", get(users::list_roles))
        .route(
            "/api/roles/:id",
            get(users::get_role).patch(users::update_role),
        )
        .route(
            "/api/teams",
            get(teams::list_teams).post(teams::create_team),
        )
        .route(
            "/api/teams/:id",
            get(teams::get_team)
                .patch(teams::update_team)
                .delete(teams::delete_team),
        )
        .route("/api/teams/:id/members", post(teams::add_member))
        .route(
            "/api/teams/:id/members/:user_id",
            axum::routing::delete(teams::remove_member),
        )
        .route(
            "/api/departments",
            get(departments::list_departments).post(departments::create_department),
        )
        .route(
            "/api/departments/:id",
            get(departments::get_department)
                .patch(departments::update_department)
                .delete(departments::delete_department),
        )
        .route(
            "/api/pipelines",
            get(pipelines::list_pipelines).post(pipelines::create_pipeline),
        )
        .route(
            "/api/pipelines/:id",
            get(pipelines::get_pipeline)
                .patch(pipelines::update_pipeline)
                .delete(pipelines::delete_pipeline),
        )
        .route("/api/pipelines/:id/detail", get(pipelines::get_pipeline_detail))
        .route("/api/pipelines/:id/stages", post(pipelines::create_stage))
        .route(
            "/api/stages/:id",
            patch(pipelines::update_stage).delete(pipelines::delete_stage),
        )
        .route(
            "/api/stages/:id/participants",
            get(pipelines::list_participants).post(pipelines::enroll_participant),
        )
        .route(
            "/api/stages/:id/participants/:candidate_id",
            patch(pipelines::record_result).delete(pipelines::withdraw_participant),
        )
        .route("/api/jobs", get(jobs::list_jobs).post(jobs::create_job))
        .route(
            "/api/jobs/:id",
            get(jobs::get_job)
                .patch(jobs::update_job)
                .delete(jobs::delete_job),
        )
        .route("/api/jobs/:id/detail", get(jobs::get_job_detail))
        .route("/api/jobs/:id/applications", get(jobs::list_job_applications))
        .route(
            "/api/jobs/:id/referrals",
            get(jobs::list_referrals).post(jobs::issue_referral),
        )
        .route(
            "/api/jobs/:id/referrals/:referral_id",
            axum::routing::delete(referrals::revoke_referral),
        )
        .route("/api/jobs/:id/match", post(jobs::match_candidates))
        .route(
            "/api/candidates",
            get(candidates::list_candidates).post(candidates::create_candidate),
        )
        .route("/api/candidates/stats", get(candidates::candidate_stats))
        .route(
            "/api/candidates/:id",
            get(candidates::get_candidate)
                .patch(candidates::update_candidate)
                .delete(candidates::delete_candidate),
        )
        .route("/api/candidates/:id/detail", get(candidates::get_candidate_detail))
        .route(
            "/api/candidates/:id/status",
            patch(candidates::update_candidate_status),
        )
        .route(
            "/api/candidates/:id/applications",
            get(candidates::list_candidate_applications),
        )
        .route(
            "/api/candidates/:id/interviews",
            get(candidates::list_candidate_interviews),
        )
        .route(
            "/api/candidates/:id/notes",
            get(candidates::list_notes).post(candidates::add_note),
        )
        .route(
            "/api/candidates/:id/notes/:note_id",
            axum::routing::delete(candidates::delete_note),
        )
        .route(
            "/api/candidates/:id/attachments",
            get(candidates::list_attachments).post(candidates::add_attachment),
        )
        .route(
            "/api/candidates/:id/attachments/:attachment_id",
            axum::routing::delete(candidates::delete_attachment),
        )
        .route("/api/applications", post(applications::create_application))
        .route(
            "/api/applications/:id",
            get(applications::get_application).delete(applications::withdraw_application),
        )
        .route("/api/interviews", post(interviews::schedule_interview))
        .route(
            "/api/interviews/:id",
            get(interviews::get_interview)
                .patch(interviews::update_interview)
                .delete(interviews::delete_interview),
        )
        .route(
            "/api/interviews/:id/checklist",
            axum::routing::put(interviews::upsert_checklist),
        )
        .route(
            "/api/interviews/:id/participants",
            post(interviews::add_interviewer),
        )
        .route(
            "/api/interviews/:id/participants/:interviewer_id",
            axum::routing::delete(interviews::remove_interviewer),
        )
        .route("/api/activity", get(activity::list_activity))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_bearer_auth,
        ));

    let cors = cors_layer(&state.config.cors_allowed_origins);

    public_api
        .merge(protected_api)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
}
