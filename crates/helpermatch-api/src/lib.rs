pub mod ai;
pub mod auth;
pub mod error;
pub mod gemini;
pub mod helpers;
pub mod jobs;
pub mod mailer;
pub mod messages;
pub mod messaging;
pub mod middleware;
pub mod oauth;
pub mod payments;
pub mod policy;
pub mod settings;
pub mod state;
pub mod stripe;
pub mod users;
pub mod validation;

use axum::{
    Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};

use helpermatch_types::api::{AccessSummary, HealthResponse};

use crate::error::ApiResult;
use crate::middleware::{Session, authenticate};
use crate::state::{AppState, run_db};

/// All API routes, mounted under `/api`. Every request passes through
/// [`authenticate`]; handlers pick `Session` or `AuthUser` depending on
/// whether a signed-in caller is required.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/access", get(access))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/oauth/google", post(oauth::google_sign_in))
        .route("/oauth/forgot-password", post(oauth::forgot_password))
        .route("/oauth/reset-password", post(oauth::reset_password))
        // Listings
        .route("/helpers", get(helpers::list_helpers).post(helpers::create_helper))
        .route(
            "/helpers/{id}",
            get(helpers::get_helper)
                .put(helpers::update_helper)
                .delete(helpers::delete_helper),
        )
        .route("/helpers/{id}/status", put(helpers::moderate_helper))
        .route("/jobs", get(jobs::list_jobs).post(jobs::create_job))
        .route(
            "/jobs/{id}",
            get(jobs::get_job).put(jobs::update_job).delete(jobs::delete_job),
        )
        .route("/jobs/{id}/status", put(jobs::moderate_job))
        // Users
        .route("/users", get(users::list_users))
        .route(
            "/users/{id}",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
        // Messages
        .route("/messages", post(messages::send_message))
        .route("/messages/conversations", get(messages::list_conversations))
        .route("/messages/{conversation_id}", get(messages::get_messages))
        // Payments
        .route("/payments/checkout", post(payments::create_checkout))
        .route("/payments/verify", post(payments::verify_payment))
        // AI
        .route("/ai/match", post(ai::smart_match))
        .route("/ai/job-description", post(ai::job_description))
        // Settings
        .route("/settings", get(settings::get_settings).put(settings::put_setting))
        .layer(from_fn_with_state(state.clone(), authenticate))
        .with_state(state);

    Router::new().nest("/api", api)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Why the caller can or cannot browse each collection.
async fn access(State(state): State<AppState>, session: Session) -> ApiResult<Json<AccessSummary>> {
    let summary = run_db(&state, move |s| {
        let viewer = policy::resolve_viewer(&s.db, session.user_id());
        Ok(policy::summary(viewer.as_ref()))
    })
    .await?;
    Ok(Json(summary))
}
