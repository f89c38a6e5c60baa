//! HTTP surface exposed to the host
//!
//! - GET  /health
//! - GET  /config/:project and PUT /config/:project
//! - GET  /config/:project/:repo and PUT /config/:project/:repo
//! - GET  /config/:project/:repo/effective
//! - GET  /users/:project/:repo
//! - POST /hooks/push
//! - POST /hooks/merge-check
//! - POST /events

pub mod config;
pub mod hooks;
pub mod users;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::SearchSettings;
use crate::enforcement::{DecisionLogger, MergeBlocker, PushGate};
use crate::error::PolicyError;
use crate::host::{ConfigStore, Directory, PullRequestService};
use crate::policy::GroupResolver;
use crate::webhooks::{ReactionController, Reactions};

#[derive(Clone)]
pub struct AppState {
    pub configs: Arc<dyn ConfigStore>,
    pub groups: GroupResolver,
    pub push_gate: Arc<PushGate>,
    pub merge_blocker: Arc<MergeBlocker>,
    pub controller: Arc<ReactionController>,
}

impl AppState {
    pub fn new(
        configs: Arc<dyn ConfigStore>,
        directory: Arc<dyn Directory>,
        pull_requests: Arc<dyn PullRequestService>,
        search: SearchSettings,
        decisions: DecisionLogger,
    ) -> Self {
        let groups = GroupResolver::new(directory);
        let push_gate = Arc::new(PushGate::new(
            configs.clone(),
            groups.clone(),
            decisions.clone(),
        ));
        let merge_blocker = Arc::new(MergeBlocker::new(
            configs.clone(),
            groups.clone(),
            pull_requests.clone(),
            decisions.clone(),
        ));
        let reactions = Arc::new(Reactions::new(
            configs.clone(),
            pull_requests,
            merge_blocker.clone(),
            search,
            decisions,
        ));
        let controller = Arc::new(ReactionController::with_default_handlers(reactions));

        Self {
            configs,
            groups,
            push_gate,
            merge_blocker,
            controller,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/config/:project",
            get(config::get_project_config).put(config::put_project_config),
        )
        .route(
            "/config/:project/:repo",
            get(config::get_repo_config).put(config::put_repo_config),
        )
        .route(
            "/config/:project/:repo/effective",
            get(config::get_effective_repo_config),
        )
        .route("/users/:project/:repo", get(users::get_effective_reviewers))
        .route("/hooks/push", post(hooks::push_received))
        .route("/hooks/merge-check", post(hooks::merge_check))
        .route("/events", post(hooks::handle_event))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .into_inner(),
        )
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "pr-policy-gate",
        "timestamp": chrono::Utc::now()
    }))
}

/// `PolicyError` rendered as an HTTP response.
pub struct ApiError(PolicyError);

impl From<PolicyError> for ApiError {
    fn from(err: PolicyError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            error!("Request failed: {}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(serde_json::json!({"error": self.0.to_string()}))).into_response()
    }
}
