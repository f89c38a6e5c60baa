use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;
use tracing::{info, warn};

use crate::api::{ApiError, AppState};
use crate::enforcement::{Decision, Rejection};
use crate::host::{PullRequest, PushEvent};
use crate::webhooks::{DispatchReport, PullRequestEvent};

#[derive(Debug, Clone, Serialize)]
pub struct PushHookResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeCheckResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<Decision> for PushHookResponse {
    fn from(decision: Decision) -> Self {
        Self {
            accepted: decision.is_allowed(),
            message: decision.rejection().map(Rejection::message),
        }
    }
}

impl From<Decision> for MergeCheckResponse {
    fn from(decision: Decision) -> Self {
        let rejection = decision.rejection();
        Self {
            accepted: decision.is_allowed(),
            summary: rejection.map(|r| r.summary().to_string()),
            detail: rejection.and_then(Rejection::detail).map(str::to_string),
        }
    }
}

pub async fn push_received(
    State(state): State<AppState>,
    Json(push): Json<PushEvent>,
) -> Result<Json<PushHookResponse>, ApiError> {
    info!(
        "Push by {} to {}/{} ({} ref changes)",
        push.user,
        push.repository.project_key,
        push.repository.slug,
        push.ref_changes.len()
    );

    let decision = state.push_gate.evaluate(&push).await?;
    Ok(Json(decision.into()))
}

pub async fn merge_check(
    State(state): State<AppState>,
    Json(pr): Json<PullRequest>,
) -> Result<Json<MergeCheckResponse>, ApiError> {
    let decision = state.merge_blocker.check(&pr).await?;
    Ok(Json(decision.into()))
}

pub async fn handle_event(
    State(state): State<AppState>,
    Json(event): Json<PullRequestEvent>,
) -> (StatusCode, Json<DispatchReport>) {
    let report = state.controller.dispatch(&event).await;
    if report.has_failures() {
        warn!("{:?} event finished with handler failures", report.kind);
        (StatusCode::INTERNAL_SERVER_ERROR, Json(report))
    } else {
        (StatusCode::OK, Json(report))
    }
}
