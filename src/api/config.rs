use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::info;

use crate::api::{ApiError, AppState};
use crate::policy::PolicyConfig;

/// The record stored for the repository. Fields it leaves unset stay
/// `null` so that writing the response back keeps inheriting them.
pub async fn get_repo_config(
    State(state): State<AppState>,
    Path((project, repo)): Path<(String, String)>,
) -> Result<Json<PolicyConfig>, ApiError> {
    Ok(Json(state.configs.stored_repo_config(&project, &repo).await?))
}

/// The repository record laid over its project record, as the gates see it.
pub async fn get_effective_repo_config(
    State(state): State<AppState>,
    Path((project, repo)): Path<(String, String)>,
) -> Result<Json<PolicyConfig>, ApiError> {
    Ok(Json(state.configs.config_for_repo(&project, &repo).await?))
}

pub async fn get_project_config(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> Result<Json<PolicyConfig>, ApiError> {
    Ok(Json(state.configs.config_for_project(&project).await?))
}

pub async fn put_repo_config(
    State(state): State<AppState>,
    Path((project, repo)): Path<(String, String)>,
    Json(config): Json<PolicyConfig>,
) -> Result<StatusCode, ApiError> {
    state
        .configs
        .set_config_for_repo(&project, &repo, &config)
        .await?;
    info!("Updated policy configuration for {}/{}", project, repo);
    Ok(StatusCode::OK)
}

pub async fn put_project_config(
    State(state): State<AppState>,
    Path(project): Path<String>,
    Json(config): Json<PolicyConfig>,
) -> Result<StatusCode, ApiError> {
    state.configs.set_config_for_project(&project, &config).await?;
    info!("Updated policy configuration for project {}", project);
    Ok(StatusCode::OK)
}
