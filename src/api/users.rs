use std::collections::BTreeSet;

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;

use crate::api::{ApiError, AppState};
use crate::error::PolicyError;
use crate::host::ConfigStore;
use crate::policy::GroupResolver;

/// Reviewer lists a repository's pull requests are evaluated against,
/// reported by display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveReviewers {
    /// The configured count, or `""` when unset.
    pub required_reviews: serde_json::Value,
    pub required_reviewers: Vec<String>,
    pub default_reviewers: Vec<String>,
}

pub async fn effective_reviewers(
    configs: &dyn ConfigStore,
    groups: &GroupResolver,
    project: &str,
    repo: &str,
) -> Result<EffectiveReviewers, PolicyError> {
    let config = configs.config_for_repo(project, repo).await?;

    let required_reviews = match config.required_reviews {
        Some(count) => serde_json::Value::from(count),
        None => serde_json::Value::from(""),
    };

    let required = union(
        config.required_reviewers(),
        groups.dereference_groups(config.required_reviewer_groups()).await,
    );
    let defaults = union(
        config.default_reviewers(),
        groups.dereference_groups(config.default_reviewer_groups()).await,
    );

    Ok(EffectiveReviewers {
        required_reviews,
        required_reviewers: groups.dereference_users(&required).await,
        default_reviewers: groups.dereference_users(&defaults).await,
    })
}

fn union(users: &[String], members: Vec<String>) -> Vec<String> {
    users
        .iter()
        .cloned()
        .chain(members)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub async fn get_effective_reviewers(
    State(state): State<AppState>,
    Path((project, repo)): Path<(String, String)>,
) -> Result<Json<EffectiveReviewers>, ApiError> {
    let report = effective_reviewers(state.configs.as_ref(), &state.groups, &project, &repo).await?;
    Ok(Json(report))
}
