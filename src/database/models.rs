use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::PolicyConfig;

/// A stored configuration row. `repo_slug` is `None` for project-level
/// records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyConfigRecord {
    pub project_key: String,
    pub repo_slug: Option<String>,
    pub config: PolicyConfig,
    pub updated_at: DateTime<Utc>,
}
