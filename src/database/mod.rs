pub mod models;

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::error::PolicyError;
use crate::host::ConfigStore;
use crate::policy::PolicyConfig;

use models::PolicyConfigRecord;

pub const POLICY_CONFIG_SCHEMA: &str = include_str!("../../migrations/001_policy_config.sql");

/// Key used for project-level rows.
const PROJECT_SCOPE: &str = "";

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Ok(Database { pool })
    }

    /// Single-connection in-memory database with the schema applied.
    pub async fn new_in_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let database = Database { pool };
        database.run_migrations().await?;
        Ok(database)
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(POLICY_CONFIG_SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    async fn load(&self, project_key: &str, scope: &str) -> Result<Option<PolicyConfig>, PolicyError> {
        let raw = sqlx::query_scalar::<_, String>(
            "SELECT config FROM policy_configs WHERE project_key = ? AND repo_slug = ?",
        )
        .bind(project_key)
        .bind(scope)
        .fetch_optional(&self.pool)
        .await?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => {
                debug!("No stored policy for {}/{}", project_key, scope);
                Ok(None)
            }
        }
    }

    /// Stored repository records of a project, keyed by repo slug.
    async fn repo_records(&self, project_key: &str) -> Result<Vec<(String, PolicyConfig)>, PolicyError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT repo_slug, config FROM policy_configs WHERE project_key = ? AND repo_slug <> ?",
        )
        .bind(project_key)
        .bind(PROJECT_SCOPE)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(slug, raw)| -> Result<(String, PolicyConfig), PolicyError> {
                Ok((slug, serde_json::from_str(&raw)?))
            })
            .collect()
    }

    async fn store(&self, project_key: &str, scope: &str, config: &PolicyConfig) -> Result<(), PolicyError> {
        sqlx::query(
            r#"
            INSERT INTO policy_configs (project_key, repo_slug, config, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (project_key, repo_slug) DO UPDATE SET
                config = excluded.config,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(project_key)
        .bind(scope)
        .bind(serde_json::to_string(config)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_configs(&self) -> Result<Vec<PolicyConfigRecord>, PolicyError> {
        let rows = sqlx::query_as::<_, (String, String, String, String)>(
            r#"
            SELECT project_key, repo_slug, config, updated_at
            FROM policy_configs
            ORDER BY project_key, repo_slug
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(project_key, repo_slug, config, updated_at)| -> Result<PolicyConfigRecord, PolicyError> {
                let updated_at = DateTime::parse_from_rfc3339(&updated_at)
                    .map_err(|e| {
                        PolicyError::DatabaseError(format!("Invalid timestamp '{}': {}", updated_at, e))
                    })?
                    .with_timezone(&Utc);
                Ok(PolicyConfigRecord {
                    project_key,
                    repo_slug: Some(repo_slug).filter(|slug| !slug.is_empty()),
                    config: serde_json::from_str(&config)?,
                    updated_at,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ConfigStore for Database {
    async fn config_for_repo(
        &self,
        project_key: &str,
        repo_slug: &str,
    ) -> Result<PolicyConfig, PolicyError> {
        let project = self.load(project_key, PROJECT_SCOPE).await?.unwrap_or_default();
        let repo = self.load(project_key, repo_slug).await?.unwrap_or_default();
        Ok(repo.overlay(&project))
    }

    async fn stored_repo_config(
        &self,
        project_key: &str,
        repo_slug: &str,
    ) -> Result<PolicyConfig, PolicyError> {
        Ok(self.load(project_key, repo_slug).await?.unwrap_or_default())
    }

    async fn config_for_project(&self, project_key: &str) -> Result<PolicyConfig, PolicyError> {
        Ok(self
            .load(project_key, PROJECT_SCOPE)
            .await?
            .unwrap_or_default())
    }

    async fn set_config_for_repo(
        &self,
        project_key: &str,
        repo_slug: &str,
        config: &PolicyConfig,
    ) -> Result<(), PolicyError> {
        if repo_slug.is_empty() {
            return Err(PolicyError::ValidationError(
                "Repository slug must not be empty".to_string(),
            ));
        }
        let config = config.clone().normalized();
        let project = self.config_for_project(project_key).await?;
        // Counts are checked against what the gates will read, so a repo can
        // take its reviewers from the project.
        config.clone().overlay(&project).validate()?;

        self.store(project_key, repo_slug, &config).await
    }

    async fn set_config_for_project(
        &self,
        project_key: &str,
        config: &PolicyConfig,
    ) -> Result<(), PolicyError> {
        let config = config.clone().normalized();
        config.validate()?;

        for (slug, repo) in self.repo_records(project_key).await? {
            repo.overlay(&config).validate().map_err(|e| match e {
                PolicyError::ValidationError(reason) => PolicyError::ValidationError(format!(
                    "Repository {}/{} would inherit an invalid policy: {}",
                    project_key, slug, reason
                )),
                other => other,
            })?;
        }

        self.store(project_key, PROJECT_SCOPE, &config).await
    }
}
