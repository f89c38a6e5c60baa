//! Enforcement Decision Logger
//!
//! Records every gate decision and reaction outcome for audit and debugging

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::DecisionLogSettings;
use crate::error::PolicyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    Push,
    Merge,
    Automerge,
    Unapprove,
}

impl GateKind {
    fn label(&self) -> &'static str {
        match self {
            GateKind::Push => "[PUSH]",
            GateKind::Merge => "[MERGE]",
            GateKind::Automerge => "[AUTOMERGE]",
            GateKind::Unapprove => "[UNAPPROVE]",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: Uuid,
    pub gate: GateKind,
    pub project_key: String,
    pub repo_slug: String,
    /// Branch name for pushes, pull request id otherwise.
    pub subject: String,
    pub outcome: String,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn new(
        gate: GateKind,
        project_key: &str,
        repo_slug: &str,
        subject: impl Into<String>,
        outcome: impl Into<String>,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            gate,
            project_key: project_key.to_string(),
            repo_slug: repo_slug.to_string(),
            subject: subject.into(),
            outcome: outcome.into(),
            reason,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecisionLogger {
    enabled: bool,
    log_path: Option<PathBuf>,
}

impl DecisionLogger {
    pub fn new(enabled: bool, log_path: Option<PathBuf>) -> Self {
        Self { enabled, log_path }
    }

    pub fn from_settings(settings: &DecisionLogSettings) -> Self {
        Self::new(settings.enabled, settings.log_path.as_ref().map(PathBuf::from))
    }

    pub fn disabled() -> Self {
        Self::new(false, None)
    }

    pub fn log_decision(&self, record: &DecisionRecord) -> Result<(), PolicyError> {
        if !self.enabled {
            return Ok(());
        }

        info!(
            decision_id = %record.id,
            "{} {} for {}/{} {} {}",
            record.gate.label(),
            record.outcome,
            record.project_key,
            record.repo_slug,
            record.subject,
            record.reason.as_deref().unwrap_or("")
        );

        if let Some(path) = &self.log_path {
            self.log_to_file(record, path)?;
        }

        Ok(())
    }

    /// Log, downgrading write failures to a warning.
    ///
    /// Gates must always answer the host, so audit trouble never changes
    /// a decision.
    pub fn record(&self, record: DecisionRecord) {
        if let Err(e) = self.log_decision(&record) {
            warn!("Failed to write decision {}: {}", record.id, e);
        }
    }

    fn log_to_file(&self, record: &DecisionRecord, path: &PathBuf) -> Result<(), PolicyError> {
        use std::fs::OpenOptions;
        use std::io::Write;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| PolicyError::ConfigError(format!("Failed to open decision log: {}", e)))?;

        let line = serde_json::to_string(record)?;

        writeln!(file, "{}", line)
            .map_err(|e| PolicyError::ConfigError(format!("Failed to write decision log: {}", e)))?;

        Ok(())
    }
}

impl Default for DecisionLogger {
    fn default() -> Self {
        Self::new(true, None)
    }
}
