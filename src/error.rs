use thiserror::Error;

impl From<serde_json::Error> for PolicyError {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigError(format!("JSON serialization error: {}", err))
    }
}

impl From<sqlx::Error> for PolicyError {
    fn from(err: sqlx::Error) -> Self {
        Self::DatabaseError(format!("Database error: {}", err))
    }
}

impl From<reqwest::Error> for PolicyError {
    fn from(err: reqwest::Error) -> Self {
        Self::HostError(format!("Host request failed: {}", err))
    }
}

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Host error: {0}")]
    HostError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Merge failed: {0}")]
    MergeError(String),

    #[error("Event processing error: {0}")]
    WebhookError(String),
}

impl PolicyError {
    pub fn invalid_pattern(field: &str, pattern: &str, reason: impl std::fmt::Display) -> Self {
        Self::ValidationError(format!(
            "Invalid branch pattern '{}' in {}: {}",
            pattern, field, reason
        ))
    }

    pub fn unreachable_review_count(required_reviews: i64, reviewers: usize) -> Self {
        Self::ValidationError(format!(
            "Required reviews ({}) exceed the number of required reviewers ({}); \
             pull requests would be impossible to merge",
            required_reviews, reviewers
        ))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_))
    }
}
