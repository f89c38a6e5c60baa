use serde::{Deserialize, Serialize};
use std::env;

use crate::error::PolicyError;

/// Default number of open pull requests fetched per search page.
pub const DEFAULT_PR_PAGE_SIZE: usize = 10;

/// Default upper bound on commits fetched per pull request page.
pub const DEFAULT_COMMIT_PAGE_SIZE: usize = 1_048_576;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host_base_url: String,
    pub host_api_token: Option<String>,
    pub server_host: String,
    pub server_port: u16,
    pub search: SearchSettings,
    pub decisions: DecisionLogSettings,
}

/// Paging bounds used when locating a pull request by commit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchSettings {
    pub pull_request_page_size: usize,
    pub commit_page_size: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            pull_request_page_size: DEFAULT_PR_PAGE_SIZE,
            commit_page_size: DEFAULT_COMMIT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionLogSettings {
    pub enabled: bool,
    pub log_path: Option<String>,
}

impl Default for DecisionLogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            log_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, PolicyError> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://policy-gate.db".to_string());

        let host_base_url = env::var("HOST_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:7990".to_string());

        let host_api_token = env::var("HOST_API_TOKEN").ok().filter(|t| !t.is_empty());

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let server_port = parse_var("SERVER_PORT", 3000u16)?;

        let search = SearchSettings {
            pull_request_page_size: parse_var("PR_SEARCH_PAGE_SIZE", DEFAULT_PR_PAGE_SIZE)?,
            commit_page_size: parse_var("COMMIT_PAGE_SIZE", DEFAULT_COMMIT_PAGE_SIZE)?,
        };
        if search.pull_request_page_size == 0 || search.commit_page_size == 0 {
            return Err(PolicyError::ConfigError(
                "Page sizes must be greater than zero".to_string(),
            ));
        }

        let decisions = DecisionLogSettings {
            enabled: parse_var("LOG_DECISIONS", true)?,
            log_path: env::var("DECISION_LOG_PATH").ok().filter(|p| !p.is_empty()),
        };

        Ok(AppConfig {
            database_url,
            host_base_url,
            host_api_token,
            server_host,
            server_port,
            search,
            decisions,
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T, PolicyError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| PolicyError::ConfigError(format!("Invalid {}='{}': {}", name, raw, e))),
        Err(_) => Ok(default),
    }
}
