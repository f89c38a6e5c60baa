//! Host collaborator interfaces
//!
//! Everything the policy engine needs from the source-control host is
//! reached through the traits in this module: configuration storage, the
//! user directory and the pull request service.

pub mod bridge;
pub mod paging;
pub mod types;

use async_trait::async_trait;

use crate::error::PolicyError;
use crate::policy::PolicyConfig;

pub use paging::PageCursor;
pub use types::*;

/// Persistent storage for policy configuration.
///
/// Lookups for keys that were never written return the permissive default
/// configuration rather than an error.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Effective configuration of a repository, inheriting unset fields
    /// from its project.
    async fn config_for_repo(
        &self,
        project_key: &str,
        repo_slug: &str,
    ) -> Result<PolicyConfig, PolicyError>;

    /// Configuration stored for the repository itself, without inheritance.
    async fn stored_repo_config(
        &self,
        project_key: &str,
        repo_slug: &str,
    ) -> Result<PolicyConfig, PolicyError>;

    async fn config_for_project(&self, project_key: &str) -> Result<PolicyConfig, PolicyError>;

    /// Store a repository record. Review counts are validated against the
    /// effective configuration the record produces.
    async fn set_config_for_repo(
        &self,
        project_key: &str,
        repo_slug: &str,
        config: &PolicyConfig,
    ) -> Result<(), PolicyError>;

    /// Store a project record. Rejected if any repository inheriting from
    /// it would end up with an invalid effective configuration.
    async fn set_config_for_project(
        &self,
        project_key: &str,
        config: &PolicyConfig,
    ) -> Result<(), PolicyError>;
}

/// User and group lookups.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Usernames of the members of `group`, `None` if the group is unknown.
    async fn group_members(&self, group: &str) -> Result<Option<Vec<String>>, PolicyError>;

    /// The user with the given username, `None` if unknown.
    async fn find_user(&self, username: &str) -> Result<Option<User>, PolicyError>;
}

/// Pull request operations offered by the host.
#[async_trait]
pub trait PullRequestService: Send + Sync {
    async fn search_open(&self, page: PageRequest) -> Result<Page<PullRequest>, PolicyError>;

    async fn commits(
        &self,
        repository_id: i64,
        pull_request_id: i64,
        page: PageRequest,
    ) -> Result<Page<Commit>, PolicyError>;

    async fn can_merge(
        &self,
        repository_id: i64,
        pull_request_id: i64,
    ) -> Result<Mergeability, PolicyError>;

    async fn merge(&self, run_as: &RunAs, pull_request: &PullRequest) -> Result<(), PolicyError>;

    /// Open a transaction in which approval withdrawals are staged.
    async fn begin(&self) -> Result<Box<dyn ApprovalTransaction>, PolicyError>;
}

/// Approval withdrawals applied all together on `commit`.
///
/// Dropping the transaction without committing discards every staged
/// withdrawal.
#[async_trait]
pub trait ApprovalTransaction: Send {
    async fn withdraw_approval(
        &mut self,
        run_as: &RunAs,
        repository_id: i64,
        pull_request_id: i64,
    ) -> Result<(), PolicyError>;

    async fn commit(self: Box<Self>) -> Result<(), PolicyError>;
}
