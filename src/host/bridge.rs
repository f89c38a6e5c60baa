//! HTTP client for the host-side bridge plugin
//!
//! The bridge plugin runs inside the source-control host and exposes the
//! directory and pull request primitives the engine needs under
//! `/bridge/1.0`. Run-as capabilities are forwarded as request headers and
//! the host applies them to that single request only.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::PolicyError;
use crate::host::{
    ApprovalTransaction, Commit, Directory, Mergeability, Page, PageRequest, PullRequest,
    PullRequestService, RunAs, User,
};

pub const RUN_AS_USER_HEADER: &str = "X-Run-As-User";
pub const RUN_AS_PERMISSION_HEADER: &str = "X-Run-As-Permission";
pub const RUN_AS_REASON_HEADER: &str = "X-Run-As-Reason";

#[derive(Clone)]
pub struct HostBridge {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HostBridge {
    pub fn new(base_url: &str, api_token: Option<String>) -> Result<Self, PolicyError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| PolicyError::ConfigError(format!("Invalid host URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(PolicyError::ConfigError(format!(
                "Host URL '{}' cannot be used as a base URL",
                base_url
            )));
        }

        Ok(Self {
            client: Client::new(),
            base_url,
            api_token,
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["bridge", "1.0"]).extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn ensure_success(response: Response) -> Result<Response, PolicyError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().clone();
        let body = response.text().await.unwrap_or_default();
        Err(PolicyError::HostError(format!(
            "{} returned {}: {}",
            url.path(),
            status,
            body
        )))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, PolicyError> {
        let response = self.request(Method::GET, url).send().await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.json().await?)
    }

    async fn get_optional<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, PolicyError> {
        let response = self.request(Method::GET, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::ensure_success(response).await?;
        Ok(Some(response.json().await?))
    }

    fn with_run_as(builder: RequestBuilder, run_as: &RunAs) -> RequestBuilder {
        let builder = match run_as {
            RunAs::Elevated { permission, .. } => {
                builder.header(RUN_AS_PERMISSION_HEADER, permission.as_str())
            }
            RunAs::Impersonating { username, .. } => builder.header(RUN_AS_USER_HEADER, username),
        };
        builder.header(RUN_AS_REASON_HEADER, run_as.reason())
    }

    fn pull_request_url(&self, repository_id: i64, pull_request_id: i64, tail: &str) -> Url {
        self.url(&[
            "repositories",
            &repository_id.to_string(),
            "pull-requests",
            &pull_request_id.to_string(),
            tail,
        ])
    }
}

fn with_page(mut url: Url, page: PageRequest) -> Url {
    url.query_pairs_mut()
        .append_pair("start", &page.start.to_string())
        .append_pair("limit", &page.limit.to_string());
    url
}

#[async_trait]
impl Directory for HostBridge {
    async fn group_members(&self, group: &str) -> Result<Option<Vec<String>>, PolicyError> {
        self.get_optional(self.url(&["groups", group, "members"])).await
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>, PolicyError> {
        self.get_optional(self.url(&["users", username])).await
    }
}

#[async_trait]
impl PullRequestService for HostBridge {
    async fn search_open(&self, page: PageRequest) -> Result<Page<PullRequest>, PolicyError> {
        let mut url = with_page(self.url(&["pull-requests"]), page);
        url.query_pairs_mut().append_pair("state", "OPEN");
        self.get_json(url).await
    }

    async fn commits(
        &self,
        repository_id: i64,
        pull_request_id: i64,
        page: PageRequest,
    ) -> Result<Page<Commit>, PolicyError> {
        let url = with_page(
            self.pull_request_url(repository_id, pull_request_id, "commits"),
            page,
        );
        self.get_json(url).await
    }

    async fn can_merge(
        &self,
        repository_id: i64,
        pull_request_id: i64,
    ) -> Result<Mergeability, PolicyError> {
        self.get_json(self.pull_request_url(repository_id, pull_request_id, "merge"))
            .await
    }

    async fn merge(&self, run_as: &RunAs, pull_request: &PullRequest) -> Result<(), PolicyError> {
        let mut url = self.pull_request_url(pull_request.repository().id, pull_request.id, "merge");
        url.query_pairs_mut()
            .append_pair("version", &pull_request.version.to_string());

        let response = Self::with_run_as(self.request(Method::POST, url), run_as)
            .send()
            .await?;
        Self::ensure_success(response)
            .await
            .map_err(|e| PolicyError::MergeError(e.to_string()))?;
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn ApprovalTransaction>, PolicyError> {
        Ok(Box::new(BridgeTransaction {
            bridge: self.clone(),
            withdrawals: Vec::new(),
        }))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Withdrawal {
    repository_id: i64,
    pull_request_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    run_as_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    run_as_permission: Option<&'static str>,
    reason: String,
}

#[derive(Serialize)]
struct WithdrawalBatch<'a> {
    withdrawals: &'a [Withdrawal],
}

/// Stages withdrawals locally and submits them as one batch the host
/// applies atomically.
struct BridgeTransaction {
    bridge: HostBridge,
    withdrawals: Vec<Withdrawal>,
}

#[async_trait]
impl ApprovalTransaction for BridgeTransaction {
    async fn withdraw_approval(
        &mut self,
        run_as: &RunAs,
        repository_id: i64,
        pull_request_id: i64,
    ) -> Result<(), PolicyError> {
        let (run_as_user, run_as_permission) = match run_as {
            RunAs::Impersonating { username, .. } => (Some(username.clone()), None),
            RunAs::Elevated { permission, .. } => (None, Some(permission.as_str())),
        };
        self.withdrawals.push(Withdrawal {
            repository_id,
            pull_request_id,
            run_as_user,
            run_as_permission,
            reason: run_as.reason().to_string(),
        });
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), PolicyError> {
        if self.withdrawals.is_empty() {
            return Ok(());
        }
        debug!("Submitting {} approval withdrawals", self.withdrawals.len());

        let url = self.bridge.url(&["approvals", "withdraw"]);
        let response = self
            .bridge
            .request(Method::POST, url)
            .json(&WithdrawalBatch {
                withdrawals: &self.withdrawals,
            })
            .send()
            .await?;
        HostBridge::ensure_success(response).await?;
        Ok(())
    }
}
