//! Unapprove and automerge reactions
//!
//! Shared by every event handler. Each reaction re-reads configuration and
//! acts on the pull request as the event delivered it.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::SearchSettings;
use crate::enforcement::decision_log::{DecisionLogger, DecisionRecord, GateKind};
use crate::enforcement::{AutomergeOutcome, MergeBlocker};
use crate::error::PolicyError;
use crate::host::{ConfigStore, PageCursor, PullRequest, PullRequestService, RunAs};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reaction", rename_all = "snake_case")]
pub enum ReactionOutcome {
    /// The event did not call for any action.
    Ignored { reason: String },
    UnapproveDisabled,
    Unapproved { withdrawn: usize },
    Automerge { outcome: AutomergeOutcome },
    PullRequestNotFound { commit_id: String },
}

impl ReactionOutcome {
    pub fn ignored(reason: impl Into<String>) -> Self {
        ReactionOutcome::Ignored {
            reason: reason.into(),
        }
    }
}

pub struct Reactions {
    configs: Arc<dyn ConfigStore>,
    pull_requests: Arc<dyn PullRequestService>,
    merges: Arc<MergeBlocker>,
    search: SearchSettings,
    decisions: DecisionLogger,
}

impl Reactions {
    pub fn new(
        configs: Arc<dyn ConfigStore>,
        pull_requests: Arc<dyn PullRequestService>,
        merges: Arc<MergeBlocker>,
        search: SearchSettings,
        decisions: DecisionLogger,
    ) -> Self {
        Self {
            configs,
            pull_requests,
            merges,
            search,
            decisions,
        }
    }

    pub async fn automerge_pull_request(&self, pr: &PullRequest) -> Result<ReactionOutcome, PolicyError> {
        let outcome = self.merges.attempt_automerge(pr).await?;
        Ok(ReactionOutcome::Automerge { outcome })
    }

    /// Withdraw the approval of every reviewer and participant, each as
    /// themselves, in one host transaction.
    ///
    /// Gated by the project-level auto-unapprove flag.
    pub async fn unapprove_pull_request(&self, pr: &PullRequest) -> Result<ReactionOutcome, PolicyError> {
        let repository = pr.repository();
        let config = self.configs.config_for_project(&repository.project_key).await?;
        if !config.auto_unapprove() {
            debug!(
                "Auto-unapprove disabled for project {}, keeping approvals on pull request {}",
                repository.project_key, pr.id
            );
            return Ok(ReactionOutcome::UnapproveDisabled);
        }

        let mut tx = self.pull_requests.begin().await?;
        let mut withdrawn = 0;
        for participant in pr.reviewers.iter().chain(pr.participants.iter()) {
            let run_as = RunAs::impersonating(
                participant.username(),
                "Unapproving pull-request on behalf of user",
            );
            tx.withdraw_approval(&run_as, repository.id, pr.id).await?;
            withdrawn += 1;
        }
        tx.commit().await?;

        info!(
            "Withdrew {} approvals on pull request {} in {}/{}",
            withdrawn, pr.id, repository.project_key, repository.slug
        );
        self.decisions.record(DecisionRecord::new(
            GateKind::Unapprove,
            &repository.project_key,
            &repository.slug,
            pr.id.to_string(),
            "UNAPPROVED",
            Some(format!("{} approvals withdrawn", withdrawn)),
        ));

        Ok(ReactionOutcome::Unapproved { withdrawn })
    }

    /// Linear scan of open pull requests for one whose commits include
    /// `commit_id`.
    ///
    /// Costs one commit listing per open pull request in the worst case.
    pub async fn find_pull_request_by_commit(
        &self,
        commit_id: &str,
    ) -> Result<Option<PullRequest>, PolicyError> {
        let mut open = PageCursor::new(self.search.pull_request_page_size);

        while let Some(request) = open.next_request() {
            let page = self.pull_requests.search_open(request).await?;
            debug!(
                "Scanning {} open pull requests from offset {} for commit {}",
                page.size(),
                request.start,
                commit_id
            );
            open.advance(page.size());

            for pr in page.values {
                if self.contains_commit(&pr, commit_id).await? {
                    return Ok(Some(pr));
                }
            }
        }

        Ok(None)
    }

    async fn contains_commit(&self, pr: &PullRequest, commit_id: &str) -> Result<bool, PolicyError> {
        let repository_id = pr.repository().id;
        let mut commits = PageCursor::new(self.search.commit_page_size);

        while let Some(request) = commits.next_request() {
            let page = self
                .pull_requests
                .commits(repository_id, pr.id, request)
                .await?;
            commits.advance(page.size());

            if page.values.iter().any(|commit| commit.id == commit_id) {
                return Ok(true);
            }
        }

        Ok(false)
    }
}
