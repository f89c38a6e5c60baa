use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::enforcement::decision_log::{DecisionLogger, DecisionRecord, GateKind};
use crate::enforcement::{Decision, Rejection};
use crate::error::PolicyError;
use crate::host::{ConfigStore, Permission, PullRequest, PullRequestService, RunAs};
use crate::policy::patterns::{format_branch_name, matches};
use crate::policy::{GroupResolver, PolicyConfig, ReviewAssessment, ReviewPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomergeOutcome {
    /// Neither the target nor the source branch is set up for automerge.
    NotConfigured,
    /// The target branch is merge-blocked.
    TargetBlocked,
    /// The host refused the merge right now (conflicts, vetoes, permissions).
    NotMergeable,
    Merged,
}

impl AutomergeOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            AutomergeOutcome::NotConfigured => "NOT_CONFIGURED",
            AutomergeOutcome::TargetBlocked => "TARGET_BLOCKED",
            AutomergeOutcome::NotMergeable => "NOT_MERGEABLE",
            AutomergeOutcome::Merged => "MERGED",
        }
    }
}

/// Merge check and automerge for pull requests.
pub struct MergeBlocker {
    configs: Arc<dyn ConfigStore>,
    groups: GroupResolver,
    pull_requests: Arc<dyn PullRequestService>,
    decisions: DecisionLogger,
}

impl MergeBlocker {
    pub fn new(
        configs: Arc<dyn ConfigStore>,
        groups: GroupResolver,
        pull_requests: Arc<dyn PullRequestService>,
        decisions: DecisionLogger,
    ) -> Self {
        Self {
            configs,
            groups,
            pull_requests,
            decisions,
        }
    }

    async fn config_for(&self, pr: &PullRequest) -> Result<PolicyConfig, PolicyError> {
        let repository = pr.repository();
        self.configs
            .config_for_repo(&repository.project_key, &repository.slug)
            .await
    }

    pub async fn check(&self, pr: &PullRequest) -> Result<Decision, PolicyError> {
        let config = self.config_for(pr).await?;
        Ok(self.check_with(&config, pr).await)
    }

    pub async fn check_with(&self, config: &PolicyConfig, pr: &PullRequest) -> Decision {
        let to_branch = format_branch_name(&pr.to_ref.id);

        let decision = if matches(config.blocked_prs(), to_branch) {
            Decision::Deny(Rejection::Veto {
                summary: "Pull request merging is blocked".to_string(),
                detail: format!(
                    "Pull requests to branch [{}] are not allowed to be merged.",
                    to_branch
                ),
            })
        } else {
            let assessment = ReviewPolicy::new(config, &self.groups).assess(pr).await;
            if assessment.approved {
                Decision::Allow
            } else {
                Decision::Deny(self.review_veto(&assessment).await)
            }
        };

        let repository = pr.repository();
        self.decisions.record(DecisionRecord::new(
            GateKind::Merge,
            &repository.project_key,
            &repository.slug,
            pr.id.to_string(),
            if decision.is_allowed() { "ALLOW" } else { "DENY" },
            decision.reason(),
        ));

        decision
    }

    async fn review_veto(&self, assessment: &ReviewAssessment) -> Rejection {
        let mut lines = Vec::new();

        if let Some(needed) = assessment.required_reviews {
            if (assessment.seen.len() as i64) < needed {
                lines.push(format!(
                    "{} of {} required approvals.",
                    assessment.seen.len(),
                    needed
                ));
                if !assessment.missing.is_empty() {
                    let missing = self.display_names(&assessment.missing).await;
                    lines.push(format!("Missing reviewers: {}.", missing.join(", ")));
                }
            }
        }

        if assessment.blocked_by_required_reviewer {
            let blocking = self.display_names(&assessment.blocking).await;
            lines.push(format!("Changes requested by: {}.", blocking.join(", ")));
        }

        let summary = if assessment.blocked_by_required_reviewer {
            "Changes requested by a required reviewer"
        } else {
            "Not enough approved reviews"
        };

        Rejection::Veto {
            summary: summary.to_string(),
            detail: lines.join("\n"),
        }
    }

    async fn display_names(&self, usernames: &std::collections::BTreeSet<String>) -> Vec<String> {
        let usernames: Vec<String> = usernames.iter().cloned().collect();
        self.groups.dereference_users(&usernames).await
    }

    /// Merge `pr` on the engine's authority if it qualifies for automerge.
    ///
    /// Merge failures are returned to the caller and never retried here.
    pub async fn attempt_automerge(&self, pr: &PullRequest) -> Result<AutomergeOutcome, PolicyError> {
        let config = self.config_for(pr).await?;
        let to_branch = format_branch_name(&pr.to_ref.id);
        let from_branch = format_branch_name(&pr.from_ref.id);

        let outcome = if !(matches(config.automerge_prs(), to_branch)
            || matches(config.automerge_prs_from(), from_branch))
        {
            AutomergeOutcome::NotConfigured
        } else if matches(config.blocked_prs(), to_branch) {
            AutomergeOutcome::TargetBlocked
        } else {
            let repository = pr.repository();
            let mergeability = self.pull_requests.can_merge(repository.id, pr.id).await?;
            if mergeability.can_merge {
                let run_as = RunAs::elevated(Permission::Admin, "Automerging pull request");
                self.pull_requests.merge(&run_as, pr).await?;
                info!("Automerged pull request {} into {}", pr.id, to_branch);
                AutomergeOutcome::Merged
            } else {
                debug!(
                    "Pull request {} not mergeable yet (conflicted: {}, vetoes: {})",
                    pr.id,
                    mergeability.conflicted,
                    mergeability.vetoes.len()
                );
                AutomergeOutcome::NotMergeable
            }
        };

        let repository = pr.repository();
        self.decisions.record(DecisionRecord::new(
            GateKind::Automerge,
            &repository.project_key,
            &repository.slug,
            pr.id.to_string(),
            outcome.as_str(),
            None,
        ));

        Ok(outcome)
    }
}
