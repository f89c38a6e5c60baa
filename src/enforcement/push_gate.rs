use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::enforcement::decision_log::{DecisionLogger, DecisionRecord, GateKind};
use crate::enforcement::{Decision, Rejection};
use crate::error::PolicyError;
use crate::host::{ConfigStore, PushEvent};
use crate::policy::patterns::{format_branch_name, matches};
use crate::policy::{GroupResolver, PolicyConfig};

/// Rejects direct pushes to protected branches.
pub struct PushGate {
    configs: Arc<dyn ConfigStore>,
    groups: GroupResolver,
    decisions: DecisionLogger,
}

impl PushGate {
    pub fn new(configs: Arc<dyn ConfigStore>, groups: GroupResolver, decisions: DecisionLogger) -> Self {
        Self {
            configs,
            groups,
            decisions,
        }
    }

    pub async fn evaluate(&self, push: &PushEvent) -> Result<Decision, PolicyError> {
        let repository = &push.repository;
        let config = self
            .configs
            .config_for_repo(&repository.project_key, &repository.slug)
            .await?;

        Ok(self.evaluate_with(&config, push).await)
    }

    /// Evaluate ref changes in order; the first rejected branch decides
    /// the whole push and later ref changes are not inspected.
    pub async fn evaluate_with(&self, config: &PolicyConfig, push: &PushEvent) -> Decision {
        let mut excluded: Option<HashSet<String>> = None;

        for change in &push.ref_changes {
            let branch = format_branch_name(&change.ref_id);
            if !matches(config.blocked_commits(), branch) {
                debug!("Push to {} is not restricted", branch);
                continue;
            }

            if excluded.is_none() {
                excluded = Some(self.excluded_users(config).await);
            }
            if excluded.as_ref().is_some_and(|users| users.contains(&push.user)) {
                debug!("{} is excluded from push restrictions on {}", push.user, branch);
                continue;
            }

            info!("Rejecting direct push by {} to {}", push.user, branch);
            let decision = Decision::Deny(Rejection::Push {
                message: rejection_message(branch),
            });
            self.record(push, branch, &decision);
            return decision;
        }

        let subject = push
            .ref_changes
            .iter()
            .map(|change| format_branch_name(&change.ref_id))
            .collect::<Vec<_>>()
            .join(",");
        self.record(push, &subject, &Decision::Allow);
        Decision::Allow
    }

    /// Configured excluded users plus members of excluded groups.
    async fn excluded_users(&self, config: &PolicyConfig) -> HashSet<String> {
        let mut excluded: HashSet<String> = config.excluded_users().iter().cloned().collect();
        excluded.extend(self.groups.dereference_groups(config.excluded_groups()).await);
        excluded
    }

    fn record(&self, push: &PushEvent, subject: &str, decision: &Decision) {
        let outcome = if decision.is_allowed() { "ALLOW" } else { "DENY" };
        self.decisions.record(DecisionRecord::new(
            GateKind::Push,
            &push.repository.project_key,
            &push.repository.slug,
            subject,
            outcome,
            decision.reason(),
        ));
    }
}

pub fn rejection_message(branch: &str) -> String {
    format!(
        "\n\
         ******************************\n\
         *    !! Commit Rejected !!   *\n\
         ******************************\n\n\
         Direct commits are not allowed\n\
         to branch [{}].\n\n",
        branch
    )
}
