//! Policy configuration record
//!
//! One `PolicyConfig` is stored per project and optionally per repository.
//! Every field is optional so that a repository record can leave a field
//! unset and inherit it from its project.

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::policy::patterns;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyConfig {
    #[serde(default)]
    pub required_reviews: Option<i64>,
    #[serde(default)]
    pub required_reviewers: Option<Vec<String>>,
    #[serde(default)]
    pub required_reviewer_groups: Option<Vec<String>>,
    #[serde(default)]
    pub default_reviewers: Option<Vec<String>>,
    #[serde(default)]
    pub default_reviewer_groups: Option<Vec<String>>,
    #[serde(default)]
    pub excluded_users: Option<Vec<String>>,
    #[serde(default)]
    pub excluded_groups: Option<Vec<String>>,
    #[serde(default)]
    pub blocked_commits: Option<Vec<String>>,
    #[serde(default, rename = "blockedPRs")]
    pub blocked_prs: Option<Vec<String>>,
    #[serde(default, rename = "automergePRs")]
    pub automerge_prs: Option<Vec<String>>,
    #[serde(default, rename = "automergePRsFrom")]
    pub automerge_prs_from: Option<Vec<String>>,
    #[serde(default)]
    pub auto_unapprove: Option<bool>,
    #[serde(default)]
    pub block_by_required_reviewer: Option<bool>,
}

fn list(field: &Option<Vec<String>>) -> &[String] {
    field.as_deref().unwrap_or(&[])
}

impl PolicyConfig {
    pub fn required_reviewers(&self) -> &[String] {
        list(&self.required_reviewers)
    }

    pub fn required_reviewer_groups(&self) -> &[String] {
        list(&self.required_reviewer_groups)
    }

    pub fn default_reviewers(&self) -> &[String] {
        list(&self.default_reviewers)
    }

    pub fn default_reviewer_groups(&self) -> &[String] {
        list(&self.default_reviewer_groups)
    }

    pub fn excluded_users(&self) -> &[String] {
        list(&self.excluded_users)
    }

    pub fn excluded_groups(&self) -> &[String] {
        list(&self.excluded_groups)
    }

    pub fn blocked_commits(&self) -> &[String] {
        list(&self.blocked_commits)
    }

    pub fn blocked_prs(&self) -> &[String] {
        list(&self.blocked_prs)
    }

    pub fn automerge_prs(&self) -> &[String] {
        list(&self.automerge_prs)
    }

    pub fn automerge_prs_from(&self) -> &[String] {
        list(&self.automerge_prs_from)
    }

    pub fn auto_unapprove(&self) -> bool {
        self.auto_unapprove.unwrap_or(false)
    }

    pub fn block_by_required_reviewer(&self) -> bool {
        self.block_by_required_reviewer.unwrap_or(false)
    }

    /// Fill every unset field of `self` from `base`.
    pub fn overlay(self, base: &PolicyConfig) -> PolicyConfig {
        PolicyConfig {
            required_reviews: self.required_reviews.or(base.required_reviews),
            required_reviewers: self
                .required_reviewers
                .or_else(|| base.required_reviewers.clone()),
            required_reviewer_groups: self
                .required_reviewer_groups
                .or_else(|| base.required_reviewer_groups.clone()),
            default_reviewers: self
                .default_reviewers
                .or_else(|| base.default_reviewers.clone()),
            default_reviewer_groups: self
                .default_reviewer_groups
                .or_else(|| base.default_reviewer_groups.clone()),
            excluded_users: self.excluded_users.or_else(|| base.excluded_users.clone()),
            excluded_groups: self.excluded_groups.or_else(|| base.excluded_groups.clone()),
            blocked_commits: self.blocked_commits.or_else(|| base.blocked_commits.clone()),
            blocked_prs: self.blocked_prs.or_else(|| base.blocked_prs.clone()),
            automerge_prs: self.automerge_prs.or_else(|| base.automerge_prs.clone()),
            automerge_prs_from: self
                .automerge_prs_from
                .or_else(|| base.automerge_prs_from.clone()),
            auto_unapprove: self.auto_unapprove.or(base.auto_unapprove),
            block_by_required_reviewer: self
                .block_by_required_reviewer
                .or(base.block_by_required_reviewer),
        }
    }

    /// Drop blank entries from every list field.
    ///
    /// Admin forms submit comma-separated values, so `""` shows up for
    /// empty inputs.
    pub fn normalized(mut self) -> PolicyConfig {
        for field in [
            &mut self.required_reviewers,
            &mut self.required_reviewer_groups,
            &mut self.default_reviewers,
            &mut self.default_reviewer_groups,
            &mut self.excluded_users,
            &mut self.excluded_groups,
            &mut self.blocked_commits,
            &mut self.blocked_prs,
            &mut self.automerge_prs,
            &mut self.automerge_prs_from,
        ] {
            if let Some(values) = field {
                values.retain(|v| !v.trim().is_empty());
                for v in values.iter_mut() {
                    *v = v.trim().to_string();
                }
            }
        }
        self
    }

    /// Reject configurations that can never be satisfied or contain
    /// patterns that do not compile.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let pattern_fields = [
            ("blockedCommits", self.blocked_commits()),
            ("blockedPRs", self.blocked_prs()),
            ("automergePRs", self.automerge_prs()),
            ("automergePRsFrom", self.automerge_prs_from()),
        ];
        for (field, values) in pattern_fields {
            for pattern in values {
                patterns::compile(pattern)
                    .map_err(|e| PolicyError::invalid_pattern(field, pattern, e))?;
            }
        }

        if let Some(required) = self.required_reviews {
            if required < 0 {
                return Err(PolicyError::ValidationError(format!(
                    "Required reviews must not be negative, got {}",
                    required
                )));
            }
            let reviewers = self.required_reviewers().len();
            if required as usize > reviewers && self.required_reviewer_groups().is_empty() {
                return Err(PolicyError::unreachable_review_count(required, reviewers));
            }
        }

        Ok(())
    }
}
