//! Required reviewer satisfaction
//!
//! A pull request is approved when enough required reviewers have approved
//! it and, if the configuration asks for it, no required reviewer has
//! requested changes.

use std::collections::{BTreeSet, HashMap};

use crate::host::{Participant, ParticipantStatus, PullRequest};
use crate::policy::groups::GroupResolver;
use crate::policy::PolicyConfig;

/// Snapshot of one review evaluation, computed from a single group
/// resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewAssessment {
    pub required: BTreeSet<String>,
    pub missing: BTreeSet<String>,
    pub blocking: BTreeSet<String>,
    pub seen: BTreeSet<String>,
    pub required_reviews: Option<i64>,
    pub blocked_by_required_reviewer: bool,
    pub approved: bool,
}

impl ReviewAssessment {
    pub fn from_required(pr: &PullRequest, config: &PolicyConfig, required: BTreeSet<String>) -> Self {
        let reviewers = index_reviewers(pr);

        let missing: BTreeSet<String> = required
            .iter()
            .filter(|req| {
                reviewer_is_missing(reviewers.get(req.as_str()).copied())
                    && !(submitter_is_required_reviewer(pr, req)
                        && exactly_enough_required_reviewers(config))
            })
            .cloned()
            .collect();

        let blocking: BTreeSet<String> = required
            .iter()
            .filter(|req| reviewer_is_blocking(reviewers.get(req.as_str()).copied()))
            .cloned()
            .collect();

        let seen: BTreeSet<String> = required.difference(&missing).cloned().collect();

        let blocked_by_required_reviewer =
            config.block_by_required_reviewer() && !blocking.is_empty();
        let count_met = config
            .required_reviews
            .map_or(true, |needed| seen.len() as i64 >= needed);

        Self {
            required,
            missing,
            blocking,
            seen,
            required_reviews: config.required_reviews,
            blocked_by_required_reviewer,
            approved: count_met && !blocked_by_required_reviewer,
        }
    }
}

pub struct ReviewPolicy<'a> {
    config: &'a PolicyConfig,
    groups: &'a GroupResolver,
}

impl<'a> ReviewPolicy<'a> {
    pub fn new(config: &'a PolicyConfig, groups: &'a GroupResolver) -> Self {
        Self { config, groups }
    }

    /// Explicit required reviewers plus members of required reviewer groups.
    pub async fn required_reviewers(&self) -> BTreeSet<String> {
        let mut required: BTreeSet<String> =
            self.config.required_reviewers().iter().cloned().collect();
        required.extend(
            self.groups
                .dereference_groups(self.config.required_reviewer_groups())
                .await,
        );
        required
    }

    pub async fn assess(&self, pr: &PullRequest) -> ReviewAssessment {
        ReviewAssessment::from_required(pr, self.config, self.required_reviewers().await)
    }

    pub async fn missing_reviewers(&self, pr: &PullRequest) -> BTreeSet<String> {
        self.assess(pr).await.missing
    }

    pub async fn blocked_reviewers(&self, pr: &PullRequest) -> BTreeSet<String> {
        self.assess(pr).await.blocking
    }

    pub async fn seen_reviewers(&self, pr: &PullRequest) -> BTreeSet<String> {
        self.assess(pr).await.seen
    }

    pub async fn is_blocked_by_required_reviewer(&self, pr: &PullRequest) -> bool {
        self.assess(pr).await.blocked_by_required_reviewer
    }

    pub async fn is_approved(&self, pr: &PullRequest) -> bool {
        self.assess(pr).await.approved
    }

    pub async fn missing_reviewer_names(&self, pr: &PullRequest) -> Vec<String> {
        let missing: Vec<String> = self.missing_reviewers(pr).await.into_iter().collect();
        self.groups.dereference_users(&missing).await
    }

    pub async fn blocking_reviewer_names(&self, pr: &PullRequest) -> Vec<String> {
        let blocking: Vec<String> = self.blocked_reviewers(pr).await.into_iter().collect();
        self.groups.dereference_users(&blocking).await
    }
}

fn index_reviewers(pr: &PullRequest) -> HashMap<&str, &Participant> {
    pr.reviewers
        .iter()
        .map(|reviewer| (reviewer.username(), reviewer))
        .collect()
}

fn reviewer_is_missing(reviewer: Option<&Participant>) -> bool {
    reviewer.map_or(true, |r| !r.is_approved())
}

fn reviewer_is_blocking(reviewer: Option<&Participant>) -> bool {
    reviewer.is_some_and(|r| r.status == ParticipantStatus::NeedsWork)
}

fn submitter_is_required_reviewer(pr: &PullRequest, username: &str) -> bool {
    pr.author.username() == username
}

// Counts the explicitly configured reviewers only; group members do not
// take part in the comparison.
fn exactly_enough_required_reviewers(config: &PolicyConfig) -> bool {
    config.required_reviews == Some(config.required_reviewers().len() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{PullRequestRef, Repository};

    fn strings(values: &[&str]) -> Option<Vec<String>> {
        Some(values.iter().map(|v| v.to_string()).collect())
    }

    fn pull_request(author: &str, reviewers: &[(&str, ParticipantStatus)]) -> PullRequest {
        let repository = Repository {
            id: 1,
            slug: "repo_1".to_string(),
            project_key: "PRJ".to_string(),
        };
        PullRequest {
            id: 7,
            version: 0,
            author: Participant::new(author, ParticipantStatus::Unapproved),
            reviewers: reviewers
                .iter()
                .map(|(name, status)| Participant::new(*name, *status))
                .collect(),
            participants: vec![],
            from_ref: PullRequestRef {
                id: "refs/heads/feature".to_string(),
                latest_commit: "abc".to_string(),
                repository: repository.clone(),
            },
            to_ref: PullRequestRef {
                id: "refs/heads/master".to_string(),
                latest_commit: "def".to_string(),
                repository,
            },
        }
    }

    fn assess(pr: &PullRequest, config: &PolicyConfig) -> ReviewAssessment {
        let required = config.required_reviewers().iter().cloned().collect();
        ReviewAssessment::from_required(pr, config, required)
    }

    use ParticipantStatus::*;

    #[test]
    fn test_absent_reviewer_is_missing() {
        let config = PolicyConfig {
            required_reviewers: strings(&["user1"]),
            required_reviews: Some(1),
            ..Default::default()
        };
        let result = assess(&pull_request("author", &[]), &config);
        assert!(result.missing.contains("user1"));
        assert!(!result.approved);
    }

    #[test]
    fn test_absent_and_unapproved_are_equivalent() {
        let config = PolicyConfig {
            required_reviewers: strings(&["user1"]),
            required_reviews: Some(1),
            ..Default::default()
        };
        let absent = assess(&pull_request("author", &[]), &config);
        let unapproved = assess(&pull_request("author", &[("user1", Unapproved)]), &config);
        assert_eq!(absent.missing, unapproved.missing);
        assert_eq!(absent.approved, unapproved.approved);
    }

    #[test]
    fn test_unset_count_approves_regardless_of_reviewers() {
        let config = PolicyConfig {
            required_reviewers: strings(&["user1", "user2"]),
            ..Default::default()
        };
        let result = assess(&pull_request("author", &[("user1", NeedsWork)]), &config);
        assert_eq!(result.missing.len(), 2);
        assert!(result.approved);
    }

    #[test]
    fn test_author_exempt_when_count_equals_reviewers() {
        let config = PolicyConfig {
            required_reviewers: strings(&["user1", "user2"]),
            required_reviews: Some(2),
            ..Default::default()
        };
        let result = assess(&pull_request("user1", &[("user2", Approved)]), &config);
        assert!(!result.missing.contains("user1"));
        assert_eq!(result.seen.len(), 2);
        assert!(result.approved);
    }

    #[test]
    fn test_author_not_exempt_when_count_differs() {
        let config = PolicyConfig {
            required_reviewers: strings(&["user1", "user2"]),
            required_reviews: Some(1),
            ..Default::default()
        };
        let result = assess(&pull_request("user1", &[("user2", Unapproved)]), &config);
        assert!(result.missing.contains("user1"));
        assert!(result.missing.contains("user2"));
        assert!(!result.approved);
    }

    #[test]
    fn test_non_required_reviewers_are_ignored() {
        let config = PolicyConfig {
            required_reviewers: strings(&["user1"]),
            required_reviews: Some(1),
            ..Default::default()
        };
        let result = assess(
            &pull_request("author", &[("user3", Approved), ("user1", Unapproved)]),
            &config,
        );
        assert!(!result.seen.contains("user3"));
        assert!(!result.approved);
    }

    #[test]
    fn test_no_required_reviewers_never_meets_count() {
        let config = PolicyConfig {
            required_reviews: Some(1),
            ..Default::default()
        };
        assert!(!assess(&pull_request("author", &[("user1", Approved)]), &config).approved);
    }

    #[test]
    fn test_blocking_reviewer_vetoes_when_enabled() {
        let config = PolicyConfig {
            required_reviewers: strings(&["user1", "user2", "user3"]),
            required_reviews: Some(1),
            block_by_required_reviewer: Some(true),
            ..Default::default()
        };
        let pr = pull_request("user1", &[("user2", NeedsWork), ("user3", Approved)]);
        let result = assess(&pr, &config);
        assert!(result.blocking.contains("user2"));
        assert!(result.blocked_by_required_reviewer);
        assert!(!result.approved);
    }

    #[test]
    fn test_blocking_reviewer_ignored_when_disabled() {
        let config = PolicyConfig {
            required_reviewers: strings(&["user1", "user2", "user3"]),
            required_reviews: Some(1),
            block_by_required_reviewer: Some(false),
            ..Default::default()
        };
        let pr = pull_request("user1", &[("user2", NeedsWork), ("user3", Approved)]);
        let result = assess(&pr, &config);
        assert!(!result.blocked_by_required_reviewer);
        assert!(result.approved);
    }

    #[test]
    fn test_non_required_needs_work_does_not_block() {
        let config = PolicyConfig {
            required_reviewers: strings(&["user1"]),
            required_reviews: Some(1),
            block_by_required_reviewer: Some(true),
            ..Default::default()
        };
        let pr = pull_request("author", &[("user1", Approved), ("user9", NeedsWork)]);
        assert!(assess(&pr, &config).approved);
    }
}
