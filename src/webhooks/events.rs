use serde::{Deserialize, Serialize};

use crate::host::{Participant, ParticipantStatus, PullRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Rescoped,
    Updated,
    ParticipantStatusUpdated,
    BuildStatusSet,
}

/// New commits were pushed to the source branch of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescopedEvent {
    pub pull_request: PullRequest,
    pub previous_from_hash: String,
    #[serde(default)]
    pub previous_to_hash: Option<String>,
}

impl RescopedEvent {
    pub fn source_commit_changed(&self) -> bool {
        self.previous_from_hash != self.pull_request.from_ref.latest_commit
    }
}

/// Pull request metadata changed; `previous_to_branch` is present only
/// when the target branch was changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedEvent {
    pub pull_request: PullRequest,
    #[serde(default)]
    pub previous_to_branch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantStatusUpdatedEvent {
    pub pull_request: PullRequest,
    pub participant: Participant,
    #[serde(default)]
    pub previous_status: Option<ParticipantStatus>,
}

/// A build result was reported for a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatusSetEvent {
    pub commit_id: String,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PullRequestEvent {
    Rescoped(RescopedEvent),
    Updated(UpdatedEvent),
    ParticipantStatusUpdated(ParticipantStatusUpdatedEvent),
    BuildStatusSet(BuildStatusSetEvent),
}

impl PullRequestEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PullRequestEvent::Rescoped(_) => EventKind::Rescoped,
            PullRequestEvent::Updated(_) => EventKind::Updated,
            PullRequestEvent::ParticipantStatusUpdated(_) => EventKind::ParticipantStatusUpdated,
            PullRequestEvent::BuildStatusSet(_) => EventKind::BuildStatusSet,
        }
    }

    /// Pull request the event is about, if it names one directly.
    pub fn pull_request(&self) -> Option<&PullRequest> {
        match self {
            PullRequestEvent::Rescoped(e) => Some(&e.pull_request),
            PullRequestEvent::Updated(e) => Some(&e.pull_request),
            PullRequestEvent::ParticipantStatusUpdated(e) => Some(&e.pull_request),
            PullRequestEvent::BuildStatusSet(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_status_event_from_json() {
        let event: PullRequestEvent = serde_json::from_value(serde_json::json!({
            "type": "build_status_set",
            "commitId": "abc123",
            "state": "SUCCESSFUL"
        }))
        .unwrap();

        assert_eq!(event.kind(), EventKind::BuildStatusSet);
        assert!(event.pull_request().is_none());
        match event {
            PullRequestEvent::BuildStatusSet(e) => assert_eq!(e.commit_id, "abc123"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_updated_event_without_previous_branch() {
        let event: PullRequestEvent = serde_json::from_value(serde_json::json!({
            "type": "updated",
            "pullRequest": {
                "id": 3,
                "author": {"user": {"name": "author"}, "status": "UNAPPROVED"},
                "fromRef": {
                    "id": "refs/heads/feature",
                    "latestCommit": "aaa",
                    "repository": {"id": 1, "slug": "repo_1", "projectKey": "PRJ"}
                },
                "toRef": {
                    "id": "refs/heads/master",
                    "latestCommit": "bbb",
                    "repository": {"id": 1, "slug": "repo_1", "projectKey": "PRJ"}
                }
            }
        }))
        .unwrap();

        match event {
            PullRequestEvent::Updated(e) => {
                assert_eq!(e.previous_to_branch, None);
                assert!(e.pull_request.reviewers.is_empty());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
