use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PolicyError;
use crate::webhooks::controller::EventHandler;
use crate::webhooks::events::PullRequestEvent;
use crate::webhooks::reactions::{ReactionOutcome, Reactions};

fn unexpected(handler: &str, event: &PullRequestEvent) -> PolicyError {
    PolicyError::WebhookError(format!(
        "{} cannot handle {:?} events",
        handler,
        event.kind()
    ))
}

/// Unapproves when new commits actually changed the source branch head.
pub struct RescopeHandler {
    reactions: Arc<Reactions>,
}

impl RescopeHandler {
    pub fn new(reactions: Arc<Reactions>) -> Self {
        Self { reactions }
    }
}

#[async_trait]
impl EventHandler for RescopeHandler {
    fn name(&self) -> &'static str {
        "unapprove-on-rescope"
    }

    async fn handle(&self, event: &PullRequestEvent) -> Result<ReactionOutcome, PolicyError> {
        let PullRequestEvent::Rescoped(rescoped) = event else {
            return Err(unexpected(self.name(), event));
        };

        if !rescoped.source_commit_changed() {
            return Ok(ReactionOutcome::ignored("source commit unchanged"));
        }
        self.reactions
            .unapprove_pull_request(&rescoped.pull_request)
            .await
    }
}

/// Unapproves when the target branch of a pull request changed.
pub struct RetargetHandler {
    reactions: Arc<Reactions>,
}

impl RetargetHandler {
    pub fn new(reactions: Arc<Reactions>) -> Self {
        Self { reactions }
    }
}

#[async_trait]
impl EventHandler for RetargetHandler {
    fn name(&self) -> &'static str {
        "unapprove-on-retarget"
    }

    async fn handle(&self, event: &PullRequestEvent) -> Result<ReactionOutcome, PolicyError> {
        let PullRequestEvent::Updated(updated) = event else {
            return Err(unexpected(self.name(), event));
        };

        if updated.previous_to_branch.is_none() {
            return Ok(ReactionOutcome::ignored("target branch unchanged"));
        }
        self.reactions
            .unapprove_pull_request(&updated.pull_request)
            .await
    }
}

pub struct ParticipantStatusHandler {
    reactions: Arc<Reactions>,
}

impl ParticipantStatusHandler {
    pub fn new(reactions: Arc<Reactions>) -> Self {
        Self { reactions }
    }
}

#[async_trait]
impl EventHandler for ParticipantStatusHandler {
    fn name(&self) -> &'static str {
        "automerge-on-review"
    }

    async fn handle(&self, event: &PullRequestEvent) -> Result<ReactionOutcome, PolicyError> {
        let PullRequestEvent::ParticipantStatusUpdated(status) = event else {
            return Err(unexpected(self.name(), event));
        };

        self.reactions
            .automerge_pull_request(&status.pull_request)
            .await
    }
}

pub struct BuildStatusHandler {
    reactions: Arc<Reactions>,
}

impl BuildStatusHandler {
    pub fn new(reactions: Arc<Reactions>) -> Self {
        Self { reactions }
    }
}

#[async_trait]
impl EventHandler for BuildStatusHandler {
    fn name(&self) -> &'static str {
        "automerge-on-build"
    }

    async fn handle(&self, event: &PullRequestEvent) -> Result<ReactionOutcome, PolicyError> {
        let PullRequestEvent::BuildStatusSet(build) = event else {
            return Err(unexpected(self.name(), event));
        };

        match self
            .reactions
            .find_pull_request_by_commit(&build.commit_id)
            .await?
        {
            Some(pr) => self.reactions.automerge_pull_request(&pr).await,
            None => Ok(ReactionOutcome::PullRequestNotFound {
                commit_id: build.commit_id.clone(),
            }),
        }
    }
}
