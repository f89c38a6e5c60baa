//! Event dispatch
//!
//! Handlers are registered by name against an `EventKind`; dispatch runs
//! every handler registered for the event's kind, in registration order.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::PolicyError;
use crate::webhooks::events::{EventKind, PullRequestEvent};
use crate::webhooks::handlers::{
    BuildStatusHandler, ParticipantStatusHandler, RescopeHandler, RetargetHandler,
};
use crate::webhooks::reactions::{ReactionOutcome, Reactions};

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &PullRequestEvent) -> Result<ReactionOutcome, PolicyError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct HandlerReport {
    pub handler: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ReactionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub kind: EventKind,
    pub handlers: Vec<HandlerReport>,
}

impl DispatchReport {
    pub fn has_failures(&self) -> bool {
        self.handlers.iter().any(|h| h.error.is_some())
    }
}

#[derive(Default)]
pub struct ReactionController {
    handlers: HashMap<EventKind, Vec<Arc<dyn EventHandler>>>,
}

impl ReactionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller wired with the standard reactions: unapprove on rescope
    /// and retarget, automerge on reviewer status change and build status.
    pub fn with_default_handlers(reactions: Arc<Reactions>) -> Self {
        let mut controller = Self::new();
        controller
            .register(
                EventKind::Rescoped,
                Arc::new(RescopeHandler::new(reactions.clone())),
            )
            .register(
                EventKind::Updated,
                Arc::new(RetargetHandler::new(reactions.clone())),
            )
            .register(
                EventKind::ParticipantStatusUpdated,
                Arc::new(ParticipantStatusHandler::new(reactions.clone())),
            )
            .register(
                EventKind::BuildStatusSet,
                Arc::new(BuildStatusHandler::new(reactions)),
            );
        controller
    }

    pub fn register(&mut self, kind: EventKind, handler: Arc<dyn EventHandler>) -> &mut Self {
        debug!("Registering handler {} for {:?} events", handler.name(), kind);
        self.handlers.entry(kind).or_default().push(handler);
        self
    }

    pub fn handler_names(&self, kind: EventKind) -> Vec<&'static str> {
        self.handlers
            .get(&kind)
            .map(|handlers| handlers.iter().map(|h| h.name()).collect())
            .unwrap_or_default()
    }

    /// Run each handler for the event.
    ///
    /// A failing handler does not stop the ones after it; failures are
    /// reported back so the host can surface them.
    pub async fn dispatch(&self, event: &PullRequestEvent) -> DispatchReport {
        let kind = event.kind();
        let mut reports = Vec::new();

        for handler in self.handlers.get(&kind).into_iter().flatten() {
            let report = match handler.handle(event).await {
                Ok(outcome) => {
                    info!("{} handled {:?} event: {:?}", handler.name(), kind, outcome);
                    HandlerReport {
                        handler: handler.name(),
                        outcome: Some(outcome),
                        error: None,
                    }
                }
                Err(e) => {
                    error!("{} failed on {:?} event: {}", handler.name(), kind, e);
                    HandlerReport {
                        handler: handler.name(),
                        outcome: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            reports.push(report);
        }

        if reports.is_empty() {
            debug!("No handlers registered for {:?} events", kind);
        }

        DispatchReport {
            kind,
            handlers: reports,
        }
    }
}
