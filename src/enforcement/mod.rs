pub mod decision_log;
pub mod merge_block;
pub mod push_gate;

use serde::Serialize;

pub use decision_log::DecisionLogger;
pub use merge_block::{AutomergeOutcome, MergeBlocker};
pub use push_gate::PushGate;

/// Outcome of a gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny(Rejection),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    /// Message written to the pusher's error stream.
    Push { message: String },
    /// Merge veto shown on the pull request.
    Veto { summary: String, detail: String },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Decision::Allow => None,
            Decision::Deny(rejection) => Some(rejection),
        }
    }

    pub(crate) fn reason(&self) -> Option<String> {
        self.rejection().map(|rejection| match rejection {
            Rejection::Push { message } => message.trim().to_string(),
            Rejection::Veto { summary, detail } => format!("{}: {}", summary, detail),
        })
    }
}

impl Rejection {
    /// Headline of the rejection: the whole push message, or a veto summary.
    pub fn summary(&self) -> &str {
        match self {
            Rejection::Push { message } => message,
            Rejection::Veto { summary, .. } => summary,
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Rejection::Push { .. } => None,
            Rejection::Veto { detail, .. } => Some(detail),
        }
    }

    /// Single text block for channels that show one message.
    pub fn message(&self) -> String {
        match self.detail() {
            Some(detail) if !detail.is_empty() => format!("{}\n{}", self.summary(), detail),
            _ => self.summary().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_rejection_is_its_message() {
        let rejection = Rejection::Push {
            message: "Direct commits are not allowed".to_string(),
        };
        assert_eq!(rejection.summary(), "Direct commits are not allowed");
        assert_eq!(rejection.detail(), None);
        assert_eq!(rejection.message(), "Direct commits are not allowed");
    }

    #[test]
    fn test_veto_message_joins_summary_and_detail() {
        let rejection = Rejection::Veto {
            summary: "Not enough approved reviews".to_string(),
            detail: "0 of 1 required approvals.".to_string(),
        };
        assert_eq!(rejection.detail(), Some("0 of 1 required approvals."));
        assert_eq!(
            rejection.message(),
            "Not enough approved reviews\n0 of 1 required approvals."
        );
        assert_eq!(
            Decision::Deny(rejection).reason().as_deref(),
            Some("Not enough approved reviews: 0 of 1 required approvals.")
        );
    }

    #[test]
    fn test_allow_has_no_rejection() {
        assert!(Decision::Allow.rejection().is_none());
        assert!(Decision::Allow.reason().is_none());
    }
}
