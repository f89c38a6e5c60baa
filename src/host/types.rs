use serde::{Deserialize, Serialize};

/// Fully qualified prefix of branch refs.
pub const BRANCH_REF_PREFIX: &str = "refs/heads/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantStatus {
    Approved,
    NeedsWork,
    Unapproved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user: User,
    #[serde(default = "unapproved")]
    pub status: ParticipantStatus,
}

fn unapproved() -> ParticipantStatus {
    ParticipantStatus::Unapproved
}

impl Participant {
    pub fn new(name: impl Into<String>, status: ParticipantStatus) -> Self {
        Self {
            user: User::new(name),
            status,
        }
    }

    pub fn username(&self) -> &str {
        &self.user.name
    }

    pub fn is_approved(&self) -> bool {
        self.status == ParticipantStatus::Approved
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: i64,
    pub slug: String,
    pub project_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestRef {
    /// Fully qualified ref id, e.g. `refs/heads/master`.
    pub id: String,
    pub latest_commit: String,
    pub repository: Repository,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub id: i64,
    #[serde(default)]
    pub version: i32,
    pub author: Participant,
    #[serde(default)]
    pub reviewers: Vec<Participant>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    pub from_ref: PullRequestRef,
    pub to_ref: PullRequestRef,
}

impl PullRequest {
    /// The repository the pull request merges into.
    pub fn repository(&self) -> &Repository {
        &self.to_ref.repository
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefChange {
    pub ref_id: String,
    pub from_hash: String,
    pub to_hash: String,
}

/// A push received by the host, with the identity of the authenticated pusher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushEvent {
    pub repository: Repository,
    pub user: String,
    pub ref_changes: Vec<RefChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub start: usize,
    pub limit: usize,
}

impl PageRequest {
    pub fn new(start: usize, limit: usize) -> Self {
        Self { start, limit }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default)]
    pub start: usize,
    pub values: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(start: usize, values: Vec<T>) -> Self {
        Self { start, values }
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }
}

/// Result of asking the host whether a merge could run right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mergeability {
    pub can_merge: bool,
    #[serde(default)]
    pub conflicted: bool,
    #[serde(default)]
    pub vetoes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    Admin,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Admin => "ADMIN",
        }
    }
}

/// Identity a single host call executes under.
///
/// A `RunAs` is passed to exactly one call and never stored, so the
/// privilege it grants cannot outlive the operation it was created for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunAs {
    Elevated {
        permission: Permission,
        reason: String,
    },
    Impersonating {
        username: String,
        reason: String,
    },
}

impl RunAs {
    pub fn elevated(permission: Permission, reason: impl Into<String>) -> Self {
        RunAs::Elevated {
            permission,
            reason: reason.into(),
        }
    }

    pub fn impersonating(username: impl Into<String>, reason: impl Into<String>) -> Self {
        RunAs::Impersonating {
            username: username.into(),
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            RunAs::Elevated { reason, .. } | RunAs::Impersonating { reason, .. } => reason,
        }
    }
}
