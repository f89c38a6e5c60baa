#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use pr_policy_gate::config::SearchSettings;
use pr_policy_gate::database::Database;
use pr_policy_gate::enforcement::{DecisionLogger, MergeBlocker, PushGate};
use pr_policy_gate::error::PolicyError;
use pr_policy_gate::host::{
    ApprovalTransaction, Commit, ConfigStore, Directory, Mergeability, Page, PageRequest,
    Participant, ParticipantStatus, PullRequest, PullRequestRef, PullRequestService, PushEvent,
    RefChange, Repository, RunAs, User,
};
use pr_policy_gate::policy::{GroupResolver, PolicyConfig};
use pr_policy_gate::webhooks::Reactions;

pub const PROJECT: &str = "PRJ";
pub const REPO: &str = "repo_1";

/// Setup an in-memory SQLite config store for testing
pub async fn setup_test_db() -> Arc<Database> {
    Arc::new(
        Database::new_in_memory()
            .await
            .expect("Failed to create test database"),
    )
}

pub fn strings(values: &[&str]) -> Option<Vec<String>> {
    Some(values.iter().map(|v| v.to_string()).collect())
}

pub fn repository() -> Repository {
    Repository {
        id: 1,
        slug: REPO.to_string(),
        project_key: PROJECT.to_string(),
    }
}

/// Pull request from `feature` into `master` with the given reviewers.
pub fn pull_request(id: i64, author: &str, reviewers: &[(&str, ParticipantStatus)]) -> PullRequest {
    PullRequest {
        id,
        version: 3,
        author: Participant::new(author, ParticipantStatus::Unapproved),
        reviewers: reviewers
            .iter()
            .map(|(name, status)| Participant::new(*name, *status))
            .collect(),
        participants: vec![],
        from_ref: PullRequestRef {
            id: "refs/heads/feature".to_string(),
            latest_commit: format!("head-{}", id),
            repository: repository(),
        },
        to_ref: PullRequestRef {
            id: "refs/heads/master".to_string(),
            latest_commit: "base".to_string(),
            repository: repository(),
        },
    }
}

pub fn push(user: &str, branches: &[&str]) -> PushEvent {
    PushEvent {
        repository: repository(),
        user: user.to_string(),
        ref_changes: branches
            .iter()
            .map(|branch| RefChange {
                ref_id: format!("refs/heads/{}", branch),
                from_hash: "0000".to_string(),
                to_hash: "1111".to_string(),
            })
            .collect(),
    }
}

#[derive(Default)]
pub struct FakeDirectory {
    groups: HashMap<String, Vec<String>>,
    users: HashMap<String, User>,
    lookups: AtomicUsize,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, group: &str, members: &[&str]) -> Self {
        self.groups.insert(
            group.to_string(),
            members.iter().map(|m| m.to_string()).collect(),
        );
        self
    }

    pub fn with_user(mut self, name: &str, display_name: &str) -> Self {
        self.users.insert(
            name.to_string(),
            User {
                name: name.to_string(),
                display_name: Some(display_name.to_string()),
            },
        );
        self
    }

    /// Number of group lookups served so far.
    pub fn group_lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Directory for FakeDirectory {
    async fn group_members(&self, group: &str) -> Result<Option<Vec<String>>, PolicyError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.groups.get(group).cloned())
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>, PolicyError> {
        Ok(self.users.get(username).cloned())
    }
}

/// A withdrawal applied by a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Withdrawal {
    pub run_as: RunAs,
    pub repository_id: i64,
    pub pull_request_id: i64,
}

/// In-memory pull request service recording every privileged call.
#[derive(Default)]
pub struct FakeHost {
    open: Mutex<Vec<PullRequest>>,
    commits: Mutex<HashMap<i64, Vec<String>>>,
    unmergeable: AtomicBool,
    merges: Mutex<Vec<(RunAs, i64)>>,
    withdrawals: Arc<Mutex<Vec<Withdrawal>>>,
    fail_withdrawal_for: Mutex<Option<String>>,
    searches: AtomicUsize,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_open(&self, pr: PullRequest, commits: &[&str]) {
        self.commits
            .lock()
            .unwrap()
            .insert(pr.id, commits.iter().map(|c| c.to_string()).collect());
        self.open.lock().unwrap().push(pr);
    }

    pub fn set_mergeable(&self, mergeable: bool) {
        self.unmergeable.store(!mergeable, Ordering::SeqCst);
    }

    /// Make staging a withdrawal for `username` fail.
    pub fn fail_withdrawal_for(&self, username: &str) {
        *self.fail_withdrawal_for.lock().unwrap() = Some(username.to_string());
    }

    pub fn merges(&self) -> Vec<(RunAs, i64)> {
        self.merges.lock().unwrap().clone()
    }

    pub fn withdrawals(&self) -> Vec<Withdrawal> {
        self.withdrawals.lock().unwrap().clone()
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PullRequestService for FakeHost {
    async fn search_open(&self, page: PageRequest) -> Result<Page<PullRequest>, PolicyError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let open = self.open.lock().unwrap();
        let values = open
            .iter()
            .skip(page.start)
            .take(page.limit)
            .cloned()
            .collect();
        Ok(Page::new(page.start, values))
    }

    async fn commits(
        &self,
        _repository_id: i64,
        pull_request_id: i64,
        page: PageRequest,
    ) -> Result<Page<Commit>, PolicyError> {
        let commits = self.commits.lock().unwrap();
        let values = commits
            .get(&pull_request_id)
            .into_iter()
            .flatten()
            .skip(page.start)
            .take(page.limit)
            .map(|id| Commit { id: id.clone() })
            .collect();
        Ok(Page::new(page.start, values))
    }

    async fn can_merge(
        &self,
        _repository_id: i64,
        _pull_request_id: i64,
    ) -> Result<Mergeability, PolicyError> {
        let can_merge = !self.unmergeable.load(Ordering::SeqCst);
        Ok(Mergeability {
            can_merge,
            conflicted: !can_merge,
            vetoes: vec![],
        })
    }

    async fn merge(&self, run_as: &RunAs, pull_request: &PullRequest) -> Result<(), PolicyError> {
        self.merges
            .lock()
            .unwrap()
            .push((run_as.clone(), pull_request.id));
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn ApprovalTransaction>, PolicyError> {
        Ok(Box::new(FakeTransaction {
            staged: Vec::new(),
            applied: self.withdrawals.clone(),
            fail_for: self.fail_withdrawal_for.lock().unwrap().clone(),
        }))
    }
}

struct FakeTransaction {
    staged: Vec<Withdrawal>,
    applied: Arc<Mutex<Vec<Withdrawal>>>,
    fail_for: Option<String>,
}

#[async_trait]
impl ApprovalTransaction for FakeTransaction {
    async fn withdraw_approval(
        &mut self,
        run_as: &RunAs,
        repository_id: i64,
        pull_request_id: i64,
    ) -> Result<(), PolicyError> {
        if let RunAs::Impersonating { username, .. } = run_as {
            if self.fail_for.as_deref() == Some(username.as_str()) {
                return Err(PolicyError::HostError(format!(
                    "Cannot withdraw approval of {}",
                    username
                )));
            }
        }
        self.staged.push(Withdrawal {
            run_as: run_as.clone(),
            repository_id,
            pull_request_id,
        });
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), PolicyError> {
        self.applied.lock().unwrap().extend(self.staged);
        Ok(())
    }
}

/// Gates and reactions wired against the fakes.
pub struct Harness {
    pub configs: Arc<Database>,
    pub directory: Arc<FakeDirectory>,
    pub host: Arc<FakeHost>,
    pub push_gate: PushGate,
    pub merge_blocker: Arc<MergeBlocker>,
    pub reactions: Arc<Reactions>,
}

impl Harness {
    pub async fn new(directory: FakeDirectory) -> Self {
        Self::with_search(
            directory,
            SearchSettings {
                pull_request_page_size: 10,
                commit_page_size: 100,
            },
        )
        .await
    }

    pub async fn with_search(directory: FakeDirectory, search: SearchSettings) -> Self {
        let configs = setup_test_db().await;
        let directory = Arc::new(directory);
        let host = Arc::new(FakeHost::new());
        let groups = GroupResolver::new(directory.clone());

        let push_gate = PushGate::new(configs.clone(), groups.clone(), DecisionLogger::disabled());
        let merge_blocker = Arc::new(MergeBlocker::new(
            configs.clone(),
            groups,
            host.clone(),
            DecisionLogger::disabled(),
        ));
        let reactions = Arc::new(Reactions::new(
            configs.clone(),
            host.clone(),
            merge_blocker.clone(),
            search,
            DecisionLogger::disabled(),
        ));

        Self {
            configs,
            directory,
            host,
            push_gate,
            merge_blocker,
            reactions,
        }
    }

    pub async fn set_repo_config(&self, config: PolicyConfig) {
        self.configs
            .set_config_for_repo(PROJECT, REPO, &config)
            .await
            .expect("Failed to store repository config");
    }

    pub async fn set_project_config(&self, config: PolicyConfig) {
        self.configs
            .set_config_for_project(PROJECT, &config)
            .await
            .expect("Failed to store project config");
    }
}
