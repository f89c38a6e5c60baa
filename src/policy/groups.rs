//! Group expansion and display-name lookup
//!
//! Lookups never fail: unknown groups expand to nobody and unknown users
//! are reported by their raw username.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;

use crate::host::Directory;

#[derive(Clone)]
pub struct GroupResolver {
    directory: Arc<dyn Directory>,
}

impl GroupResolver {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    /// Members of every group in `groups`, deduplicated, in first-seen order.
    pub async fn dereference_groups(&self, groups: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut members = Vec::new();

        for group in groups {
            let found = match self.directory.group_members(group).await {
                Ok(Some(found)) => found,
                Ok(None) => {
                    warn!("Group '{}' not found in directory", group);
                    Vec::new()
                }
                Err(e) => {
                    warn!("Failed to resolve members of group '{}': {}", group, e);
                    Vec::new()
                }
            };

            for member in found {
                if seen.insert(member.clone()) {
                    members.push(member);
                }
            }
        }

        members
    }

    pub async fn display_name(&self, username: &str) -> String {
        match self.directory.find_user(username).await {
            Ok(Some(user)) => user.display_name.unwrap_or(user.name),
            Ok(None) => username.to_string(),
            Err(e) => {
                warn!("Failed to look up user '{}': {}", username, e);
                username.to_string()
            }
        }
    }

    pub async fn dereference_users(&self, usernames: &[String]) -> Vec<String> {
        let mut names = Vec::with_capacity(usernames.len());
        for username in usernames {
            names.push(self.display_name(username).await);
        }
        names
    }
}
