//! Branch pattern matching

use regex::Regex;
use tracing::warn;

use crate::host::BRANCH_REF_PREFIX;

/// Short branch name of a fully qualified ref id.
pub fn format_branch_name(ref_id: &str) -> &str {
    ref_id.strip_prefix(BRANCH_REF_PREFIX).unwrap_or(ref_id)
}

/// Compile `pattern` so that it must match the whole branch name.
pub fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})$", pattern))
}

/// True if `branch` fully matches any of `patterns`.
pub fn matches(patterns: &[String], branch: &str) -> bool {
    patterns.iter().any(|pattern| match compile(pattern) {
        Ok(re) => re.is_match(branch),
        Err(e) => {
            warn!("Ignoring invalid branch pattern '{}': {}", pattern, e);
            false
        }
    })
}
