//! Git branch resolution used by the summary generator's session label and
//! the subject filter's branch rule.
//!
//! Shells out to `git` with stdout/stderr suppressed and degrades
//! gracefully on any failure — no commit/push functionality here, just
//! read-only branch lookup.

use std::path::Path;
use std::process::Command;

/// Resolve the current branch name for `cwd`, or `None` if `cwd` is not
/// inside a git repository, has no branch (detached HEAD), or `git` is
/// unavailable. Never fails the caller.
pub fn resolve_git_branch(cwd: &str) -> Option<String> {
    if cwd.is_empty() {
        return None;
    }
    let output = Command::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .current_dir(Path::new(cwd))
        .stderr(std::process::Stdio::null())
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if branch.is_empty() || branch == "HEAD" {
        None
    } else {
        Some(branch)
    }
}
