//! Cleanup sweep: reaps scratch files older than a bounded age.
//!
//! The scratch directory is flat (all lock and state files live directly
//! under the process-temp directory, never nested), so this walks it with
//! a single non-recursive `read_dir` rather than pulling in a recursive
//! directory-walking dependency for a one-level listing.

use std::time::Duration;

use crate::scratch::scratch_dir;

pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60);

const PREFIXES: &[&str] = &["claude-notification-", "claude-session-state-"];

/// Remove scratch files matching our name patterns whose mtime exceeds
/// `max_age`. Returns the number of files removed. Best-effort: any
/// individual file's metadata or removal failure is skipped, not fatal.
pub fn sweep(max_age: Duration) -> usize {
    let dir = scratch_dir();
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !PREFIXES.iter().any(|p| name.starts_with(p)) {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        let age = std::time::SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age > max_age && std::fs::remove_file(&path).is_ok() {
            removed += 1;
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_skips_fresh_files() {
        let dir = tempfile::tempdir().unwrap();
        let prev = std::env::var("TMPDIR").ok();
        unsafe { std::env::set_var("TMPDIR", dir.path()) };

        std::fs::write(dir.path().join("claude-notification-s1-stop.lock"), b"").unwrap();
        let removed = sweep(Duration::from_secs(60));
        assert_eq!(removed, 0);
        assert!(dir.path().join("claude-notification-s1-stop.lock").exists());

        match prev {
            Some(p) => unsafe { std::env::set_var("TMPDIR", p) },
            None => unsafe { std::env::remove_var("TMPDIR") },
        }
    }

    #[test]
    fn test_sweep_ignores_unrelated_files() {
        let dir = tempfile::tempdir().unwrap();
        let prev = std::env::var("TMPDIR").ok();
        unsafe { std::env::set_var("TMPDIR", dir.path()) };

        std::fs::write(dir.path().join("some-other-file.txt"), b"").unwrap();
        let removed = sweep(Duration::from_secs(0));
        assert_eq!(removed, 0);
        assert!(dir.path().join("some-other-file.txt").exists());

        match prev {
            Some(p) => unsafe { std::env::set_var("TMPDIR", p) },
            None => unsafe { std::env::remove_var("TMPDIR") },
        }
    }
}
