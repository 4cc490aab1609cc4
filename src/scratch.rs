//! Shared scratch-directory helpers used by the dedup manager, session
//! state manager, and cleanup sweep.

use std::path::PathBuf;

/// Encode a session id into a filesystem-safe string: anything other than
/// ASCII alphanumerics, `-`, and `_` is replaced with `_`.
pub fn safe_session_id(session_id: &str) -> String {
    session_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// The process-temp directory, honoring `TMPDIR`/`TMP`/`TEMP` via
/// `std::env::temp_dir()`.
pub fn scratch_dir() -> PathBuf {
    std::env::temp_dir()
}

pub fn event_lock_path(session_id: &str, event: &str) -> PathBuf {
    scratch_dir().join(format!(
        "claude-notification-{}-{}.lock",
        safe_session_id(session_id),
        event
    ))
}

pub fn content_lock_path(session_id: &str, hash: &str) -> PathBuf {
    scratch_dir().join(format!(
        "claude-notification-{}-content-{}.lock",
        safe_session_id(session_id),
        hash
    ))
}

pub fn session_state_path(session_id: &str) -> PathBuf {
    scratch_dir().join(format!("claude-session-state-{}.json", safe_session_id(session_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_session_id_strips_unsafe_chars() {
        assert_eq!(safe_session_id("abc-123_DEF"), "abc-123_DEF");
        assert_eq!(safe_session_id("../../etc/passwd"), "______etc_passwd");
        assert_eq!(safe_session_id("a/b c"), "a_b_c");
    }
}
