//! Per-session state manager.
//!
//! One scratch JSON file per session, rewritten whole on every delivery.
//! The rewrite is intentionally non-atomic (no temp-file-then-rename):
//! only the dedup-winner path reaches this code, so there is no
//! concurrent writer to race against.

use serde::{Deserialize, Serialize};

use crate::scratch::session_state_path;
use crate::transcript::Classification;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStateRecord {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub last_notification_epoch: Option<i64>,
    #[serde(default)]
    pub last_classification: Option<String>,
    #[serde(default)]
    pub last_message_normalized: Option<String>,
    #[serde(default)]
    pub last_task_complete_epoch: Option<i64>,
    #[serde(default)]
    pub last_cwd: Option<String>,
}

impl SessionStateRecord {
    pub fn load(session_id: &str) -> Self {
        let path = session_state_path(session_id);
        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|_| Self {
                session_id: session_id.to_string(),
                ..Default::default()
            }),
            Err(_) => Self { session_id: session_id.to_string(), ..Default::default() },
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        let path = session_state_path(&self.session_id);
        let content = serde_json::to_string(self).unwrap_or_default();
        std::fs::write(path, content)
    }
}

/// Trim, drop a single trailing period, and case-fold. Idempotent:
/// normalize(normalize(x)) == normalize(x) — tested below.
pub fn normalize(message: &str) -> String {
    let trimmed = message.trim();
    let without_period = trimmed.strip_suffix('.').unwrap_or(trimmed);
    without_period.to_lowercase()
}

pub fn should_suppress_question(record: &SessionStateRecord, now_epoch: i64, cooldown_secs: u64) -> bool {
    match record.last_task_complete_epoch {
        Some(last) => (now_epoch - last) < cooldown_secs as i64,
        None => false,
    }
}

/// Gate a question on the cooldown since *any* prior notification,
/// independent of its classification. Defaults to 0 (disabled): a
/// `cooldown_secs` of 0 never suppresses, since `(now - last) < 0` is
/// never true.
pub fn should_suppress_any(record: &SessionStateRecord, now_epoch: i64, cooldown_secs: u64) -> bool {
    match record.last_notification_epoch {
        Some(last) => (now_epoch - last) < cooldown_secs as i64,
        None => false,
    }
}

pub fn is_duplicate_message(
    record: &SessionStateRecord,
    message: &str,
    now_epoch: i64,
    window_secs: u64,
) -> bool {
    let (Some(last_epoch), Some(last_message)) =
        (record.last_notification_epoch, record.last_message_normalized.as_deref())
    else {
        return false;
    };
    if (now_epoch - last_epoch) >= window_secs as i64 {
        return false;
    }
    normalize(last_message) == normalize(message)
}

pub fn record_notification(
    record: &mut SessionStateRecord,
    classification: &Classification,
    message: &str,
    cwd: &str,
    now_epoch: i64,
) {
    record.last_notification_epoch = Some(now_epoch);
    record.last_classification = Some(classification.status_key().to_string());
    record.last_message_normalized = Some(normalize(message));
    record.last_cwd = Some(cwd.to_string());
    if matches!(classification, Classification::TaskComplete) {
        record.last_task_complete_epoch = Some(now_epoch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_idempotent() {
        let cases = ["  Hello World.  ", "ALL CAPS", "already.lower", ""];
        for case in cases {
            let once = normalize(case);
            let twice = normalize(&once);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_normalize_drops_trailing_period_and_case_folds() {
        assert_eq!(normalize("  Done.  "), "done");
        assert_eq!(normalize("Done"), "done");
    }

    #[test]
    fn test_cooldown_within_window_suppresses() {
        let record = SessionStateRecord {
            last_task_complete_epoch: Some(100),
            ..Default::default()
        };
        assert!(should_suppress_question(&record, 111, 12));
    }

    #[test]
    fn test_cooldown_at_exact_boundary_permits() {
        let record = SessionStateRecord {
            last_task_complete_epoch: Some(100),
            ..Default::default()
        };
        // at exactly 12s, (now - last) == 12 is NOT < 12, so permitted.
        assert!(!should_suppress_question(&record, 112, 12));
    }

    #[test]
    fn test_suppress_any_disabled_by_default_zero_cooldown() {
        let record = SessionStateRecord {
            last_notification_epoch: Some(100),
            ..Default::default()
        };
        assert!(!should_suppress_any(&record, 100, 0));
    }

    #[test]
    fn test_suppress_any_within_nonzero_cooldown_suppresses() {
        let record = SessionStateRecord {
            last_notification_epoch: Some(100),
            ..Default::default()
        };
        assert!(should_suppress_any(&record, 105, 30));
        assert!(!should_suppress_any(&record, 140, 30));
    }

    #[test]
    fn test_duplicate_message_detection() {
        let record = SessionStateRecord {
            last_notification_epoch: Some(100),
            last_message_normalized: Some(normalize("Build finished.")),
            ..Default::default()
        };
        assert!(is_duplicate_message(&record, "Build finished", 150, 180));
        assert!(!is_duplicate_message(&record, "Build finished", 300, 180));
        assert!(!is_duplicate_message(&record, "Something else", 150, 180));
    }

    #[test]
    fn test_record_notification_sets_task_complete_epoch_only_for_task_complete() {
        let mut record = SessionStateRecord::default();
        record_notification(&mut record, &Classification::Question, "msg", "/tmp", 500);
        assert!(record.last_task_complete_epoch.is_none());

        record_notification(&mut record, &Classification::TaskComplete, "msg", "/tmp", 600);
        assert_eq!(record.last_task_complete_epoch, Some(600));
    }

    #[test]
    fn test_load_missing_file_is_zero_valued() {
        let dir = tempfile::tempdir().unwrap();
        let prev = std::env::var("TMPDIR").ok();
        unsafe { std::env::set_var("TMPDIR", dir.path()) };
        let record = SessionStateRecord::load("never-seen-session");
        assert!(record.last_notification_epoch.is_none());
        match prev {
            Some(p) => unsafe { std::env::set_var("TMPDIR", p) },
            None => unsafe { std::env::remove_var("TMPDIR") },
        }
    }
}
