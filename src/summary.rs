//! Summary generator: the short, user-facing message.

use chrono::Utc;

use crate::git;
use crate::label::session_label;
use crate::markdown::strip_markdown;
use crate::transcript::{Classification, TranscriptEntry};

const MAX_LEN: usize = 200;

pub struct SummaryInput<'a> {
    pub classification: &'a Classification,
    /// The current response window (not just the 15-entry recent window —
    /// the action counter and several extraction rules look further back).
    pub window: &'a [TranscriptEntry],
    pub cwd: &'a str,
    pub session_id: &'a str,
}

pub fn generate_summary(input: &SummaryInput) -> String {
    let seed = extract_seed(input.classification, input.window);
    let stripped = strip_markdown(&seed);

    let label = session_label(input.session_id);
    let branch = git::resolve_git_branch(input.cwd).unwrap_or_default();
    let folder = folder_name(input.cwd);
    let prefix = format!("[{label}|{branch} {folder}]");

    let suffix = action_counter(input.window);

    let body = if suffix.is_empty() {
        format!("{prefix} {stripped}")
    } else {
        format!("{prefix} {stripped} {suffix}")
    };

    truncate(body.trim(), MAX_LEN).to_string()
}

fn folder_name(cwd: &str) -> String {
    std::path::Path::new(cwd)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn extract_seed(classification: &Classification, window: &[TranscriptEntry]) -> String {
    match classification {
        Classification::Question => extract_question(window),
        Classification::PlanReady => extract_plan(window),
        Classification::TaskComplete | Classification::ReviewComplete => last_assistant_text(window),
        Classification::ApiError(_) | Classification::SessionLimitReached => {
            last_error_text(window).unwrap_or_else(|| default_status_message(classification))
        }
        Classification::Unknown => String::new(),
    }
}

fn extract_question(window: &[TranscriptEntry]) -> String {
    let last_ts = window.last().map(|e| e.timestamp);
    let tail_start = window.len().saturating_sub(10);
    let tail = &window[tail_start..];

    for entry in tail.iter().rev() {
        for (name, tool_input) in entry.tool_uses() {
            if name != "AskUserQuestion" {
                continue;
            }
            if let Some(last_ts) = last_ts {
                let delta = (last_ts - entry.timestamp).num_seconds().abs();
                if delta > 60 {
                    continue;
                }
            }
            if let Some(question) = tool_input.get("question").and_then(|v| v.as_str()) {
                return question.to_string();
            }
        }
    }

    // Fall back to the first sentence of the last assistant text
    // containing '?', then to the first sentence of the last assistant
    // text at all.
    let last_text = last_assistant_text(window);
    if last_text.contains('?') {
        if let Some(sentence) = first_sentence_containing(&last_text, '?') {
            return sentence;
        }
    }
    first_sentence(&last_text)
}

fn extract_plan(window: &[TranscriptEntry]) -> String {
    for entry in window.iter().rev() {
        for (name, tool_input) in entry.tool_uses() {
            if name != "ExitPlanMode" {
                continue;
            }
            if let Some(plan) = tool_input.get("plan").and_then(|v| v.as_str()) {
                if let Some(line) = plan.lines().find(|l| !l.trim().is_empty()) {
                    return line.trim().to_string();
                }
            }
        }
    }
    String::new()
}

fn last_assistant_text(window: &[TranscriptEntry]) -> String {
    window
        .iter()
        .rev()
        .map(|e| e.concat_assistant_text())
        .find(|t| !t.trim().is_empty())
        .unwrap_or_default()
}

fn last_error_text(window: &[TranscriptEntry]) -> Option<String> {
    window
        .iter()
        .rev()
        .find(|e| e.is_api_error)
        .map(|e| e.concat_assistant_text())
        .filter(|t| !t.trim().is_empty())
}

fn default_status_message(classification: &Classification) -> String {
    match classification {
        Classification::SessionLimitReached => "Session limit reached.".to_string(),
        Classification::ApiError(_) => "An API error occurred.".to_string(),
        _ => String::new(),
    }
}

fn first_sentence_containing(text: &str, marker: char) -> Option<String> {
    text.split_inclusive(['.', '?', '!'])
        .find(|s| s.contains(marker))
        .map(|s| s.trim().to_string())
}

fn first_sentence(text: &str) -> String {
    text.split_inclusive(['.', '?', '!'])
        .next()
        .unwrap_or(text)
        .trim()
        .to_string()
}

/// Count Write/Edit/Bash tool_uses and the time delta between the
/// window's first and last entry. Returns an empty string when the
/// window is empty or has no such tool calls and no measurable duration.
fn action_counter(window: &[TranscriptEntry]) -> String {
    let mut writes = 0u32;
    let mut edits = 0u32;
    let mut bashes = 0u32;
    for entry in window {
        for (name, _) in entry.tool_uses() {
            match name {
                "Write" => writes += 1,
                "Edit" => edits += 1,
                "Bash" => bashes += 1,
                _ => {}
            }
        }
    }

    let duration = match (window.first(), window.last()) {
        (Some(first), Some(last)) if window.len() > 1 => {
            Some((last.timestamp - first.timestamp).num_seconds().max(0))
        }
        _ => None,
    };

    let mut parts = Vec::new();
    if writes > 0 {
        parts.push(format!("\u{1f4dd}{writes}"));
    }
    if edits > 0 {
        parts.push(format!("\u{270f}\u{fe0f}{edits}"));
    }
    if bashes > 0 {
        parts.push(format!("\u{25b6}\u{fe0f}{bashes}"));
    }
    if let Some(secs) = duration {
        if secs > 0 {
            parts.push(format!("\u{23f1}\u{fe0f}{secs}s"));
        }
    }

    parts.join(" ")
}

/// Truncate to at most `max` bytes without splitting a UTF-8 codepoint.
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{EntryKind, Message, MessageContent, Role};
    use chrono::TimeZone;

    fn ts(seconds: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).single().unwrap()
    }

    fn text_content(text: &str) -> MessageContent {
        serde_json::from_value(serde_json::json!([{"type": "text", "text": text}])).unwrap()
    }

    fn assistant_text(seconds: i64, text: &str) -> TranscriptEntry {
        TranscriptEntry {
            kind: EntryKind::Assistant,
            parent_id: None,
            message: Some(Message { role: Role::Assistant, model: None, content: text_content(text) }),
            timestamp: ts(seconds),
            is_api_error: false,
            error_category: None,
        }
    }

    fn assistant_tool(seconds: i64, name: &str, input: serde_json::Value) -> TranscriptEntry {
        let content: MessageContent = serde_json::from_value(serde_json::json!([
            {"type": "tool_use", "id": "t1", "name": name, "input": input}
        ]))
        .unwrap();
        TranscriptEntry {
            kind: EntryKind::Assistant,
            parent_id: None,
            message: Some(Message { role: Role::Assistant, model: None, content }),
            timestamp: ts(seconds),
            is_api_error: false,
            error_category: None,
        }
    }

    #[test]
    fn test_extract_question_from_tool_input() {
        let window = vec![assistant_tool(
            0,
            "AskUserQuestion",
            serde_json::json!({"question": "Use tabs or spaces?"}),
        )];
        assert_eq!(extract_question(&window), "Use tabs or spaces?");
    }

    #[test]
    fn test_extract_plan_first_nonempty_line() {
        let window = vec![assistant_tool(
            0,
            "ExitPlanMode",
            serde_json::json!({"plan": "\n\nStep 1: do the thing\nStep 2: done"}),
        )];
        assert_eq!(extract_plan(&window), "Step 1: do the thing");
    }

    #[test]
    fn test_action_counter_counts_and_duration() {
        let window = vec![
            assistant_tool(0, "Write", serde_json::json!({})),
            assistant_tool(10, "Edit", serde_json::json!({})),
            assistant_tool(20, "Edit", serde_json::json!({})),
            assistant_tool(45, "Bash", serde_json::json!({})),
        ];
        let counter = action_counter(&window);
        assert!(counter.contains("1"));
        assert!(counter.contains("45s"));
    }

    #[test]
    fn test_truncate_respects_utf8_boundaries() {
        let s = "a".repeat(199) + "é"; // é is 2 bytes, pushes past 200
        let t = truncate(&s, 200);
        assert!(t.len() <= 200);
        assert!(std::str::from_utf8(t.as_bytes()).is_ok());
    }

    #[test]
    fn test_generate_summary_caps_at_200_chars() {
        let long_text = "word ".repeat(100);
        let window = vec![assistant_text(0, &long_text)];
        let input = SummaryInput {
            classification: &Classification::TaskComplete,
            window: &window,
            cwd: "/tmp/project",
            session_id: "session-abcdef",
        };
        let summary = generate_summary(&input);
        assert!(summary.len() <= 200);
    }

    #[test]
    fn test_generate_summary_includes_label_prefix() {
        let window = vec![assistant_text(0, "All done")];
        let input = SummaryInput {
            classification: &Classification::TaskComplete,
            window: &window,
            cwd: "/tmp/my-project",
            session_id: "session-abcdef",
        };
        let summary = generate_summary(&input);
        assert!(summary.starts_with('['));
        assert!(summary.contains("my-project"));
    }
}
