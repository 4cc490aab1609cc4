//! Transcript analyzer: the classification state machine.
//!
//! Runs over a transcript snapshot and produces a [`Classification`] plus
//! an optional short message seed the summary generator may use as a
//! starting point. The algorithm is a strict first-match-wins chain —
//! order matters and is tested explicitly below.

use chrono::{DateTime, Utc};

use crate::transcript::{ApiErrorKind, Classification, TranscriptEntry, is_active_tool, is_passive_tool};

/// Bound on the current response window kept for classification. Ghost
/// tool_uses far back in history must not influence the current
/// classification.
const RECENT_WINDOW_SIZE: usize = 15;

/// review-complete requires the concatenated assistant text in the recent
/// window to exceed this many characters. Exactly 200 does not trigger.
const REVIEW_TEXT_THRESHOLD: usize = 200;

/// Case-insensitive substrings that mark an assistant response as having
/// hit a session quota.
const SESSION_LIMIT_SENTINELS: &[&str] = &[
    "session limit reached",
    "you've reached your usage limit",
    "usage limit reached",
    "upgrade to continue",
];

pub struct AnalyzerConfig {
    pub notify_on_text_response: bool,
}

pub struct AnalysisResult {
    pub classification: Classification,
    /// The entries making up the recent window, in order — handed to the
    /// summary generator so it doesn't have to recompute the window.
    pub recent_window: Vec<TranscriptEntry>,
}

/// Compute the current response window: assistant entries strictly after
/// the timestamp of the last entry carrying user-authored text. If no
/// such entry exists, every assistant entry is kept.
fn current_response_window(entries: &[TranscriptEntry]) -> Vec<TranscriptEntry> {
    let user_ts: Option<DateTime<Utc>> = entries
        .iter()
        .filter(|e| e.is_user() && e.carries_user_text())
        .map(|e| e.timestamp)
        .last();

    entries
        .iter()
        .filter(|e| e.is_assistant())
        .filter(|e| user_ts.is_none_or(|ts| e.timestamp > ts))
        .cloned()
        .collect()
}

fn recent_window(window: &[TranscriptEntry]) -> Vec<TranscriptEntry> {
    let start = window.len().saturating_sub(RECENT_WINDOW_SIZE);
    window[start..].to_vec()
}

pub fn analyze(entries: &[TranscriptEntry], config: &AnalyzerConfig) -> AnalysisResult {
    let window = current_response_window(entries);
    let recent = recent_window(&window);

    let classification = classify(&window, &recent, config);

    AnalysisResult {
        classification,
        recent_window: recent,
    }
}

fn classify(
    window: &[TranscriptEntry],
    recent: &[TranscriptEntry],
    config: &AnalyzerConfig,
) -> Classification {
    // Step 3: api-error flag anywhere in the *current response window*
    // (not just the recent window — an error can sit before the 15-entry
    // cutoff and still be the thing that happened).
    if let Some(entry) = window.iter().find(|e| e.is_api_error) {
        let kind = ApiErrorKind::from_category(entry.error_category.as_deref());
        return Classification::ApiError(kind);
    }

    // Step 4: session-quota sentinel, over the recent window's text.
    let concat_text: String = recent
        .iter()
        .map(|e| e.concat_assistant_text())
        .collect::<Vec<_>>()
        .join(" ");
    let lower = concat_text.to_lowercase();
    if SESSION_LIMIT_SENTINELS.iter().any(|s| lower.contains(s)) {
        return Classification::SessionLimitReached;
    }

    // Step 5: tool_use blocks, in order, with their entry position.
    let mut tool_uses: Vec<(usize, &str)> = Vec::new();
    for (pos, entry) in recent.iter().enumerate() {
        for (name, _input) in entry.tool_uses() {
            tool_uses.push((pos, name));
        }
    }

    let exit_plan_pos = tool_uses
        .iter()
        .rposition(|(_, name)| *name == "ExitPlanMode")
        .map(|i| tool_uses[i].0 as i64)
        .unwrap_or(-1);

    // Step 6: last tool_use overall is ExitPlanMode.
    if let Some((_, last_name)) = tool_uses.last() {
        if *last_name == "ExitPlanMode" {
            return Classification::PlanReady;
        }
        // Step 7: last tool_use overall is AskUserQuestion.
        if *last_name == "AskUserQuestion" {
            return Classification::Question;
        }
    }

    // Step 8: an active tool appears strictly after the last ExitPlanMode.
    if exit_plan_pos >= 0
        && tool_uses
            .iter()
            .any(|(pos, name)| *pos as i64 > exit_plan_pos && is_active_tool(name))
    {
        return Classification::TaskComplete;
    }

    // Step 9: any active tool anywhere in the recent window.
    if tool_uses.iter().any(|(_, name)| is_active_tool(name)) {
        return Classification::TaskComplete;
    }

    // Step 10: only passive tools, and assistant text exceeds threshold.
    let has_tool_uses = !tool_uses.is_empty();
    let only_passive = has_tool_uses && tool_uses.iter().all(|(_, name)| is_passive_tool(name));
    if only_passive && concat_text.chars().count() > REVIEW_TEXT_THRESHOLD {
        return Classification::ReviewComplete;
    }

    // Step 11: no tool_use blocks at all.
    if !has_tool_uses {
        return if config.notify_on_text_response {
            Classification::TaskComplete
        } else {
            Classification::Unknown
        };
    }

    // Step 12: fallback.
    Classification::Unknown
}
