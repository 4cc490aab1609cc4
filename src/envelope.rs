//! Envelope parsing and event dispatch.

use std::path::Path;

use crate::config::Config;
use crate::error::HookError;
use crate::transcript::Classification;

/// The stdin JSON envelope. Unknown fields are ignored; missing non-
/// critical fields default to empty strings rather than failing parse —
/// only malformed JSON itself is a parse failure.
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    pub session_id: String,
    pub transcript_path: String,
    pub cwd: String,
    pub tool_name: String,
    pub hook_event_name: String,
}

pub fn parse_envelope(bytes: &[u8]) -> Result<Envelope, HookError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| HookError::Envelope(format!("invalid JSON: {e}")))?;

    if !value.is_object() {
        return Err(HookError::Envelope("envelope is not a JSON object".into()));
    }

    let field = |key: &str| -> String {
        value
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    Ok(Envelope {
        session_id: field("session_id"),
        transcript_path: field("transcript_path"),
        cwd: field("cwd"),
        tool_name: field("tool_name"),
        hook_event_name: field("hook_event_name"),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PreToolUse,
    Notification,
    Stop,
    SubagentStop,
}

impl EventKind {
    pub fn parse(raw: &str) -> Result<Self, HookError> {
        match raw {
            "pre-tool-use" => Ok(EventKind::PreToolUse),
            "notification" => Ok(EventKind::Notification),
            "stop" => Ok(EventKind::Stop),
            "subagent-stop" => Ok(EventKind::SubagentStop),
            other => Err(HookError::UnknownEvent(other.to_string())),
        }
    }
}

/// What the dispatcher decided to do with this invocation, before the
/// dedup manager and session state gates run.
pub enum Dispatch {
    /// Drop immediately, no notification, exit 0. The reason is for
    /// debug logging only.
    Drop(&'static str),
    /// Classification already known from the event/tool name alone; the
    /// transcript was never read (pre-tool-use, notification).
    Classified(Classification),
    /// Classification requires running the analyzer over the transcript
    /// (stop, subagent-stop).
    RunAnalyzer,
}

/// `respect-judge-mode` ambient suppression: checked before any other
/// work, for every event kind.
pub fn is_judge_mode_active(config: &Config) -> bool {
    config.behavior.respect_judge_mode
        && std::env::var("CLAUDE_HOOK_JUDGE_MODE").as_deref() == Ok("true")
}

/// Path-component check for a `/subagents/` segment — matches whole path
/// components, not a raw substring (a project literally named
/// "my-subagents-thing" must not match).
fn transcript_under_subagents(transcript_path: &str) -> bool {
    Path::new(transcript_path)
        .components()
        .any(|c| c.as_os_str() == "subagents")
}

pub fn dispatch(event: EventKind, envelope: &Envelope, config: &Config) -> Dispatch {
    match event {
        EventKind::PreToolUse => match envelope.tool_name.as_str() {
            "ExitPlanMode" => Dispatch::Classified(Classification::PlanReady),
            "AskUserQuestion" => Dispatch::Classified(Classification::Question),
            _ => Dispatch::Drop("pre-tool-use for a non-interactive tool"),
        },
        EventKind::Notification => Dispatch::Classified(Classification::Question),
        EventKind::Stop => Dispatch::RunAnalyzer,
        EventKind::SubagentStop => {
            if !config.behavior.notify_on_subagent {
                return Dispatch::Drop("notify_on_subagent is false");
            }
            if config.behavior.suppress_for_subagent_transcripts
                && transcript_under_subagents(&envelope.transcript_path)
            {
                return Dispatch::Drop("transcript path is under a subagents/ segment");
            }
            Dispatch::RunAnalyzer
        }
    }
}
