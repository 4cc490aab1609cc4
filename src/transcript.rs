//! Transcript data model.
//!
//! # Architecture overview
//!
//! The hook host writes one JSON object per line to an append-only log for
//! each session. This module defines the normalized shape of one line (a
//! [`TranscriptEntry`]) and the polymorphic content it carries.
//!
//! # TRADE-OFFS
//!
//! - `ContentBlock` is a tagged enum rather than a map of arbitrary fields,
//!   so the analyzer can match exhaustively instead of probing fields at
//!   runtime.
//! - A message's `content` field is either a bare string or an array of
//!   blocks on the wire. Rather than model that as `serde(untagged)` on
//!   `ContentBlock` itself, [`MessageContent`] tries the structured decode
//!   first and falls back to a single synthetic `Text` block, so downstream
//!   code only ever deals with `Vec<ContentBlock>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Speaker role within a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A typed unit of message content.
///
/// WHY: tool_use and tool_result are cross-referenced by id elsewhere
/// (the analyzer pairs them up when it needs before/after context), so
/// both carry their ids even though the analyzer mostly only needs
/// `ToolUse`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: serde_json::Value,
    },
}

impl ContentBlock {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn as_tool_use(&self) -> Option<(&str, &serde_json::Value)> {
        match self {
            ContentBlock::ToolUse { name, input, .. } => Some((name, input)),
            _ => None,
        }
    }
}

/// The message body of a transcript entry.
///
/// WHY: modeled as a plain struct (not `#[serde(untagged)]` on the enum)
/// because the `content` field needs its own two-phase decode, not a
/// field-by-field untagged guess — see [`MessageContent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub model: Option<String>,
    pub content: MessageContent,
}

/// Polymorphic message content: either a bare string or a list of blocks.
///
/// Deserialization tries the structured (array-of-blocks) form first and
/// falls back to treating the raw value as plain text, wrapping it in a
/// single `Text` block. Exactly one representation survives past decode —
/// callers only ever see `blocks()`.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct MessageContent {
    blocks: Vec<ContentBlock>,
}

impl MessageContent {
    pub fn blocks(&self) -> &[ContentBlock] {
        &self.blocks
    }

    pub fn first_is_text(&self) -> bool {
        matches!(self.blocks.first(), Some(ContentBlock::Text { .. }))
    }

    /// Concatenate every text block's contents with a space separator.
    pub fn concat_text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl<'de> Deserialize<'de> for MessageContent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        if let serde_json::Value::String(text) = &value {
            return Ok(MessageContent {
                blocks: vec![ContentBlock::Text { text: text.clone() }],
            });
        }
        let blocks: Vec<ContentBlock> =
            serde_json::from_value(value).map_err(serde::de::Error::custom)?;
        Ok(MessageContent { blocks })
    }
}

/// One line of the assistant transcript log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(rename = "parentUuid", default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub message: Option<Message>,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "isApiErrorMessage", default)]
    pub is_api_error: bool,
    #[serde(rename = "errorCategory", default)]
    pub error_category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    User,
    Assistant,
    System,
}

impl TranscriptEntry {
    pub fn is_user(&self) -> bool {
        self.kind == EntryKind::User
    }

    pub fn is_assistant(&self) -> bool {
        self.kind == EntryKind::Assistant
    }

    /// Whether this entry's message opens with user-authored text: a bare
    /// string, or an array whose first block is `Text`.
    pub fn carries_user_text(&self) -> bool {
        self.message
            .as_ref()
            .map(|m| m.content.first_is_text())
            .unwrap_or(false)
    }

    pub fn concat_assistant_text(&self) -> String {
        self.message
            .as_ref()
            .map(|m| m.content.concat_text())
            .unwrap_or_default()
    }

    pub fn tool_uses(&self) -> Vec<(&str, &serde_json::Value)> {
        self.message
            .as_ref()
            .map(|m| {
                m.content
                    .blocks()
                    .iter()
                    .filter_map(ContentBlock::as_tool_use)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Classification sub-kind for API errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    AuthFailed,
    Overloaded,
    Generic,
}

impl ApiErrorKind {
    pub fn from_category(category: Option<&str>) -> Self {
        match category {
            Some("authentication_failed") => ApiErrorKind::AuthFailed,
            Some("overloaded_error") => ApiErrorKind::Overloaded,
            _ => ApiErrorKind::Generic,
        }
    }
}

/// The sum-typed outcome of the analyzer's classification pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    TaskComplete,
    ReviewComplete,
    Question,
    PlanReady,
    SessionLimitReached,
    ApiError(ApiErrorKind),
    Unknown,
}

impl Classification {
    /// The stable config key used to look up per-status settings.
    pub fn status_key(&self) -> &'static str {
        match self {
            Classification::TaskComplete => "task_complete",
            Classification::ReviewComplete => "review_complete",
            Classification::Question => "question",
            Classification::PlanReady => "plan_ready",
            Classification::SessionLimitReached => "session_limit_reached",
            Classification::ApiError(_) => "api_error",
            Classification::Unknown => "unknown",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Classification::Unknown)
    }
}

/// Tool categories referenced by the analyzer.
pub const ACTIVE_TOOLS: &[&str] =
    &["Write", "Edit", "Bash", "NotebookEdit", "SlashCommand", "KillShell"];
pub const PASSIVE_TOOLS: &[&str] =
    &["Read", "Grep", "Glob", "WebFetch", "WebSearch", "Task"];

pub fn is_active_tool(name: &str) -> bool {
    ACTIVE_TOOLS.contains(&name)
}

pub fn is_passive_tool(name: &str) -> bool {
    PASSIVE_TOOLS.contains(&name)
}
