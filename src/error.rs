/// Crate-wide error type.
///
/// Variants are split into two severities by the caller, not by the type
/// system: `main` treats `Envelope` and `UnknownEvent` as fatal (exit
/// nonzero) and everything else as recoverable (logged, pipeline
/// degrades). See the error handling design notes in DESIGN.md.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed envelope: {0}")]
    Envelope(String),

    #[error("unknown event kind: {0}")]
    UnknownEvent(String),

    #[error("config invalid: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Other(String),
}

impl HookError {
    /// Whether this error is fatal to the invocation (exits nonzero) as
    /// opposed to recoverable (logged, pipeline degrades and continues).
    pub fn is_fatal(&self) -> bool {
        matches!(self, HookError::Envelope(_) | HookError::UnknownEvent(_))
    }
}
