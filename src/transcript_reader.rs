//! Tolerant reader for the append-only JSON-lines transcript.
//!
//! WHY: the transcript may be appended to concurrently by the host while
//! this process reads it. Reading is a single pass to EOF (a snapshot);
//! lines that fail to decode — a half-written line at the tail is the
//! common case — are skipped rather than treated as fatal.

use std::io::BufRead;
use std::path::Path;

use crate::error::HookError;
use crate::transcript::TranscriptEntry;

/// Read and parse every decodable line of the transcript at `path`.
///
/// A missing file is treated as an empty transcript (recoverable, not
/// fatal): callers see `Ok(vec![])`, not an IO error, so the pipeline can
/// still dispatch pre-tool-use events that never touch the transcript at
/// all.
pub fn read_transcript(path: &Path) -> Result<Vec<TranscriptEntry>, HookError> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let reader = std::io::BufReader::new(file);
    Ok(parse_lines(reader.lines().map_while(Result::ok)))
}

/// Parse transcript entries from an arbitrary line iterator (used for the
/// stdin-driven tests and any future stdin transcript mode).
pub fn parse_lines<I: Iterator<Item = String>>(lines: I) -> Vec<TranscriptEntry> {
    let mut entries = Vec::new();
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<TranscriptEntry>(trimmed) {
            Ok(entry) => entries.push(entry),
            Err(_) => continue,
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(kind: &str, ts: &str, content: &str) -> String {
        format!(
            r#"{{"type":"{kind}","timestamp":"{ts}","message":{{"role":"{kind}","content":{content}}}}}"#
        )
    }

    #[test]
    fn test_skips_malformed_lines() {
        let lines = vec![
            line("user", "2026-01-01T00:00:00Z", r#""hi""#),
            "not json at all".to_string(),
            line("assistant", "2026-01-01T00:00:01Z", r#""hello""#),
        ];
        let entries = parse_lines(lines.into_iter());
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_missing_file_is_empty_not_error() {
        let entries = read_transcript(Path::new("/nonexistent/path/transcript.jsonl")).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_blank_lines_skipped() {
        let lines = vec![
            "".to_string(),
            "   ".to_string(),
            line("user", "2026-01-01T00:00:00Z", r#""hi""#),
        ];
        assert_eq!(parse_lines(lines.into_iter()).len(), 1);
    }
}
