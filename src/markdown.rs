//! Markdown stripping for the summary generator.
//!
//! Stages run in a fixed order, each a single compiled `Regex` built once
//! via `LazyLock` — one dependency, used directly, rather than pulling in
//! a full markdown parser for a one-way plain-text reduction.

use std::sync::LazyLock;

use regex::Regex;

static FENCED_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```[\s\S]*?```").unwrap());
static IMAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]*\)").unwrap());
static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap());
static STRIKETHROUGH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"~~(.+?)~~").unwrap());
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*|__(.+?)__").unwrap());
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*(.+?)\*|_(.+?)_").unwrap());
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]*)`").unwrap());
static HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s*").unwrap());
static BLOCKQUOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^>\s*").unwrap());
static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[\s]*[-*+]\s+").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

fn capture_or_whole<'a>(re: &Regex, input: &'a str) -> String {
    re.replace_all(input, |caps: &regex::Captures| {
        caps.iter()
            .skip(1)
            .flatten()
            .map(|m| m.as_str().to_string())
            .next()
            .unwrap_or_default()
    })
    .into_owned()
}

/// Strip markdown in a fixed stage order, then collapse whitespace and
/// trim. Does not apply the 200-char cap — callers apply
/// that after prefixing/suffixing.
pub fn strip_markdown(input: &str) -> String {
    let text = FENCED_CODE.replace_all(input, "").into_owned();
    let text = capture_or_whole(&IMAGE, &text);
    let text = capture_or_whole(&LINK, &text);
    let text = capture_or_whole(&STRIKETHROUGH, &text);
    let text = capture_or_whole(&BOLD, &text);
    let text = capture_or_whole(&ITALIC, &text);
    let text = capture_or_whole(&INLINE_CODE, &text);
    let text = HEADER.replace_all(&text, "").into_owned();
    let text = BLOCKQUOTE.replace_all(&text, "").into_owned();
    let text = BULLET.replace_all(&text, "").into_owned();
    let text = WHITESPACE.replace_all(&text, " ").into_owned();
    text.trim().to_string()
}
