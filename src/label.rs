//! Deterministic pronounceable session-label generation.
//!
//! A fixed 64-entry syllable table, three syllables selected from
//! non-overlapping bytes of the session id's SHA-256 digest. Small fixed
//! lookup tables keyed by index are used elsewhere in this codebase for
//! the same reason: deterministic, allocation-free, and trivially
//! testable.

use sha2::{Digest, Sha256};

const SYLLABLES: [&str; 64] = [
    "kel", "tam", "dor", "fen", "lir", "mos", "nav", "pex", "rin", "sol", "tiv", "vok", "wex",
    "yun", "zar", "ack", "bix", "cor", "dax", "ekl", "fol", "gev", "hux", "inz", "jor", "kux",
    "lem", "miv", "nol", "opx", "pav", "quin", "rex", "sib", "tol", "unx", "vel", "wun", "xiv",
    "yol", "zem", "arn", "bol", "cez", "dun", "erv", "fim", "gol", "hex", "iv", "jax", "kon",
    "luv", "mex", "niv", "orb", "piv", "quel", "rov", "siv", "tux", "unv", "vix", "wol",
];

/// Compute a deterministic, pronounceable label for `session_id`. The
/// same id always produces the same label; short or empty ids (fewer
/// than 4 bytes) produce the literal `"unknown"`.
pub fn session_label(session_id: &str) -> String {
    if session_id.trim().len() < 4 {
        return "unknown".to_string();
    }
    let digest = Sha256::digest(session_id.as_bytes());
    let a = digest[0] as usize % SYLLABLES.len();
    let b = digest[1] as usize % SYLLABLES.len();
    let c = digest[2] as usize % SYLLABLES.len();
    format!("{}{}{}", SYLLABLES[a], SYLLABLES[b], SYLLABLES[c])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_session_id_same_label() {
        assert_eq!(session_label("session-abc-123"), session_label("session-abc-123"));
    }

    #[test]
    fn test_different_session_ids_usually_differ() {
        assert_ne!(session_label("session-abc-123"), session_label("session-xyz-789"));
    }

    #[test]
    fn test_short_id_is_unknown() {
        assert_eq!(session_label(""), "unknown");
        assert_eq!(session_label("ab"), "unknown");
    }
}
