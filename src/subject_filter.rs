//! Subject filter: the last gate before delivery.

use crate::config::SubjectFilterRule;
use crate::transcript::Classification;

/// Returns `true` if any rule matches (and delivery should be dropped).
/// The first matching rule wins, but since rules only gate a boolean
/// outcome here, "any" and "first" are equivalent in effect.
pub fn matches_any(rules: &[SubjectFilterRule], classification: &Classification, branch: Option<&str>, folder: &str) -> bool {
    rules.iter().any(|rule| rule_matches(rule, classification, branch, folder))
}

fn rule_matches(rule: &SubjectFilterRule, classification: &Classification, branch: Option<&str>, folder: &str) -> bool {
    if let Some(ref want) = rule.classification {
        if want != classification.status_key() {
            return false;
        }
    }
    if let Some(ref want) = rule.branch {
        let actual = branch.unwrap_or("");
        if want != actual {
            return false;
        }
    }
    if let Some(ref want) = rule.folder {
        if want != folder {
            return false;
        }
    }
    true
}
