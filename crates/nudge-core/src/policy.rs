//! Policy constants: followup delays and title-overlap matching.
//!
//! These are product decisions, not derived values. They live here so
//! there is exactly one place to change them.

use crate::triage::Urgency;
use chrono::Duration;

/// Hours until the first followup is due, per urgency tier.
pub const FOLLOWUP_DELAY_CRITICAL_HOURS: i64 = 4;
pub const FOLLOWUP_DELAY_HIGH_HOURS: i64 = 24;
pub const FOLLOWUP_DELAY_MEDIUM_HOURS: i64 = 48;
pub const FOLLOWUP_DELAY_LOW_HOURS: i64 = 120;

/// Words at or below this length are ignored when comparing a task
/// summary against tracker issue titles.
pub const MIN_SIGNIFICANT_WORD_LEN: usize = 3;

/// Followup delay for a tier.
pub fn followup_delay(urgency: Urgency) -> Duration {
    let hours = match urgency {
        Urgency::Critical => FOLLOWUP_DELAY_CRITICAL_HOURS,
        Urgency::High => FOLLOWUP_DELAY_HIGH_HOURS,
        Urgency::Medium => FOLLOWUP_DELAY_MEDIUM_HOURS,
        Urgency::Low => FOLLOWUP_DELAY_LOW_HOURS,
    };
    Duration::hours(hours)
}

/// Significant words of a summary: lowercase, longer than
/// [`MIN_SIGNIFICANT_WORD_LEN`] characters.
fn significant_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| w.len() > MIN_SIGNIFICANT_WORD_LEN)
        .collect()
}

/// Whether an existing issue title matches a task summary.
///
/// At least half (rounded up) of the summary's significant words must
/// appear as substrings of the candidate title. Summaries with no
/// significant words never match — creating a duplicate is safer than
/// adopting an arbitrary issue.
pub fn title_matches(summary: &str, candidate_title: &str) -> bool {
    let words = significant_words(summary);
    if words.is_empty() {
        return false;
    }
    let title = candidate_title.to_lowercase();
    let overlap = words.iter().filter(|w| title.contains(w.as_str())).count();
    overlap >= words.len().div_ceil(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_table() {
        assert_eq!(followup_delay(Urgency::Critical), Duration::hours(4));
        assert_eq!(followup_delay(Urgency::High), Duration::hours(24));
        assert_eq!(followup_delay(Urgency::Medium), Duration::hours(48));
        assert_eq!(followup_delay(Urgency::Low), Duration::hours(120));
    }

    #[test]
    fn test_title_matches_reuses_overlapping_issue() {
        // 50%+ of significant words ("send", "report", "finance", "team")
        // appear in the existing title.
        assert!(title_matches(
            "Send Q4 report to finance team",
            "Ship Q4 report to finance"
        ));
    }

    #[test]
    fn test_title_matches_rejects_unrelated_issue() {
        assert!(!title_matches(
            "Send Q4 report to finance team",
            "Rotate production database credentials"
        ));
    }

    #[test]
    fn test_short_words_are_ignored() {
        // "to", "the" are below the significance cutoff; only
        // "send" + "invoice" count, and one of two suffices.
        assert!(title_matches("send the invoice", "Invoice for March"));
    }

    #[test]
    fn test_empty_summary_never_matches() {
        assert!(!title_matches("", "Anything"));
        assert!(!title_matches("a to of it", "a to of it"));
    }
}
