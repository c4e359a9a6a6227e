//! Triage verdict types and the followup state machine.

use crate::conversation::UnitKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Urgency tier assigned by the classifier.
///
/// Ordering matters: actionable results are returned sorted by tier
/// (critical first), and the tier drives both tracker priority and the
/// followup delay table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Critical,
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Critical => "critical",
            Urgency::High => "high",
            Urgency::Medium => "medium",
            Urgency::Low => "low",
        }
    }

    /// Sort rank — lower is more urgent.
    pub fn rank(&self) -> u8 {
        match self {
            Urgency::Critical => 0,
            Urgency::High => 1,
            Urgency::Medium => 2,
            Urgency::Low => 3,
        }
    }

    /// Parse a stored tier, defaulting to medium for anything unknown.
    pub fn parse(s: &str) -> Self {
        match s {
            "critical" => Urgency::Critical,
            "high" => Urgency::High,
            "low" => Urgency::Low,
            _ => Urgency::Medium,
        }
    }
}

impl Default for Urgency {
    fn default() -> Self {
        Urgency::Medium
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One conversation unit prepared for the classifier.
#[derive(Debug, Clone, Serialize)]
pub struct UnitForAnalysis {
    pub index: usize,
    #[serde(rename = "type")]
    pub kind: UnitKind,
    pub text: String,
    /// Injected so relative deadlines ("by tomorrow") resolve to
    /// concrete datetimes.
    pub reference_time: DateTime<Utc>,
}

/// Per-unit classifier verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageVerdict {
    pub index: usize,
    pub is_actionable: bool,
    #[serde(default)]
    pub task_summary: Option<String>,
    /// Concrete resolved ISO datetime, never a relative phrase.
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub urgency: Urgency,
    /// Verbatim quote from the conversation text.
    #[serde(default)]
    pub trigger_message: Option<String>,
}

impl TriageVerdict {
    /// Fallback verdict for an index the classifier failed to cover.
    pub fn non_actionable(index: usize) -> Self {
        Self {
            index,
            is_actionable: false,
            task_summary: None,
            deadline: None,
            assignee: None,
            urgency: Urgency::Medium,
            trigger_message: None,
        }
    }
}

/// One actionable unit prepared for nudge drafting.
#[derive(Debug, Clone, Serialize)]
pub struct NudgeRequest {
    pub index: usize,
    pub sender: String,
    pub task: Option<String>,
    pub deadline: Option<String>,
    pub urgency: Urgency,
    pub text: String,
}

/// A drafted nudge for one actionable unit.
#[derive(Debug, Clone, Deserialize)]
pub struct NudgeDraft {
    pub index: usize,
    pub text: String,
}

/// Followup lifecycle state.
///
/// `pending → sent` (reminder dispatched), `pending → resolved` and
/// `sent → resolved` are the only legal transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowupStatus {
    Pending,
    Sent,
    Resolved,
}

impl FollowupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowupStatus::Pending => "pending",
            FollowupStatus::Sent => "sent",
            FollowupStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(FollowupStatus::Pending),
            "sent" => Some(FollowupStatus::Sent),
            "resolved" => Some(FollowupStatus::Resolved),
            _ => None,
        }
    }

    /// Whether moving from `self` to `to` is a legal transition.
    pub fn can_transition(&self, to: FollowupStatus) -> bool {
        matches!(
            (self, to),
            (FollowupStatus::Pending, FollowupStatus::Sent)
                | (FollowupStatus::Pending, FollowupStatus::Resolved)
                | (FollowupStatus::Sent, FollowupStatus::Resolved)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urgency_rank_ordering() {
        assert!(Urgency::Critical.rank() < Urgency::High.rank());
        assert!(Urgency::High.rank() < Urgency::Medium.rank());
        assert!(Urgency::Medium.rank() < Urgency::Low.rank());
    }

    #[test]
    fn test_urgency_parse_defaults_to_medium() {
        assert_eq!(Urgency::parse("critical"), Urgency::Critical);
        assert_eq!(Urgency::parse("nonsense"), Urgency::Medium);
        assert_eq!(Urgency::parse(""), Urgency::Medium);
    }

    #[test]
    fn test_followup_transitions() {
        use FollowupStatus::*;
        assert!(Pending.can_transition(Sent));
        assert!(Pending.can_transition(Resolved));
        assert!(Sent.can_transition(Resolved));
        assert!(!Sent.can_transition(Pending));
        assert!(!Resolved.can_transition(Sent));
        assert!(!Resolved.can_transition(Pending));
        assert!(!Pending.can_transition(Pending));
    }
}
