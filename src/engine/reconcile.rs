//! Tracker reconciliation: search-before-create, so repeated triage
//! runs never mint duplicate external issues.

use super::Engine;
use nudge_core::{
    conversation::ConversationUnit,
    error::NudgeError,
    policy::title_matches,
    traits::{CreatedIssue, NewIssue, Tracker},
    triage::TriageVerdict,
};
use nudge_trackers::WEBHOOK_TASK_ID;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Provenance footer appended to every mirrored issue description.
const ISSUE_FOOTER: &str = "Source: Nudge Engine";

impl Engine {
    /// Mirror each actionable unit into the tracker, reusing a
    /// sufficiently similar existing issue when one exists.
    ///
    /// A per-unit failure is logged and skipped; the other units
    /// proceed. With no usable integration the whole step is skipped.
    pub(crate) async fn reconcile_units(
        &self,
        units: &[ConversationUnit],
        verdicts: &[TriageVerdict],
    ) -> HashMap<usize, CreatedIssue> {
        let mut out = HashMap::new();
        let Some(tracker) = self.tracker.as_deref() else {
            debug!("reconcile: no tracker integration, skipping");
            return out;
        };

        for verdict in verdicts.iter().filter(|v| v.is_actionable) {
            let Some(summary) = verdict.task_summary.as_deref().filter(|s| !s.is_empty()) else {
                continue;
            };
            let Some(unit) = units.get(verdict.index) else {
                continue;
            };
            match reconcile_one(tracker, unit, verdict, summary).await {
                Ok(issue) => {
                    out.insert(verdict.index, issue);
                }
                Err(e) => {
                    warn!("reconcile: unit {} failed: {e}", verdict.index);
                }
            }
        }
        out
    }

    /// Transition a mirrored issue to completed. Failures are
    /// swallowed: resolving locally must always succeed.
    pub(crate) async fn resolve_external(&self, identifier: &str) {
        if identifier == WEBHOOK_TASK_ID {
            debug!("resolve: webhook sentinel, nothing to sync");
            return;
        }
        let Some(tracker) = self.tracker.as_deref() else {
            debug!("resolve: no tracker integration, skipping sync for {identifier}");
            return;
        };
        match tracker.resolve_issue(identifier).await {
            Ok(()) => info!("resolve: tracker issue {identifier} completed"),
            Err(e) => warn!("resolve: tracker sync for {identifier} failed: {e}"),
        }
    }
}

async fn reconcile_one(
    tracker: &dyn Tracker,
    unit: &ConversationUnit,
    verdict: &TriageVerdict,
    summary: &str,
) -> Result<CreatedIssue, NudgeError> {
    let candidates = tracker.search_issues(summary).await?;
    if let Some(existing) = candidates.iter().find(|c| title_matches(summary, &c.title)) {
        info!(
            "reconcile: reusing {} issue {} for \"{summary}\"",
            tracker.name(),
            existing.identifier
        );
        return Ok(CreatedIssue {
            identifier: existing.identifier.clone(),
            url: existing.url.clone(),
        });
    }

    let issue = NewIssue {
        title: summary.to_string(),
        description: build_description(unit, verdict),
        priority: verdict.urgency,
    };
    let created = tracker.create_issue(&issue).await?;
    info!(
        "reconcile: created {} issue {} for \"{summary}\"",
        tracker.name(),
        created.identifier
    );
    Ok(created)
}

fn build_description(unit: &ConversationUnit, verdict: &TriageVerdict) -> String {
    let trigger = verdict
        .trigger_message
        .clone()
        .unwrap_or_else(|| unit.conversation_text.clone());
    let mut lines = vec![trigger];
    if let Some(assignee) = verdict.assignee.as_deref() {
        lines.push(format!("Assigned to: {assignee}"));
    }
    lines.push(format!("Urgency: {}", verdict.urgency));
    if let Some(deadline) = verdict.deadline.as_deref() {
        lines.push(format!("Deadline: {deadline}"));
    }
    lines.push(ISSUE_FOOTER.to_string());
    lines.join("\n")
}
