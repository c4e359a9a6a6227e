//! The message-triage pipeline: group, dedup, classify, draft,
//! reconcile, persist.

use super::Engine;
use chrono::Utc;
use nudge_core::{
    conversation::{group_messages, ConversationUnit},
    error::NudgeError,
    message::RawMessage,
    triage::{NudgeRequest, TriageVerdict, UnitForAnalysis},
};
use nudge_memory::{NewProcessedMessage, ProcessedMessage};
use std::collections::HashMap;
use tracing::{info, warn};

/// Result of one triage run for a channel.
#[derive(Debug)]
pub struct TriageOutcome {
    /// Every actionable record for the channel, most urgent first,
    /// newest first within a tier — not just this batch.
    pub results: Vec<ProcessedMessage>,
    /// Conversation units not seen before this run.
    pub new_count: usize,
    /// Actionable units among the new ones (for a short-circuited run,
    /// the size of the cached set).
    pub actionable_count: usize,
}

impl Engine {
    /// Triage a batch of raw messages for one channel.
    ///
    /// Mandatory steps (grouping, dedup, classification) abort the run
    /// on failure with nothing persisted. Drafting and reconciliation
    /// degrade gracefully: their failures leave fields unset.
    pub async fn analyze(
        &self,
        channel_id: &str,
        messages: Vec<RawMessage>,
    ) -> Result<TriageOutcome, NudgeError> {
        let owner = self.require_owner()?.to_string();
        if channel_id.is_empty() || messages.is_empty() {
            return Err(NudgeError::Input(
                "messages and channel_id required".to_string(),
            ));
        }

        // 1. Group into conversation units.
        let message_count = messages.len();
        let units = group_messages(messages);
        info!(
            "analyze: grouped {message_count} messages into {} units for {channel_id}",
            units.len()
        );

        // 2. Dedup against already-processed identity keys.
        let keys: Vec<String> = units.iter().map(|u| u.identity_key.clone()).collect();
        let existing = self.store.existing_keys(channel_id, &keys).await?;
        let new_units: Vec<ConversationUnit> = units
            .into_iter()
            .filter(|u| !existing.contains(&u.identity_key))
            .collect();

        // Nothing new: serve the cached actionable set. The classifier
        // and tracker must never run redundantly.
        if new_units.is_empty() {
            let results = self.store.actionable_for_channel(&owner, channel_id).await?;
            info!(
                "analyze: no new units for {channel_id}, returning {} cached actionable",
                results.len()
            );
            return Ok(TriageOutcome {
                new_count: 0,
                actionable_count: results.len(),
                results,
            });
        }

        // 3. Classify (mandatory). One verdict per index; missing
        // indices default to non-actionable.
        let reference_time = Utc::now();
        let for_analysis: Vec<UnitForAnalysis> = new_units
            .iter()
            .enumerate()
            .map(|(index, unit)| UnitForAnalysis {
                index,
                kind: unit.kind,
                text: unit.conversation_text.clone(),
                reference_time,
            })
            .collect();

        let mut by_index: HashMap<usize, TriageVerdict> = self
            .classifier
            .classify(&for_analysis)
            .await?
            .into_iter()
            .filter(|v| v.index < new_units.len())
            .map(|v| (v.index, v))
            .collect();
        let verdicts: Vec<TriageVerdict> = (0..new_units.len())
            .map(|i| {
                by_index
                    .remove(&i)
                    .unwrap_or_else(|| TriageVerdict::non_actionable(i))
            })
            .collect();

        let actionable_count = verdicts.iter().filter(|v| v.is_actionable).count();
        info!(
            "analyze: {} new units, {actionable_count} actionable",
            new_units.len()
        );

        // 4. Draft nudges for the actionable subset. Best-effort.
        let requests: Vec<NudgeRequest> = verdicts
            .iter()
            .filter(|v| v.is_actionable)
            .map(|v| NudgeRequest {
                index: v.index,
                sender: new_units[v.index].primary_sender.clone(),
                task: v.task_summary.clone(),
                deadline: v.deadline.clone(),
                urgency: v.urgency,
                text: new_units[v.index].conversation_text.clone(),
            })
            .collect();
        let drafts: HashMap<usize, String> = if requests.is_empty() {
            HashMap::new()
        } else {
            match self.generator.draft_nudges(&requests).await {
                Ok(list) => list.into_iter().map(|d| (d.index, d.text)).collect(),
                Err(e) => {
                    warn!("analyze: nudge drafting failed, persisting without drafts: {e}");
                    HashMap::new()
                }
            }
        };

        // 5. Mirror actionable units into the tracker. Best-effort.
        let external = self.reconcile_units(&new_units, &verdicts).await;

        // 6. Persist one record per new unit, keyed on
        // (identity_key, channel_id).
        let records: Vec<NewProcessedMessage> = new_units
            .iter()
            .zip(verdicts.iter())
            .enumerate()
            .map(|(i, (unit, verdict))| {
                let issue = external.get(&i);
                NewProcessedMessage {
                    identity_key: unit.identity_key.clone(),
                    channel_id: channel_id.to_string(),
                    owner_user_id: owner.clone(),
                    is_actionable: verdict.is_actionable,
                    task_summary: verdict.task_summary.clone(),
                    deadline: verdict.deadline.clone(),
                    assignee: verdict.assignee.clone(),
                    urgency: verdict.urgency,
                    trigger_message: verdict.trigger_message.clone(),
                    nudge_draft: drafts.get(&i).cloned(),
                    external_task_id: issue.map(|c| c.identifier.clone()),
                    external_task_url: issue.and_then(|c| c.url.clone()),
                }
            })
            .collect();

        // The response is re-queried below, so a failed upsert degrades
        // to stale data rather than a failed run.
        if let Err(e) = self.store.upsert_processed(&records).await {
            warn!("analyze: persistence failed: {e}");
        }

        // 7. Authoritative current state for the channel.
        let results = self.store.actionable_for_channel(&owner, channel_id).await?;
        Ok(TriageOutcome {
            new_count: new_units.len(),
            actionable_count,
            results,
        })
    }
}
