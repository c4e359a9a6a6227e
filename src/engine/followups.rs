//! Followup scheduling: nudge dispatch, due listing, reminders, and
//! resolution.
//!
//! A followup is created at nudge-send time, anchored on the processed
//! record's identity key, and becomes due after the urgency-dependent
//! delay. Its status only ever moves pending→sent, pending→resolved,
//! or sent→resolved.

use super::Engine;
use chrono::Utc;
use nudge_core::{
    error::NudgeError,
    policy::followup_delay,
    triage::FollowupStatus,
};
use nudge_memory::{Followup, NewFollowup};
use tracing::{info, warn};

/// Canned reminder used when the generator is unavailable.
const FALLBACK_REMINDER: &str =
    "Hi, just following up again on \"{task}\" - could you share an update when you get a chance?";

/// Outcome of a send-reminder action. Dispatch failure is reported
/// separately from scheduling failure: the status transition is
/// attempted either way.
pub struct ReminderOutcome {
    pub reminder_text: String,
    pub delivery_error: Option<String>,
}

impl Engine {
    /// Dispatch the stored nudge draft as a threaded reply, mark the
    /// record sent, and schedule its followup.
    pub async fn send_nudge(&self, processed_id: &str) -> Result<(), NudgeError> {
        let owner = self.require_owner()?.to_string();
        let record = self
            .store
            .get_processed(processed_id, &owner)
            .await?
            .ok_or_else(|| NudgeError::Input(format!("unknown record: {processed_id}")))?;
        if !record.is_actionable {
            return Err(NudgeError::Input(format!(
                "record {processed_id} is not actionable"
            )));
        }

        let task = record
            .task_summary
            .clone()
            .unwrap_or_else(|| "this task".to_string());
        let text = record
            .nudge_draft
            .clone()
            .unwrap_or_else(|| format!("Hi, quick check-in on \"{task}\" - any update?"));

        self.chat
            .send_message(&record.channel_id, &text, Some(&record.identity_key))
            .await?;

        // One clock reading anchors both the sent marker and the due
        // time, so followup_at - nudge_sent_at is exactly the delay.
        let now = Utc::now();
        self.store
            .mark_nudge_sent(&record.id, &owner, &now.to_rfc3339())
            .await?;

        let followup_at = (now + followup_delay(record.urgency())).to_rfc3339();
        let created = self
            .store
            .create_followup(&NewFollowup {
                processed_message_id: record.id.clone(),
                channel_id: record.channel_id.clone(),
                identity_key: record.identity_key.clone(),
                owner_user_id: owner,
                task_summary: task,
                assignee: record.assignee.clone(),
                urgency: record.urgency(),
                followup_at,
                external_task_id: record.external_task_id.clone(),
            })
            .await?;

        match created {
            Some(id) => info!("nudge sent for {processed_id}, followup {id} scheduled"),
            None => info!("nudge sent for {processed_id}, followup already scheduled"),
        }
        Ok(())
    }

    /// Pending followups due now, oldest due first.
    pub async fn due_followups(&self) -> Result<Vec<Followup>, NudgeError> {
        let owner = self.require_owner()?;
        self.store
            .due_followups(owner, &Utc::now().to_rfc3339())
            .await
    }

    /// Send a secondary, more direct reminder and mark the followup
    /// sent. Chat dispatch failure does not block the transition; it
    /// is reported in the outcome instead.
    pub async fn send_reminder(&self, followup_id: &str) -> Result<ReminderOutcome, NudgeError> {
        let owner = self.require_owner()?.to_string();
        let followup = self.load_followup(followup_id, &owner).await?;
        self.check_transition(&followup, FollowupStatus::Sent)?;

        let reminder_text = match self
            .generator
            .draft_reminder(&followup.task_summary, followup.assignee.as_deref())
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!("reminder generation failed, using fallback: {e}");
                FALLBACK_REMINDER.replace("{task}", &followup.task_summary)
            }
        };

        let delivery_error = match self
            .chat
            .send_message(
                &followup.channel_id,
                &reminder_text,
                Some(&followup.identity_key),
            )
            .await
        {
            Ok(_) => None,
            Err(e) => {
                warn!("reminder dispatch for {followup_id} failed: {e}");
                Some(e.to_string())
            }
        };

        self.store
            .set_followup_status(&followup.id, &owner, FollowupStatus::Sent)
            .await?;

        Ok(ReminderOutcome {
            reminder_text,
            delivery_error,
        })
    }

    /// Mark a followup resolved and best-effort complete its mirrored
    /// tracker issue. The local transition always wins; tracker
    /// failure is logged and swallowed.
    pub async fn resolve_followup(&self, followup_id: &str) -> Result<(), NudgeError> {
        let owner = self.require_owner()?.to_string();
        let followup = self.load_followup(followup_id, &owner).await?;
        self.check_transition(&followup, FollowupStatus::Resolved)?;

        self.store
            .set_followup_status(&followup.id, &owner, FollowupStatus::Resolved)
            .await?;
        info!("followup {followup_id} resolved");

        // The external id may live on the followup or on its owning
        // processed record.
        let external = match followup.external_task_id.clone() {
            Some(id) => Some(id),
            None => self
                .store
                .get_processed(&followup.processed_message_id, &owner)
                .await?
                .and_then(|p| p.external_task_id),
        };
        if let Some(identifier) = external {
            self.resolve_external(&identifier).await;
        }
        Ok(())
    }

    async fn load_followup(&self, id: &str, owner: &str) -> Result<Followup, NudgeError> {
        self.store
            .get_followup(id, owner)
            .await?
            .ok_or_else(|| NudgeError::Input(format!("unknown followup: {id}")))
    }

    fn check_transition(&self, followup: &Followup, to: FollowupStatus) -> Result<(), NudgeError> {
        let current = followup
            .status()
            .ok_or_else(|| NudgeError::Store(format!("corrupt followup status: {}", followup.status)))?;
        if !current.can_transition(to) {
            return Err(NudgeError::Input(format!(
                "followup {} is {}, cannot move to {}",
                followup.id,
                current.as_str(),
                to.as_str()
            )));
        }
        Ok(())
    }
}
