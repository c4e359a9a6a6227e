//! Followup creation, due listing, and status updates.

use super::Store;
use crate::records::{Followup, NewFollowup};
use nudge_core::{error::NudgeError, triage::FollowupStatus};
use uuid::Uuid;

impl Store {
    /// Create a followup unless one already exists for this
    /// conversation unit. Returns the new row id, or `None` when the
    /// natural key `(channel_id, identity_key)` already has a row.
    pub async fn create_followup(
        &self,
        followup: &NewFollowup,
    ) -> Result<Option<String>, NudgeError> {
        let id = Uuid::new_v4().to_string();
        let result = sqlx::query(
            "INSERT OR IGNORE INTO followups \
             (id, processed_message_id, channel_id, identity_key, owner_user_id, \
              task_summary, assignee, urgency, followup_at, status, external_task_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?)",
        )
        .bind(&id)
        .bind(&followup.processed_message_id)
        .bind(&followup.channel_id)
        .bind(&followup.identity_key)
        .bind(&followup.owner_user_id)
        .bind(&followup.task_summary)
        .bind(&followup.assignee)
        .bind(followup.urgency.as_str())
        .bind(&followup.followup_at)
        .bind(&followup.external_task_id)
        .execute(&self.pool)
        .await
        .map_err(|e| NudgeError::Store(format!("create followup failed: {e}")))?;

        if result.rows_affected() == 0 {
            tracing::debug!(
                "followup already exists for ({}, {})",
                followup.channel_id,
                followup.identity_key
            );
            return Ok(None);
        }
        Ok(Some(id))
    }

    /// Pending followups due at or before `now`, oldest due first.
    pub async fn due_followups(
        &self,
        user_id: &str,
        now: &str,
    ) -> Result<Vec<Followup>, NudgeError> {
        sqlx::query_as::<_, Followup>(
            "SELECT * FROM followups \
             WHERE owner_user_id = ? AND status = 'pending' AND followup_at <= ? \
             ORDER BY followup_at ASC",
        )
        .bind(user_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| NudgeError::Store(format!("due followups query failed: {e}")))
    }

    /// Look up one followup by row id, scoped to its owner.
    pub async fn get_followup(
        &self,
        id: &str,
        user_id: &str,
    ) -> Result<Option<Followup>, NudgeError> {
        sqlx::query_as::<_, Followup>(
            "SELECT * FROM followups WHERE id = ? AND owner_user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| NudgeError::Store(format!("followup lookup failed: {e}")))
    }

    /// Write a new followup status. Transition legality is the
    /// engine's responsibility; the store just records it.
    pub async fn set_followup_status(
        &self,
        id: &str,
        user_id: &str,
        status: FollowupStatus,
    ) -> Result<(), NudgeError> {
        sqlx::query("UPDATE followups SET status = ? WHERE id = ? AND owner_user_id = ?")
            .bind(status.as_str())
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| NudgeError::Store(format!("followup status update failed: {e}")))?;
        Ok(())
    }
}
