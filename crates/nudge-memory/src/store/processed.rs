//! Processed-message upsert, dedup lookup, and actionable queries.

use super::Store;
use crate::records::{NewProcessedMessage, ProcessedMessage};
use nudge_core::error::NudgeError;
use std::collections::HashSet;
use uuid::Uuid;

impl Store {
    /// Identity keys in `keys` that already have a row for this channel.
    pub async fn existing_keys(
        &self,
        channel_id: &str,
        keys: &[String],
    ) -> Result<HashSet<String>, NudgeError> {
        if keys.is_empty() {
            return Ok(HashSet::new());
        }

        let placeholders = vec!["?"; keys.len()].join(", ");
        let sql = format!(
            "SELECT identity_key FROM processed_messages \
             WHERE channel_id = ? AND identity_key IN ({placeholders})"
        );

        let mut query = sqlx::query_as::<_, (String,)>(&sql).bind(channel_id);
        for key in keys {
            query = query.bind(key);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| NudgeError::Store(format!("dedup lookup failed: {e}")))?;

        Ok(rows.into_iter().map(|(k,)| k).collect())
    }

    /// Insert-or-replace by the natural key `(identity_key, channel_id)`.
    ///
    /// Re-running triage on a unit replaces its derived fields; the row
    /// id and created_at survive. This conflict clause is the only
    /// concurrency control the pipeline needs.
    pub async fn upsert_processed(
        &self,
        records: &[NewProcessedMessage],
    ) -> Result<(), NudgeError> {
        for r in records {
            sqlx::query(
                "INSERT INTO processed_messages \
                 (id, identity_key, channel_id, owner_user_id, is_actionable, task_summary, \
                  deadline, assignee, urgency, trigger_message, nudge_draft, \
                  external_task_id, external_task_url) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT (identity_key, channel_id) DO UPDATE SET \
                  owner_user_id = excluded.owner_user_id, \
                  is_actionable = excluded.is_actionable, \
                  task_summary = excluded.task_summary, \
                  deadline = excluded.deadline, \
                  assignee = excluded.assignee, \
                  urgency = excluded.urgency, \
                  trigger_message = excluded.trigger_message, \
                  nudge_draft = excluded.nudge_draft, \
                  external_task_id = excluded.external_task_id, \
                  external_task_url = excluded.external_task_url",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&r.identity_key)
            .bind(&r.channel_id)
            .bind(&r.owner_user_id)
            .bind(r.is_actionable)
            .bind(&r.task_summary)
            .bind(&r.deadline)
            .bind(&r.assignee)
            .bind(r.urgency.as_str())
            .bind(&r.trigger_message)
            .bind(&r.nudge_draft)
            .bind(&r.external_task_id)
            .bind(&r.external_task_url)
            .execute(&self.pool)
            .await
            .map_err(|e| NudgeError::Store(format!("upsert failed: {e}")))?;
        }
        Ok(())
    }

    /// All actionable records for a channel, most urgent tier first,
    /// newest first within a tier. This ordering is part of the
    /// pipeline's response contract.
    pub async fn actionable_for_channel(
        &self,
        user_id: &str,
        channel_id: &str,
    ) -> Result<Vec<ProcessedMessage>, NudgeError> {
        sqlx::query_as::<_, ProcessedMessage>(
            "SELECT * FROM processed_messages \
             WHERE channel_id = ? AND owner_user_id = ? AND is_actionable = 1 \
             ORDER BY CASE urgency \
                WHEN 'critical' THEN 0 \
                WHEN 'high' THEN 1 \
                WHEN 'medium' THEN 2 \
                ELSE 3 END, \
              created_at DESC",
        )
        .bind(channel_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| NudgeError::Store(format!("actionable query failed: {e}")))
    }

    /// Look up one processed record by row id, scoped to its owner.
    pub async fn get_processed(
        &self,
        id: &str,
        user_id: &str,
    ) -> Result<Option<ProcessedMessage>, NudgeError> {
        sqlx::query_as::<_, ProcessedMessage>(
            "SELECT * FROM processed_messages WHERE id = ? AND owner_user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| NudgeError::Store(format!("processed lookup failed: {e}")))
    }

    /// Record that the drafted nudge went out.
    pub async fn mark_nudge_sent(
        &self,
        id: &str,
        user_id: &str,
        sent_at: &str,
    ) -> Result<(), NudgeError> {
        sqlx::query(
            "UPDATE processed_messages SET nudge_sent = 1, nudge_sent_at = ? \
             WHERE id = ? AND owner_user_id = ?",
        )
        .bind(sent_at)
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| NudgeError::Store(format!("mark nudge sent failed: {e}")))?;
        Ok(())
    }
}
