//! Per-user tracker integration rows.

use super::Store;
use crate::records::Integration;
use nudge_core::error::NudgeError;
use std::collections::HashMap;
use uuid::Uuid;

impl Store {
    /// Insert or update the integration for `(user_id, provider)`.
    pub async fn upsert_integration(
        &self,
        user_id: &str,
        provider: &str,
        config: &HashMap<String, String>,
        api_token: &str,
    ) -> Result<(), NudgeError> {
        let config_json = serde_json::to_string(config)?;
        sqlx::query(
            "INSERT INTO integrations (id, user_id, provider, config, api_token) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT (user_id, provider) DO UPDATE SET \
              config = excluded.config, \
              api_token = excluded.api_token",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(provider)
        .bind(config_json)
        .bind(api_token)
        .execute(&self.pool)
        .await
        .map_err(|e| NudgeError::Store(format!("integration upsert failed: {e}")))?;
        Ok(())
    }

    /// The user's active integration — the most recently configured
    /// one wins (single-provider policy).
    pub async fn get_integration(
        &self,
        user_id: &str,
    ) -> Result<Option<Integration>, NudgeError> {
        sqlx::query_as::<_, Integration>(
            "SELECT * FROM integrations WHERE user_id = ? \
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| NudgeError::Store(format!("integration lookup failed: {e}")))
    }
}
