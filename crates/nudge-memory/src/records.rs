//! Row types for the three persisted tables.

use nudge_core::triage::{FollowupStatus, Urgency};
use serde::Serialize;
use std::collections::HashMap;

/// A persisted analysis result for one conversation unit.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProcessedMessage {
    pub id: String,
    pub identity_key: String,
    pub channel_id: String,
    pub owner_user_id: String,
    pub is_actionable: bool,
    pub task_summary: Option<String>,
    pub deadline: Option<String>,
    pub assignee: Option<String>,
    pub urgency: String,
    pub trigger_message: Option<String>,
    pub nudge_draft: Option<String>,
    pub nudge_sent: bool,
    pub nudge_sent_at: Option<String>,
    pub external_task_id: Option<String>,
    pub external_task_url: Option<String>,
    pub created_at: String,
}

impl ProcessedMessage {
    pub fn urgency(&self) -> Urgency {
        Urgency::parse(&self.urgency)
    }
}

/// Insert payload for [`ProcessedMessage`]. The row id and created_at
/// are assigned by the store on first insert and survive upserts.
#[derive(Debug, Clone)]
pub struct NewProcessedMessage {
    pub identity_key: String,
    pub channel_id: String,
    pub owner_user_id: String,
    pub is_actionable: bool,
    pub task_summary: Option<String>,
    pub deadline: Option<String>,
    pub assignee: Option<String>,
    pub urgency: Urgency,
    pub trigger_message: Option<String>,
    pub nudge_draft: Option<String>,
    pub external_task_id: Option<String>,
    pub external_task_url: Option<String>,
}

/// A scheduled followup tied to an actionable processed message.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Followup {
    pub id: String,
    pub processed_message_id: String,
    pub channel_id: String,
    pub identity_key: String,
    pub owner_user_id: String,
    pub task_summary: String,
    pub assignee: Option<String>,
    pub urgency: String,
    pub followup_at: String,
    pub status: String,
    pub external_task_id: Option<String>,
    pub created_at: String,
}

impl Followup {
    pub fn status(&self) -> Option<FollowupStatus> {
        FollowupStatus::parse(&self.status)
    }

    pub fn urgency(&self) -> Urgency {
        Urgency::parse(&self.urgency)
    }
}

/// Insert payload for [`Followup`].
#[derive(Debug, Clone)]
pub struct NewFollowup {
    pub processed_message_id: String,
    pub channel_id: String,
    pub identity_key: String,
    pub owner_user_id: String,
    pub task_summary: String,
    pub assignee: Option<String>,
    pub urgency: Urgency,
    pub followup_at: String,
    pub external_task_id: Option<String>,
}

/// A per-user tracker integration.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Integration {
    pub id: String,
    pub user_id: String,
    pub provider: String,
    /// JSON object of provider-specific keys.
    pub config: String,
    pub api_token: String,
    pub created_at: String,
}

impl Integration {
    /// Parse the opaque config column. Unparseable configs read as empty.
    pub fn config_map(&self) -> HashMap<String, String> {
        serde_json::from_str(&self.config).unwrap_or_default()
    }
}
