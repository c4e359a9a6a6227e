//! Generic webhook adapter. Fire-and-forget: tasks are POSTed to a
//! configured URL, there is no addressable issue to search or resolve.

use crate::WEBHOOK_TASK_ID;
use async_trait::async_trait;
use nudge_core::{
    error::NudgeError,
    traits::{CreatedIssue, NewIssue, Tracker, TrackerIssue},
};
use serde_json::json;
use tracing::debug;

pub struct WebhookTracker {
    client: reqwest::Client,
    webhook_url: String,
}

impl WebhookTracker {
    pub fn new(webhook_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }
}

#[async_trait]
impl Tracker for WebhookTracker {
    fn name(&self) -> &str {
        "webhook"
    }

    /// Nothing to search; every task POSTs fresh.
    async fn search_issues(&self, _query: &str) -> Result<Vec<TrackerIssue>, NudgeError> {
        Ok(Vec::new())
    }

    async fn create_issue(&self, issue: &NewIssue) -> Result<CreatedIssue, NudgeError> {
        let resp = self
            .client
            .post(&self.webhook_url)
            .json(&json!({
                "title": issue.title,
                "description": issue.description,
                "priority": issue.priority.as_str(),
            }))
            .send()
            .await
            .map_err(|e| NudgeError::Tracker(format!("webhook request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(NudgeError::Tracker(format!(
                "webhook failed ({status}): {text}"
            )));
        }

        Ok(CreatedIssue {
            identifier: WEBHOOK_TASK_ID.to_string(),
            url: None,
        })
    }

    async fn resolve_issue(&self, identifier: &str) -> Result<(), NudgeError> {
        debug!("webhook: resolve is a no-op for {identifier}");
        Ok(())
    }

    async fn test_connection(&self) -> Result<String, NudgeError> {
        // No credential check possible; configuration is the test.
        Ok(format!(
            "webhook configured — will POST to {} when a task is created",
            self.webhook_url
        ))
    }
}
