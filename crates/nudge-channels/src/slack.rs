//! Slack Web API client.
//!
//! Fetching flattens a channel into [`RawMessage`]s: thread parents are
//! tagged with their own ts as `thread_root`, replies are pulled in and
//! tagged with the parent's ts, and user ids are resolved to display
//! names. A partial reply fetch is logged, never silently dropped.

use async_trait::async_trait;
use nudge_core::{
    config::SlackConfig,
    error::NudgeError,
    message::{ChannelInfo, RawMessage},
    traits::ChatClient,
};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Threads fetched per batch; more would risk platform rate limits.
const MAX_THREAD_FETCH: usize = 10;
/// Replies fetched per thread.
const THREAD_REPLY_LIMIT: u32 = 20;

const SLACK_API: &str = "https://slack.com/api";

/// Slack Web API client.
pub struct SlackClient {
    client: reqwest::Client,
    bot_token: String,
    base_url: String,
}

impl SlackClient {
    pub fn from_config(config: &SlackConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token: config.bot_token.clone(),
            base_url: SLACK_API.to_string(),
        }
    }

    /// Override the API root (tests).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<T, NudgeError> {
        let url = format!("{}/{method}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .header("Authorization", format!("Bearer {}", self.bot_token))
            .send()
            .await
            .map_err(|e| NudgeError::Channel(format!("slack {method} request failed: {e}")))?;

        resp.json()
            .await
            .map_err(|e| NudgeError::Channel(format!("slack {method}: bad response: {e}")))
    }

    /// Resolve user ids to display names, one lookup per unique id.
    /// A failed lookup falls back to the raw id.
    async fn resolve_users(&self, user_ids: &[String]) -> HashMap<String, String> {
        let mut names = HashMap::new();
        for user_id in user_ids {
            let result: Result<UserInfoResponse, NudgeError> = self
                .get("users.info", &[("user", user_id.clone())])
                .await;
            match result {
                Ok(resp) if resp.ok => {
                    if let Some(user) = resp.user {
                        let name = if !user.real_name.is_empty() {
                            user.real_name
                        } else {
                            user.profile.display_name
                        };
                        names.insert(user_id.clone(), name);
                    }
                }
                Ok(resp) => {
                    warn!("slack users.info failed for {user_id}: {:?}", resp.error);
                }
                Err(e) => {
                    warn!("slack users.info failed for {user_id}: {e}");
                }
            }
        }
        names
    }
}

#[derive(Deserialize)]
struct ChannelListResponse {
    ok: bool,
    error: Option<String>,
    #[serde(default)]
    channels: Vec<SlackChannel>,
}

#[derive(Deserialize)]
struct SlackChannel {
    id: String,
    name: String,
    #[serde(default)]
    is_private: bool,
    #[serde(default)]
    num_members: u32,
}

#[derive(Deserialize)]
struct HistoryResponse {
    ok: bool,
    error: Option<String>,
    #[serde(default)]
    messages: Vec<SlackMessage>,
}

#[derive(Deserialize, Clone)]
struct SlackMessage {
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
    ts: String,
    #[serde(default)]
    thread_ts: Option<String>,
    #[serde(default)]
    reply_count: Option<u32>,
}

#[derive(Deserialize)]
struct UserInfoResponse {
    ok: bool,
    error: Option<String>,
    user: Option<SlackUser>,
}

#[derive(Deserialize)]
struct SlackUser {
    #[serde(default)]
    real_name: String,
    #[serde(default)]
    profile: SlackProfile,
}

#[derive(Deserialize, Default)]
struct SlackProfile {
    #[serde(default)]
    display_name: String,
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
    ts: Option<String>,
}

#[async_trait]
impl ChatClient for SlackClient {
    async fn list_channels(&self) -> Result<Vec<ChannelInfo>, NudgeError> {
        let resp: ChannelListResponse = self
            .get(
                "conversations.list",
                &[("types", "public_channel,private_channel".to_string())],
            )
            .await?;
        if !resp.ok {
            return Err(NudgeError::Channel(format!(
                "slack conversations.list error: {}",
                resp.error.unwrap_or_default()
            )));
        }
        Ok(resp
            .channels
            .into_iter()
            .map(|c| ChannelInfo {
                id: c.id,
                name: c.name,
                is_private: c.is_private,
                member_count: c.num_members,
            })
            .collect())
    }

    async fn fetch_messages(
        &self,
        channel_id: &str,
        limit: u32,
    ) -> Result<Vec<RawMessage>, NudgeError> {
        let resp: HistoryResponse = self
            .get(
                "conversations.history",
                &[
                    ("channel", channel_id.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        if !resp.ok {
            return Err(NudgeError::Channel(format!(
                "slack conversations.history error: {}",
                resp.error.unwrap_or_default()
            )));
        }

        let top_level = resp.messages;

        // Thread parents: top-level messages with replies.
        let parents: Vec<&SlackMessage> = top_level
            .iter()
            .filter(|m| m.reply_count.unwrap_or(0) > 0)
            .collect();
        let parent_ts: Vec<String> = parents.iter().map(|m| m.ts.clone()).collect();

        let mut replies: Vec<SlackMessage> = Vec::new();
        for parent in parents.iter().take(MAX_THREAD_FETCH) {
            let result: Result<HistoryResponse, NudgeError> = self
                .get(
                    "conversations.replies",
                    &[
                        ("channel", channel_id.to_string()),
                        ("ts", parent.ts.clone()),
                        ("limit", THREAD_REPLY_LIMIT.to_string()),
                    ],
                )
                .await;
            match result {
                Ok(r) if r.ok => {
                    // First entry is the parent itself.
                    replies.extend(r.messages.into_iter().skip(1).map(|mut m| {
                        m.thread_ts = Some(parent.ts.clone());
                        m
                    }));
                }
                Ok(r) => {
                    warn!(
                        "slack: replies fetch for thread {} failed: {}",
                        parent.ts,
                        r.error.unwrap_or_default()
                    );
                }
                Err(e) => {
                    warn!("slack: replies fetch for thread {} failed: {e}", parent.ts);
                }
            }
        }
        debug!(
            "slack: fetched {} top-level messages, {} thread replies",
            top_level.len(),
            replies.len()
        );

        // Tag parents with their own ts so grouping roots the thread there.
        let mut all: Vec<SlackMessage> = top_level
            .into_iter()
            .map(|mut m| {
                if parent_ts.contains(&m.ts) {
                    m.thread_ts = Some(m.ts.clone());
                }
                m
            })
            .collect();
        all.extend(replies);

        let mut user_ids: Vec<String> = all.iter().filter_map(|m| m.user.clone()).collect();
        user_ids.sort();
        user_ids.dedup();
        let names = self.resolve_users(&user_ids).await;

        Ok(all
            .into_iter()
            .filter_map(|m| {
                let user = m.user?;
                let text = m.text?;
                if text.is_empty() {
                    return None;
                }
                Some(RawMessage {
                    sender_name: names.get(&user).cloned().unwrap_or_else(|| user.clone()),
                    sender_id: user,
                    text,
                    timestamp: m.ts,
                    channel_id: channel_id.to_string(),
                    thread_root: m.thread_ts,
                })
            })
            .collect())
    }

    async fn send_message(
        &self,
        channel_id: &str,
        text: &str,
        thread_root: Option<&str>,
    ) -> Result<String, NudgeError> {
        let mut body = serde_json::json!({
            "channel": channel_id,
            "text": text,
        });
        if let Some(root) = thread_root {
            body["thread_ts"] = serde_json::json!(root);
        }

        let url = format!("{}/chat.postMessage", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.bot_token))
            .json(&body)
            .send()
            .await
            .map_err(|e| NudgeError::Channel(format!("slack chat.postMessage failed: {e}")))?;

        let parsed: PostMessageResponse = resp
            .json()
            .await
            .map_err(|e| NudgeError::Channel(format!("slack chat.postMessage: bad response: {e}")))?;

        if !parsed.ok {
            return Err(NudgeError::Channel(format!(
                "slack chat.postMessage error: {}",
                parsed.error.unwrap_or_default()
            )));
        }
        Ok(parsed.ts.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_response_parsing() {
        let json = r#"{"ok":true,"messages":[
            {"user":"U1","text":"standup at 10","ts":"1726000000.000100"},
            {"user":"U2","text":"can you review?","ts":"1726000050.000200","reply_count":2}
        ]}"#;
        let resp: HistoryResponse = serde_json::from_str(json).unwrap();
        assert!(resp.ok);
        assert_eq!(resp.messages.len(), 2);
        assert_eq!(resp.messages[1].reply_count, Some(2));
        assert!(resp.messages[0].thread_ts.is_none());
    }

    #[test]
    fn test_error_response_parsing() {
        let json = r#"{"ok":false,"error":"channel_not_found"}"#;
        let resp: HistoryResponse = serde_json::from_str(json).unwrap();
        assert!(!resp.ok);
        assert_eq!(resp.error.as_deref(), Some("channel_not_found"));
        assert!(resp.messages.is_empty());
    }

    #[test]
    fn test_user_name_fallbacks() {
        let json = r#"{"ok":true,"user":{"real_name":"","profile":{"display_name":"dana.m"}}}"#;
        let resp: UserInfoResponse = serde_json::from_str(json).unwrap();
        let user = resp.user.unwrap();
        assert!(user.real_name.is_empty());
        assert_eq!(user.profile.display_name, "dana.m");
    }
}
