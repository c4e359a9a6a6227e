//! Read-only Gmail metadata client.
//!
//! Lists inbox message ids, then pulls From/Subject/Date headers and
//! the snippet per message. A failed per-message fetch is logged and
//! skipped; the rest of the listing still comes back.

use async_trait::async_trait;
use nudge_core::{
    config::GmailConfig, error::NudgeError, message::EmailSummary, traits::MailClient,
};
use serde::Deserialize;
use tracing::warn;

const GMAIL_API: &str = "https://gmail.googleapis.com/gmail/v1";

/// Gmail API client. Read-only.
pub struct GmailClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl GmailClient {
    pub fn from_config(config: &GmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: config.access_token.clone(),
            base_url: GMAIL_API.to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, NudgeError> {
        let resp = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .send()
            .await
            .map_err(|e| NudgeError::Channel(format!("gmail request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(NudgeError::Channel(format!(
                "gmail API error ({status}): {text}"
            )));
        }
        resp.json()
            .await
            .map_err(|e| NudgeError::Channel(format!("gmail: bad response: {e}")))
    }
}

#[derive(Deserialize)]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Deserialize)]
struct MessageDetail {
    id: String,
    #[serde(rename = "threadId", default)]
    thread_id: String,
    #[serde(default)]
    snippet: String,
    payload: Option<MessagePayload>,
}

#[derive(Deserialize)]
struct MessagePayload {
    #[serde(default)]
    headers: Vec<Header>,
}

#[derive(Deserialize)]
struct Header {
    name: String,
    value: String,
}

fn header<'a>(headers: &'a [Header], name: &str) -> &'a str {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
        .unwrap_or("")
}

#[async_trait]
impl MailClient for GmailClient {
    async fn list_messages(
        &self,
        max_results: u32,
        query: Option<&str>,
    ) -> Result<Vec<EmailSummary>, NudgeError> {
        if self.access_token.is_empty() {
            return Err(NudgeError::Config(
                "gmail access token not configured".to_string(),
            ));
        }

        let mut url = format!(
            "{}/users/me/messages?maxResults={max_results}&labelIds=INBOX",
            self.base_url
        );
        if let Some(q) = query {
            url.push_str(&format!("&q={}", urlencode(q)));
        }

        let list: MessageListResponse = self.get_json(&url).await?;
        let mut emails = Vec::with_capacity(list.messages.len());

        for msg in list.messages {
            let detail_url = format!(
                "{}/users/me/messages/{}?format=metadata\
                 &metadataHeaders=From&metadataHeaders=Subject&metadataHeaders=Date",
                self.base_url, msg.id
            );
            let detail: MessageDetail = match self.get_json(&detail_url).await {
                Ok(d) => d,
                Err(e) => {
                    warn!("gmail: failed to fetch message {}: {e}", msg.id);
                    continue;
                }
            };
            let headers = detail.payload.map(|p| p.headers).unwrap_or_default();
            emails.push(EmailSummary {
                id: detail.id,
                thread_id: detail.thread_id,
                snippet: detail.snippet,
                from: header(&headers, "From").to_string(),
                subject: header(&headers, "Subject").to_string(),
                date: header(&headers, "Date").to_string(),
            });
        }

        Ok(emails)
    }
}

/// Minimal percent-encoding for Gmail search queries.
fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_detail_parsing() {
        let json = r#"{"id":"m1","threadId":"t1","snippet":"Quarterly numbers attached",
            "payload":{"headers":[
                {"name":"From","value":"dana@example.com"},
                {"name":"Subject","value":"Q4 report"},
                {"name":"Date","value":"Mon, 24 Aug 2026 09:00:00 +0000"}
            ]}}"#;
        let detail: MessageDetail = serde_json::from_str(json).unwrap();
        let headers = detail.payload.unwrap().headers;
        assert_eq!(header(&headers, "from"), "dana@example.com");
        assert_eq!(header(&headers, "Subject"), "Q4 report");
        assert_eq!(header(&headers, "X-Missing"), "");
    }

    #[test]
    fn test_urlencode() {
        assert_eq!(urlencode("is:unread from:dana"), "is%3Aunread+from%3Adana");
    }
}
