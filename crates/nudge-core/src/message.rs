use serde::{Deserialize, Serialize};

/// A single chat message as fetched from the chat platform.
///
/// Timestamps are the platform's native decimal-string message ids
/// (e.g. `"1726000000.000100"`). They sort chronologically when parsed
/// as floats and double as conversation identity keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    /// Platform-specific user id.
    pub sender_id: String,
    /// Resolved human-readable sender name.
    pub sender_name: String,
    /// Message text content.
    pub text: String,
    /// Platform timestamp, unique within a channel.
    pub timestamp: String,
    /// Channel the message was fetched from.
    pub channel_id: String,
    /// Thread root timestamp, set for replies and for thread parents
    /// (a parent carries its own timestamp here).
    #[serde(default)]
    pub thread_root: Option<String>,
}

/// A channel as listed by the chat platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
    pub is_private: bool,
    pub member_count: u32,
}

/// Metadata for one email, read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSummary {
    pub id: String,
    pub thread_id: String,
    pub snippet: String,
    pub from: String,
    pub subject: String,
    pub date: String,
}
