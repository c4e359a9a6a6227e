use crate::{
    error::NudgeError,
    message::{ChannelInfo, EmailSummary, RawMessage},
    triage::{NudgeDraft, NudgeRequest, TriageVerdict, UnitForAnalysis, Urgency},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Classification capability — the triage brain.
///
/// Implementations receive serialized conversation units and return
/// one verdict per input index. The pipeline fills defaults for any
/// index the implementation failed to cover.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// Classify a batch of conversation units.
    ///
    /// A backpressure signal must surface as [`NudgeError::RateLimited`]
    /// so callers can retry; anything else is [`NudgeError::Upstream`].
    async fn classify(&self, units: &[UnitForAnalysis]) -> Result<Vec<TriageVerdict>, NudgeError>;
}

/// Text generation capability — nudge and reminder drafting.
///
/// Both operations are best-effort from the pipeline's point of view;
/// a failure degrades the output, never the run.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Draft one nudge per actionable unit. Partial coverage is fine.
    async fn draft_nudges(&self, requests: &[NudgeRequest]) -> Result<Vec<NudgeDraft>, NudgeError>;

    /// Draft a secondary, more direct reminder for an overdue followup.
    async fn draft_reminder(
        &self,
        task_summary: &str,
        assignee: Option<&str>,
    ) -> Result<String, NudgeError>;
}

/// Chat platform capability.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn list_channels(&self) -> Result<Vec<ChannelInfo>, NudgeError>;

    /// Fetch recent messages including thread replies, flattened into
    /// [`RawMessage`] with `thread_root` set and user ids resolved to
    /// display names.
    async fn fetch_messages(
        &self,
        channel_id: &str,
        limit: u32,
    ) -> Result<Vec<RawMessage>, NudgeError>;

    /// Send a message, optionally as a threaded reply. Returns the new
    /// message's timestamp.
    async fn send_message(
        &self,
        channel_id: &str,
        text: &str,
        thread_root: Option<&str>,
    ) -> Result<String, NudgeError>;
}

/// Email provider capability. Read-only.
#[async_trait]
pub trait MailClient: Send + Sync {
    async fn list_messages(
        &self,
        max_results: u32,
        query: Option<&str>,
    ) -> Result<Vec<EmailSummary>, NudgeError>;
}

/// An issue as returned by a tracker search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerIssue {
    /// Internal tracker id.
    pub id: String,
    /// Human-facing identifier (e.g. "ENG-142").
    pub identifier: String,
    pub url: Option<String>,
    pub title: String,
}

/// Request to create a tracker issue.
#[derive(Debug, Clone)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub priority: Urgency,
}

/// The externally visible handle of a created or reused issue.
#[derive(Debug, Clone)]
pub struct CreatedIssue {
    pub identifier: String,
    pub url: Option<String>,
}

/// Project-tracker capability: search, create, resolve, test.
///
/// One adapter per provider; the engine only ever talks to this trait.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// Provider name ("linear", "jira", "asana", "webhook").
    fn name(&self) -> &str;

    /// Free-text search over open issues.
    async fn search_issues(&self, query: &str) -> Result<Vec<TrackerIssue>, NudgeError>;

    /// Create a new issue.
    async fn create_issue(&self, issue: &NewIssue) -> Result<CreatedIssue, NudgeError>;

    /// Move an issue to the provider's completed state.
    ///
    /// Missing issue or missing completed state is a logged no-op, not
    /// an error — resolving locally must always succeed.
    async fn resolve_issue(&self, identifier: &str) -> Result<(), NudgeError>;

    /// Verify credentials; returns the authenticated display name.
    async fn test_connection(&self) -> Result<String, NudgeError>;
}
