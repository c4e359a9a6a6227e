//! OpenAI-compatible classifier and generator.
//!
//! Structured output is obtained through forced tool calls so that the
//! model returns machine-parseable verdicts rather than prose. One
//! client implements both capabilities.

use async_trait::async_trait;
use nudge_core::{
    config::ClassifierConfig,
    error::NudgeError,
    traits::{Classifier, Generator},
    triage::{NudgeDraft, NudgeRequest, TriageVerdict, UnitForAnalysis},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

const TRIAGE_SYSTEM_PROMPT: &str = "You are a workplace message analyzer. You will receive \
conversation units — each is either a single standalone message or a full thread conversation.\n\n\
For THREAD conversations, analyze the entire thread as a whole. If later replies already satisfy \
the original request, the unit is NOT actionable.\n\
For STANDALONE messages, analyze individually.\n\n\
Determine for each unit:\n\
1. Whether it contains an explicit task, to-do, request, or unresolved commitment\n\
2. An urgency tier: critical, high, medium, or low\n\
3. A deadline, resolved against the unit's reference_time to a concrete ISO datetime — never \
a relative phrase. Null if there is none.\n\
4. The exact message text (verbatim quote) that justifies the actionable verdict.\n\n\
Return your analysis using the analyze_conversations function. Every conversation unit must \
have a result.";

const NUDGE_SYSTEM_PROMPT: &str = "You are a polite workplace assistant. Generate context-aware \
follow-up nudge messages. Each nudge should be friendly, professional, and reference the \
specific task/deadline. Keep nudges to 1-2 sentences. Use the person's first name when available.";

const REMINDER_SYSTEM_PROMPT: &str = "You are a polite workplace assistant. Generate a secondary \
follow-up reminder. The initial nudge was already sent. Be slightly more direct but still \
professional. Keep it to 1-2 sentences.";

/// OpenAI-compatible chat-completions client.
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    /// Create from config values.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    /// POST a chat-completion request, mapping 429 to the retryable
    /// rate-limit error.
    async fn complete(&self, body: &ChatRequest) -> Result<ChatResponse, NudgeError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!("openai: POST {url} model={}", body.model);

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| NudgeError::Upstream(format!("openai request failed: {e}")))?;

        let status = resp.status();
        if status.as_u16() == 429 {
            let text = resp.text().await.unwrap_or_default();
            return Err(NudgeError::RateLimited(format!("openai returned 429: {text}")));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(NudgeError::Upstream(format!("openai returned {status}: {text}")));
        }

        resp.json()
            .await
            .map_err(|e| NudgeError::Upstream(format!("openai: failed to parse response: {e}")))
    }

    /// Arguments of the first forced tool call, if present.
    fn tool_arguments(response: &ChatResponse) -> Option<&str> {
        response
            .choices
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.tool_calls.as_ref())
            .and_then(|t| t.first())
            .map(|t| t.function.arguments.as_str())
    }

    fn first_content(response: &ChatResponse) -> Option<String> {
        response
            .choices
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.clone())
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Deserialize)]
struct ToolCall {
    function: ToolFunction,
}

#[derive(Deserialize)]
struct ToolFunction {
    arguments: String,
}

#[derive(Deserialize)]
struct AnalysesPayload {
    #[serde(default)]
    analyses: Vec<TriageVerdict>,
}

#[derive(Deserialize)]
struct NudgesPayload {
    #[serde(default)]
    nudges: Vec<NudgeWire>,
}

#[derive(Deserialize)]
struct NudgeWire {
    index: usize,
    nudge_text: String,
}

fn analyze_tool() -> serde_json::Value {
    json!([{
        "type": "function",
        "function": {
            "name": "analyze_conversations",
            "description": "Return analysis results for all conversation units",
            "parameters": {
                "type": "object",
                "properties": {
                    "analyses": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "index": { "type": "number", "description": "The conversation unit index" },
                                "is_actionable": { "type": "boolean", "description": "True if the unit contains a task, unresolved request, or deadline" },
                                "task_summary": { "type": "string", "description": "Brief summary of the task/request, or null" },
                                "deadline": { "type": "string", "description": "Concrete resolved ISO datetime, or null" },
                                "assignee": { "type": "string", "description": "Who the task is assigned to, or null" },
                                "urgency": { "type": "string", "enum": ["critical", "high", "medium", "low"] },
                                "trigger_message": { "type": "string", "description": "Verbatim quote that justifies the verdict" }
                            },
                            "required": ["index", "is_actionable", "urgency"],
                            "additionalProperties": false
                        }
                    }
                },
                "required": ["analyses"],
                "additionalProperties": false
            }
        }
    }])
}

fn nudge_tool() -> serde_json::Value {
    json!([{
        "type": "function",
        "function": {
            "name": "generate_nudges",
            "description": "Return nudge drafts for each actionable conversation",
            "parameters": {
                "type": "object",
                "properties": {
                    "nudges": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "index": { "type": "number" },
                                "nudge_text": { "type": "string", "description": "The polite nudge message" }
                            },
                            "required": ["index", "nudge_text"],
                            "additionalProperties": false
                        }
                    }
                },
                "required": ["nudges"],
                "additionalProperties": false
            }
        }
    }])
}

fn forced(name: &str) -> serde_json::Value {
    json!({ "type": "function", "function": { "name": name } })
}

#[async_trait]
impl Classifier for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn classify(&self, units: &[UnitForAnalysis]) -> Result<Vec<TriageVerdict>, NudgeError> {
        let payload = serde_json::to_string_pretty(units)?;
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: TRIAGE_SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!("Analyze these conversation units:\n\n{payload}"),
                },
            ],
            tools: Some(analyze_tool()),
            tool_choice: Some(forced("analyze_conversations")),
        };

        let response = self.complete(&body).await?;
        let arguments = Self::tool_arguments(&response)
            .ok_or_else(|| NudgeError::Upstream("openai: no tool call in response".to_string()))?;

        let parsed: AnalysesPayload = serde_json::from_str(arguments)
            .map_err(|e| NudgeError::Upstream(format!("openai: bad analyses payload: {e}")))?;

        debug!("openai: {} analyses returned", parsed.analyses.len());
        Ok(parsed.analyses)
    }
}

#[async_trait]
impl Generator for OpenAiClient {
    async fn draft_nudges(&self, requests: &[NudgeRequest]) -> Result<Vec<NudgeDraft>, NudgeError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let payload = serde_json::to_string(requests)?;
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: NUDGE_SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!("Generate nudge messages for these actionable items:\n\n{payload}"),
                },
            ],
            tools: Some(nudge_tool()),
            tool_choice: Some(forced("generate_nudges")),
        };

        let response = self.complete(&body).await?;
        let Some(arguments) = Self::tool_arguments(&response) else {
            warn!("openai: nudge response had no tool call");
            return Ok(Vec::new());
        };

        // Partial or malformed drafts only degrade UX; never fail here.
        let parsed: NudgesPayload = match serde_json::from_str(arguments) {
            Ok(p) => p,
            Err(e) => {
                warn!("openai: bad nudges payload: {e}");
                return Ok(Vec::new());
            }
        };

        Ok(parsed
            .nudges
            .into_iter()
            .map(|n| NudgeDraft {
                index: n.index,
                text: n.nudge_text,
            })
            .collect())
    }

    async fn draft_reminder(
        &self,
        task_summary: &str,
        assignee: Option<&str>,
    ) -> Result<String, NudgeError> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: REMINDER_SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!(
                        "Generate a secondary reminder for task: \"{task_summary}\" assigned to {}. \
                         The original nudge got no response.",
                        assignee.unwrap_or("the team")
                    ),
                },
            ],
            tools: None,
            tool_choice: None,
        };

        let response = self.complete(&body).await?;
        Self::first_content(&response)
            .ok_or_else(|| NudgeError::Upstream("openai: empty reminder response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nudge_core::triage::Urgency;

    #[test]
    fn test_analyses_payload_parsing() {
        let json = r#"{"analyses":[
            {"index":0,"is_actionable":true,"task_summary":"Send invoice","deadline":"2026-08-25T17:00:00Z","assignee":"Dana","urgency":"high","trigger_message":"I'll send the invoice by 5pm today"},
            {"index":1,"is_actionable":false,"urgency":"low"}
        ]}"#;
        let parsed: AnalysesPayload = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.analyses.len(), 2);
        assert!(parsed.analyses[0].is_actionable);
        assert_eq!(parsed.analyses[0].urgency, Urgency::High);
        assert_eq!(parsed.analyses[0].assignee.as_deref(), Some("Dana"));
        assert!(!parsed.analyses[1].is_actionable);
        assert!(parsed.analyses[1].task_summary.is_none());
    }

    #[test]
    fn test_missing_urgency_defaults_to_medium() {
        let json = r#"{"analyses":[{"index":0,"is_actionable":true}]}"#;
        let parsed: AnalysesPayload = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.analyses[0].urgency, Urgency::Medium);
    }

    #[test]
    fn test_tool_call_extraction() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":null,
            "tool_calls":[{"id":"call_1","type":"function",
            "function":{"name":"analyze_conversations","arguments":"{\"analyses\":[]}"}}]}}]}"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            OpenAiClient::tool_arguments(&resp),
            Some("{\"analyses\":[]}")
        );
    }

    #[test]
    fn test_nudge_wire_mapping() {
        let json = r#"{"nudges":[{"index":2,"nudge_text":"Hi Dana, quick check on the invoice?"}]}"#;
        let parsed: NudgesPayload = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.nudges[0].index, 2);
        assert!(parsed.nudges[0].nudge_text.starts_with("Hi Dana"));
    }
}
