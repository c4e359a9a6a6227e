//! Jira Cloud adapter (REST v3, Basic auth).

use async_trait::async_trait;
use base64::Engine as _;
use nudge_core::{
    error::NudgeError,
    traits::{CreatedIssue, NewIssue, Tracker, TrackerIssue},
    triage::Urgency,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

fn priority_for(urgency: Urgency) -> &'static str {
    match urgency {
        Urgency::Critical => "Highest",
        Urgency::High => "High",
        Urgency::Medium => "Medium",
        Urgency::Low => "Low",
    }
}

pub struct JiraTracker {
    client: reqwest::Client,
    api_token: String,
    domain: String,
    project_key: String,
    email: String,
}

impl JiraTracker {
    pub fn new(api_token: String, domain: String, project_key: String, email: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_token,
            domain,
            project_key,
            email,
        }
    }

    fn auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.email, self.api_token);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(credentials)
        )
    }

    fn browse_url(&self, key: &str) -> String {
        format!("https://{}/browse/{key}", self.domain)
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, NudgeError> {
        let url = format!("https://{}{path}", self.domain);
        let mut req = self
            .client
            .request(method, &url)
            .header("Authorization", self.auth_header());
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| NudgeError::Tracker(format!("jira request failed: {e}")))?;

        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            let message = body
                .get("errorMessages")
                .and_then(|m| m.as_array())
                .and_then(|m| m.first())
                .and_then(|m| m.as_str())
                .unwrap_or("request failed");
            return Err(NudgeError::Tracker(format!("jira ({status}): {message}")));
        }
        Ok(body)
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<JiraIssue>,
}

#[derive(Deserialize)]
struct JiraIssue {
    id: String,
    key: String,
    fields: JiraFields,
}

#[derive(Deserialize)]
struct JiraFields {
    #[serde(default)]
    summary: String,
}

#[async_trait]
impl Tracker for JiraTracker {
    fn name(&self) -> &str {
        "jira"
    }

    async fn search_issues(&self, query: &str) -> Result<Vec<TrackerIssue>, NudgeError> {
        let sanitized = query.replace('"', " ");
        let jql = format!(
            "project = {} AND summary ~ \"{sanitized}\" ORDER BY created DESC",
            self.project_key
        );
        let body = self
            .request(
                reqwest::Method::POST,
                "/rest/api/3/search",
                Some(json!({ "jql": jql, "maxResults": 5, "fields": ["summary"] })),
            )
            .await?;

        let parsed: SearchResponse = serde_json::from_value(body)?;
        Ok(parsed
            .issues
            .into_iter()
            .map(|i| TrackerIssue {
                id: i.id,
                url: Some(self.browse_url(&i.key)),
                title: i.fields.summary,
                identifier: i.key,
            })
            .collect())
    }

    async fn create_issue(&self, issue: &NewIssue) -> Result<CreatedIssue, NudgeError> {
        let body = self
            .request(
                reqwest::Method::POST,
                "/rest/api/3/issue",
                Some(json!({
                    "fields": {
                        "project": { "key": self.project_key },
                        "summary": issue.title,
                        "description": {
                            "type": "doc",
                            "version": 1,
                            "content": [{
                                "type": "paragraph",
                                "content": [{ "type": "text", "text": issue.description }]
                            }]
                        },
                        "issuetype": { "name": "Task" },
                        "priority": { "name": priority_for(issue.priority) }
                    }
                })),
            )
            .await?;

        let key = body
            .get("key")
            .and_then(|k| k.as_str())
            .ok_or_else(|| NudgeError::Tracker("jira: created issue has no key".to_string()))?;

        Ok(CreatedIssue {
            identifier: key.to_string(),
            url: Some(self.browse_url(key)),
        })
    }

    async fn resolve_issue(&self, identifier: &str) -> Result<(), NudgeError> {
        let body = self
            .request(
                reqwest::Method::GET,
                &format!("/rest/api/3/issue/{identifier}/transitions"),
                None,
            )
            .await?;

        // Pick the transition landing in the "done" status category.
        let done_transition = body
            .get("transitions")
            .and_then(|t| t.as_array())
            .and_then(|transitions| {
                transitions.iter().find(|t| {
                    t.pointer("/to/statusCategory/key").and_then(|k| k.as_str()) == Some("done")
                })
            })
            .and_then(|t| t.get("id"))
            .and_then(|id| id.as_str())
            .map(String::from);

        let Some(transition_id) = done_transition else {
            warn!("jira: no done transition for {identifier}, skipping resolve");
            return Ok(());
        };

        self.request(
            reqwest::Method::POST,
            &format!("/rest/api/3/issue/{identifier}/transitions"),
            Some(json!({ "transition": { "id": transition_id } })),
        )
        .await?;

        info!("jira: issue {identifier} transitioned to done");
        Ok(())
    }

    async fn test_connection(&self) -> Result<String, NudgeError> {
        let body = self
            .request(reqwest::Method::GET, "/rest/api/3/myself", None)
            .await?;
        body.get("displayName")
            .and_then(|n| n.as_str())
            .map(String::from)
            .ok_or_else(|| NudgeError::Tracker("jira: myself lookup failed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_names() {
        assert_eq!(priority_for(Urgency::Critical), "Highest");
        assert_eq!(priority_for(Urgency::Low), "Low");
    }

    #[test]
    fn test_search_response_parsing() {
        let json = r#"{"issues":[{"id":"10001","key":"OPS-7","fields":{"summary":"Ship Q4 report"}}]}"#;
        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.issues[0].key, "OPS-7");
        assert_eq!(parsed.issues[0].fields.summary, "Ship Q4 report");
    }
}
