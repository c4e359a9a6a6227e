//! Asana adapter (REST). Priority has no Asana equivalent; urgency
//! only shows up in the task notes.

use async_trait::async_trait;
use nudge_core::{
    error::NudgeError,
    traits::{CreatedIssue, NewIssue, Tracker, TrackerIssue},
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

const ASANA_API: &str = "https://app.asana.com/api/1.0";

pub struct AsanaTracker {
    client: reqwest::Client,
    api_token: String,
    project_id: String,
    base_url: String,
}

impl AsanaTracker {
    pub fn new(api_token: String, project_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_token,
            project_id,
            base_url: ASANA_API.to_string(),
        }
    }

    fn task_url(&self, gid: &str) -> String {
        format!("https://app.asana.com/0/{}/{gid}", self.project_id)
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, NudgeError> {
        let url = format!("{}{path}", self.base_url);
        let mut req = self
            .client
            .request(method, &url)
            .header("Authorization", format!("Bearer {}", self.api_token));
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| NudgeError::Tracker(format!("asana request failed: {e}")))?;

        let body: Value = resp
            .json()
            .await
            .map_err(|e| NudgeError::Tracker(format!("asana: bad response: {e}")))?;

        if let Some(errors) = body.get("errors").and_then(|e| e.as_array()) {
            let message = errors
                .first()
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            return Err(NudgeError::Tracker(format!("asana: {message}")));
        }
        Ok(body)
    }
}

#[derive(Deserialize)]
struct TaskList {
    #[serde(default)]
    data: Vec<AsanaTask>,
}

#[derive(Deserialize)]
struct AsanaTask {
    gid: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    completed: bool,
}

#[async_trait]
impl Tracker for AsanaTracker {
    fn name(&self) -> &str {
        "asana"
    }

    /// Asana has no free-text issue search scoped to a project, so the
    /// project's open tasks serve as the candidate set; the caller's
    /// overlap scoring does the actual matching.
    async fn search_issues(&self, _query: &str) -> Result<Vec<TrackerIssue>, NudgeError> {
        let body = self
            .request(
                reqwest::Method::GET,
                &format!(
                    "/projects/{}/tasks?opt_fields=name,completed",
                    self.project_id
                ),
                None,
            )
            .await?;

        let parsed: TaskList = serde_json::from_value(body)?;
        Ok(parsed
            .data
            .into_iter()
            .filter(|t| !t.completed)
            .map(|t| TrackerIssue {
                url: Some(self.task_url(&t.gid)),
                identifier: t.gid.clone(),
                id: t.gid,
                title: t.name,
            })
            .collect())
    }

    async fn create_issue(&self, issue: &NewIssue) -> Result<CreatedIssue, NudgeError> {
        let body = self
            .request(
                reqwest::Method::POST,
                "/tasks",
                Some(json!({
                    "data": {
                        "name": issue.title,
                        "notes": issue.description,
                        "projects": [self.project_id],
                    }
                })),
            )
            .await?;

        let gid = body
            .pointer("/data/gid")
            .and_then(|g| g.as_str())
            .ok_or_else(|| NudgeError::Tracker("asana: created task has no gid".to_string()))?;

        Ok(CreatedIssue {
            identifier: gid.to_string(),
            url: Some(self.task_url(gid)),
        })
    }

    async fn resolve_issue(&self, identifier: &str) -> Result<(), NudgeError> {
        self.request(
            reqwest::Method::PUT,
            &format!("/tasks/{identifier}"),
            Some(json!({ "data": { "completed": true } })),
        )
        .await?;
        info!("asana: task {identifier} completed");
        Ok(())
    }

    async fn test_connection(&self) -> Result<String, NudgeError> {
        let body = self
            .request(reqwest::Method::GET, "/users/me", None)
            .await?;
        body.pointer("/data/name")
            .and_then(|n| n.as_str())
            .map(String::from)
            .ok_or_else(|| NudgeError::Tracker("asana: user lookup failed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_list_filters_nothing_at_parse_time() {
        let json = r#"{"data":[
            {"gid":"1","name":"Open task","completed":false},
            {"gid":"2","name":"Done task","completed":true}
        ]}"#;
        let parsed: TaskList = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.data.len(), 2);
        assert!(parsed.data[1].completed);
    }
}
