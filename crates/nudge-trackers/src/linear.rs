//! Linear adapter (GraphQL).

use async_trait::async_trait;
use nudge_core::{
    error::NudgeError,
    traits::{CreatedIssue, NewIssue, Tracker, TrackerIssue},
    triage::Urgency,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

const LINEAR_API: &str = "https://api.linear.app/graphql";

/// Linear priority scale: 1 = urgent .. 4 = low.
fn priority_for(urgency: Urgency) -> u8 {
    match urgency {
        Urgency::Critical => 1,
        Urgency::High => 2,
        Urgency::Medium => 3,
        Urgency::Low => 4,
    }
}

pub struct LinearTracker {
    client: reqwest::Client,
    api_token: String,
    team_id: String,
    base_url: String,
}

impl LinearTracker {
    pub fn new(api_token: String, team_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_token,
            team_id,
            base_url: LINEAR_API.to_string(),
        }
    }

    async fn graphql(&self, query: &str, variables: Value) -> Result<Value, NudgeError> {
        let resp = self
            .client
            .post(&self.base_url)
            .header("Authorization", &self.api_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| NudgeError::Tracker(format!("linear request failed: {e}")))?;

        let body: Value = resp
            .json()
            .await
            .map_err(|e| NudgeError::Tracker(format!("linear: bad response: {e}")))?;

        if let Some(errors) = body.get("errors").and_then(|e| e.as_array()) {
            let message = errors
                .first()
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            return Err(NudgeError::Tracker(format!("linear: {message}")));
        }
        Ok(body)
    }
}

#[derive(Deserialize)]
struct IssueNode {
    id: String,
    identifier: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: String,
}

#[async_trait]
impl Tracker for LinearTracker {
    fn name(&self) -> &str {
        "linear"
    }

    async fn search_issues(&self, query: &str) -> Result<Vec<TrackerIssue>, NudgeError> {
        let body = self
            .graphql(
                "query SearchIssues($query: String!) {
                   issueSearch(query: $query, first: 5) {
                     nodes { id identifier url title }
                   }
                 }",
                json!({ "query": query }),
            )
            .await?;

        let nodes: Vec<IssueNode> = body
            .pointer("/data/issueSearch/nodes")
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();

        Ok(nodes
            .into_iter()
            .map(|n| TrackerIssue {
                id: n.id,
                identifier: n.identifier,
                url: n.url,
                title: n.title,
            })
            .collect())
    }

    async fn create_issue(&self, issue: &NewIssue) -> Result<CreatedIssue, NudgeError> {
        let body = self
            .graphql(
                "mutation CreateIssue($input: IssueCreateInput!) {
                   issueCreate(input: $input) {
                     success
                     issue { id identifier url }
                   }
                 }",
                json!({
                    "input": {
                        "teamId": self.team_id,
                        "title": issue.title,
                        "description": issue.description,
                        "priority": priority_for(issue.priority),
                    }
                }),
            )
            .await?;

        if body.pointer("/data/issueCreate/success") != Some(&Value::Bool(true)) {
            return Err(NudgeError::Tracker(
                "linear: issue creation failed".to_string(),
            ));
        }

        let created: IssueNode = body
            .pointer("/data/issueCreate/issue")
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .ok_or_else(|| NudgeError::Tracker("linear: created issue missing".to_string()))?;

        Ok(CreatedIssue {
            identifier: created.identifier,
            url: created.url,
        })
    }

    async fn resolve_issue(&self, identifier: &str) -> Result<(), NudgeError> {
        // Find the issue's internal id from its human identifier.
        let body = self
            .graphql(
                "query FindIssue($identifier: String!) {
                   issueSearch(query: $identifier, first: 1) {
                     nodes { id identifier }
                   }
                 }",
                json!({ "identifier": identifier }),
            )
            .await?;

        let Some(issue_id) = body
            .pointer("/data/issueSearch/nodes/0/id")
            .and_then(|v| v.as_str())
            .map(String::from)
        else {
            info!("linear: issue {identifier} not found, skipping resolve");
            return Ok(());
        };

        // The team's "completed"-type workflow state.
        let body = self
            .graphql(
                "query GetDoneState($teamId: String!) {
                   workflowStates(filter: { team: { id: { eq: $teamId } }, type: { eq: \"completed\" } }) {
                     nodes { id name }
                   }
                 }",
                json!({ "teamId": self.team_id }),
            )
            .await?;

        let Some(state_id) = body
            .pointer("/data/workflowStates/nodes/0/id")
            .and_then(|v| v.as_str())
            .map(String::from)
        else {
            warn!(
                "linear: no completed workflow state for team {}, skipping resolve",
                self.team_id
            );
            return Ok(());
        };

        self.graphql(
            "mutation UpdateIssue($id: String!, $input: IssueUpdateInput!) {
               issueUpdate(id: $id, input: $input) {
                 success
                 issue { id state { name } }
               }
             }",
            json!({ "id": issue_id, "input": { "stateId": state_id } }),
        )
        .await?;

        info!("linear: issue {identifier} moved to completed state");
        Ok(())
    }

    async fn test_connection(&self) -> Result<String, NudgeError> {
        let body = self
            .graphql("{ viewer { id name } }", json!({}))
            .await?;
        body.pointer("/data/viewer/name")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| NudgeError::Tracker("linear: viewer lookup failed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_mapping() {
        assert_eq!(priority_for(Urgency::Critical), 1);
        assert_eq!(priority_for(Urgency::High), 2);
        assert_eq!(priority_for(Urgency::Medium), 3);
        assert_eq!(priority_for(Urgency::Low), 4);
    }

    #[test]
    fn test_issue_node_parsing() {
        let json = r#"{"id":"uuid-1","identifier":"ENG-142","url":"https://linear.app/x/issue/ENG-142","title":"Ship Q4 report to finance"}"#;
        let node: IssueNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.identifier, "ENG-142");
        assert_eq!(node.title, "Ship Q4 report to finance");
    }
}
