//! # nudge-trackers
//!
//! Issue-tracker provider adapters. Each provider implements the
//! [`Tracker`] capability trait from `nudge-core`; the engine never
//! sees provider specifics.

pub mod asana;
pub mod jira;
pub mod linear;
pub mod webhook;

use nudge_core::{error::NudgeError, traits::Tracker};
use std::collections::HashMap;

/// Sentinel identifier for tasks mirrored to a webhook — there is no
/// addressable issue behind it, so resolve-side sync skips it.
pub const WEBHOOK_TASK_ID: &str = "webhook";

/// Build the tracker adapter for a persisted integration row.
///
/// A missing required config field is a [`NudgeError::Config`] — the
/// caller treats that as "no usable integration" and skips
/// reconciliation for the batch.
pub fn from_integration(
    provider: &str,
    config: &HashMap<String, String>,
    api_token: &str,
) -> Result<Box<dyn Tracker>, NudgeError> {
    // Webhooks carry no credential; every API-backed provider does.
    if api_token.is_empty() && provider != "webhook" {
        return Err(NudgeError::Config(format!(
            "{provider} integration has no API token"
        )));
    }

    let require = |key: &str| -> Result<String, NudgeError> {
        config
            .get(key)
            .filter(|v| !v.is_empty())
            .cloned()
            .ok_or_else(|| NudgeError::Config(format!("{provider} integration missing {key}")))
    };

    match provider {
        "linear" => Ok(Box::new(linear::LinearTracker::new(
            api_token.to_string(),
            require("team_id")?,
        ))),
        "jira" => Ok(Box::new(jira::JiraTracker::new(
            api_token.to_string(),
            require("domain")?,
            require("project_key")?,
            require("email")?,
        ))),
        "asana" => Ok(Box::new(asana::AsanaTracker::new(
            api_token.to_string(),
            require("project_id")?,
        ))),
        "webhook" => Ok(Box::new(webhook::WebhookTracker::new(require(
            "webhook_url",
        )?))),
        other => Err(NudgeError::Config(format!("unknown provider: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_requires_provider_config() {
        let empty = HashMap::new();
        assert!(from_integration("linear", &empty, "token").is_err());
        assert!(from_integration("jira", &empty, "token").is_err());
        assert!(from_integration("nonsense", &empty, "token").is_err());
        assert!(from_integration("webhook", &empty, "").is_err());

        let mut hook = HashMap::new();
        hook.insert("webhook_url".to_string(), "https://hooks.example/t".to_string());
        assert!(from_integration("webhook", &hook, "").is_ok());

        let mut config = HashMap::new();
        config.insert("team_id".to_string(), "t-1".to_string());
        assert!(from_integration("linear", &config, "").is_err());
        let tracker = from_integration("linear", &config, "token").unwrap();
        assert_eq!(tracker.name(), "linear");
    }
}
