//! The nudge engine: triage pipeline, tracker reconciliation, and
//! followup scheduling over injected capabilities.

mod followups;
mod reconcile;
mod triage;

pub use followups::ReminderOutcome;
pub use triage::TriageOutcome;

use nudge_core::{
    config::Config,
    error::NudgeError,
    traits::{ChatClient, Classifier, Generator, Tracker},
};
use nudge_memory::Store;
use std::sync::Arc;
use tracing::{debug, warn};

/// One engine per request context. All capabilities are injected;
/// nothing in here touches ambient process state.
pub struct Engine {
    store: Store,
    classifier: Arc<dyn Classifier>,
    generator: Arc<dyn Generator>,
    chat: Arc<dyn ChatClient>,
    /// The owner's tracker integration, if one is configured and usable.
    tracker: Option<Arc<dyn Tracker>>,
    owner_user_id: String,
}

impl Engine {
    pub fn new(
        store: Store,
        classifier: Arc<dyn Classifier>,
        generator: Arc<dyn Generator>,
        chat: Arc<dyn ChatClient>,
        tracker: Option<Arc<dyn Tracker>>,
        owner_user_id: String,
    ) -> Self {
        Self {
            store,
            classifier,
            generator,
            chat,
            tracker,
            owner_user_id,
        }
    }

    /// Wire up the production capabilities from config plus the
    /// owner's persisted tracker integration.
    pub async fn from_config(config: &Config, store: Store) -> Result<Self, NudgeError> {
        let classifier = Arc::new(nudge_providers::openai::OpenAiClient::from_config(
            &config.classifier,
        ));
        let generator = Arc::new(nudge_providers::openai::OpenAiClient::from_config(
            &config.classifier,
        ));
        let chat = Arc::new(nudge_channels::slack::SlackClient::from_config(&config.slack));

        let owner = config.engine.owner_user_id.clone();
        let tracker = Self::load_tracker(&store, &owner).await;

        Ok(Self::new(store, classifier, generator, chat, tracker, owner))
    }

    /// Resolve the owner's tracker integration into an adapter.
    /// Unusable or absent integrations disable reconciliation for the
    /// run; they never fail it.
    async fn load_tracker(store: &Store, owner: &str) -> Option<Arc<dyn Tracker>> {
        if owner.is_empty() {
            return None;
        }
        let integration = match store.get_integration(owner).await {
            Ok(Some(i)) => i,
            Ok(None) => {
                debug!("no tracker integration configured");
                return None;
            }
            Err(e) => {
                warn!("tracker integration lookup failed: {e}");
                return None;
            }
        };
        match nudge_trackers::from_integration(
            &integration.provider,
            &integration.config_map(),
            &integration.api_token,
        ) {
            Ok(tracker) => Some(Arc::from(tracker)),
            Err(e) => {
                warn!("tracker integration unusable: {e}");
                None
            }
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Fail early when no owner is configured; nothing may reach an
    /// external service on an unauthenticated run.
    pub(crate) fn require_owner(&self) -> Result<&str, NudgeError> {
        if self.owner_user_id.is_empty() {
            return Err(NudgeError::Auth(
                "no owner user configured (engine.owner_user_id)".to_string(),
            ));
        }
        Ok(&self.owner_user_id)
    }
}
