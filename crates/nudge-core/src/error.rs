use thiserror::Error;

/// Top-level error type for the nudge engine.
///
/// The triage pipeline distinguishes hard failures (grouping, dedup,
/// classification — the run aborts, nothing is persisted) from soft
/// ones (drafting, tracker reconciliation — logged, the run degrades).
/// Soft failures never surface as a `NudgeError` from the pipeline;
/// they are caught at the step that produced them.
#[derive(Debug, Error)]
pub enum NudgeError {
    /// Caller supplied missing or malformed input. No external calls were made.
    #[error("invalid input: {0}")]
    Input(String),

    /// Caller is not authenticated / no owner configured. No external calls were made.
    #[error("unauthorized: {0}")]
    Auth(String),

    /// The classifier signalled backpressure. The run can be retried later.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Classifier or generator call failed.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Chat or mail platform error.
    #[error("channel error: {0}")]
    Channel(String),

    /// Issue tracker error.
    #[error("tracker error: {0}")]
    Tracker(String),

    /// Persistent store error.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NudgeError {
    /// Whether the caller should retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NudgeError::RateLimited(_))
    }
}
