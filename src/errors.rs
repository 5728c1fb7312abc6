//! Error taxonomy for the job orchestration substrate.
//!
//! Each variant corresponds to one of the error kinds the pipeline executor
//! and worker loop must distinguish between: configuration failures abort
//! the process, stage-local failures are folded into `error_message` on the
//! workflow state and never unwind past a stage boundary.

use thiserror::Error;

/// Fatal at startup: missing env, unreachable queue/store, missing prompts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("invalid value for environment variable {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("missing required prompts: {0:?}")]
    MissingPrompts(Vec<&'static str>),

    #[error("missing required environment variables: {0:?}")]
    MissingVars(Vec<&'static str>),
}

/// Governance gatekeeper (C1) failures.
#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("could not parse domain from url: {0}")]
    BadUrl(String),
}

/// Browser pool (C2) failures.
#[derive(Debug, Error)]
pub enum BrowserFetchError {
    #[error("navigation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("browser connection failed: {0}")]
    Connection(String),

    #[error("page crashed or closed unexpectedly")]
    PageClosed,
}

/// Work queue (C4) failures.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("job {0} not found")]
    NotFound(String),
}

/// The taxonomy from NewsAgent §7, folded into `WorkflowState.error_message`
/// at each pipeline stage boundary. `ValidationExhaustion` is deliberately
/// absent: reaching `validation_count >= max_retries` without validity is
/// not an error, it is handled by `select_best_summary`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Configuration(String),

    #[error("Blocked by robots.txt: {0}")]
    GovernanceDenied(String),

    #[error("{0}")]
    Fetch(String),

    #[error("{0}")]
    Llm(String),

    #[error("{0}")]
    Search(String),
}

impl PipelineError {
    /// Renders the error the way it is stored on `WorkflowState.error_message`.
    pub fn as_message(&self) -> String {
        self.to_string()
    }
}
