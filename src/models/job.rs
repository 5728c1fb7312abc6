use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The unit placed on the work queue (NewsAgent §3/§4.4). Produced by the
/// Job API or the discovery scheduler; consumed exactly once by a worker in
/// the absence of a crash between pop and status write (see SPEC_FULL §9,
/// at-least-once open question).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub job_id: Uuid,
    pub source_url: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    pub timestamp: String,
}

fn default_max_retries() -> u32 {
    3
}

impl JobEnvelope {
    #[must_use]
    pub fn new(source_url: String, max_retries: u32, now_rfc3339: String) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            source_url,
            max_retries,
            timestamp: now_rfc3339,
        }
    }
}

/// Lifecycle states observable on `job:<id>.status`. Transitions on the
/// success path form a subsequence of `Queued -> Processing -> Completed`
/// (NewsAgent §8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Crashed,
    #[serde(rename = "re-queued")]
    Requeued,
}

/// Side-channel record keyed by job_id, stored as a Redis hash with a 24h
/// expiry (NewsAgent §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusRecord {
    pub status: JobStatus,
    pub source_url: String,
    pub created_at: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub traceback: Option<String>,
}
