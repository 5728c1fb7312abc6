use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A configured listing page the discovery scheduler (C6) periodically polls.
///
/// Invariant: `listing_url` is unique across all sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub name: String,
    pub listing_url: String,
    /// Optional substring/regex accepted-link filter.
    pub url_pattern: Option<String>,
    pub fetch_interval_minutes: i64,
    pub is_active: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    /// Per-domain delay override; falls back to [`crate::config::AppConfig::default_delay_seconds`].
    pub delay_seconds: Option<i64>,
}

impl Source {
    /// Whether this source is due for a scheduler tick (NewsAgent §4.6).
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_run_at {
            None => true,
            Some(last) => {
                let elapsed_minutes = (now - last).num_minutes();
                elapsed_minutes >= self.fetch_interval_minutes
            }
        }
    }
}

/// Status of a URL the discovery scheduler has ever seen. Persistent memory
/// of the system (NewsAgent §3): `url` is the global dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveredArticleStatus {
    Queued,
    SubmissionFailed,
    Processing,
    Processed,
    Approved,
    Rejected,
    Duplicated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredArticle {
    pub id: String,
    pub source_id: String,
    pub url: String,
    pub status: DiscoveredArticleStatus,
    pub discovered_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub final_output: Option<serde_json::Value>,
}
