use serde::{Deserialize, Serialize};

use super::{AgentPrompts, Article};
use std::collections::HashMap;

/// The value threaded through the pipeline executor (NewsAgent §3/§4.5).
///
/// Invariant: `validation_count == summary_attempts.len()`.
/// Invariant: once `error_message` is set, no downstream stage may mutate
/// `article` — every stage inspects `error_message` first and returns the
/// state unchanged if it is set (the fail-fast sentinel, NewsAgent §9).
#[derive(Debug, Clone)]
pub struct WorkflowState {
    pub source_url: String,

    pub active_prompts: Option<AgentPrompts>,
    pub category_mapping: HashMap<String, String>,

    pub cleaned_article_text: Option<String>,
    pub cleaned_article_html: Option<String>,

    pub article: Option<Article>,

    pub summary_attempts: Vec<super::SummaryAttempt>,
    pub validation_result: Option<super::ValidationResult>,
    pub validation_count: u32,

    pub other_sources: Vec<serde_json::Value>,
    pub search_queries: Vec<String>,

    pub max_retries: u32,
    pub error_message: Option<String>,
}

impl WorkflowState {
    #[must_use]
    pub fn new(source_url: String, max_retries: u32) -> Self {
        Self {
            source_url,
            active_prompts: None,
            category_mapping: HashMap::new(),
            cleaned_article_text: None,
            cleaned_article_html: None,
            article: None,
            summary_attempts: Vec::new(),
            validation_result: None,
            validation_count: 0,
            other_sources: Vec::new(),
            search_queries: Vec::new(),
            max_retries,
            error_message: None,
        }
    }

    /// The fail-fast gate every stage calls first.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.error_message.is_some()
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }
}

/// Serializable projection of the terminal article, the `data` payload of
/// the webhook POST (NewsAgent §4.8/§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleDump {
    pub source_url: String,
    pub article: Article,
}
