//! Pipeline Executor (C5): runs one [`crate::models::WorkflowState`] through
//! every stage in `stages/` in the original's fixed DAG order, looping the
//! generate/validate pair until [`stages::validate_summary::should_retry`]
//! says stop.

pub mod llm;
pub mod search;
pub mod stages;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::browser_pool::BrowserPool;
use crate::config::AppConfig;
use crate::governance::GovernanceGatekeeper;
use crate::models::WorkflowState;
use crate::store::Store;

use llm::LlmClient;
use search::SearchClient;

/// Every external collaborator and shared resource a full pipeline run
/// touches, held for the lifetime of a worker process and cloned cheaply
/// (everything here is an `Arc` or a `Clone`-cheap handle) per job.
#[derive(Clone)]
pub struct Executor {
    store: Store,
    governance: Arc<Mutex<GovernanceGatekeeper>>,
    browser_pool: Arc<BrowserPool>,
    llm: Arc<dyn LlmClient>,
    search: Arc<dyn SearchClient>,
    http_client: reqwest::Client,
    user_agent: String,
    webhook_url: Option<String>,
    webhook_secret: Option<String>,
    seo_publisher_name: String,
    seo_publisher_url: String,
    seo_publisher_logo_url: String,
    link_scoring_concurrency: usize,
}

impl Executor {
    #[must_use]
    pub fn new(
        config: &AppConfig,
        store: Store,
        governance: Arc<Mutex<GovernanceGatekeeper>>,
        browser_pool: Arc<BrowserPool>,
        llm: Arc<dyn LlmClient>,
        search: Arc<dyn SearchClient>,
    ) -> Self {
        Self {
            store,
            governance,
            browser_pool,
            llm,
            search,
            http_client: reqwest::Client::new(),
            user_agent: config.user_agent.clone(),
            webhook_url: config.webhook_url.clone(),
            webhook_secret: config.webhook_secret.clone(),
            seo_publisher_name: config.seo_publisher_name.clone(),
            seo_publisher_url: config.seo_publisher_url.clone(),
            seo_publisher_logo_url: config.seo_publisher_logo_url.clone(),
            link_scoring_concurrency: config.link_scoring_concurrency(),
        }
    }

    /// Runs the full enrichment pipeline for one job envelope's `source_url`,
    /// returning the terminal [`WorkflowState`] (successful or failed — the
    /// caller inspects `error_message` to decide DLQ vs completion).
    pub async fn run(&self, source_url: String, max_retries: u32) -> WorkflowState {
        let mut state = WorkflowState::new(source_url, max_retries);

        match self.store.load_agent_prompts().await {
            Ok(prompts) => state.active_prompts = Some(prompts),
            Err(e) => {
                state.fail(format!("Configuration error: failed to load prompts: {e}"));
                return state;
            }
        }
        match self.store.category_mapping().await {
            Ok(mapping) => state.category_mapping = mapping,
            Err(e) => warn!("failed to load category mapping, categorization will drop unmapped names: {e}"),
        }

        state = stages::fetch::fetch(state, Arc::clone(&self.governance), Arc::clone(&self.browser_pool), &self.user_agent).await;
        state = stages::extract_links::extract_links(state);

        loop {
            state = stages::generate_summary::generate_summary(state, self.llm.as_ref()).await;
            state = stages::validate_summary::validate_summary(state, self.llm.as_ref()).await;
            if !stages::validate_summary::should_retry(&state) {
                break;
            }
        }
        state = stages::select_best_summary::select_best_summary(state);

        state = stages::check_embedded_links::check_embedded_links(
            state,
            self.llm.as_ref(),
            Arc::clone(&self.browser_pool),
            self.link_scoring_concurrency,
        )
        .await;
        state = stages::find_other_sources::find_other_sources(state, self.llm.as_ref(), self.search.as_ref()).await;

        state = stages::categorize_article::categorize_article(state, self.llm.as_ref()).await;
        state = stages::generate_seo::generate_seo(
            state,
            self.llm.as_ref(),
            stages::generate_seo::SeoPublisher {
                name: &self.seo_publisher_name,
                url: &self.seo_publisher_url,
                logo_url: &self.seo_publisher_logo_url,
            },
        )
        .await;

        state = stages::translate_article::translate_article(state, self.llm.as_ref()).await;
        state = stages::extract_country::extract_country(state, self.llm.as_ref()).await;
        state = stages::calculate_reading_time::calculate_reading_time(state);

        state = stages::notify_webhook::notify_webhook(
            state,
            &self.http_client,
            self.webhook_url.as_deref(),
            self.webhook_secret.as_deref(),
        )
        .await;

        if state.is_failed() {
            warn!("pipeline run failed for {}: {:?}", state.source_url, state.error_message);
        } else {
            info!("pipeline run completed for {}", state.source_url);
        }

        state
    }
}
