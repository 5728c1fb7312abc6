//! Stage "link scoring" (C10, grounded in `graph/nodes/check_embedded_links.py`).
//!
//! Bounded-parallel fan-out: each embedded link gets its own browser
//! context drawn from the shared pool (NewsAgent §5's accepted exception —
//! link-scoring shares the browser-context semaphore with `fetch` rather
//! than owning a second one), a 15s navigate budget, and a structured-output
//! relevance call. Any failure along that chain scores the link `0.0`
//! rather than failing the stage.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::debug;

use crate::browser_pool::BrowserPool;
use crate::models::{EmbeddedLink, WorkflowState};
use crate::pipeline::llm::{LlmClient, LlmClientExt};
use crate::pipeline::stages::generate_summary::render;

const NAV_TIMEOUT: Duration = Duration::from_secs(15);
const VISIBLE_TEXT_CHARS: usize = 1500;

#[derive(Deserialize)]
struct RelevanceResponse {
    score: f64,
    #[allow(dead_code)]
    reason: String,
}

pub async fn check_embedded_links(
    mut state: WorkflowState,
    llm: &dyn LlmClient,
    browser_pool: Arc<BrowserPool>,
    concurrency: usize,
) -> WorkflowState {
    if state.is_failed() {
        return state;
    }

    let Some(article) = state.article.clone() else {
        return state;
    };
    if article.embedded_links.is_empty() {
        return state;
    }
    let Some(prompts) = state.active_prompts.clone() else {
        state.fail("Prompts are not loaded.");
        return state;
    };
    let summary = article.summary.clone().unwrap_or_default();

    let prompts_system = prompts.relevance_system.clone();
    let prompts_user = prompts.relevance_user.clone();
    let summary = Arc::new(summary);

    let scored: Vec<EmbeddedLink> = stream::iter(article.embedded_links.into_iter())
        .map(|link| {
            let pool = Arc::clone(&browser_pool);
            let system = prompts_system.clone();
            let user_template = prompts_user.clone();
            let summary = Arc::clone(&summary);
            async move {
                let score = score_link(&link, &pool, llm, &system, &user_template, &summary).await;
                EmbeddedLink { relevance_score: Some(score), ..link }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    if let Some(article) = state.article.as_mut() {
        article.embedded_links = scored;
    }

    state
}

async fn score_link(
    link: &EmbeddedLink,
    pool: &Arc<BrowserPool>,
    llm: &dyn LlmClient,
    relevance_system: &str,
    relevance_user_template: &str,
    article_summary: &str,
) -> f64 {
    let text = match fetch_visible_text(link, pool).await {
        Ok(t) => t,
        Err(e) => {
            debug!("link-scoring fetch failed for {}: {e}", link.absolute_url);
            return 0.0;
        }
    };

    let user_prompt = render(
        relevance_user_template,
        &[("article_summary", article_summary), ("link_text", &link.hyperlink_text), ("linked_page_text", &text)],
    );

    match llm
        .complete_structured::<RelevanceResponse>(relevance_system, &user_prompt)
        .await
    {
        Ok(resp) => resp.score,
        Err(e) => {
            debug!("link-scoring LLM call failed for {}: {e}", link.absolute_url);
            0.0
        }
    }
}

async fn fetch_visible_text(link: &EmbeddedLink, pool: &Arc<BrowserPool>) -> anyhow::Result<String> {
    let guard = pool.acquire().await?;
    let browser = guard.browser();
    let page = browser.new_page("about:blank").await?;

    let navigation = tokio::time::timeout(NAV_TIMEOUT, page.goto(&link.absolute_url)).await;
    navigation.map_err(|_| anyhow::anyhow!("navigation timed out"))??;

    let html = page.content().await?;
    let document = Html::parse_document(&html);
    let selector = Selector::parse("body").map_err(|e| anyhow::anyhow!("selector parse error: {e:?}"))?;

    let text: String = document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
        .chars()
        .take(VISIBLE_TEXT_CHARS)
        .collect();

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevance_response_deserializes_score_and_reason() {
        let raw = r#"{"score": 7.5, "reason": "directly corroborates the claim"}"#;
        let resp: RelevanceResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.score, 7.5);
    }
}
