//! Stage "search fan-out" (C10, grounded in `graph/nodes/find_other_sources.py`).
//!
//! Generates 3-5 corroborating search queries via structured LLM output,
//! then runs them sequentially against the search collaborator, unioning
//! hits by URL into a seen-set seeded with the article's own source URL.

use serde::Deserialize;
use serde_json::json;

use crate::models::WorkflowState;
use crate::pipeline::llm::{LlmClient, LlmClientExt};
use crate::pipeline::search::SearchClient;
use crate::pipeline::stages::generate_summary::render;

const MAX_RESULTS_PER_QUERY: usize = 5;

#[derive(Deserialize)]
struct SearchQueriesResponse {
    queries: Vec<String>,
}

pub async fn find_other_sources(
    mut state: WorkflowState,
    llm: &dyn LlmClient,
    search: &dyn SearchClient,
) -> WorkflowState {
    if state.is_failed() {
        return state;
    }

    let Some(article) = state.article.clone() else {
        return state;
    };
    let Some(summary) = article.summary.clone() else {
        return state;
    };
    let Some(prompts) = state.active_prompts.clone() else {
        state.fail("Prompts are not loaded.");
        return state;
    };

    let user_prompt = render(&prompts.search_user, &[("title", &article.title), ("summary", &summary)]);

    let queries = match llm
        .complete_structured::<SearchQueriesResponse>(&prompts.search_system, &user_prompt)
        .await
    {
        Ok(resp) => resp.queries,
        Err(e) => {
            // Best-effort enrichment: a failed fan-out leaves other_sources
            // empty rather than failing the pipeline.
            tracing::debug!("find_other_sources query generation failed: {e}");
            state.search_queries = Vec::new();
            return state;
        }
    };

    state.search_queries = queries.clone();

    let mut seen_urls = std::collections::HashSet::new();
    seen_urls.insert(state.source_url.clone());

    let mut results = Vec::new();
    for query in &queries {
        let hits = match search.search(query, MAX_RESULTS_PER_QUERY).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::debug!("search query {query:?} failed: {e}");
                continue;
            }
        };
        for hit in hits {
            if seen_urls.insert(hit.url.clone()) {
                results.push(json!({ "url": hit.url, "content": hit.content }));
            }
        }
    }

    state.other_sources = results;
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_query_list() {
        let raw = r#"{"queries": ["a", "b", "c"]}"#;
        let resp: SearchQueriesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.queries.len(), 3);
    }
}
