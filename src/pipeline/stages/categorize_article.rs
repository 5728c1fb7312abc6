//! Stage 6: categorize_article (grounded in `graph/nodes/categorize_article.py`).
//!
//! Resolves up to 3 LLM-predicted category names against the configured
//! `category_mapping`, falling back to a normalized (punctuation-stripped,
//! lowercased) match when the exact name doesn't hit — the original's
//! "fuzzy matched" fallback for bolded or whitespace-mangled LLM output.

use serde::Deserialize;

use crate::models::WorkflowState;
use crate::pipeline::llm::{LlmClient, LlmClientExt};
use crate::pipeline::stages::generate_summary::render;

const MAX_CATEGORIES: usize = 3;

#[derive(Deserialize)]
struct CategorizationResponse {
    categories: Vec<String>,
}

pub async fn categorize_article(mut state: WorkflowState, llm: &dyn LlmClient) -> WorkflowState {
    if state.is_failed() {
        return state;
    }

    let Some(article) = state.article.clone() else {
        state.fail("No article/summary found for categorization.");
        return state;
    };
    let Some(summary) = article.summary.clone() else {
        state.fail("No article/summary found for categorization.");
        return state;
    };
    let Some(prompts) = state.active_prompts.clone() else {
        state.fail("Prompts are not loaded.");
        return state;
    };
    let content_snippet: String = state
        .cleaned_article_text
        .as_deref()
        .unwrap_or_default()
        .chars()
        .take(500)
        .collect();

    let user_prompt = render(
        &prompts.categorization_user,
        &[("title", &article.title), ("summary", &summary), ("content_snippet", &content_snippet)],
    );

    match llm
        .complete_structured::<CategorizationResponse>(&prompts.categorization_system, &user_prompt)
        .await
    {
        Ok(resp) => {
            let predicted: Vec<String> = resp.categories.into_iter().take(MAX_CATEGORIES).collect();
            let mapped_ids = resolve_category_ids(&predicted, &state.category_mapping);

            if let Some(article) = state.article.as_mut() {
                article.category = predicted;
                article.category_ids = mapped_ids;
            }
        }
        Err(e) => state.fail(format!("Error in categorize: {e}")),
    }

    state
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

fn resolve_category_ids(
    predicted: &[String],
    category_map: &std::collections::HashMap<String, String>,
) -> Vec<String> {
    let normalized_map: std::collections::HashMap<String, String> = category_map
        .iter()
        .map(|(name, id)| (normalize(name), id.clone()))
        .collect();

    predicted
        .iter()
        .filter_map(|name| {
            category_map
                .get(name)
                .cloned()
                .or_else(|| normalized_map.get(&normalize(name)).cloned())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuzzy_matches_on_normalized_name() {
        let mut map = std::collections::HashMap::new();
        map.insert("Market News".to_string(), "uuid-1".to_string());

        let ids = resolve_category_ids(&["**market news**".to_string()], &map);
        assert_eq!(ids, vec!["uuid-1".to_string()]);
    }

    #[test]
    fn unmapped_category_is_dropped() {
        let map = std::collections::HashMap::new();
        let ids = resolve_category_ids(&["Unknown".to_string()], &map);
        assert!(ids.is_empty());
    }
}
