//! Stage 14: extract_country (grounded in `graph/nodes/extract_country.py`).
//!
//! Unlike `translate_article`, a missing summary here is treated as fatal
//! configuration rather than a best-effort miss, matching the original.

use serde::Deserialize;

use crate::models::WorkflowState;
use crate::pipeline::llm::{LlmClient, LlmClientExt};
use crate::pipeline::stages::generate_summary::render;

const CONTENT_SNIPPET_CHARS: usize = 1000;

#[derive(Deserialize)]
struct CountryResponse {
    countries: Vec<String>,
}

pub async fn extract_country(mut state: WorkflowState, llm: &dyn LlmClient) -> WorkflowState {
    if state.is_failed() {
        return state;
    }

    let Some(article) = state.article.clone() else {
        state.fail("No article found for country extraction.");
        return state;
    };
    let Some(summary) = article.summary.clone() else {
        state.fail("Cannot extract country: summary is missing.");
        return state;
    };
    let Some(prompts) = state.active_prompts.clone() else {
        state.fail("Prompts are not loaded.");
        return state;
    };

    let snippet: String = state
        .cleaned_article_text
        .as_deref()
        .unwrap_or_default()
        .chars()
        .take(CONTENT_SNIPPET_CHARS)
        .collect();

    let user_prompt = render(
        &prompts.country_extraction_user,
        &[("title", &article.title), ("summary", &summary), ("content_snippet", &snippet)],
    );

    match llm
        .complete_structured::<CountryResponse>(&prompts.country_extraction_system, &user_prompt)
        .await
    {
        Ok(resp) => {
            if let Some(article) = state.article.as_mut() {
                article.countries = resp.countries;
            }
        }
        Err(e) => state.fail(format!("Error in extract_country: {e}")),
    }

    state
}
