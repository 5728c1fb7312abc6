//! Stage 13: translate_article (grounded in `graph/nodes/translate_article.py`).
//!
//! Best-effort: unlike every other stage, failure here never sets
//! `error_message` — it logs and leaves `title_ar`/`summary_ar`/`content_ar`
//! unset, because the original catches and continues rather than failing
//! the whole enrichment over a translation miss (NewsAgent §4.5a).

use serde::Deserialize;
use tracing::warn;

use crate::models::WorkflowState;
use crate::pipeline::llm::{LlmClient, LlmClientExt};
use crate::pipeline::stages::generate_summary::render;

#[derive(Deserialize)]
struct TranslationResponse {
    title_ar: String,
    summary_ar: String,
    content_ar: String,
}

pub async fn translate_article(mut state: WorkflowState, llm: &dyn LlmClient) -> WorkflowState {
    if state.is_failed() {
        return state;
    }

    let Some(article) = state.article.clone() else {
        return state;
    };
    if article.content.is_empty() {
        return state;
    }
    let Some(prompts) = state.active_prompts.clone() else {
        return state;
    };

    let user_prompt = render(
        &prompts.translation_user,
        &[
            ("title", &article.title),
            ("summary", article.summary.as_deref().unwrap_or_default()),
            ("content", &article.content),
        ],
    );

    match llm
        .complete_structured::<TranslationResponse>(&prompts.translation_system, &user_prompt)
        .await
    {
        Ok(resp) => {
            if let Some(article) = state.article.as_mut() {
                article.title_ar = Some(resp.title_ar);
                article.summary_ar = Some(resp.summary_ar);
                article.content_ar = Some(resp.content_ar);
            }
        }
        Err(e) => warn!("translate_article failed, continuing without Arabic fields: {e}"),
    }

    state
}
