//! Stage 4: validate_summary (grounded in `graph/nodes/validate_summary.py`).

use serde::Deserialize;

use crate::models::{SummaryAttempt, ValidationResult, WorkflowState};
use crate::pipeline::llm::{LlmClient, LlmClientExt};
use crate::pipeline::stages::generate_summary::render;

#[derive(Deserialize)]
struct ValidationResponse {
    is_valid: bool,
    feedback: String,
    #[serde(default)]
    semantic_score: Option<f64>,
    #[serde(default)]
    tone_score: Option<f64>,
}

pub async fn validate_summary(mut state: WorkflowState, llm: &dyn LlmClient) -> WorkflowState {
    if state.is_failed() {
        return state;
    }

    let Some(article_text) = state.cleaned_article_text.clone() else {
        state.fail("Cannot validate: cleaned_article_text is missing.");
        return state;
    };
    let Some(summary) = state.article.as_ref().and_then(|a| a.summary.clone()) else {
        state.fail("Cannot validate: summary is missing.");
        return state;
    };
    let Some(prompts) = state.active_prompts.clone() else {
        state.fail("Cannot validate: prompts are not loaded.");
        return state;
    };

    let user_prompt = render(
        &prompts.validation_user,
        &[("article_text", &article_text), ("summary_text", &summary)],
    );

    match llm
        .complete_structured::<ValidationResponse>(&prompts.validation_system, &user_prompt)
        .await
    {
        Ok(resp) => {
            let validation = ValidationResult {
                is_valid: resp.is_valid,
                feedback: resp.feedback,
                semantic_score: resp.semantic_score,
                tone_score: resp.tone_score,
            };
            state.summary_attempts.push(SummaryAttempt {
                summary,
                validation: validation.clone(),
            });
            state.validation_count = state.summary_attempts.len() as u32;
            state.validation_result = Some(validation);
        }
        Err(e) => state.fail(format!("Error in validate_summary: {e}")),
    }

    state
}

/// Conditional edge (`graph/nodes/conditional_edges.py::check_summary_validity`):
/// `true` continues the regenerate/validate loop, `false` ends it.
pub fn should_retry(state: &WorkflowState) -> bool {
    match &state.validation_result {
        None => false,
        Some(v) if v.is_valid => false,
        Some(_) => state.validation_count < state.max_retries,
    }
}
