//! Stage 3: generate_summary (grounded in `graph/nodes/summary_generator.py`).

use crate::models::WorkflowState;
use crate::pipeline::llm::LlmClient;

const NOT_YET_RUN: &str = "Validation not yet run.";

pub async fn generate_summary(mut state: WorkflowState, llm: &dyn LlmClient) -> WorkflowState {
    if state.is_failed() {
        return state;
    }

    let Some(article_text) = state.cleaned_article_text.clone() else {
        state.fail("Cannot generate summary: cleaned_article_text is missing.");
        return state;
    };
    if state.article.is_none() {
        state.fail("Cannot generate summary: news_article model is missing.");
        return state;
    }

    let Some(prompts) = state.active_prompts.clone() else {
        state.fail("Cannot generate summary: prompts are not loaded.");
        return state;
    };

    let is_retry = state
        .validation_result
        .as_ref()
        .is_some_and(|v| v.feedback != NOT_YET_RUN);

    let user_prompt = if is_retry {
        let feedback = state.validation_result.as_ref().map(|v| v.feedback.clone()).unwrap_or_default();
        render(&prompts.summary_retry_user, &[("feedback", &feedback), ("article_text", &article_text)])
    } else {
        render(&prompts.summary_initial_user, &[("article_text", &article_text)])
    };

    match llm.complete(&prompts.summary_system, &user_prompt).await {
        Ok(summary) => {
            if let Some(article) = state.article.as_mut() {
                article.summary = Some(summary);
            }
            state.validation_result = None;
        }
        Err(e) => state.fail(format!("Error in generate_summary: {e}")),
    }

    state
}

/// `{name}`-style template substitution, the Rust stand-in for
/// `langchain_core.prompts.PromptTemplate.format`.
pub(crate) fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}
