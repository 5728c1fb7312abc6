//! Stage 5: select_best_summary (grounded in `graph/nodes/select_best_summary.py`).
//!
//! Runs after the generate/validate loop exits, regardless of whether it
//! ended in a valid summary or exhausted its retries — **ValidationExhaustion**
//! is not an error (NewsAgent §7); this stage picks the highest-scoring
//! attempt either way.

use crate::models::WorkflowState;

pub fn select_best_summary(mut state: WorkflowState) -> WorkflowState {
    if state.is_failed() {
        return state;
    }

    if state.summary_attempts.is_empty() {
        state.fail("No summaries to select from.");
        return state;
    }

    let best = state
        .summary_attempts
        .iter()
        .max_by(|a, b| {
            let sa = a.validation.semantic_score.unwrap_or(0.0);
            let sb = b.validation.semantic_score.unwrap_or(0.0);
            sa.total_cmp(&sb)
        })
        .cloned()
        .expect("checked non-empty above");

    if let Some(article) = state.article.as_mut() {
        article.summary = Some(best.summary);
    }
    state.validation_result = Some(best.validation);

    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Article, SummaryAttempt, ValidationResult};

    fn attempt(summary: &str, score: f64) -> SummaryAttempt {
        SummaryAttempt {
            summary: summary.to_string(),
            validation: ValidationResult {
                is_valid: false,
                feedback: String::new(),
                semantic_score: Some(score),
                tone_score: None,
            },
        }
    }

    #[test]
    fn picks_highest_semantic_score() {
        let mut state = WorkflowState::new("https://example.com/a".into(), 3);
        state.article = Some(Article::default());
        state.summary_attempts = vec![attempt("low", 0.2), attempt("high", 0.9), attempt("mid", 0.5)];

        let result = select_best_summary(state);
        assert_eq!(result.article.unwrap().summary.as_deref(), Some("high"));
    }
}
