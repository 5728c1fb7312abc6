//! Stage 15: calculate_reading_time (grounded in
//! `graph/nodes/calculate_reading_time.py`).
//!
//! Pure computation, no collaborator call: `ceil(word_count / 200)`.

use crate::models::WorkflowState;

const WORDS_PER_MINUTE: usize = 200;

pub fn calculate_reading_time(mut state: WorkflowState) -> WorkflowState {
    if state.is_failed() {
        return state;
    }

    let Some(article) = state.article.as_mut() else {
        return state;
    };

    if let Some(summary) = article.summary.as_deref() {
        article.reading_time = Some(reading_minutes(summary));
    }
    if let Some(summary_ar) = article.summary_ar.as_deref() {
        article.reading_time_ar = Some(reading_minutes(summary_ar));
    }

    state
}

fn reading_minutes(text: &str) -> u32 {
    let word_count = text.split_whitespace().count();
    word_count.div_ceil(WORDS_PER_MINUTE).max(1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Article;

    #[test]
    fn rounds_up_to_next_minute() {
        let mut state = WorkflowState::new("https://example.com".into(), 3);
        let words = vec!["word"; 250].join(" ");
        state.article = Some(Article { summary: Some(words), ..Default::default() });

        let result = calculate_reading_time(state);
        assert_eq!(result.article.unwrap().reading_time, Some(2));
    }

    #[test]
    fn empty_summary_never_zero() {
        assert_eq!(reading_minutes("one"), 1);
    }
}
