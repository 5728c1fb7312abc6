use serde::{Deserialize, Serialize};

/// An anchor inside the extracted article body, scored for relevance
/// against the article's summary (NewsAgent §3/§4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedLink {
    pub hyperlink_text: String,
    pub absolute_url: String,
    pub surrounding_context: String,
    pub relevance_score: Option<f64>,
}

/// Structured-output verdict from the validator LLM call (NewsAgent §3/§4.5
/// step 5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub feedback: String,
    pub semantic_score: Option<f64>,
    pub tone_score: Option<f64>,
}

/// One iteration of the generate/validate loop, recorded so
/// `select_best_summary` can pick the highest-scoring attempt even when the
/// loop exhausts its retries without ever producing a valid summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryAttempt {
    pub summary: String,
    pub validation: ValidationResult,
}

/// SEO metadata produced by `generate_seo`: the LLM supplies everything
/// except `json_ld`, which the executor constructs deterministically
/// (NewsAgent §4.5 step 11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seo {
    pub meta_title: String,
    pub meta_description: String,
    pub slug: String,
    pub primary_keywords: Vec<String>,
    pub og_title: String,
    pub og_description: String,
    pub og_image: String,
    pub twitter_card: String,
    pub twitter_title: String,
    pub twitter_description: String,
    pub json_ld: Option<serde_json::Value>,
}

/// The enriched article the pipeline produces. Populated incrementally by
/// every pipeline stage after `fetch`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub published_date: Option<String>,
    pub author: Option<String>,
    pub top_image: Option<String>,

    pub category: Vec<String>,
    pub category_ids: Vec<String>,
    pub sub_category: Vec<String>,
    pub countries: Vec<String>,

    pub title_ar: Option<String>,
    pub summary_ar: Option<String>,
    pub content_ar: Option<String>,

    pub reading_time: Option<u32>,
    pub reading_time_ar: Option<u32>,

    pub embedded_links: Vec<EmbeddedLink>,
    pub seo: Option<Seo>,
}
