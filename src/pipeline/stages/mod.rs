//! The pipeline executor's stage functions (NewsAgent §4.5), one module per
//! DAG node, wired together by [`crate::pipeline::Executor`].

pub mod calculate_reading_time;
pub mod categorize_article;
pub mod check_embedded_links;
pub mod extract_country;
pub mod extract_links;
pub mod fetch;
pub mod find_other_sources;
pub mod generate_seo;
pub mod generate_summary;
pub mod notify_webhook;
pub mod select_best_summary;
pub mod translate_article;
pub mod validate_summary;
