//! Stage 7: generate_seo (grounded in `graph/nodes/generate_seo.py`).
//!
//! The LLM supplies the human-facing metadata; `json_ld` is built
//! deterministically here so publisher identity stays a single configured
//! fact rather than something an LLM could hallucinate per-article.

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::models::{Seo, WorkflowState};
use crate::pipeline::llm::{LlmClient, LlmClientExt};
use crate::pipeline::stages::generate_summary::render;

#[derive(Deserialize)]
struct SeoResponse {
    meta_title: String,
    meta_description: String,
    slug: String,
    primary_keywords: Vec<String>,
    og_title: String,
    og_description: String,
    og_image: String,
    twitter_card: String,
    twitter_title: String,
    twitter_description: String,
}

pub struct SeoPublisher<'a> {
    pub name: &'a str,
    pub url: &'a str,
    pub logo_url: &'a str,
}

pub async fn generate_seo(
    mut state: WorkflowState,
    llm: &dyn LlmClient,
    publisher: SeoPublisher<'_>,
) -> WorkflowState {
    if state.is_failed() {
        return state;
    }

    let Some(article) = state.article.clone() else {
        state.fail("No article found for SEO generation.");
        return state;
    };
    let Some(summary) = article.summary.clone() else {
        state.fail("No summary found for SEO generation.");
        return state;
    };
    let Some(prompts) = state.active_prompts.clone() else {
        state.fail("Prompts are not loaded.");
        return state;
    };

    let user_prompt = render(
        &prompts.seo_user,
        &[("title", &article.title), ("summary", &summary), ("source_url", &state.source_url)],
    );

    match llm.complete_structured::<SeoResponse>(&prompts.seo_system, &user_prompt).await {
        Ok(resp) => {
            let image = article.top_image.clone().unwrap_or_default();
            let published = article
                .published_date
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339());
            let now = Utc::now().to_rfc3339();

            let json_ld = json!({
                "@context": "https://schema.org",
                "@type": "NewsArticle",
                "mainEntityOfPage": { "@id": state.source_url },
                "headline": resp.meta_title,
                "description": resp.meta_description,
                "image": image,
                "datePublished": published,
                "dateModified": now,
                "publisher": {
                    "@type": "Organization",
                    "name": publisher.name,
                    "url": publisher.url,
                    "logo": { "@type": "ImageObject", "url": publisher.logo_url },
                },
            });

            let seo = Seo {
                meta_title: resp.meta_title,
                meta_description: resp.meta_description,
                slug: resp.slug,
                primary_keywords: resp.primary_keywords,
                og_title: resp.og_title,
                og_description: resp.og_description,
                og_image: resp.og_image,
                twitter_card: resp.twitter_card,
                twitter_title: resp.twitter_title,
                twitter_description: resp.twitter_description,
                json_ld: Some(json_ld),
            };

            if let Some(article) = state.article.as_mut() {
                article.seo = Some(seo);
            }
        }
        Err(e) => state.fail(format!("Error in generate_seo: {e}")),
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_ld_uses_configured_publisher() {
        let publisher = SeoPublisher { name: "Acme News", url: "https://acme.example/", logo_url: "https://acme.example/logo.png" };
        let value = json!({
            "publisher": {
                "@type": "Organization",
                "name": publisher.name,
                "url": publisher.url,
                "logo": { "@type": "ImageObject", "url": publisher.logo_url },
            }
        });
        assert_eq!(value["publisher"]["name"], "Acme News");
    }
}
