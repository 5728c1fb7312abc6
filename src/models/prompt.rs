use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStatus {
    Active,
    Draft,
    Archived,
}

/// A named, versioned text template (NewsAgent §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub name: String,
    pub status: PromptStatus,
    pub content: String,
    pub description: Option<String>,
    pub input_variables: Vec<String>,
    pub version: String,
    pub created_at: DateTime<Utc>,
}

/// The full set of prompt names the executor requires at pipeline start
/// (NewsAgent §4.3). Presence is validated when this type is constructed:
/// a missing name fails loudly here rather than at the stage that needed it.
#[derive(Debug, Clone)]
pub struct AgentPrompts {
    pub content_extractor: String,
    pub summary_system: String,
    pub summary_initial_user: String,
    pub summary_retry_user: String,
    pub validation_system: String,
    pub validation_user: String,
    pub relevance_system: String,
    pub relevance_user: String,
    pub search_system: String,
    pub search_user: String,
    pub categorization_system: String,
    pub categorization_user: String,
    pub seo_system: String,
    pub seo_user: String,
    pub translation_system: String,
    pub translation_user: String,
    pub country_extraction_system: String,
    pub country_extraction_user: String,
}

/// The logical names `AgentPrompts` requires, matching the column `name`
/// values in the `prompts` table one-to-one.
pub const REQUIRED_PROMPT_NAMES: &[&str] = &[
    "content_extractor",
    "summary_system",
    "summary_initial_user",
    "summary_retry_user",
    "validation_system",
    "validation_user",
    "relevance_system",
    "relevance_user",
    "search_system",
    "search_user",
    "categorization_system",
    "categorization_user",
    "seo_system",
    "seo_user",
    "translation_system",
    "translation_user",
    "country_extraction_system",
    "country_extraction_user",
];

impl TryFrom<HashMap<String, String>> for AgentPrompts {
    type Error = ConfigError;

    fn try_from(mut raw: HashMap<String, String>) -> Result<Self, Self::Error> {
        let mut missing = Vec::new();
        macro_rules! take {
            ($name:literal) => {
                match raw.remove($name) {
                    Some(v) => v,
                    None => {
                        missing.push($name);
                        String::new()
                    }
                }
            };
        }

        let content_extractor = take!("content_extractor");
        let summary_system = take!("summary_system");
        let summary_initial_user = take!("summary_initial_user");
        let summary_retry_user = take!("summary_retry_user");
        let validation_system = take!("validation_system");
        let validation_user = take!("validation_user");
        let relevance_system = take!("relevance_system");
        let relevance_user = take!("relevance_user");
        let search_system = take!("search_system");
        let search_user = take!("search_user");
        let categorization_system = take!("categorization_system");
        let categorization_user = take!("categorization_user");
        let seo_system = take!("seo_system");
        let seo_user = take!("seo_user");
        let translation_system = take!("translation_system");
        let translation_user = take!("translation_user");
        let country_extraction_system = take!("country_extraction_system");
        let country_extraction_user = take!("country_extraction_user");

        if !missing.is_empty() {
            return Err(ConfigError::MissingPrompts(missing));
        }

        Ok(Self {
            content_extractor,
            summary_system,
            summary_initial_user,
            summary_retry_user,
            validation_system,
            validation_user,
            relevance_system,
            relevance_user,
            search_system,
            search_user,
            categorization_system,
            categorization_user,
            seo_system,
            seo_user,
            translation_system,
            translation_user,
            country_extraction_system,
            country_extraction_user,
        })
    }
}

/// Admin-managed category, backing the `name -> external_id` lookup
/// `categorize_article` resolves predictions against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub external_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailRecipient {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub is_active: bool,
}
