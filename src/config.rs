//! Process configuration, read once from the environment at startup.
//!
//! All three binaries (`newsagent-api`, `newsagent-scheduler`,
//! `newsagent-worker`) construct one [`AppConfig`] via [`AppConfig::from_env`]
//! and fail fast if a required variable is absent.

use crate::errors::ConfigError;

/// Everything a long-running NewsAgent process needs, sourced from the
/// environment. Fields carry the same defaults as the original deployment's
/// settings module where a default exists; fields with no sane default
/// (API keys, browser endpoint) are required.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub redis_url: String,
    pub redis_queue_name: String,
    pub redis_dlq_name: String,

    pub database_url: String,

    pub main_api_url: String,
    pub submission_source_id: String,

    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,

    pub newsagent_api_key: String,
    pub user_agent: String,
    pub browser_ws_endpoint: String,

    pub llm_api_base: String,
    pub llm_api_key: String,
    pub llm_model: String,

    pub search_api_key: String,

    pub smtp_server: String,
    pub smtp_port: u16,
    pub smtp_email: String,
    pub smtp_password: String,

    pub seo_publisher_name: String,
    pub seo_publisher_url: String,
    pub seo_publisher_logo_url: String,
}

impl AppConfig {
    /// Reads and validates every environment variable in one pass. Returns
    /// every missing-or-invalid field, not just the first, so an operator
    /// fixes a misconfiguration in one round trip.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut missing: Vec<&'static str> = Vec::new();

        let newsagent_api_key = match std::env::var("NEWSAGENT_API_KEY") {
            Ok(v) if !v.is_empty() => v,
            _ => {
                missing.push("NEWSAGENT_API_KEY");
                String::new()
            }
        };
        let browser_ws_endpoint = match std::env::var("BROWSER_WS_ENDPOINT") {
            Ok(v) if !v.is_empty() => v,
            _ => {
                missing.push("BROWSER_WS_ENDPOINT");
                String::new()
            }
        };
        let llm_api_key = match std::env::var("LLM_API_KEY") {
            Ok(v) if !v.is_empty() => v,
            _ => {
                missing.push("LLM_API_KEY");
                String::new()
            }
        };
        let search_api_key = match std::env::var("SEARCH_API_KEY") {
            Ok(v) if !v.is_empty() => v,
            _ => {
                missing.push("SEARCH_API_KEY");
                String::new()
            }
        };

        if !missing.is_empty() {
            return Err(ConfigError::MissingVars(missing));
        }

        let smtp_port = match std::env::var("SMTP_PORT") {
            Ok(v) => v.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                name: "SMTP_PORT",
                value: v,
            })?,
            Err(_) => 587,
        };

        Ok(Self {
            redis_url: env_or("REDIS_URL", "redis://localhost:6379/0"),
            redis_queue_name: env_or("REDIS_QUEUE_NAME", "newsagent_jobs"),
            redis_dlq_name: env_or("REDIS_DLQ_NAME", "newsagent_dlq"),
            database_url: env_or("DATABASE_URL", "postgres://localhost/newsagent"),
            main_api_url: env_or("MAIN_API_URL", "http://localhost:8000"),
            submission_source_id: env_or("SUBMISSION_SOURCE_ID", "newsagent_scheduled_source"),
            webhook_url: std::env::var("WEBHOOK_URL").ok(),
            webhook_secret: std::env::var("WEBHOOK_SECRET").ok(),
            newsagent_api_key,
            user_agent: env_or("USER_AGENT", "NewsAgent/1.0"),
            browser_ws_endpoint,
            llm_api_base: env_or("LLM_API_BASE", "https://api.openai.com/v1"),
            llm_api_key,
            llm_model: env_or("LLM_MODEL", "gpt-4o-mini"),
            search_api_key,
            smtp_server: env_or("SMTP_SERVER", "smtp.gmail.com"),
            smtp_port,
            smtp_email: env_or("SMTP_EMAIL", ""),
            smtp_password: env_or("SMTP_PASSWORD", ""),
            seo_publisher_name: env_or("SEO_PUBLISHER_NAME", "NewsAgent"),
            seo_publisher_url: env_or("SEO_PUBLISHER_URL", "https://example.org/"),
            seo_publisher_logo_url: env_or(
                "SEO_PUBLISHER_LOGO_URL",
                "https://example.org/logo.png",
            ),
        })
    }

    /// Default per-domain fetch delay when neither the cache nor the store
    /// has an override (NewsAgent §4.1).
    #[must_use]
    pub fn default_delay_seconds(&self) -> i64 {
        5
    }

    /// Target count of concurrent browser contexts (NewsAgent §4.2/§5).
    #[must_use]
    pub fn browser_concurrency(&self) -> usize {
        8
    }

    /// Target count of concurrent scheduler source-checks (NewsAgent §4.6/§5).
    #[must_use]
    pub fn scheduler_concurrency(&self) -> usize {
        3
    }

    /// Target count of concurrent link-relevance scoring tasks (NewsAgent §4.10).
    #[must_use]
    pub fn link_scoring_concurrency(&self) -> usize {
        8
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
