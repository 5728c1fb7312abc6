//! LLM provider interface.
//!
//! The original dispatches to whatever chat model `settings.get_model()`
//! resolves, sometimes asking it for a structured Pydantic model
//! (`with_structured_output`), sometimes a plain string. That provider is an
//! external collaborator out of scope for this crate (NewsAgent §1); this
//! module only defines the interface every pipeline stage calls through, so
//! the executor (and its tests) stay decoupled from any one vendor.

use std::future::Future;
use std::pin::Pin;

use serde::de::DeserializeOwned;

use crate::errors::PipelineError;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PipelineError>> + Send + 'a>>;

/// A chat-completion provider. One request is one system/user message pair,
/// matching the original's `[("system", ...), ("user", ...)]` message list —
/// the original never threads multi-turn history through a node.
///
/// Object-safe by construction (no generic methods) so the executor holds
/// `Arc<dyn LlmClient>`; [`LlmClient::complete_structured`] is a `Sized`-only
/// convenience built on top of [`LlmClient::complete_json`].
pub trait LlmClient: Send + Sync {
    /// Free-form text completion (`generate_summary`'s plain-string call).
    fn complete<'a>(&'a self, system: &'a str, user: &'a str) -> BoxFuture<'a, String>;

    /// Structured-output completion returning the raw JSON the provider
    /// produced (`validate_summary`, `categorize_article`, `generate_seo`,
    /// `check_embedded_links`, `find_other_sources`, `translate_article`,
    /// `extract_country` all use this form via `with_structured_output`).
    fn complete_json<'a>(&'a self, system: &'a str, user: &'a str) -> BoxFuture<'a, serde_json::Value>;
}

/// Extension trait giving callers a typed `complete_structured::<T>()` on
/// top of the object-safe [`LlmClient::complete_json`].
pub trait LlmClientExt: LlmClient {
    fn complete_structured<'a, T>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<T, PipelineError>> + Send + 'a>>
    where
        T: DeserializeOwned + 'a,
        Self: Sized,
    {
        Box::pin(async move {
            let value = self.complete_json(system, user).await?;
            serde_json::from_value(value)
                .map_err(|e| PipelineError::Llm(format!("malformed structured output: {e}")))
        })
    }
}

impl<C: LlmClient + ?Sized> LlmClientExt for C {}

/// Concrete [`LlmClient`] for an OpenAI-compatible chat-completions endpoint,
/// the most common shape for `settings.get_model()` providers.
pub struct HttpLlmClient {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl HttpLlmClient {
    #[must_use]
    pub fn new(client: reqwest::Client, api_base: String, api_key: String, model: String) -> Self {
        Self {
            client,
            api_base,
            api_key,
            model,
        }
    }

    async fn chat(&self, system: &str, user: &str, json_mode: bool) -> Result<String, PipelineError> {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });
        if json_mode {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Llm(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(PipelineError::Llm(format!(
                "provider returned status {}",
                resp.status()
            )));
        }

        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| PipelineError::Llm(format!("invalid response body: {e}")))?;

        value
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| PipelineError::Llm("response missing choices[0].message.content".into()))
    }
}

impl LlmClient for HttpLlmClient {
    fn complete<'a>(&'a self, system: &'a str, user: &'a str) -> BoxFuture<'a, String> {
        Box::pin(self.chat(system, user, false))
    }

    fn complete_json<'a>(&'a self, system: &'a str, user: &'a str) -> BoxFuture<'a, serde_json::Value> {
        Box::pin(async move {
            let raw = self.chat(system, user, true).await?;
            serde_json::from_str(&raw)
                .map_err(|e| PipelineError::Llm(format!("malformed structured output: {e}")))
        })
    }
}
