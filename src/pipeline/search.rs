//! Web search interface for `find_other_sources` (C10).
//!
//! The original calls a hosted search API (`tavily_client.search(query,
//! search_depth="basic", max_results=5)`) — an external collaborator out of
//! scope here (NewsAgent §1). This module defines the minimal interface
//! `find_other_sources` needs against it.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub content: String,
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PipelineError>> + Send + 'a>>;

pub trait SearchClient: Send + Sync {
    /// One `search_depth="basic", max_results=5`-equivalent query.
    fn search<'a>(&'a self, query: &'a str, max_results: usize) -> BoxFuture<'a, Vec<SearchResult>>;
}

/// Concrete [`SearchClient`] for a Tavily-shaped `/search` REST endpoint.
pub struct HttpSearchClient {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
}

impl HttpSearchClient {
    #[must_use]
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            api_base: "https://api.tavily.com".to_string(),
        }
    }

    #[must_use]
    pub fn with_base(mut self, api_base: String) -> Self {
        self.api_base = api_base;
        self
    }
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    url: String,
    #[serde(default)]
    content: String,
}

impl SearchClient for HttpSearchClient {
    fn search<'a>(&'a self, query: &'a str, max_results: usize) -> BoxFuture<'a, Vec<SearchResult>> {
        Box::pin(async move {
            let resp = self
                .client
                .post(format!("{}/search", self.api_base))
                .json(&serde_json::json!({
                    "api_key": self.api_key,
                    "query": query,
                    "search_depth": "basic",
                    "max_results": max_results,
                }))
                .send()
                .await
                .map_err(|e| PipelineError::Search(format!("request failed: {e}")))?;

            if !resp.status().is_success() {
                return Err(PipelineError::Search(format!(
                    "search provider returned status {}",
                    resp.status()
                )));
            }

            let body: TavilyResponse = resp
                .json()
                .await
                .map_err(|e| PipelineError::Search(format!("invalid response body: {e}")))?;

            Ok(body
                .results
                .into_iter()
                .map(|r| SearchResult {
                    url: r.url,
                    content: r.content,
                })
                .collect())
        })
    }
}
