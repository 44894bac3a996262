//! Prompt-injection screening backed by [Lakera Guard](https://www.lakera.ai/).
//!
//! [`PromptInjectionGuard`] implements [`QueryTransformer`]: a query that the
//! service flags is rejected with [`VectorHubError::Security`], anything else
//! passes through unchanged as a single-element list.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use vectorhub_core::{QueryTransformer, VectorHubError};
use vectorhub_transport::{HttpRequest, Method, Transport};

const BACKEND: &str = "Lakera";

/// Configuration for the Lakera Guard API.
#[derive(Debug, Clone)]
pub struct LakeraConfig {
    /// Base URL (default: `https://api.lakera.ai/`).
    pub endpoint: String,
    pub api_key: String,
}

impl LakeraConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: "https://api.lakera.ai/".to_string(),
            api_key: api_key.into(),
        }
    }

    /// Read `LAKERA_API_KEY` and, when set, `LAKERA_ENDPOINT`.
    pub fn from_env() -> Result<Self, VectorHubError> {
        let api_key = std::env::var("LAKERA_API_KEY").map_err(|_| {
            VectorHubError::Config(
                "you have to provide a LAKERA_API_KEY env var to connect to Lakera".to_string(),
            )
        })?;
        let config = Self::new(api_key);
        Ok(match std::env::var("LAKERA_ENDPOINT") {
            Ok(endpoint) => config.with_endpoint(endpoint),
            Err(_) => config,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn prompt_injection_url(&self) -> String {
        format!("{}/v1/prompt_injection", self.endpoint.trim_end_matches('/'))
    }
}

/// Outcome of screening one input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Verdict {
    pub flagged: bool,
    #[serde(default)]
    pub categories: HashMap<String, bool>,
    #[serde(default)]
    pub category_scores: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct GuardResponse {
    #[serde(default)]
    results: Vec<Verdict>,
}

/// Screens queries for prompt injection before they reach retrieval.
pub struct PromptInjectionGuard {
    config: LakeraConfig,
    transport: Arc<dyn Transport>,
}

impl PromptInjectionGuard {
    pub fn new(
        config: LakeraConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, VectorHubError> {
        if config.endpoint.trim().is_empty() {
            return Err(VectorHubError::Config(
                "Lakera endpoint must not be empty".to_string(),
            ));
        }
        if config.api_key.trim().is_empty() {
            return Err(VectorHubError::Config(
                "Lakera API key must not be empty".to_string(),
            ));
        }
        Ok(Self { config, transport })
    }

    pub fn config(&self) -> &LakeraConfig {
        &self.config
    }

    /// Ask the service for a verdict without rejecting flagged input.
    pub async fn screen(&self, input: &str) -> Result<Verdict, VectorHubError> {
        let request = HttpRequest::new(Method::Post, self.config.prompt_injection_url())
            .with_header("Authorization", format!("Bearer {}", self.config.api_key))
            .with_header("Accept", "application/json")
            .with_header("Content-Type", "application/json")
            .with_json(json!({ "input": input }));

        tracing::debug!(url = %request.url, "Lakera request");
        let response = self.transport.send(request).await?;
        tracing::debug!(status = response.status, "Lakera response");

        if !response.is_success() {
            return Err(VectorHubError::from_status(
                BACKEND,
                response.status,
                &response.body,
            ));
        }

        let parsed: GuardResponse = serde_json::from_str(&response.body).map_err(|e| {
            VectorHubError::Parsing(format!(
                "unexpected response from Lakera ({e}): {}",
                response.body
            ))
        })?;
        parsed.results.into_iter().next().ok_or_else(|| {
            VectorHubError::Parsing(format!(
                "unexpected response from Lakera: {}",
                response.body
            ))
        })
    }
}

#[async_trait]
impl QueryTransformer for PromptInjectionGuard {
    async fn transform_query(&self, query: &str) -> Result<Vec<String>, VectorHubError> {
        let verdict = self.screen(query).await?;
        if verdict.flagged {
            tracing::warn!("Lakera flagged a query as prompt injection");
            return Err(VectorHubError::Security(format!(
                "prompt flagged as insecure: {query}"
            )));
        }
        Ok(vec![query.to_string()])
    }
}
