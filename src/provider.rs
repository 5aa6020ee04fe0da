//! Text-generation collaborator: trait seam plus the OpenAI-compatible
//! HTTP client used in production.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use tracing::{info, warn};

const OPENAI_API_BASE: &str = "https://api.openai.com/";

/// External text generation: one prompt in, one completed text out. The
/// curation logic never knows how the text is produced.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    base_url: Url,
    api_key: String,
    model: String,
}

impl fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    pub fn new(api_key: String, model: String) -> Self {
        let base_url = Url::parse(OPENAI_API_BASE).expect("valid default OpenAI URL");
        Self::with_base_url(api_key, model, base_url)
    }

    pub fn with_base_url(api_key: String, model: String, base_url: Url) -> Self {
        let http = Client::builder()
            .user_agent("listing-curator/0.1")
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            api_key,
            model,
        }
    }

    pub fn from_config(cfg: &crate::config::Config) -> Result<Self> {
        let base_url = match cfg.provider.base_url.as_deref() {
            Some(url) => Url::parse(url).context("invalid provider.base_url")?,
            None => Url::parse(OPENAI_API_BASE).expect("valid default OpenAI URL"),
        };
        Ok(Self::with_base_url(
            cfg.provider.api_key.clone(),
            cfg.provider.model.clone(),
            base_url,
        ))
    }

    pub fn build_request(&self, prompt: &str, max_tokens: u32) -> Result<reqwest::Request> {
        let endpoint = self
            .base_url
            .join("v1/chat/completions")
            .context("invalid provider base URL")?;
        let body = completion_body(&self.model, prompt, max_tokens);
        self.http
            .post(endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .build()
            .context("failed to build completion request")
    }

    async fn execute(&self, request: reqwest::Request) -> Result<String> {
        info!(url=%request.url(), model=%self.model, "sending completion request");

        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach text-generation provider")?;

        if res.status() == StatusCode::TOO_MANY_REQUESTS {
            let body = res.text().await.unwrap_or_default();
            warn!("rate limited by provider: {}", body);
            return Err(anyhow!("received 429 from provider: {}", body));
        }
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            warn!("provider error - status: {}, body: {}", status, body);
            return Err(anyhow!("provider error {}: {}", status, body));
        }

        let payload: CompletionResponse = res
            .json()
            .await
            .context("invalid provider response JSON")?;
        let text = payload
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(anyhow!("provider returned empty completion"));
        }
        info!(chars = text.chars().count(), "completion received");
        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = self.build_request(prompt, max_tokens)?;
        self.execute(request).await
    }
}

pub fn completion_body(model: &str, prompt: &str, max_tokens: u32) -> Value {
    json!({
        "model": model,
        "messages": [
            {
                "role": "user",
                "content": prompt,
            }
        ],
        "max_tokens": max_tokens,
        "temperature": 0.7,
    })
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}
