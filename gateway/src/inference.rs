use std::future::Future;

use anyhow::Context;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use roomtalk_common::GatewayConfig;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("HTTP {status}: {body}")]
    UpstreamStatus { status: u16, body: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("Ollama returned empty response")]
    EmptyResponse,
}

pub trait TextGenerator: Send + Sync {
    /// One generation attempt for `prompt`; the returned text is trimmed and
    /// never empty.
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, InferenceError>> + Send;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct OllamaClient {
    http: Client,
    generate_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(config: &GatewayConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(config.ollama_timeout())
            .build()
            .context("failed to build ollama http client")?;

        Ok(Self {
            http,
            generate_url: format!(
                "{}/api/generate",
                config.ollama_base_url.trim_end_matches('/')
            ),
            model: config.ollama_model.clone(),
        })
    }
}

impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, InferenceError> {
        let response = self
            .http
            .post(&self.generate_url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body: GenerateResponse = response.json().await?;
        let text = body.response.trim();
        if text.is_empty() {
            return Err(InferenceError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}
