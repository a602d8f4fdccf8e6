//! Vision-language text extraction.

use anyhow::Result;
use async_trait::async_trait;

/// A model that reads the text visible in an image.
#[async_trait]
pub trait VisionClient: Send + Sync {
    /// Extract the visible text of the image at `image_url`, following `instruction`.
    async fn extract_text(&self, instruction: &str, image_url: &str) -> Result<String>;
}

#[cfg(feature = "vision-openai")]
pub use openai::OpenAiVisionClient;

#[cfg(feature = "vision-openai")]
mod openai {
    use super::*;
    use anyhow::Context;
    use serde::{Deserialize, Serialize};
    use std::fmt::{Debug, Formatter, Result as FmtResult};
    use std::time::Duration;

    /// OpenAI Responses API client
    pub struct OpenAiVisionClient {
        http_client: reqwest::Client,
        base_url: String,
        api_key: String,
        model: String,
    }

    impl Debug for OpenAiVisionClient {
        fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
            f.debug_struct("OpenAiVisionClient")
                .field("base_url", &self.base_url)
                .field("model", &self.model)
                .finish()
        }
    }

    // Responses API request/response structures
    #[derive(Debug, Serialize)]
    struct ResponsesRequest<'a> {
        model: &'a str,
        input: Vec<InputMessage<'a>>,
    }

    #[derive(Debug, Serialize)]
    struct InputMessage<'a> {
        role: &'a str,
        content: Vec<InputContent<'a>>,
    }

    #[derive(Debug, Serialize)]
    #[serde(tag = "type", rename_all = "snake_case")]
    enum InputContent<'a> {
        InputText { text: &'a str },
        InputImage { image_url: &'a str },
    }

    #[derive(Debug, Deserialize)]
    struct ResponsesResponse {
        #[serde(default)]
        output_text: Option<String>,
        #[serde(default)]
        output: Vec<OutputItem>,
        #[serde(default)]
        usage: Option<ResponsesUsage>,
    }

    #[derive(Debug, Deserialize)]
    struct OutputItem {
        #[serde(rename = "type")]
        item_type: String,
        #[serde(default)]
        content: Vec<OutputContent>,
    }

    #[derive(Debug, Deserialize)]
    struct OutputContent {
        #[serde(rename = "type")]
        content_type: String,
        #[serde(default)]
        text: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    struct ResponsesUsage {
        input_tokens: u32,
        output_tokens: u32,
    }

    impl ResponsesResponse {
        /// `output_text` when the API provides it, otherwise every
        /// `output_text` part of every message joined in order.
        fn into_text(self) -> String {
            if let Some(text) = self.output_text {
                return text;
            }
            self.output
                .into_iter()
                .filter(|item| item.item_type == "message")
                .flat_map(|item| item.content)
                .filter(|part| part.content_type == "output_text")
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        }
    }

    impl OpenAiVisionClient {
        pub fn new(
            base_url: impl Into<String>,
            api_key: impl Into<String>,
            model: impl Into<String>,
            timeout: Duration,
        ) -> Result<Self> {
            Ok(Self {
                http_client: crate::http_client(timeout)?,
                base_url: base_url.into().trim_end_matches('/').to_string(),
                api_key: api_key.into(),
                model: model.into(),
            })
        }
    }

    #[async_trait]
    impl VisionClient for OpenAiVisionClient {
        async fn extract_text(&self, instruction: &str, image_url: &str) -> Result<String> {
            let start = std::time::Instant::now();

            let body = ResponsesRequest {
                model: &self.model,
                input: vec![InputMessage {
                    role: "user",
                    content: vec![
                        InputContent::InputText { text: instruction },
                        InputContent::InputImage { image_url },
                    ],
                }],
            };

            let response = self
                .http_client
                .post(format!("{}/responses", self.base_url))
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
                .context("Failed to send request to OpenAI Responses API")?;

            let response = crate::ensure_success(response, "OpenAI Responses API").await?;

            let parsed: ResponsesResponse = response
                .json()
                .await
                .context("Failed to parse OpenAI Responses API response")?;

            if let Some(usage) = &parsed.usage {
                tracing::debug!(
                    input_tokens = usage.input_tokens,
                    output_tokens = usage.output_tokens,
                    "Vision token usage"
                );
            }

            let text = parsed.into_text();

            tracing::info!(
                model = %self.model,
                text_chars = text.chars().count(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Vision text extraction completed"
            );

            Ok(text)
        }
    }

}
