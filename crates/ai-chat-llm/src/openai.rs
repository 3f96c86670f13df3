use std::time::Duration;

use ai_chat_core::ChatConfig;
use async_trait::async_trait;
use reqwest::Client;

use crate::protocol::openai::ChatCompletionRequest;
use crate::provider::{LLMError, LLMProvider, LLMStream, Result};
use crate::sse::llm_stream_from_sse;

/// Streaming client for any endpoint that speaks the OpenAI chat completions protocol.
pub struct OpenAICompatProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    timeout_ms: u64,
}

impl OpenAICompatProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: None,
            base_url: base_url.into(),
            timeout_ms: ai_chat_core::DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn from_config(config: &ChatConfig) -> Self {
        let provider = Self::new(config.base_url.clone()).with_timeout_ms(config.timeout_ms);
        match &config.api_key {
            Some(api_key) => provider.with_api_key(api_key.clone()),
            None => provider,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatProvider {
    async fn chat_stream(&self, request: &ChatCompletionRequest) -> Result<LLMStream> {
        log::debug!(
            "POST {} model={} messages={} tools={}",
            self.endpoint(),
            request.model,
            request.messages.len(),
            request.tools.len()
        );

        let mut builder = self
            .client
            .post(self.endpoint())
            .header("Accept", "text/event-stream")
            .json(request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        // Only the response head is bounded; the body may stream for longer.
        let response = tokio::time::timeout(Duration::from_millis(self.timeout_ms), builder.send())
            .await
            .map_err(|_| LLMError::Timeout(self.timeout_ms))??;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            log::warn!("Completion endpoint returned {}: {}", status, text);
            return Err(LLMError::Api(format!("HTTP {}: {}", status, text)));
        }

        Ok(llm_stream_from_sse(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let provider = OpenAICompatProvider::new("https://api.openai.com/v1/");
        assert_eq!(provider.endpoint(), "https://api.openai.com/v1/chat/completions");

        let provider = OpenAICompatProvider::new("http://localhost:12123");
        assert_eq!(provider.endpoint(), "http://localhost:12123/chat/completions");
    }

    #[test]
    fn from_config_copies_credentials_and_timeout() {
        let config = ChatConfig::new("http://localhost:8080", "gpt-4o")
            .with_api_key("sk-test")
            .with_timeout_ms(5_000);

        let provider = OpenAICompatProvider::from_config(&config);

        assert_eq!(provider.api_key.as_deref(), Some("sk-test"));
        assert_eq!(provider.timeout_ms, 5_000);
        assert_eq!(provider.base_url, "http://localhost:8080");
    }

    #[test]
    fn defaults_to_thirty_second_timeout_without_key() {
        let provider = OpenAICompatProvider::new("http://localhost");
        assert!(provider.api_key.is_none());
        assert_eq!(provider.timeout_ms, 30_000);
    }
}
