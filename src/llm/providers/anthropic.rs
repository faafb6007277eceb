use std::time::Duration;

use async_trait::async_trait;

use crate::errors::{DroidClawResult, PlannerError};
use crate::llm::provider::LlmProvider;
use crate::llm::providers::openai_compatible::truncate_for_log;
use crate::llm::types::{AnthropicRequest, AnthropicResponse, CallConfig, ChatMessage};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// "system field + content blocks" dialect.
pub struct AnthropicProvider {
    display_name: String,
    api_base: String,
    api_key: String,
    cfg: CallConfig,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(
        display_name: String,
        api_base: String,
        api_key: String,
        cfg: CallConfig,
    ) -> DroidClawResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            display_name,
            api_base,
            api_key,
            cfg,
            client,
        })
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.display_name
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String, PlannerError> {
        let body = AnthropicRequest {
            model: &self.cfg.model,
            max_tokens: self.cfg.max_tokens,
            system,
            messages: vec![ChatMessage::user(user)],
            temperature: self.cfg.temperature,
        };

        tracing::debug!(
            provider = %self.display_name,
            model = %self.cfg.model,
            user_len = user.len(),
            "sending planner request"
        );
        tracing::debug!(user = %truncate_for_log(user), "planner user message (truncated)");

        let response = self
            .client
            .post(&self.api_base)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let err_body = response.text().await.unwrap_or_default();
            tracing::error!(
                provider = %self.display_name,
                status = status.as_u16(),
                body = %err_body,
                "planner API error"
            );
            return Err(PlannerError::from_status(
                &self.display_name,
                status.as_u16(),
                err_body,
            ));
        }

        let parsed: AnthropicResponse = response.json().await?;
        let content = parsed.into_text().ok_or(PlannerError::EmptyResponse)?;
        tracing::info!(
            provider = %self.display_name,
            content_len = content.len(),
            "planner reply received"
        );
        Ok(content)
    }
}
