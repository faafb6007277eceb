use std::time::Duration;

use async_trait::async_trait;

use crate::errors::{DroidClawResult, PlannerError};
use crate::llm::provider::LlmProvider;
use crate::llm::types::{CallConfig, ChatMessage, OpenAiRequest, OpenAiResponse, ResponseFormat};

/// "messages + single text reply" dialect. Covers OpenAI, Gemini's
/// OpenAI-compatible endpoint, DeepSeek and local servers.
pub struct OpenAiCompatibleProvider {
    display_name: String,
    api_base: String,
    api_key: String,
    cfg: CallConfig,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
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
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.display_name
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String, PlannerError> {
        let body = OpenAiRequest {
            model: &self.cfg.model,
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: self.cfg.temperature,
            max_tokens: self.cfg.max_tokens,
            response_format: ResponseFormat::json_object(),
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
            .bearer_auth(&self.api_key)
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

        let parsed: OpenAiResponse = response.json().await?;
        let content = parsed.into_text().ok_or(PlannerError::EmptyResponse)?;
        tracing::info!(
            provider = %self.display_name,
            content_len = content.len(),
            "planner reply received"
        );
        Ok(content)
    }
}

/// Caps logged payloads; snapshots can run to tens of kilobytes.
pub(crate) fn truncate_for_log(text: &str) -> String {
    const LIMIT: usize = 2000;
    if text.len() <= LIMIT {
        return text.to_string();
    }
    let mut end = LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}… (+{} bytes)", &text[..end], text.len() - end)
}
