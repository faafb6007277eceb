use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::agent_engine::state::ActionProposal;
use crate::config::AgentConfig;
use crate::errors::PlannerError;
use crate::llm::prompt::{build_system_prompt, build_user_message};
use crate::llm::provider::LlmProvider;
use crate::perception::types::UiNode;

/// Turns (goal, history, snapshot) into the next `ActionProposal` through
/// whichever backend it was built with.
#[derive(Clone)]
pub struct Planner {
    provider: Arc<dyn LlmProvider>,
    system_prompt: String,
}

impl Planner {
    pub fn new(provider: Arc<dyn LlmProvider>, agent: &AgentConfig) -> Self {
        Self::with_system_prompt(
            provider,
            build_system_prompt(&agent.default_browser, &agent.language),
        )
    }

    pub fn with_system_prompt(provider: Arc<dyn LlmProvider>, system_prompt: String) -> Self {
        Self {
            provider,
            system_prompt,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn propose(
        &self,
        goal: &str,
        history: &[String],
        snapshot: &UiNode,
    ) -> Result<ActionProposal, PlannerError> {
        let user = build_user_message(goal, history, snapshot)
            .map_err(|e| PlannerError::ParseError(format!("snapshot encoding: {e}")))?;
        let reply = self.provider.chat(&self.system_prompt, &user).await?;
        tracing::debug!(provider = %self.provider.name(), reply = %reply, "planner reply");

        let proposal = ActionProposal::from_json(strip_code_fence(&reply))?;
        tracing::info!(
            action = %proposal.action.kind(),
            target = proposal.action.target_text().unwrap_or("-"),
            id = proposal.action.target_id().unwrap_or("-"),
            reasoning = proposal.reasoning.as_deref().unwrap_or(""),
            "planner decision"
        );
        Ok(proposal)
    }
}

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)\s*```").ok())
        .as_ref()
}

/// Body of the first ```-fenced block, or the trimmed input when unfenced.
pub fn strip_code_fence(text: &str) -> &str {
    fence_regex()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or_else(|| text.trim())
}
