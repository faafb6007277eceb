use async_trait::async_trait;

use crate::errors::PlannerError;

/// One planner backend. Implementations speak a single wire dialect and
/// return the raw reply text; decoding it into an action happens upstream.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable name used in error messages and logs.
    fn name(&self) -> &str;

    /// Sends one system + user exchange. No retries.
    async fn chat(&self, system: &str, user: &str) -> Result<String, PlannerError>;
}
