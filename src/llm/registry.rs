use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{AppConfig, ProviderEntry};
use crate::errors::{DroidClawError, DroidClawResult};
use crate::llm::provider::LlmProvider;
use crate::llm::providers::anthropic::AnthropicProvider;
use crate::llm::providers::openai_compatible::OpenAiCompatibleProvider;
use crate::llm::types::CallConfig;

/// Configured planner backends, keyed by their config.toml identifier.
pub struct ProviderRegistry {
    entries: HashMap<String, (ProviderEntry, String)>,
    active: String,
}

impl ProviderRegistry {
    /// Build a registry from the loaded app config.
    /// API keys are read from environment variables named `DROIDCLAW_<ID>_API_KEY`,
    /// falling back to `api_key` in config.toml.
    pub fn from_config(config: &AppConfig) -> Self {
        let entries = config
            .llm
            .providers
            .iter()
            .map(|(id, entry)| {
                let api_key = std::env::var(env_key_name(id))
                    .ok()
                    .filter(|k| !k.trim().is_empty())
                    .unwrap_or_else(|| entry.api_key.clone().unwrap_or_default());
                (id.clone(), (entry.clone(), api_key))
            })
            .collect();
        Self {
            entries,
            active: config.llm.active_provider.clone(),
        }
    }

    pub fn active_id(&self) -> &str {
        &self.active
    }

    pub fn set_active(&mut self, id: String) -> DroidClawResult<()> {
        if self.entries.contains_key(&id) {
            self.active = id;
            Ok(())
        } else {
            Err(DroidClawError::Config(format!("Provider '{id}' not configured")))
        }
    }

    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Instantiates the active provider. Fails on an unknown id or a missing key,
    /// so configuration problems surface before any run starts.
    pub fn get_active(&self) -> DroidClawResult<Arc<dyn LlmProvider>> {
        let (entry, api_key) = self.entries.get(&self.active).ok_or_else(|| {
            DroidClawError::Config(format!(
                "Active provider '{}' not found in config",
                self.active
            ))
        })?;
        if api_key.trim().is_empty() {
            return Err(DroidClawError::Config(format!(
                "No API key for '{}'. Set {} or api_key in config.toml.",
                self.active,
                env_key_name(&self.active)
            )));
        }

        let cfg = CallConfig {
            model: entry.model.clone(),
            temperature: entry.temperature,
            max_tokens: entry.max_tokens,
            timeout_secs: entry.timeout_secs,
        };
        tracing::info!(
            provider = %self.active,
            model = %cfg.model,
            anthropic = entry.is_anthropic(),
            "planner backend selected"
        );

        let provider: Arc<dyn LlmProvider> = if entry.is_anthropic() {
            Arc::new(AnthropicProvider::new(
                entry.display_name.clone(),
                entry.api_base.clone(),
                api_key.clone(),
                cfg,
            )?)
        } else {
            Arc::new(OpenAiCompatibleProvider::new(
                entry.display_name.clone(),
                entry.api_base.clone(),
                api_key.clone(),
                cfg,
            )?)
        };
        Ok(provider)
    }
}

pub fn env_key_name(id: &str) -> String {
    format!("DROIDCLAW_{}_API_KEY", id.to_uppercase().replace('-', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_config_error() {
        let mut cfg = AppConfig::default();
        cfg.llm.active_provider = "deepseek".into();
        std::env::remove_var("DROIDCLAW_DEEPSEEK_API_KEY");

        let registry = ProviderRegistry::from_config(&cfg);
        match registry.get_active() {
            Err(DroidClawError::Config(msg)) => assert!(msg.contains("DROIDCLAW_DEEPSEEK_API_KEY")),
            Err(other) => panic!("unexpected {other:?}"),
            Ok(_) => panic!("expected a config error"),
        }
    }

    #[test]
    fn test_unknown_active_provider() {
        let mut cfg = AppConfig::default();
        cfg.llm.active_provider = "nope".into();
        let registry = ProviderRegistry::from_config(&cfg);
        assert!(matches!(registry.get_active(), Err(DroidClawError::Config(_))));
    }

    #[test]
    fn test_env_key_wins_over_config() {
        let mut cfg = AppConfig::default();
        if let Some(entry) = cfg.llm.providers.get_mut("claude") {
            entry.api_key = Some("from-config".into());
        }
        cfg.llm.active_provider = "claude".into();
        std::env::set_var("DROIDCLAW_CLAUDE_API_KEY", "from-env");

        let registry = ProviderRegistry::from_config(&cfg);
        assert_eq!(registry.entries["claude"].1, "from-env");
        let provider = registry.get_active().unwrap();
        assert_eq!(provider.name(), "Anthropic Claude");
        std::env::remove_var("DROIDCLAW_CLAUDE_API_KEY");
    }

    #[test]
    fn test_set_active_and_names() {
        let mut registry = ProviderRegistry::from_config(&AppConfig::default());
        assert_eq!(registry.list_names(), vec!["claude", "deepseek", "gemini", "openai"]);
        registry.set_active("gemini".into()).unwrap();
        assert_eq!(registry.active_id(), "gemini");
        assert!(registry.set_active("missing".into()).is_err());
    }

    #[test]
    fn test_env_key_name() {
        assert_eq!(env_key_name("open-router"), "DROIDCLAW_OPEN_ROUTER_API_KEY");
    }
}
