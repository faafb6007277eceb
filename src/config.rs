use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{DroidClawError, DroidClawResult};

pub const MIN_STEPS: u32 = 5;
pub const MAX_STEPS: u32 = 30;
pub const MIN_STEP_DELAY_MS: u64 = 500;
pub const MAX_STEP_DELAY_MS: u64 = 3000;

/// Browser value meaning "no preference"; the prompt omits the browser hint.
pub const DEFAULT_BROWSER: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub active_provider: String,
    #[serde(default = "builtin_providers")]
    pub providers: HashMap<String, ProviderEntry>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            active_provider: "openai".into(),
            providers: builtin_providers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub display_name: String,
    /// Full chat endpoint URL.
    pub api_base: String,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// "anthropic" for the system-field dialect, None for OpenAI-compatible.
    pub adapter: Option<String>,
    /// Optional API key stored in config.toml (env var DROIDCLAW_<ID>_API_KEY wins).
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderEntry {
    pub fn is_anthropic(&self) -> bool {
        self.adapter
            .as_deref()
            .is_some_and(|a| a.eq_ignore_ascii_case("anthropic"))
    }

    fn preset(display_name: &str, api_base: &str, model: &str, adapter: Option<&str>) -> Self {
        Self {
            display_name: display_name.into(),
            api_base: api_base.into(),
            model: model.into(),
            temperature: default_temperature(),
            adapter: adapter.map(String::from),
            api_key: None,
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn builtin_providers() -> HashMap<String, ProviderEntry> {
    HashMap::from([
        (
            "openai".to_string(),
            ProviderEntry::preset(
                "OpenAI",
                "https://api.openai.com/v1/chat/completions",
                "gpt-4o-mini",
                None,
            ),
        ),
        (
            "gemini".to_string(),
            ProviderEntry::preset(
                "Google Gemini",
                "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
                "gemini-2.0-flash",
                None,
            ),
        ),
        (
            "claude".to_string(),
            ProviderEntry::preset(
                "Anthropic Claude",
                "https://api.anthropic.com/v1/messages",
                "claude-sonnet-4-20250514",
                Some("anthropic"),
            ),
        ),
        (
            "deepseek".to_string(),
            ProviderEntry::preset(
                "DeepSeek",
                "https://api.deepseek.com/v1/chat/completions",
                "deepseek-chat",
                None,
            ),
        ),
    ])
}

fn default_temperature() -> f64 {
    0.1
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_timeout_secs() -> u64 {
    60
}

/// Run-loop tuning. Read once at the start of every run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_browser")]
    pub default_browser: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_hint_threshold")]
    pub hint_threshold: u32,
    #[serde(default = "default_force_back_threshold")]
    pub force_back_threshold: u32,
    #[serde(default = "default_window_retry_limit")]
    pub window_retry_limit: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            step_delay_ms: default_step_delay_ms(),
            initial_delay_ms: default_initial_delay_ms(),
            default_browser: default_browser(),
            language: default_language(),
            hint_threshold: default_hint_threshold(),
            force_back_threshold: default_force_back_threshold(),
            window_retry_limit: default_window_retry_limit(),
        }
    }
}

impl AgentConfig {
    /// Clamps every value into its supported range.
    pub fn normalized(mut self) -> Self {
        self.max_steps = self.max_steps.clamp(MIN_STEPS, MAX_STEPS);
        self.step_delay_ms = self.step_delay_ms.clamp(MIN_STEP_DELAY_MS, MAX_STEP_DELAY_MS);
        self.hint_threshold = self.hint_threshold.max(1);
        if self.force_back_threshold <= self.hint_threshold {
            tracing::warn!(
                hint = self.hint_threshold,
                force_back = self.force_back_threshold,
                "force_back_threshold must exceed hint_threshold; adjusting"
            );
            self.force_back_threshold = self.hint_threshold + 1;
        }
        self.window_retry_limit = self.window_retry_limit.max(1);
        self
    }
}

fn default_max_steps() -> u32 {
    15
}

fn default_step_delay_ms() -> u64 {
    1500
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_browser() -> String {
    DEFAULT_BROWSER.into()
}

fn default_language() -> String {
    "English".into()
}

fn default_hint_threshold() -> u32 {
    3
}

fn default_force_back_threshold() -> u32 {
    5
}

fn default_window_retry_limit() -> u32 {
    10
}

fn resolve_config_path() -> DroidClawResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    Err(DroidClawError::Config(
        "config.toml not found next to executable or in working directory".into(),
    ))
}

pub fn load_config() -> DroidClawResult<AppConfig> {
    let path = resolve_config_path()?;
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> DroidClawResult<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let mut config: AppConfig = toml::from_str(&content)?;
    config.agent = config.agent.normalized();
    tracing::info!(
        path = %path.display(),
        provider = %config.llm.active_provider,
        max_steps = config.agent.max_steps,
        "config loaded"
    );
    Ok(config)
}

pub fn save_config_to(config: &AppConfig, path: &Path) -> DroidClawResult<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
