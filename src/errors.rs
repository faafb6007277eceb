use thiserror::Error;

#[derive(Debug, Error)]
pub enum DroidClawError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Planner error: {0}")]
    Planner(#[from] PlannerError),

    #[error("Perception error: {0}")]
    Perception(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Agent error: {0}")]
    Agent(String),
}

impl serde::Serialize for DroidClawError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type DroidClawResult<T> = Result<T, DroidClawError>;

/// Failure of a single planner round-trip. Every variant is recorded as an
/// ERROR step by the engine; none of them ends the run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlannerError {
    #[error("[{provider}] The API key is invalid or lacks permission (HTTP {status}). Check the key in config.toml.")]
    Unauthorized { provider: String, status: u16 },

    #[error("[{provider}] Request limit or account quota exceeded (HTTP {status}). Wait a moment or top up the {provider} plan.")]
    RateLimited { provider: String, status: u16 },

    #[error("[{provider}] The server is temporarily unavailable (HTTP {status}). Try again shortly.")]
    ServerUnavailable { provider: String, status: u16 },

    #[error("[{provider}] API error (HTTP {status}): {body}")]
    Http {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Could not decode the planner response: {0}")]
    ParseError(String),

    #[error("The planner returned an empty response")]
    EmptyResponse,
}

impl PlannerError {
    /// Maps a non-success HTTP status onto the error taxonomy.
    pub fn from_status(provider: &str, status: u16, body: String) -> Self {
        let provider = provider.to_string();
        match status {
            401 | 403 => Self::Unauthorized { provider, status },
            402 | 429 => Self::RateLimited { provider, status },
            500 | 502 | 503 | 504 => Self::ServerUnavailable { provider, status },
            _ => Self::Http {
                provider,
                status,
                body,
            },
        }
    }
}

impl From<reqwest::Error> for PlannerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::ParseError(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}
