pub mod planner;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod types;

pub use planner::Planner;
pub use provider::LlmProvider;
pub use registry::ProviderRegistry;
