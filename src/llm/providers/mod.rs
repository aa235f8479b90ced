//! LLM provider implementations.

pub mod openrouter;

pub use openrouter::{ModelInfo, ModelPricing, OpenRouterProvider, OPENROUTER_BASE_URL};

// Re-export the main LlmProvider trait for convenience
pub use super::provider::LlmProvider;
