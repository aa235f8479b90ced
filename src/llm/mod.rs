//! LLM integration for tenthman.
//!
//! This module provides the chat-completion types shared by every caller, the
//! [`LlmProvider`] trait the debate engine and consensus judge depend on, and
//! the OpenRouter implementation with its retry policy.
//!
//! ```ignore
//! use tenthman::llm::{GenerationRequest, LlmProvider, Message, OpenRouterProvider};
//! use tokio_util::sync::CancellationToken;
//!
//! let provider = OpenRouterProvider::new(api_key)?;
//! let request = GenerationRequest::new(
//!     "qwen/qwen3-235b-a22b:free",
//!     vec![Message::user("Is remote work here to stay?")],
//! );
//! let response = provider.generate(request, &CancellationToken::new()).await?;
//! ```

pub mod provider;
pub mod providers;
pub mod retry;

pub use provider::{Choice, GenerationRequest, GenerationResponse, LlmProvider, Message, Usage};
pub use providers::{ModelInfo, ModelPricing, OpenRouterProvider};
pub use retry::{RetryPolicy, MAX_RETRIES};
