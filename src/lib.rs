//! tenthman: multi-agent debate orchestrator using the Tenth Man Rule.
//!
//! A group of model-backed participants debates a topic in rounds. When a
//! judge finds strong agreement, a mandated dissenter joins and argues the
//! opposite for a fixed number of rounds before a final verdict.

pub mod cli;
pub mod config;
pub mod debate;
pub mod error;
pub mod llm;
pub mod models;
pub mod output;
pub mod utils;

pub use config::{ConfigError, DebateSettings};
pub use error::{DebateError, LlmError, OutputError};
