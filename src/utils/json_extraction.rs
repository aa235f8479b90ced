//! JSON extraction utilities for parsing LLM responses.
//!
//! Models asked for "only JSON" still wrap it in markdown fences or surround
//! it with prose. Recovery is an ordered list of [`ExtractionStrategy`] values;
//! each one proposes a candidate substring and the first candidate that
//! deserializes into the target type wins.
//!
//! # Extraction Strategies
//!
//! 1. [`ExtractionStrategy::Direct`]: the whole (trimmed) reply
//! 2. [`ExtractionStrategy::FencedBlock`]: the inside of the first ``` block,
//!    with or without a language tag
//! 3. [`ExtractionStrategy::BraceScan`]: first `{` through last `}`
//!
//! # Example
//!
//! ```
//! use serde::Deserialize;
//! use tenthman::utils::json_extraction::parse_structured;
//!
//! #[derive(Deserialize)]
//! struct Reply {
//!     value: u32,
//! }
//!
//! let reply: Reply = parse_structured("Sure! {\"value\": 42} Hope that helps.").unwrap();
//! assert_eq!(reply.value, 42);
//! ```

use regex::Regex;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Number of characters of the raw reply kept in error messages.
const PREVIEW_CHARS: usize = 50;

/// Error type for JSON extraction failures
#[derive(Debug, Clone, Error, PartialEq)]
pub enum JsonExtractionError {
    #[error("No JSON content found in response. Content starts with: '{content_preview}'")]
    NotFound { content_preview: String },
    #[error("JSON candidate did not match the expected shape: {last_error}. Content starts with: '{content_preview}'")]
    Invalid {
        content_preview: String,
        last_error: String,
    },
}

/// A single way of locating JSON inside a model reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionStrategy {
    /// Parse the reply as-is.
    Direct,
    /// Parse the contents of a markdown code fence.
    FencedBlock,
    /// Parse the span between the first `{` and the last `}`.
    BraceScan,
}

impl ExtractionStrategy {
    /// The default order in which strategies are tried.
    pub const ORDERED: [ExtractionStrategy; 3] = [Self::Direct, Self::FencedBlock, Self::BraceScan];

    /// Returns the display name for this strategy.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::FencedBlock => "fenced block",
            Self::BraceScan => "brace scan",
        }
    }

    /// Returns the substring this strategy would hand to the JSON parser.
    pub fn candidate<'a>(&self, raw: &'a str) -> Option<&'a str> {
        match self {
            Self::Direct => {
                let trimmed = raw.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
            Self::FencedBlock => extract_from_code_block(raw),
            Self::BraceScan => extract_outer_braces(raw),
        }
    }

    /// Applies this strategy and deserializes the candidate.
    pub fn parse<T: DeserializeOwned>(&self, raw: &str) -> Result<T, JsonExtractionError> {
        let candidate = self
            .candidate(raw)
            .ok_or_else(|| JsonExtractionError::NotFound {
                content_preview: preview(raw),
            })?;
        serde_json::from_str(candidate).map_err(|e| JsonExtractionError::Invalid {
            content_preview: preview(raw),
            last_error: e.to_string(),
        })
    }
}

impl std::fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Parses `raw` into `T` using the default strategy order.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, JsonExtractionError> {
    parse_structured_with(raw, &ExtractionStrategy::ORDERED).map(|(value, _)| value)
}

/// Parses `raw` into `T` trying `strategies` in order.
///
/// Returns the parsed value and the strategy that produced it. When every
/// strategy fails, the error reports the last parser failure if any candidate
/// was found, otherwise `NotFound`.
pub fn parse_structured_with<T: DeserializeOwned>(
    raw: &str,
    strategies: &[ExtractionStrategy],
) -> Result<(T, ExtractionStrategy), JsonExtractionError> {
    let mut last_error = None;

    for strategy in strategies {
        match strategy.parse(raw) {
            Ok(value) => return Ok((value, *strategy)),
            Err(err @ JsonExtractionError::Invalid { .. }) => last_error = Some(err),
            Err(JsonExtractionError::NotFound { .. }) => {}
        }
    }

    Err(last_error.unwrap_or_else(|| JsonExtractionError::NotFound {
        content_preview: preview(raw),
    }))
}

/// Extract the contents of the first ``` ... ``` code block.
///
/// The language tag is optional (```json, ```JSON, bare ```).
pub fn extract_from_code_block(content: &str) -> Option<&str> {
    let re = Regex::new(r"```(?:\w+)?[ \t]*\r?\n?([\s\S]*?)\r?\n?```").ok()?;
    let caps = re.captures(content)?;
    let inner = caps.get(1)?.as_str().trim();
    (!inner.is_empty()).then_some(inner)
}

/// Extract the span from the first `{` to the last `}` (inclusive).
pub fn extract_outer_braces(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

fn preview(content: &str) -> String {
    content.trim().chars().take(PREVIEW_CHARS).collect()
}
