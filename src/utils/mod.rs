//! Shared utility functions for tenthman.
//!
//! This module provides common utilities used across multiple modules,
//! including structured-output recovery from LLM responses.

pub mod json_extraction;

pub use json_extraction::{
    extract_from_code_block, extract_outer_braces, parse_structured, parse_structured_with,
    ExtractionStrategy, JsonExtractionError,
};
