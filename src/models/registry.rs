//! Free-model registry used to assign models to participants.

use tracing::{debug, warn};

use crate::error::LlmError;
use crate::llm::{ModelInfo, ModelPricing};

/// Known free models, used when the live list is unavailable.
const DEFAULT_FREE_MODELS: [(&str, &str); 5] = [
    ("qwen/qwen3-235b-a22b:free", "Qwen3 235B A22B"),
    ("google/gemma-3n-e2b-it:free", "Gemma 3n 2B"),
    ("nvidia/nemotron-nano-9b-v2:free", "Nemotron Nano 9B V2"),
    ("qwen/qwen3-coder:free", "Qwen3 Coder 480B A35B"),
    ("openai/gpt-oss-120b:free", "GPT OSS 120B"),
];

/// Returns the built-in list of free models.
pub fn default_free_models() -> Vec<ModelInfo> {
    DEFAULT_FREE_MODELS
        .iter()
        .map(|(id, name)| ModelInfo {
            id: id.to_string(),
            name: name.to_string(),
            pricing: Some(ModelPricing::free()),
        })
        .collect()
}

/// Holds the free subset of a model listing.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    free: Vec<ModelInfo>,
}

impl ModelRegistry {
    /// Keeps only models whose prompt and completion prices are both zero.
    /// Models without pricing are excluded.
    pub fn new(models: Vec<ModelInfo>) -> Self {
        let total = models.len();
        let free: Vec<ModelInfo> = models
            .into_iter()
            .filter(|m| m.pricing.as_ref().is_some_and(ModelPricing::is_free))
            .collect();
        debug!(total, free = free.len(), "Filtered model listing");
        Self { free }
    }

    /// Builds a registry from a live listing, falling back to the built-in
    /// free list when the listing failed or contains no free models.
    pub fn with_fallback(listing: Result<Vec<ModelInfo>, LlmError>) -> Self {
        match listing {
            Ok(models) => {
                let registry = Self::new(models);
                if registry.is_empty() {
                    warn!("No free models in live listing, using defaults");
                    Self::new(default_free_models())
                } else {
                    registry
                }
            }
            Err(e) => {
                warn!(error = %e, "Could not fetch models, using defaults");
                Self::new(default_free_models())
            }
        }
    }

    /// All free models, in listing order.
    pub fn free_models(&self) -> &[ModelInfo] {
        &self.free
    }

    /// True when no free model is known.
    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    /// Returns `n` model ids, cycling through the free list when `n` exceeds it.
    ///
    /// Empty when the registry is empty.
    pub fn select(&self, n: usize) -> Vec<String> {
        if self.free.is_empty() {
            return Vec::new();
        }
        self.free
            .iter()
            .cycle()
            .take(n)
            .map(|m| m.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: &str, prompt: &str, completion: &str) -> ModelInfo {
        ModelInfo {
            id: id.to_string(),
            name: id.to_string(),
            pricing: Some(ModelPricing {
                prompt: prompt.to_string(),
                completion: completion.to_string(),
            }),
        }
    }

    #[test]
    fn test_keeps_only_free_models() {
        let registry = ModelRegistry::new(vec![
            model("free-a", "0", "0"),
            model("paid-prompt", "0.001", "0"),
            model("paid-completion", "0", "0.002"),
            ModelInfo {
                id: "no-pricing".to_string(),
                name: String::new(),
                pricing: None,
            },
            model("free-b", "0", "0"),
        ]);

        let ids: Vec<&str> = registry.free_models().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["free-a", "free-b"]);
    }

    #[test]
    fn test_select_cycles() {
        let registry = ModelRegistry::new(vec![model("a", "0", "0"), model("b", "0", "0")]);
        assert_eq!(registry.select(5), vec!["a", "b", "a", "b", "a"]);
        assert_eq!(registry.select(1), vec!["a"]);
        assert!(registry.select(0).is_empty());
    }

    #[test]
    fn test_select_on_empty_registry() {
        let registry = ModelRegistry::new(Vec::new());
        assert!(registry.is_empty());
        assert!(registry.select(3).is_empty());
    }

    #[test]
    fn test_default_list_is_free() {
        let defaults = default_free_models();
        assert_eq!(defaults.len(), 5);
        assert_eq!(ModelRegistry::new(defaults).free_models().len(), 5);
    }

    #[test]
    fn test_fallback_on_error() {
        let registry =
            ModelRegistry::with_fallback(Err(LlmError::RequestFailed("offline".to_string())));
        assert_eq!(registry.select(1), vec!["qwen/qwen3-235b-a22b:free"]);
    }

    #[test]
    fn test_fallback_on_no_free_models() {
        let registry = ModelRegistry::with_fallback(Ok(vec![model("paid", "1", "1")]));
        assert_eq!(registry.free_models().len(), 5);
    }

    #[test]
    fn test_live_listing_used_when_free_models_exist() {
        let registry = ModelRegistry::with_fallback(Ok(vec![model("live", "0", "0")]));
        assert_eq!(registry.select(2), vec!["live", "live"]);
    }
}
