//! External text-generation capability.
//!
//! The Reply Generator depends only on the [`GenerationClient`] trait, so
//! fallback selection is testable without network access.

mod gemini;

pub use gemini::GeminiClient;

use crate::config::GenerationConfig;
use crate::error::GenerationError;
use async_trait::async_trait;
use std::sync::Arc;

/// Single-call completion contract: one formatted text prompt in, generated
/// text out. Any failure is equivalent to "use the fallback" for callers.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Build the configured client, or `None` when no credential is present
/// (which selects the fallback path unconditionally).
pub fn create_generation_client(config: &GenerationConfig) -> Option<Arc<dyn GenerationClient>> {
    config.api_key.as_deref().map(|key| {
        Arc::new(GeminiClient::new(key, &config.model).with_base_url(&config.base_url))
            as Arc<dyn GenerationClient>
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_api_key_means_no_client() {
        let config = GenerationConfig::default();
        assert!(create_generation_client(&config).is_none());
    }

    #[test]
    fn api_key_builds_client() {
        let config = GenerationConfig {
            api_key: Some("test-key".into()),
            ..GenerationConfig::default()
        };
        assert!(create_generation_client(&config).is_some());
    }
}
