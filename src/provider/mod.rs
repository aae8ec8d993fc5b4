//! Generative-text provider trait and the Gemini implementation.

pub mod google;
pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::config::FolioConfig;
use crate::error::FolioError;
use crate::types::{ChatContent, GenerationSettings, TextStreamDelta};

pub use google::GoogleProvider;

/// A request sent to a provider: the replayed history ending with the new
/// visitor turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub contents: Vec<ChatContent>,
    pub settings: GenerationSettings,
}

/// Stream of deltas produced by a provider for one turn.
pub type DeltaStream = BoxStream<'static, Result<TextStreamDelta, FolioError>>;

/// Core trait implemented by generative-text backends.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name (e.g., "google").
    fn provider_name(&self) -> &str;

    /// The model ID this provider instance serves.
    fn model_id(&self) -> &str;

    /// Send a request and stream the reply.
    ///
    /// Errors before the first byte (bad status, missing credentials) are
    /// returned directly; errors after that arrive as stream items.
    async fn stream_chat(&self, request: &ChatRequest) -> Result<DeltaStream, FolioError>;
}

/// Create the provider described by `config`.
pub fn create_provider(config: &FolioConfig) -> Arc<dyn ChatProvider> {
    let mut provider = GoogleProvider::new(config.model().to_string(), config.api_key());
    if let Some(base_url) = config.base_url() {
        provider = provider.with_base_url(base_url);
    }
    Arc::new(provider)
}
