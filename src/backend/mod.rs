//! LLM backends behind a single async seam.
//!
//! The pipeline needs two things from a backend: the catalog of models the
//! caller's key can use, and one text generation. [`SynthesisBackend`] is
//! that contract; everything above it (model selection, fail-closed error
//! handling, session state) is backend-agnostic.
//!
//! | Backend | Catalog | Credentials |
//! |---------|---------|-------------|
//! | [`GeminiBackend`] | live `models.list` | user-supplied key per call |
//! | [`ProviderBackend`] | its one configured model | owned by the provider |
//! | [`MockBackend`] | scripted | ignored |

pub mod gemini;
pub mod mock;
pub mod provider;

pub use gemini::GeminiBackend;
pub use mock::{MockBackend, MockCall};
pub use provider::ProviderBackend;

use crate::config::SynthesisConfig;
use crate::error::NexusPathError;
use crate::output::Generation;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Capability tag a model must advertise to be usable for synthesis.
pub const GENERATE_CONTENT: &str = "generateContent";

/// One entry of a backend's model catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Identifier as reported by the backend, e.g. `models/gemini-1.5-flash`.
    pub id: String,
    /// Supported operations, e.g. `generateContent`, `embedContent`.
    pub capabilities: Vec<String>,
}

impl ModelInfo {
    pub fn new(id: impl Into<String>, capabilities: Vec<String>) -> Self {
        Self {
            id: id.into(),
            capabilities,
        }
    }

    /// A model that supports content generation.
    pub fn generative(id: impl Into<String>) -> Self {
        Self::new(id, vec![GENERATE_CONTENT.to_string()])
    }

    pub fn supports_generation(&self) -> bool {
        self.capabilities.iter().any(|c| c == GENERATE_CONTENT)
    }
}

/// Sampling options forwarded to the backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub max_output_tokens: usize,
}

impl From<&SynthesisConfig> for GenerateOptions {
    fn from(config: &SynthesisConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

/// A text-generation backend.
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    /// Short provider name used in logs and error messages.
    fn name(&self) -> &str;

    /// Whether calls need the user-supplied API key.
    fn requires_api_key(&self) -> bool {
        true
    }

    /// List the models available to `api_key`.
    async fn list_models(&self, api_key: &str) -> Result<Vec<ModelInfo>, NexusPathError>;

    /// Generate text for `prompt` with `model`.
    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<Generation, NexusPathError>;
}
