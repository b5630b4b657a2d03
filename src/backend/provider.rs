//! Adapter over any `edgequake_llm` chat provider.
//!
//! Used with the static model policy: the provider is created for one model
//! and reads its own credentials (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, …)
//! when constructed, so the per-call key is not needed.

use super::{GenerateOptions, ModelInfo, SynthesisBackend};
use crate::error::NexusPathError;
use crate::output::Generation;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A [`SynthesisBackend`] backed by a pre-configured chat provider.
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
    provider_name: String,
    model: String,
}

impl ProviderBackend {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        provider_name: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            provider_name: provider_name.into(),
            model: model.into(),
        }
    }

    /// Instantiate a named provider (`openai`, `anthropic`, `gemini`, `ollama`, …).
    pub fn from_name(provider_name: &str, model: &str) -> Result<Self, NexusPathError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            NexusPathError::InvalidConfig(format!(
                "LLM provider '{provider_name}' is not configured: {e}"
            ))
        })?;
        Ok(Self::new(provider, provider_name, model))
    }
}

impl fmt::Debug for ProviderBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderBackend")
            .field("provider", &self.provider_name)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl SynthesisBackend for ProviderBackend {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn requires_api_key(&self) -> bool {
        false
    }

    async fn list_models(&self, _api_key: &str) -> Result<Vec<ModelInfo>, NexusPathError> {
        Ok(vec![ModelInfo::generative(self.model.clone())])
    }

    async fn generate(
        &self,
        _api_key: &str,
        _model: &str,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<Generation, NexusPathError> {
        let messages = vec![ChatMessage::user(prompt)];
        let completion = CompletionOptions {
            temperature: Some(options.temperature),
            max_tokens: Some(options.max_output_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&completion))
            .await
            .map_err(|e| NexusPathError::LlmApiError {
                message: format!("{}: {e}", self.provider_name),
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.provider_name, response.prompt_tokens, response.completion_tokens
        );

        if response.content.is_empty() {
            return Err(NexusPathError::EmptyResponse {
                provider: self.provider_name.clone(),
                reason: None,
            });
        }

        Ok(Generation {
            text: response.content,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}
