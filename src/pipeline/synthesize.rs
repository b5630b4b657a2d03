//! The synthesis call: resolve a model, send one prompt, keep the answer.
//!
//! [`SynthesisClient`] fails closed. Whatever goes wrong (bad key, empty
//! catalog, quota, network) comes back as a [`SynthesisResult`] whose text
//! explains the problem, so the caller always has something to display. One
//! call per invocation; retrying is the user's decision.

use crate::backend::{GenerateOptions, SynthesisBackend};
use crate::config::{ModelPolicy, SynthesisConfig};
use crate::error::NexusPathError;
use crate::output::SynthesisResult;
use crate::pipeline::select::{compatible_models, select_model};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Sends prompts to a [`SynthesisBackend`].
#[derive(Clone)]
pub struct SynthesisClient {
    backend: Arc<dyn SynthesisBackend>,
    config: SynthesisConfig,
}

impl SynthesisClient {
    pub fn new(backend: Arc<dyn SynthesisBackend>, config: SynthesisConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> &dyn SynthesisBackend {
        self.backend.as_ref()
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Choose the model for this call according to the configured policy.
    ///
    /// Under [`ModelPolicy::Discover`] the catalog is fetched every time;
    /// listing errors are wrapped in [`NexusPathError::ModelDiscoveryFailed`].
    pub async fn resolve_model(&self, api_key: &str) -> Result<String, NexusPathError> {
        match &self.config.model_policy {
            ModelPolicy::Static(model) => Ok(model.clone()),
            ModelPolicy::Discover { priority } => {
                let catalog = self.backend.list_models(api_key).await.map_err(|e| {
                    NexusPathError::ModelDiscoveryFailed {
                        source: Box::new(e),
                    }
                })?;
                let available = compatible_models(&catalog);
                debug!(
                    "{} of {} catalog models support generation",
                    available.len(),
                    catalog.len()
                );
                select_model(&available, priority)
            }
        }
    }

    /// Resolve a model, then synthesise. Never fails.
    pub async fn synthesize(&self, prompt: &str, api_key: &str) -> SynthesisResult {
        let start = Instant::now();
        match self.resolve_model(api_key).await {
            Ok(model) => {
                let mut result = self.synthesize_with_model(prompt, &model, api_key).await;
                result.duration_ms = start.elapsed().as_millis() as u64;
                result
            }
            Err(e) => {
                warn!("Model resolution failed: {}", e);
                let mut result = SynthesisResult::failed(&e, None);
                result.duration_ms = start.elapsed().as_millis() as u64;
                result
            }
        }
    }

    /// Send `prompt` to `model`. Never fails; errors become the result text.
    pub async fn synthesize_with_model(
        &self,
        prompt: &str,
        model: &str,
        api_key: &str,
    ) -> SynthesisResult {
        let start = Instant::now();
        let options = GenerateOptions::from(&self.config);
        info!(
            "Synthesising with {}/{} ({} prompt chars)",
            self.backend.name(),
            model,
            prompt.chars().count()
        );

        match self.backend.generate(api_key, model, prompt, &options).await {
            Ok(generation) => {
                let duration = start.elapsed();
                debug!(
                    "{}: {} input tokens, {} output tokens, {:?}",
                    model, generation.input_tokens, generation.output_tokens, duration
                );
                SynthesisResult {
                    text: generation.text,
                    model: Some(model.to_string()),
                    duration_ms: duration.as_millis() as u64,
                    input_tokens: generation.input_tokens,
                    output_tokens: generation.output_tokens,
                    failure: None,
                }
            }
            Err(e) => {
                warn!("Synthesis with {} failed: {}", model, e);
                let mut result = SynthesisResult::failed(&e, Some(model.to_string()));
                result.duration_ms = start.elapsed().as_millis() as u64;
                result
            }
        }
    }
}
