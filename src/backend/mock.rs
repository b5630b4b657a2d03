//! Scripted in-memory backend.
//!
//! Records every call so tests can assert how many requests a user action
//! produced and what they contained.

use super::{GenerateOptions, ModelInfo, SynthesisBackend};
use crate::error::NexusPathError;
use crate::output::Generation;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// One recorded `generate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub api_key: String,
    pub model: String,
    pub prompt: String,
}

/// A backend that answers from a script.
///
/// `generate` pops queued failures first, then returns the fixed response.
#[derive(Debug)]
pub struct MockBackend {
    response: String,
    models: Vec<ModelInfo>,
    queued_failures: Mutex<VecDeque<NexusPathError>>,
    listing_failure: Mutex<Option<NexusPathError>>,
    calls: Mutex<Vec<MockCall>>,
    list_calls: AtomicUsize,
}

impl MockBackend {
    /// Answer every generate call with `response`; catalog: `gemini-1.5-flash`.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            models: vec![ModelInfo::generative("models/gemini-1.5-flash")],
            queued_failures: Mutex::new(VecDeque::new()),
            listing_failure: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_models(mut self, models: Vec<ModelInfo>) -> Self {
        self.models = models;
        self
    }

    /// Fail the next `generate` call with `error`.
    pub fn fail_next(self, error: NexusPathError) -> Self {
        lock(&self.queued_failures).push_back(error);
        self
    }

    /// Fail the next `list_models` call with `error`.
    pub fn fail_listing(self, error: NexusPathError) -> Self {
        *lock(&self.listing_failure) = Some(error);
        self
    }

    /// Recorded generate calls, oldest first.
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    pub fn generate_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn list_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl SynthesisBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_models(&self, _api_key: &str) -> Result<Vec<ModelInfo>, NexusPathError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = lock(&self.listing_failure).take() {
            return Err(err);
        }
        Ok(self.models.clone())
    }

    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<Generation, NexusPathError> {
        lock(&self.calls).push(MockCall {
            api_key: api_key.to_string(),
            model: model.to_string(),
            prompt: prompt.to_string(),
        });
        if let Some(err) = lock(&self.queued_failures).pop_front() {
            return Err(err);
        }
        Ok(Generation::text(self.response.clone()))
    }
}
