//! Result types produced by the synthesis stage.

use crate::error::{NexusPathError, SynthesisFailure};
use serde::{Deserialize, Serialize};

/// The text shown to the user after a synthesis call.
///
/// On failure `text` holds a readable message and `failure` the typed
/// details, so the caller always has something to display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisResult {
    /// Model response, or the failure message substituted for it.
    pub text: String,
    /// Model that served the request, when one was resolved.
    pub model: Option<String>,
    /// Wall-clock time of discovery plus generation.
    pub duration_ms: u64,
    /// Prompt/response token counts reported by the backend, if any.
    pub input_tokens: usize,
    pub output_tokens: usize,
    /// Set when the call failed.
    pub failure: Option<SynthesisFailure>,
}

impl SynthesisResult {
    pub fn success(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: Some(model.into()),
            duration_ms: 0,
            input_tokens: 0,
            output_tokens: 0,
            failure: None,
        }
    }

    /// Substitute a user-facing message for a failed call.
    pub fn failed(error: &NexusPathError, model: Option<String>) -> Self {
        let failure = SynthesisFailure::from(error);
        Self {
            text: format!("⚠️ Could not generate a result.\n\n{}", failure.message),
            model,
            duration_ms: 0,
            input_tokens: 0,
            output_tokens: 0,
            failure: Some(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Text and usage returned by a backend's generate call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl Generation {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_result_carries_message_and_kind() {
        let err = NexusPathError::AuthError {
            provider: "gemini".into(),
            detail: "API key not valid".into(),
        };
        let r = SynthesisResult::failed(&err, None);
        assert!(!r.is_success());
        assert!(r.text.contains("API key not valid"));
        assert!(!r.failure.as_ref().unwrap().retryable);
    }

    #[test]
    fn success_result() {
        let r = SynthesisResult::success("PLAN", "gemini-1.5-flash");
        assert!(r.is_success());
        assert_eq!(r.model.as_deref(), Some("gemini-1.5-flash"));
    }
}
