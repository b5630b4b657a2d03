//! Error types for the nexuspath library.
//!
//! Two types reflect two ways a failure travels:
//!
//! * [`NexusPathError`] — returned as `Err(..)` from every fallible library
//!   call. Variants are grouped by the boundary that produced them
//!   (extraction, model discovery, synthesis, export, configuration) and each
//!   one reports an [`ErrorKind`] and whether retrying could help.
//!
//! * [`SynthesisFailure`] — a cloneable, serialisable snapshot of a
//!   `NexusPathError` stored inside [`crate::output::SynthesisResult`]. The
//!   synthesis client never propagates backend errors; it records them here
//!   next to the human-readable text shown in place of a result.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the nexuspath library.
#[derive(Debug, Error)]
pub enum NexusPathError {
    // ── Extraction errors ─────────────────────────────────────────────────
    /// The declared media type is neither PDF nor EPUB.
    #[error("Unsupported document type '{media_type}' for '{name}'\nUpload a PDF or EPUB file.")]
    UnsupportedMediaType { name: String, media_type: String },

    /// Could not read an uploaded file from disk.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The PDF engine could not open or read the document.
    #[error("PDF '{name}' could not be read: {detail}")]
    CorruptPdf { name: String, detail: String },

    /// The EPUB container, package document or a content item is unreadable.
    #[error("EPUB '{name}' could not be read: {detail}")]
    CorruptEpub { name: String, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first use.\n\
If the download failed, check your internet connection or set\n\
PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Model discovery errors ────────────────────────────────────────────
    /// The backend catalog has no model able to generate content.
    #[error("No compatible models are available for this API key")]
    NoCompatibleModels,

    /// Listing the backend's models failed.
    #[error("Model discovery failed: {source}")]
    ModelDiscoveryFailed {
        #[source]
        source: Box<NexusPathError>,
    },

    // ── Synthesis errors ──────────────────────────────────────────────────
    /// The backend rejected the API key (401/403).
    #[error("Authentication error from '{provider}': {detail}\nCheck your API key.")]
    AuthError { provider: String, detail: String },

    /// The backend does not know the requested model (404).
    #[error("Model '{model}' was not found by '{provider}'")]
    ModelNotFound { provider: String, model: String },

    /// The backend returned HTTP 429.
    #[error("Rate limit exceeded for '{provider}'")]
    RateLimitExceeded {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    /// The backend returned any other error.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// The request never got a response (DNS, TLS, connection reset).
    #[error("Could not reach '{provider}': {detail}")]
    Transport { provider: String, detail: String },

    /// The request exceeded the configured timeout.
    #[error("Request to '{provider}' timed out after {secs}s")]
    Timeout { provider: String, secs: u64 },

    /// The backend answered but produced no text.
    #[error("'{provider}' returned no text{}", reason_suffix(.reason))]
    EmptyResponse {
        provider: String,
        reason: Option<String>,
    },

    // ── Export errors ─────────────────────────────────────────────────────
    /// Export was requested before any result was generated.
    #[error("Nothing to export yet: generate a result first")]
    NoResult,

    /// Building an export container failed.
    #[error("{format} export failed: {detail}")]
    ExportFailed { format: String, detail: String },

    /// Could not write an export payload to disk.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_ref()
        .map(|r| format!(" ({r})"))
        .unwrap_or_default()
}

/// The boundary an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Extraction,
    Discovery,
    Synthesis,
    Export,
    Config,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Extraction => "extraction",
            ErrorKind::Discovery => "discovery",
            ErrorKind::Synthesis => "synthesis",
            ErrorKind::Export => "export",
            ErrorKind::Config => "config",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

impl NexusPathError {
    /// The boundary that produced this error.
    pub fn kind(&self) -> ErrorKind {
        use NexusPathError::*;
        match self {
            UnsupportedMediaType { .. }
            | ReadFailed { .. }
            | CorruptPdf { .. }
            | CorruptEpub { .. }
            | PdfiumBindingFailed(_) => ErrorKind::Extraction,
            NoCompatibleModels | ModelDiscoveryFailed { .. } => ErrorKind::Discovery,
            AuthError { .. }
            | ModelNotFound { .. }
            | RateLimitExceeded { .. }
            | LlmApiError { .. }
            | Transport { .. }
            | Timeout { .. }
            | EmptyResponse { .. } => ErrorKind::Synthesis,
            NoResult | ExportFailed { .. } | OutputWriteFailed { .. } => ErrorKind::Export,
            InvalidConfig(_) => ErrorKind::Config,
            Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the same request could succeed if issued again later.
    ///
    /// Rate limits, timeouts and transport failures are transient. Bad keys,
    /// unknown models and corrupt documents are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            NexusPathError::RateLimitExceeded { .. }
            | NexusPathError::Transport { .. }
            | NexusPathError::Timeout { .. } => true,
            NexusPathError::ModelDiscoveryFailed { source } => source.is_retryable(),
            _ => false,
        }
    }
}

/// A recorded synthesis failure.
///
/// Stored in [`crate::output::SynthesisResult::failure`] so callers can tell
/// a retryable hiccup from a terminal condition without parsing the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisFailure {
    pub kind: ErrorKind,
    pub retryable: bool,
    pub message: String,
}

impl From<&NexusPathError> for SynthesisFailure {
    fn from(e: &NexusPathError) -> Self {
        Self {
            kind: e.kind(),
            retryable: e.is_retryable(),
            message: e.to_string(),
        }
    }
}

impl fmt::Display for SynthesisFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_retryable() {
        let e = NexusPathError::RateLimitExceeded {
            provider: "gemini".into(),
            retry_after_secs: Some(30),
        };
        assert!(e.is_retryable());
        assert_eq!(e.kind(), ErrorKind::Synthesis);
        assert!(e.to_string().contains("gemini"));
    }

    #[test]
    fn auth_error_is_terminal() {
        let e = NexusPathError::AuthError {
            provider: "gemini".into(),
            detail: "API key not valid".into(),
        };
        assert!(!e.is_retryable());
        assert!(e.to_string().contains("API key not valid"));
    }

    #[test]
    fn discovery_failure_inherits_retryability() {
        let transient = NexusPathError::ModelDiscoveryFailed {
            source: Box::new(NexusPathError::Timeout {
                provider: "gemini".into(),
                secs: 30,
            }),
        };
        assert!(transient.is_retryable());
        assert_eq!(transient.kind(), ErrorKind::Discovery);

        let terminal = NexusPathError::ModelDiscoveryFailed {
            source: Box::new(NexusPathError::AuthError {
                provider: "gemini".into(),
                detail: "bad key".into(),
            }),
        };
        assert!(!terminal.is_retryable());
        assert!(terminal.to_string().contains("bad key"));
    }

    #[test]
    fn empty_response_display() {
        let with_reason = NexusPathError::EmptyResponse {
            provider: "gemini".into(),
            reason: Some("SAFETY".into()),
        };
        assert_eq!(with_reason.to_string(), "'gemini' returned no text (SAFETY)");

        let without = NexusPathError::EmptyResponse {
            provider: "gemini".into(),
            reason: None,
        };
        assert_eq!(without.to_string(), "'gemini' returned no text");
    }

    #[test]
    fn failure_snapshot() {
        let e = NexusPathError::NoCompatibleModels;
        let f = SynthesisFailure::from(&e);
        assert_eq!(f.kind, ErrorKind::Discovery);
        assert!(!f.retryable);
        assert_eq!(f.message, e.to_string());
        assert!(f.to_string().starts_with("discovery error:"));
    }
}
