//! Per-user session: uploaded text, preferences and the last result.
//!
//! ```text
//!          upload            generate             (done)
//!  Idle ───────────▶ FilesLoaded ───────▶ Synthesizing ───────▶ ResultReady
//!   ▲  upload(empty)      ▲                                    │
//!   └─────────────────────┘◀──────────── upload ───────────────┤
//!                                      generate again ◀────────┘
//! ```
//!
//! The controller owns everything a user session needs and nothing is shared
//! between sessions. Problems the user can fix (no files, no key, a broken
//! upload, a degraded export) are reported as [`Notice`]s, drained by the
//! presentation layer with [`SessionController::take_notices`].

use crate::config::Preferences;
use crate::error::NexusPathError;
use crate::export::{self, ExportFormat, ExportOptions, ExportPayload};
use crate::output::SynthesisResult;
use crate::pipeline::extract::{extract_all, Document, DocumentExtractor};
use crate::pipeline::synthesize::SynthesisClient;
use crate::prompts::build_prompt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where the session is in the upload → generate → export flow.
///
/// A retained result outlives new uploads: `FilesLoaded` may hold the
/// previous result until the next generate replaces it. When an upload
/// leaves no text behind, the session rests in `ResultReady` if a result is
/// retained and in `Idle` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    FilesLoaded,
    Synthesizing,
    ResultReady,
}

/// A user-visible message raised by a session operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    /// Generate was requested without a usable API key.
    MissingApiKey,
    /// Generate was requested before any document was loaded.
    NoDocuments,
    /// An uploaded document could not be read.
    ExtractionFailed(String),
    /// The PDF export could not be produced; TXT and DOCX are still offered.
    ExportDegraded(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::MissingApiKey => f.write_str("Please enter your API key."),
            Notice::NoDocuments => f.write_str("Upload at least one PDF or EPUB first."),
            Notice::ExtractionFailed(msg) => write!(f, "Could not read the upload: {msg}"),
            Notice::ExportDegraded(msg) => write!(
                f,
                "PDF export unavailable ({msg}). Download the TXT or DOCX version instead."
            ),
        }
    }
}

/// Drives one user's session.
pub struct SessionController {
    extractor: Arc<dyn DocumentExtractor>,
    client: SynthesisClient,
    preferences: Preferences,
    export_options: ExportOptions,
    text: Option<String>,
    document_names: Vec<String>,
    result: Option<SynthesisResult>,
    notices: Vec<Notice>,
    state: SessionState,
    history: Vec<SessionState>,
}

impl SessionController {
    pub fn new(
        extractor: Arc<dyn DocumentExtractor>,
        client: SynthesisClient,
        preferences: Preferences,
    ) -> Self {
        let export_options = ExportOptions::from(client.config());
        Self {
            extractor,
            client,
            preferences,
            export_options,
            text: None,
            document_names: Vec::new(),
            result: None,
            notices: Vec::new(),
            state: SessionState::Idle,
            history: vec![SessionState::Idle],
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Every state the session has been in, oldest first.
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn preferences_mut(&mut self) -> &mut Preferences {
        &mut self.preferences
    }

    pub fn set_preferences(&mut self, preferences: Preferences) {
        self.preferences = preferences;
    }

    /// Title and font used for DOCX and PDF exports. Defaults to the
    /// synthesis config's settings.
    pub fn export_options(&self) -> &ExportOptions {
        &self.export_options
    }

    pub fn set_export_options(&mut self, options: ExportOptions) {
        self.export_options = options;
    }

    /// Combined text of the current upload, if any.
    pub fn extracted_text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Names of the documents in the current upload, in upload order.
    pub fn document_names(&self) -> &[String] {
        &self.document_names
    }

    /// The retained result. Reading it never re-synthesises.
    pub fn result(&self) -> Option<&SynthesisResult> {
        self.result.as_ref()
    }

    /// Drain pending notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Replace the current upload with `documents`.
    ///
    /// An empty upload clears the loaded text. On an extraction error
    /// nothing of the batch is kept, an [`Notice::ExtractionFailed`] is
    /// raised and the error returned. A previously generated result is
    /// retained either way; see [`SessionState`] for where the session
    /// rests.
    pub async fn upload(&mut self, documents: Vec<Document>) -> Result<(), NexusPathError> {
        self.text = None;
        self.document_names.clear();

        if documents.is_empty() {
            debug!("Empty upload; loaded text cleared");
            self.transition(self.resting_state());
            return Ok(());
        }

        let names: Vec<String> = documents.iter().map(|d| d.name.clone()).collect();
        match extract_all(self.extractor.as_ref(), documents).await {
            Ok(text) => {
                info!(
                    "Loaded {} documents ({} chars)",
                    names.len(),
                    text.chars().count()
                );
                self.text = Some(text);
                self.document_names = names;
                self.transition(SessionState::FilesLoaded);
                Ok(())
            }
            Err(e) => {
                warn!("Upload rejected: {}", e);
                self.notices.push(Notice::ExtractionFailed(e.to_string()));
                self.transition(self.resting_state());
                Err(e)
            }
        }
    }

    /// Build the prompt from the loaded text and synthesise a result.
    ///
    /// Returns the new result, or `None` when a precondition raised a notice
    /// instead (no documents, no API key). Backend failures still produce a
    /// result whose text describes the problem.
    pub async fn generate(&mut self) -> Option<&SynthesisResult> {
        let Some(text) = self.text.as_deref() else {
            self.notices.push(Notice::NoDocuments);
            return None;
        };

        let api_key = match self.preferences.api_key() {
            Some(key) => key.to_string(),
            None if !self.client.backend().requires_api_key() => String::new(),
            None => {
                debug!("Generate without an API key; no backend call");
                self.notices.push(Notice::MissingApiKey);
                return None;
            }
        };

        let prompt = build_prompt(
            text,
            self.preferences.language,
            self.preferences.task_mode,
            self.client.config().char_budget,
        );

        self.transition(SessionState::Synthesizing);
        let result = self.client.synthesize(&prompt, &api_key).await;
        if result.is_success() {
            info!(
                "{} ready in {} ms ({} chars)",
                self.preferences.task_mode,
                result.duration_ms,
                result.text.chars().count()
            );
        }
        self.result = Some(result);
        self.transition(SessionState::ResultReady);
        self.result.as_ref()
    }

    /// Build one export of the retained result. The session state is left
    /// unchanged.
    ///
    /// A PDF failure additionally raises [`Notice::ExportDegraded`].
    pub fn export(&mut self, format: ExportFormat) -> Result<ExportPayload, NexusPathError> {
        let result = self.result.as_ref().ok_or(NexusPathError::NoResult)?;
        export::export(&result.text, format, &self.export_options).map_err(|e| {
            if format == ExportFormat::Pdf {
                warn!("PDF export degraded: {}", e);
                self.notices.push(Notice::ExportDegraded(e.to_string()));
            }
            e
        })
    }

    /// Every export format that can be built, in TXT, DOCX, PDF order.
    ///
    /// Formats that fail are left out.
    pub fn exports(&mut self) -> Vec<ExportPayload> {
        ExportFormat::ALL
            .into_iter()
            .filter_map(|format| match self.export(format) {
                Ok(payload) => Some(payload),
                Err(e) => {
                    debug!("{} export skipped: {}", format, e);
                    None
                }
            })
            .collect()
    }

    /// State when no text is loaded.
    fn resting_state(&self) -> SessionState {
        if self.result.is_some() {
            SessionState::ResultReady
        } else {
            SessionState::Idle
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!("Session {:?} → {:?}", self.state, next);
        }
        self.state = next;
        self.history.push(next);
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state)
            .field("preferences", &self.preferences)
            .field("documents", &self.document_names)
            .field("has_result", &self.result.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::config::{Language, SynthesisConfig, TaskMode};
    use async_trait::async_trait;

    struct Utf8Extractor;

    #[async_trait]
    impl DocumentExtractor for Utf8Extractor {
        async fn extract(&self, document: Document) -> Result<String, NexusPathError> {
            String::from_utf8(document.bytes).map_err(|e| NexusPathError::CorruptPdf {
                name: document.name,
                detail: e.to_string(),
            })
        }
    }

    fn session(backend: Arc<MockBackend>, preferences: Preferences) -> SessionController {
        let client = SynthesisClient::new(backend, SynthesisConfig::default());
        SessionController::new(Arc::new(Utf8Extractor), client, preferences)
    }

    fn keyed() -> Preferences {
        Preferences::new(Language::English, TaskMode::Plan).with_api_key("key")
    }

    #[tokio::test]
    async fn generate_without_documents_raises_notice() {
        let backend = Arc::new(MockBackend::new("unused"));
        let mut s = session(backend.clone(), keyed());
        assert!(s.generate().await.is_none());
        assert_eq!(s.take_notices(), vec![Notice::NoDocuments]);
        assert_eq!(s.state(), SessionState::Idle);
        assert_eq!(backend.generate_count(), 0);
    }

    #[tokio::test]
    async fn blank_key_counts_as_missing() {
        let backend = Arc::new(MockBackend::new("unused"));
        let prefs = Preferences::default().with_api_key("   ");
        let mut s = session(backend.clone(), prefs);
        s.upload(vec![Document::pdf("a.pdf", b"text".to_vec())])
            .await
            .unwrap();
        assert!(s.generate().await.is_none());
        assert_eq!(s.take_notices(), vec![Notice::MissingApiKey]);
        assert_eq!(s.state(), SessionState::FilesLoaded);
        assert_eq!(backend.list_count() + backend.generate_count(), 0);
    }

    #[tokio::test]
    async fn failed_upload_keeps_no_partial_text() {
        let backend = Arc::new(MockBackend::new("unused"));
        let mut s = session(backend, keyed());
        let err = s
            .upload(vec![
                Document::pdf("good.pdf", b"fine".to_vec()),
                Document::pdf("bad.pdf", vec![0xff, 0xfe]),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, NexusPathError::CorruptPdf { .. }));
        assert!(s.extracted_text().is_none());
        assert_eq!(s.state(), SessionState::Idle);
        assert!(matches!(
            s.take_notices().as_slice(),
            [Notice::ExtractionFailed(_)]
        ));
    }

    #[tokio::test]
    async fn result_survives_new_upload_and_repeated_reads() {
        let backend = Arc::new(MockBackend::new("PLAN"));
        let mut s = session(backend.clone(), keyed());
        s.upload(vec![Document::epub("a.epub", b"A".to_vec())])
            .await
            .unwrap();
        s.generate().await;

        for _ in 0..3 {
            assert_eq!(s.result().unwrap().text, "PLAN");
        }
        s.upload(vec![Document::pdf("b.pdf", b"B".to_vec())])
            .await
            .unwrap();
        assert_eq!(s.state(), SessionState::FilesLoaded);
        assert_eq!(s.result().unwrap().text, "PLAN");
        assert_eq!(backend.generate_count(), 1);
    }

    #[tokio::test]
    async fn export_before_generate_is_an_error() {
        let backend = Arc::new(MockBackend::new("unused"));
        let mut s = session(backend, keyed());
        assert!(matches!(
            s.export(ExportFormat::Text),
            Err(NexusPathError::NoResult)
        ));
        assert!(s.exports().is_empty());
    }

    #[tokio::test]
    async fn empty_upload_returns_to_idle() {
        let backend = Arc::new(MockBackend::new("unused"));
        let mut s = session(backend, keyed());
        s.upload(vec![Document::pdf("a.pdf", b"x".to_vec())])
            .await
            .unwrap();
        s.upload(Vec::new()).await.unwrap();
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.document_names().is_empty());
    }
}
