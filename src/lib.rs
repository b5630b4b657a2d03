//! # nexuspath
//!
//! Turn one or more PDF/EPUB books into a single LLM-written answer: an
//! instructional summary, or a unified 30-day life action plan that merges
//! the books' advice and settles where they disagree.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / EPUB uploads
//!  │
//!  ├─ 1. Extract   pdfium page text / in-memory EPUB walk, upload order
//!  ├─ 2. Prompt    persona + language + section template, text truncated
//!  ├─ 3. Select    live model catalog → first preferred, else first listed
//!  ├─ 4. Generate  one call; failures become displayable result text
//!  └─ 5. Export    TXT / DOCX / PDF payloads of the retained result
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nexuspath::{
//!     Document, ExportFormat, GeminiBackend, Language, Preferences, SessionController,
//!     StandardExtractor, SynthesisClient, SynthesisConfig, TaskMode,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SynthesisConfig::default();
//!     let backend = Arc::new(GeminiBackend::new(&config)?);
//!     let client = SynthesisClient::new(backend, config);
//!     let prefs = Preferences::new(Language::English, TaskMode::Plan).with_api_key("AIza...");
//!
//!     let mut session = SessionController::new(Arc::new(StandardExtractor), client, prefs);
//!     session.upload(vec![Document::from_path("deep-work.pdf")?]).await?;
//!     if let Some(result) = session.generate().await {
//!         println!("{}", result.text);
//!     }
//!     let pdf = session.export(ExportFormat::Pdf)?;
//!     std::fs::write(pdf.file_name, &pdf.bytes)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `nexuspath` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! nexuspath = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{GeminiBackend, MockBackend, ModelInfo, ProviderBackend, SynthesisBackend};
pub use config::{
    Language, ModelPolicy, Preferences, SynthesisConfig, SynthesisConfigBuilder, TaskMode,
};
pub use error::{ErrorKind, NexusPathError, SynthesisFailure};
pub use export::{write_to_dir, ExportFormat, ExportOptions, ExportPayload};
pub use output::SynthesisResult;
pub use pipeline::extract::{extract_all, Document, DocumentExtractor, MediaType, StandardExtractor};
pub use pipeline::synthesize::SynthesisClient;
pub use prompts::build_prompt;
pub use session::{Notice, SessionController, SessionState};
