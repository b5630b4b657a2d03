//! Pipeline stages for document synthesis.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ prompts::build_prompt ──▶ select ──▶ synthesize
//! (pdf/epub)  (template + truncation)   (model)    (backend call)
//! ```
//!
//! 1. [`extract`]    — dispatch on the declared media type and concatenate
//!    per-document text in upload order
//! 2. [`pdf`]        — page-by-page text via pdfium; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`epub`]       — in-memory EPUB container walk and markup stripping
//! 4. [`select`]     — pick a model from the live catalog by priority
//! 5. [`synthesize`] — the only stage with network I/O; never propagates
//!    backend errors, always yields displayable text

pub mod epub;
pub mod extract;
pub mod pdf;
pub mod select;
pub mod synthesize;
