//! Document intake: declared media type → plain text.
//!
//! Uploads arrive as raw bytes tagged with the media type the browser (or
//! the CLI, from the file extension) declared. The type is trusted: a PDF
//! labelled as EPUB fails inside the EPUB reader, not here.

use crate::error::NexusPathError;
use crate::pipeline::{epub, pdf};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Pdf,
    Epub,
}

impl MediaType {
    pub const PDF_MIME: &'static str = "application/pdf";
    pub const EPUB_MIME: &'static str = "application/epub+zip";

    /// Parse a declared MIME type, ignoring case and parameters.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        if essence.eq_ignore_ascii_case(Self::PDF_MIME) {
            Some(MediaType::Pdf)
        } else if essence.eq_ignore_ascii_case(Self::EPUB_MIME) {
            Some(MediaType::Epub)
        } else {
            None
        }
    }

    /// Guess the media type from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("pdf") {
            Some(MediaType::Pdf)
        } else if ext.eq_ignore_ascii_case("epub") {
            Some(MediaType::Epub)
        } else {
            None
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            MediaType::Pdf => Self::PDF_MIME,
            MediaType::Epub => Self::EPUB_MIME,
        }
    }
}

/// An uploaded file. Consumed by one extraction call.
#[derive(Clone)]
pub struct Document {
    pub name: String,
    pub bytes: Vec<u8>,
    /// MIME type as declared by the uploader.
    pub media_type: String,
}

impl Document {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes,
            media_type: media_type.into(),
        }
    }

    pub fn pdf(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(name, bytes, MediaType::PDF_MIME)
    }

    pub fn epub(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(name, bytes, MediaType::EPUB_MIME)
    }

    /// Read a local file, declaring its media type from the extension.
    ///
    /// Unknown extensions are declared as `application/octet-stream` and
    /// rejected at extraction time.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, NexusPathError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| NexusPathError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        let media_type = MediaType::from_path(path)
            .map(MediaType::mime)
            .unwrap_or("application/octet-stream");
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes, media_type))
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .field("media_type", &self.media_type)
            .finish()
    }
}

/// Converts one document to plain text.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract(&self, document: Document) -> Result<String, NexusPathError>;
}

/// The production extractor: pdfium for PDF, the in-memory reader for EPUB.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardExtractor;

#[async_trait]
impl DocumentExtractor for StandardExtractor {
    async fn extract(&self, document: Document) -> Result<String, NexusPathError> {
        let Document {
            name,
            bytes,
            media_type,
        } = document;

        let text = match MediaType::from_mime(&media_type) {
            Some(MediaType::Pdf) => pdf::extract_pdf_text(name.clone(), bytes).await?,
            Some(MediaType::Epub) => epub::extract_epub_text(&name, &bytes)?,
            None => {
                return Err(NexusPathError::UnsupportedMediaType { name, media_type });
            }
        };

        debug!("Extracted {} chars from '{}'", text.chars().count(), name);
        Ok(text)
    }
}

/// Extract every document in upload order and concatenate the texts.
///
/// No delimiter or heading is inserted between documents. The first failure
/// aborts the whole batch.
pub async fn extract_all(
    extractor: &dyn DocumentExtractor,
    documents: Vec<Document>,
) -> Result<String, NexusPathError> {
    let count = documents.len();
    let mut combined = String::new();
    for document in documents {
        combined.push_str(&extractor.extract(document).await?);
    }
    info!("Extracted {} documents → {} bytes of text", count, combined.len());
    Ok(combined)
}
