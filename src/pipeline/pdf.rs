//! PDF text extraction via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and must not run on a Tokio worker. The whole open → iterate →
//! extract sequence runs on the blocking pool instead.
//!
//! The document is opened straight from the uploaded byte slice; nothing is
//! written to disk.

use crate::error::NexusPathError;
use tracing::debug;

/// Extract the plain text of every page, in page order.
pub async fn extract_pdf_text(name: String, bytes: Vec<u8>) -> Result<String, NexusPathError> {
    tokio::task::spawn_blocking(move || extract_blocking(&name, &bytes))
        .await
        .map_err(|e| NexusPathError::Internal(format!("PDF extraction task panicked: {}", e)))?
}

/// Blocking implementation of page text extraction.
fn extract_blocking(name: &str, bytes: &[u8]) -> Result<String, NexusPathError> {
    let pdfium = pdfium_auto::bind_pdfium_silent()
        .map_err(|e| NexusPathError::PdfiumBindingFailed(e.to_string()))?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| NexusPathError::CorruptPdf {
            name: name.to_string(),
            detail: format!("{:?}", e),
        })?;

    let pages = document.pages();
    debug!("PDF '{}' loaded: {} pages", name, pages.len());

    let text = join_pages(pages.iter().enumerate().map(|(idx, page)| {
        page.text()
            .map(|text| text.all())
            .map_err(|e| NexusPathError::CorruptPdf {
                name: name.to_string(),
                detail: format!("page {}: {:?}", idx + 1, e),
            })
    }))?;
    Ok(text)
}

/// Concatenate page texts in order with no separator.
///
/// Pages are pulled lazily; the first failing page stops the iteration.
pub fn join_pages<I, E>(pages: I) -> Result<String, E>
where
    I: IntoIterator<Item = Result<String, E>>,
{
    pages.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_join_without_separator() {
        let pages: Vec<Result<String, NexusPathError>> =
            vec![Ok("Page one.".into()), Ok("Page two.".into()), Ok(String::new())];
        assert_eq!(join_pages(pages).unwrap(), "Page one.Page two.");
    }

    #[test]
    fn single_page_is_returned_verbatim() {
        let pages: Vec<Result<String, NexusPathError>> = vec![Ok("Hello".into())];
        assert_eq!(join_pages(pages).unwrap(), "Hello");
    }

    #[test]
    fn first_page_error_stops_iteration() {
        let mut pulled = 0;
        let pages = (0..5).map(|i| {
            pulled += 1;
            if i == 1 {
                Err(format!("page {}", i + 1))
            } else {
                Ok(format!("p{i}"))
            }
        });
        assert_eq!(join_pages(pages).unwrap_err(), "page 2");
        assert_eq!(pulled, 2);
    }

    #[tokio::test]
    async fn garbage_bytes_are_reported_not_panicked() {
        if std::env::var("PDFIUM_TESTS").is_err() {
            println!("SKIP — set PDFIUM_TESTS=1 to run pdfium-backed tests");
            return;
        }
        let err = extract_pdf_text("junk.pdf".into(), b"not a pdf".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, NexusPathError::CorruptPdf { .. }));
    }
}
