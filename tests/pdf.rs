//! PDF extraction through the real pdfium engine.
//!
//! Gated behind `PDFIUM_TESTS` because the engine library is downloaded on
//! first bind.
//!
//! Run with:
//!   PDFIUM_TESTS=1 cargo test --test pdf -- --nocapture

use nexuspath::export::to_pdf;
use nexuspath::{Document, DocumentExtractor, ExportOptions, NexusPathError, StandardExtractor};
use printpdf::{BuiltinFont, Mm, PdfDocument};
use std::io::BufWriter;

macro_rules! pdfium_skip_unless_enabled {
    () => {
        if std::env::var("PDFIUM_TESTS").is_err() {
            println!("SKIP — set PDFIUM_TESTS=1 to run pdfium tests");
            return;
        }
    };
}

// ── Test helpers ─────────────────────────────────────────────────────────────

/// A PDF with one page per entry, each page holding only that text.
fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let (doc, first_page, first_layer) =
        PdfDocument::new("fixture", Mm(210.0), Mm(297.0), "Layer 1");
    let font = doc.add_builtin_font(BuiltinFont::Helvetica).unwrap();

    let mut layers = vec![doc.get_page(first_page).get_layer(first_layer)];
    for i in 1..pages.len() {
        let (page, layer) = doc.add_page(Mm(210.0), Mm(297.0), format!("Layer {}", i + 1));
        layers.push(doc.get_page(page).get_layer(layer));
    }
    for (layer, text) in layers.iter().zip(pages) {
        layer.use_text(*text, 12.0, Mm(20.0), Mm(270.0), &font);
    }

    let mut buffer = Vec::new();
    {
        let mut writer = BufWriter::new(&mut buffer);
        doc.save(&mut writer).unwrap();
    }
    buffer
}

async fn extract(name: &str, bytes: Vec<u8>) -> Result<String, NexusPathError> {
    StandardExtractor.extract(Document::pdf(name, bytes)).await
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_page_text_is_returned_exactly() {
    pdfium_skip_unless_enabled!();

    let text = extract("hello.pdf", pdf_with_pages(&["Hello"])).await.unwrap();
    assert_eq!(text, "Hello");
}

#[tokio::test]
async fn pages_are_concatenated_in_order_without_separator() {
    pdfium_skip_unless_enabled!();

    let text = extract("two.pdf", pdf_with_pages(&["One", "Two"])).await.unwrap();
    assert_eq!(text, "OneTwo");
}

#[tokio::test]
async fn exported_plan_reads_back() {
    pdfium_skip_unless_enabled!();

    let bytes = to_pdf("Hello", &ExportOptions::default()).unwrap();
    let text = extract("plan.pdf", bytes).await.unwrap();
    let title = text.find("Life Action Plan");
    let body = text.find("Hello");
    assert!(title.is_some() && body > title, "extracted: {text:?}");
}

#[tokio::test]
async fn garbage_bytes_are_a_corrupt_pdf() {
    pdfium_skip_unless_enabled!();

    let err = extract("junk.pdf", b"not a pdf".to_vec()).await.unwrap_err();
    assert!(matches!(err, NexusPathError::CorruptPdf { ref name, .. } if name == "junk.pdf"));
}
