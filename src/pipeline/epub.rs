//! EPUB text extraction, entirely in memory.
//!
//! An EPUB is a zip container. `META-INF/container.xml` points at the
//! package document (OPF), whose `<manifest>` lists every resource with its
//! media type. Content documents are the XHTML items; they are read in
//! manifest order, their markup stripped, and each one's text is followed by
//! a newline.
//!
//! The archive is read from the uploaded byte slice through a `Cursor`, so
//! concurrent extractions never share a staging file.

use crate::error::NexusPathError;
use quick_xml::events::Event;
use quick_xml::Reader;
use scraper::Html;
use std::io::{Cursor, Read, Seek};
use tracing::{debug, warn};
use zip::ZipArchive;

const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Media types of manifest items treated as content documents.
const DOCUMENT_MEDIA_TYPES: [&str; 2] = ["application/xhtml+xml", "text/html"];

/// Extract the text of every content document, each followed by `"\n"`.
pub fn extract_epub_text(name: &str, bytes: &[u8]) -> Result<String, NexusPathError> {
    let corrupt = |detail: String| NexusPathError::CorruptEpub {
        name: name.to_string(),
        detail,
    };

    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| corrupt(format!("not a zip container: {e}")))?;

    let container = read_entry(&mut archive, CONTAINER_PATH).map_err(corrupt)?;
    let opf_path = rootfile_path(&container)
        .map_err(corrupt)?
        .ok_or_else(|| corrupt(format!("{CONTAINER_PATH} names no rootfile")))?;

    let opf = read_entry(&mut archive, &opf_path).map_err(corrupt)?;
    let hrefs = content_documents(&opf).map_err(corrupt)?;
    debug!("EPUB '{}': {} content documents", name, hrefs.len());

    let mut text = String::new();
    for href in hrefs {
        let path = resolve_href(&opf_path, &href);
        let markup = read_entry(&mut archive, &path).map_err(corrupt)?;
        text.push_str(&html_to_text(&String::from_utf8_lossy(&markup)));
        text.push('\n');
    }

    if text.is_empty() {
        warn!("EPUB '{}' has no content documents", name);
    }
    Ok(text)
}

/// All text nodes of an HTML/XHTML document, concatenated, markup removed.
///
/// Whitespace is kept as written; nothing is trimmed or collapsed.
pub fn html_to_text(markup: &str) -> String {
    Html::parse_document(markup).root_element().text().collect()
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<Vec<u8>, String> {
    let mut entry = archive
        .by_name(path)
        .map_err(|e| format!("missing '{path}': {e}"))?;
    let mut buf = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut buf)
        .map_err(|e| format!("unreadable '{path}': {e}"))?;
    Ok(buf)
}

/// `full-path` of the first `<rootfile>` in `container.xml`.
fn rootfile_path(container: &[u8]) -> Result<Option<String>, String> {
    let mut reader = Reader::from_reader(container);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"rootfile" => {
                for attr in e.attributes().flatten() {
                    if attr.key.local_name().as_ref() == b"full-path" {
                        let value = attr
                            .unescape_value()
                            .map_err(|e| format!("container.xml: {e}"))?;
                        return Ok(Some(value.into_owned()));
                    }
                }
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => return Err(format!("container.xml: {e}")),
            _ => {}
        }
        buf.clear();
    }
}

/// Hrefs of the manifest's content documents, in manifest order.
fn content_documents(opf: &[u8]) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_reader(opf);
    let mut buf = Vec::new();
    let mut hrefs = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"item" => {
                let mut href = None;
                let mut media_type = None;
                for attr in e.attributes().flatten() {
                    let value = attr
                        .unescape_value()
                        .map_err(|e| format!("package document: {e}"))?
                        .into_owned();
                    match attr.key.local_name().as_ref() {
                        b"href" => href = Some(value),
                        b"media-type" => media_type = Some(value),
                        _ => {}
                    }
                }
                if let (Some(href), Some(media_type)) = (href, media_type) {
                    if DOCUMENT_MEDIA_TYPES
                        .iter()
                        .any(|t| media_type.eq_ignore_ascii_case(t))
                    {
                        hrefs.push(href);
                    }
                }
            }
            Ok(Event::Eof) => return Ok(hrefs),
            Err(e) => return Err(format!("package document: {e}")),
            _ => {}
        }
        buf.clear();
    }
}

/// Resolve a manifest href against the package document's directory.
///
/// Hrefs are percent-encoded URLs relative to the OPF; zip entry names are
/// decoded paths from the archive root.
fn resolve_href(opf_path: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or(href);
    let href = urlencoding::decode(href)
        .map(|h| h.into_owned())
        .unwrap_or_else(|_| href.to_string());

    let mut parts: Vec<&str> = match opf_path.rfind('/') {
        Some(idx) => opf_path[..idx].split('/').collect(),
        None => Vec::new(),
    };
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup() {
        let xhtml = r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>T</title></head><body><h1>Chapter</h1><p>One <em>two</em></p></body></html>"#;
        assert_eq!(html_to_text(xhtml), "TChapterOne two");
    }

    #[test]
    fn finds_rootfile() {
        let container = br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;
        assert_eq!(
            rootfile_path(container).unwrap().as_deref(),
            Some("OEBPS/content.opf")
        );
    }

    #[test]
    fn manifest_order_and_filtering() {
        let opf = br#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <manifest>
    <item id="css" href="style.css" media-type="text/css"/>
    <item id="c2" href="text/ch2.xhtml" media-type="application/xhtml+xml"/>
    <item id="img" href="cover.jpg" media-type="image/jpeg"/>
    <item id="c1" href="text/ch1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine><itemref idref="c1"/><itemref idref="c2"/></spine>
</package>"#;
        assert_eq!(
            content_documents(opf).unwrap(),
            vec!["text/ch2.xhtml", "text/ch1.xhtml"]
        );
    }

    #[test]
    fn href_resolution() {
        assert_eq!(resolve_href("OEBPS/content.opf", "ch1.xhtml"), "OEBPS/ch1.xhtml");
        assert_eq!(resolve_href("content.opf", "text/ch1.xhtml"), "text/ch1.xhtml");
        assert_eq!(
            resolve_href("OEBPS/pkg/content.opf", "../text/ch%201.xhtml#top"),
            "OEBPS/text/ch 1.xhtml"
        );
    }

    #[test]
    fn not_a_zip() {
        let err = extract_epub_text("bad.epub", b"definitely not zip").unwrap_err();
        assert!(matches!(err, NexusPathError::CorruptEpub { ref name, .. } if name == "bad.epub"));
    }
}
