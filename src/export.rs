//! Export formatters: result text → downloadable byte payloads.
//!
//! Three independent pure functions, one per container. None of them caches
//! anything; every export request rebuilds its payload from the retained
//! result text.
//!
//! | Format | File name | MIME type |
//! |--------|-----------|-----------|
//! | Text | `Life_Action_Plan.txt` | `text/plain` |
//! | Docx | `Life_Action_Plan.docx` | `application/vnd.openxmlformats-officedocument.wordprocessingml.document` |
//! | Pdf  | `Life_Action_Plan.pdf` | `application/pdf` |

use crate::config::{SynthesisConfig, PDF_FONT_SIZE_RANGE};
use crate::error::NexusPathError;
use docx_rs::{BreakType, Docx, Paragraph, Run};
use printpdf::{BuiltinFont, Mm, PdfDocument};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{BufWriter, Cursor};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Character substituted for anything the PDF base font cannot encode.
pub const PDF_PLACEHOLDER: char = '?';

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const PT_TO_MM: f32 = 0.352_778;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_EM: f32 = 0.5;
const LINE_SPACING: f32 = 1.4;

/// Supported export containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportFormat {
    Text,
    Docx,
    Pdf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Text, ExportFormat::Docx, ExportFormat::Pdf];

    pub fn file_name(self) -> &'static str {
        match self {
            ExportFormat::Text => "Life_Action_Plan.txt",
            ExportFormat::Docx => "Life_Action_Plan.docx",
            ExportFormat::Pdf => "Life_Action_Plan.pdf",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Text => "text/plain",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Text => f.write_str("TXT"),
            ExportFormat::Docx => f.write_str("DOCX"),
            ExportFormat::Pdf => f.write_str("PDF"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = NexusPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(ExportFormat::Text),
            "docx" | "word" => Ok(ExportFormat::Docx),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(NexusPathError::InvalidConfig(format!(
                "Unknown export format '{other}' (expected txt, docx or pdf)"
            ))),
        }
    }
}

/// Layout settings shared by the DOCX and PDF exports.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub title: String,
    pub font_size: f32,
}

impl From<&SynthesisConfig> for ExportOptions {
    fn from(config: &SynthesisConfig) -> Self {
        Self {
            title: config.document_title.clone(),
            font_size: config.pdf_font_size,
        }
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::from(&SynthesisConfig::default())
    }
}

/// One downloadable artefact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPayload {
    pub format: ExportFormat,
    pub file_name: &'static str,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Build the payload for `format`.
pub fn export(
    text: &str,
    format: ExportFormat,
    options: &ExportOptions,
) -> Result<ExportPayload, NexusPathError> {
    let bytes = match format {
        ExportFormat::Text => to_text(text),
        ExportFormat::Docx => to_docx(text, &options.title)?,
        ExportFormat::Pdf => to_pdf(text, options)?,
    };
    debug!("{} export: {} bytes", format, bytes.len());
    Ok(ExportPayload {
        format,
        file_name: format.file_name(),
        mime_type: format.mime_type(),
        bytes,
    })
}

/// UTF-8 bytes of `text`, unchanged.
pub fn to_text(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

/// A DOCX with a title heading and one paragraph holding the whole text.
///
/// Newlines become line breaks inside that paragraph.
pub fn to_docx(text: &str, title: &str) -> Result<Vec<u8>, NexusPathError> {
    let mut body = Run::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            body = body.add_break(BreakType::TextWrapping);
        }
        body = body.add_text(line.trim_end_matches('\r'));
    }

    let heading = Paragraph::new().add_run(Run::new().add_text(title).bold().size(32));

    let mut buf = Cursor::new(Vec::new());
    Docx::new()
        .add_paragraph(heading)
        .add_paragraph(Paragraph::new().add_run(body))
        .build()
        .pack(&mut buf)
        .map_err(|e| NexusPathError::ExportFailed {
            format: ExportFormat::Docx.to_string(),
            detail: e.to_string(),
        })?;
    Ok(buf.into_inner())
}

/// An A4 PDF in Helvetica with word wrapping and as many pages as needed.
///
/// Text is first reduced to Latin-1 (see [`latin1_sanitize`]). A font size
/// outside [`PDF_FONT_SIZE_RANGE`] is rejected before layout.
pub fn to_pdf(text: &str, options: &ExportOptions) -> Result<Vec<u8>, NexusPathError> {
    let failed = |detail: String| NexusPathError::ExportFailed {
        format: ExportFormat::Pdf.to_string(),
        detail,
    };

    let font_size = options.font_size;
    if !PDF_FONT_SIZE_RANGE.contains(&font_size) {
        return Err(failed(format!(
            "font size {font_size} pt is outside {}–{} pt",
            PDF_FONT_SIZE_RANGE.start(),
            PDF_FONT_SIZE_RANGE.end()
        )));
    }
    let line_height_mm = font_size * LINE_SPACING * PT_TO_MM;
    let usable_width_mm = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
    let max_chars = ((usable_width_mm / (font_size * AVG_GLYPH_EM * PT_TO_MM)) as usize).max(10);

    let title = latin1_sanitize(&options.title);
    let (doc, page, layer) = PdfDocument::new(
        title.as_str(),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let body_font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| failed(e.to_string()))?;
    let title_font = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| failed(e.to_string()))?;

    let mut current = doc.get_page(page).get_layer(layer);
    let top = PAGE_HEIGHT_MM - MARGIN_MM;
    current.use_text(title.as_str(), font_size * 1.6, Mm(MARGIN_MM), Mm(top), &title_font);
    let mut y = top - 2.5 * line_height_mm;
    let mut page_count = 1;

    for line in wrap_lines(&latin1_sanitize(text), max_chars) {
        if y < MARGIN_MM {
            page_count += 1;
            let (p, l) = doc.add_page(
                Mm(PAGE_WIDTH_MM),
                Mm(PAGE_HEIGHT_MM),
                format!("Layer {page_count}"),
            );
            current = doc.get_page(p).get_layer(l);
            y = top;
        }
        if !line.is_empty() {
            current.use_text(line, font_size, Mm(MARGIN_MM), Mm(y), &body_font);
        }
        y -= line_height_mm;
    }

    let mut buffer = Vec::new();
    {
        let mut writer = BufWriter::new(&mut buffer);
        doc.save(&mut writer).map_err(|e| failed(e.to_string()))?;
    }
    debug!("PDF export laid out on {} pages", page_count);
    Ok(buffer)
}

/// Replace every character outside printable Latin-1 with [`PDF_PLACEHOLDER`].
///
/// Tabs become a space; newlines are kept for the line wrapper.
pub fn latin1_sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\n' => '\n',
            '\t' => ' ',
            ' '..='~' | '\u{A0}'..='\u{FF}' => c,
            '\r' => '\r',
            _ => PDF_PLACEHOLDER,
        })
        .filter(|&c| c != '\r')
        .collect()
}

/// Greedy word wrap to at most `max_chars` characters per line.
///
/// Explicit newlines are kept (blank lines included); words longer than a
/// line are split.
pub fn wrap_lines(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut line_len = 0;
        for word in paragraph.split(' ').filter(|w| !w.is_empty()) {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if line_len > 0 {
                    lines.push(std::mem::take(&mut line));
                    line_len = 0;
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let needed = if line_len == 0 { word.len() } else { line_len + 1 + word.len() };
            if needed > max_chars {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
            }
            if line_len > 0 {
                line.push(' ');
                line_len += 1;
            }
            line_len += word.len();
            line.extend(word);
        }
        lines.push(line);
    }
    lines
}

/// Write `payload` into `dir` under its fixed file name.
///
/// The bytes go to a temporary sibling first and are renamed into place, so
/// an interrupted write never leaves a truncated file behind.
pub async fn write_to_dir(
    payload: &ExportPayload,
    dir: impl AsRef<Path>,
) -> Result<PathBuf, NexusPathError> {
    let dir = dir.as_ref();
    let path = dir.join(payload.file_name);
    let write_failed = |source| NexusPathError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    tokio::fs::create_dir_all(dir).await.map_err(write_failed)?;
    let tmp_path = path.with_extension("part");
    tokio::fs::write(&tmp_path, &payload.bytes)
        .await
        .map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, &path)
        .await
        .map_err(write_failed)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_export_is_identity() {
        let text = "Día 1: caminar 🚶\n\nDay 2";
        let bytes = to_text(text);
        assert_eq!(String::from_utf8(bytes).unwrap(), text);
    }

    #[test]
    fn format_metadata() {
        assert_eq!(ExportFormat::Text.file_name(), "Life_Action_Plan.txt");
        assert_eq!(ExportFormat::Pdf.mime_type(), "application/pdf");
        assert_eq!(
            ExportFormat::Docx.mime_type(),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!("DOCX".parse::<ExportFormat>().unwrap(), ExportFormat::Docx);
        assert!("odt".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn sanitize_replaces_non_latin1() {
        assert_eq!(latin1_sanitize("café"), "café");
        assert_eq!(latin1_sanitize("日本 ok"), "?? ok");
        assert_eq!(latin1_sanitize("a\tb\r\nc"), "a b\nc");
        assert_eq!(latin1_sanitize("“quoted” — dash"), "?quoted? ? dash");
    }

    #[test]
    fn wrap_respects_width_and_newlines() {
        let lines = wrap_lines("one two three four\n\nfive", 9);
        assert_eq!(lines, vec!["one two", "three", "four", "", "five"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 9));
    }

    #[test]
    fn wrap_splits_long_words() {
        let lines = wrap_lines("ab abcdefghij", 4);
        assert_eq!(lines, vec!["ab", "abcd", "efgh", "ij"]);
    }

    #[test]
    fn pdf_export_produces_pdf() {
        let long = "word ".repeat(5000);
        let bytes = to_pdf(&long, &ExportOptions::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn pdf_export_survives_non_latin_text() {
        let bytes = to_pdf("習慣 1: 毎朝走る", &ExportOptions::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn pdf_export_rejects_unusable_font_size() {
        for size in [0.0, f32::NAN, 500.0] {
            let options = ExportOptions {
                font_size: size,
                ..ExportOptions::default()
            };
            let err = to_pdf("text", &options).unwrap_err();
            assert!(matches!(err, NexusPathError::ExportFailed { ref format, .. } if format == "PDF"));
        }
    }

    #[test]
    fn docx_is_a_zip_container() {
        let bytes = to_docx("line one\nline two", "Life Action Plan").unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[tokio::test]
    async fn writes_payload_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let payload = export("PLAN", ExportFormat::Text, &ExportOptions::default()).unwrap();
        let path = write_to_dir(&payload, dir.path().join("out")).await.unwrap();
        assert_eq!(path.file_name().unwrap(), "Life_Action_Plan.txt");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "PLAN");
        assert!(!path.with_extension("part").exists());
    }
}
