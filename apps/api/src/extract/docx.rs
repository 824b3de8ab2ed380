use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use super::{join_blocks, ExtractError};

/// Main body part of a WordprocessingML package.
const DOCUMENT_PART: &str = "word/document.xml";

/// Largest inflated `document.xml` accepted. The upload limit only bounds the
/// compressed package.
pub const MAX_DOCUMENT_XML_BYTES: u64 = 32 * 1024 * 1024;

/// Extracts paragraph text in document order, dropping empty paragraphs.
///
/// Paragraphs inside table cells are included. Headers, footers and footnotes live in
/// other parts of the package and are not read.
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, ExtractError> {
    extract_docx_text_with_limit(bytes, MAX_DOCUMENT_XML_BYTES)
}

fn extract_docx_text_with_limit(bytes: &[u8], limit: u64) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(format!("not a DOCX package: {e}")))?;

    let file = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ExtractError::Docx(format!("{DOCUMENT_PART}: {e}")))?;
    if file.size() > limit {
        return Err(over_limit(limit));
    }

    // The declared size comes from the archive and may be wrong.
    let mut raw = Vec::new();
    file.take(limit + 1)
        .read_to_end(&mut raw)
        .map_err(|e| ExtractError::Docx(format!("{DOCUMENT_PART}: {e}")))?;
    if raw.len() as u64 > limit {
        return Err(over_limit(limit));
    }
    let xml = String::from_utf8(raw)
        .map_err(|e| ExtractError::Docx(format!("{DOCUMENT_PART}: {e}")))?;

    let paragraphs = read_paragraphs(&xml)?;
    debug!(paragraphs = paragraphs.len(), "DOCX parsed");
    Ok(join_blocks(paragraphs))
}

fn over_limit(limit: u64) -> ExtractError {
    ExtractError::Docx(format!("{DOCUMENT_PART} expands past the {limit}-byte limit"))
}

/// Walks `document.xml` and returns the text of every `w:p`, in order of completion.
///
/// Run text comes from `w:t`; `w:tab` becomes a tab and `w:br`/`w:cr` a newline.
/// Deleted (`w:delText`) and field-instruction text is skipped, and so is
/// `mc:Fallback`, which repeats the content of its sibling `mc:Choice`.
fn read_paragraphs(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    // Text boxes can nest paragraphs inside a paragraph.
    let mut open: Vec<String> = Vec::new();
    let mut in_text = false;
    // Element depth inside an `mc:Fallback`; zero when not skipping.
    let mut skip_depth = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| {
            ExtractError::Docx(format!(
                "malformed {DOCUMENT_PART} at byte {}: {e}",
                reader.buffer_position()
            ))
        })?;

        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"mc:Fallback" => skip_depth = 1,
                b"w:p" => open.push(String::new()),
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(String::new()),
                b"w:tab" => push_to_open(&mut open, "\t"),
                b"w:br" | b"w:cr" => push_to_open(&mut open, "\n"),
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractError::Docx(format!("bad text run: {e}")))?;
                push_to_open(&mut open, &text);
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    if let Some(paragraph) = open.pop() {
                        paragraphs.push(paragraph);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn push_to_open(open: &mut [String], text: &str) {
    if let Some(current) = open.last_mut() {
        current.push_str(text);
    }
}
