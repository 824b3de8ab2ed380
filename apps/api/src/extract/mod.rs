//! Document text extraction: turns uploaded resume bytes into normalized plain text.
//!
//! Dispatch is by filename extension only (case-insensitive), never by content sniffing.
//! Pages (PDF) or paragraphs (DOCX) are trimmed, blank ones dropped, and the survivors
//! joined with a blank line. An empty string is a valid result; callers decide what to
//! do with a resume that yields no text.
//!
//! Known limitation: `.doc` is accepted but routed through the DOCX parser, so genuine
//! legacy binary Word files fail with `ExtractError::Docx`.

use thiserror::Error;

pub mod docx;
pub mod pdf;

/// Separator placed between pages or paragraphs.
pub const BLOCK_SEPARATOR: &str = "\n\n";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type '{0}'. Use PDF or DOCX.")]
    UnsupportedFormat(String),

    #[error("Could not read PDF: {0}")]
    Pdf(String),

    #[error("Could not read DOCX: {0}")]
    Docx(String),
}

/// The parser a file is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    /// Covers both `.docx` and `.doc`.
    Docx,
}

impl DocumentKind {
    /// Resolves the parser from the filename's last extension.
    pub fn from_filename(filename: &str) -> Result<Self, ExtractError> {
        let extension = filename
            .trim()
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(DocumentKind::Pdf),
            "docx" | "doc" => Ok(DocumentKind::Docx),
            _ => Err(ExtractError::UnsupportedFormat(filename.to_string())),
        }
    }
}

/// Extracts normalized plain text from `bytes`, choosing the parser from `filename`.
pub fn extract_text(bytes: &[u8], filename: &str) -> Result<String, ExtractError> {
    match DocumentKind::from_filename(filename)? {
        DocumentKind::Pdf => pdf::extract_pdf_text(bytes),
        DocumentKind::Docx => docx::extract_docx_text(bytes),
    }
}

/// Trims every block, drops the empty ones, joins the rest with a blank line.
pub(crate) fn join_blocks<I, S>(blocks: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let kept: Vec<String> = blocks
        .into_iter()
        .map(|b| b.as_ref().trim().to_string())
        .filter(|b| !b.is_empty())
        .collect();
    kept.join(BLOCK_SEPARATOR).trim().to_string()
}
