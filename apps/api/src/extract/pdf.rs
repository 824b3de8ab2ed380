use std::panic;

use tracing::debug;

use super::{join_blocks, ExtractError};

/// Extracts the text of every page in document order, dropping pages with no text.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    // pdf-extract panics on some malformed font tables instead of returning an error.
    let pages = panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| ExtractError::Pdf("parser aborted on malformed content".to_string()))?
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;

    debug!(pages = pages.len(), "PDF parsed");
    Ok(join_blocks(pages))
}
