//! Plain text extraction from statement PDFs.

use std::path::Path;

use crate::statement::ExtractError;

/// Read the PDF at `path` and return the text of its non-empty pages joined by newlines.
///
/// The file is read into memory up front so that the handle is closed before any parsing
/// happens.
///
/// # Errors
/// Returns [ExtractError::Io] if the file cannot be read or [ExtractError::Pdf] if any page
/// fails to extract.
pub fn extract_text(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path)
        .map_err(|error| ExtractError::Io(format!("could not read {}: {error}", path.display())))?;

    extract_text_from_bytes(&bytes)
}

/// Return the text of the non-empty pages of the PDF in `bytes` joined by newlines.
///
/// # Errors
/// Returns [ExtractError::Pdf] if any page fails to extract.
pub fn extract_text_from_bytes(bytes: &[u8]) -> Result<String, ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|error| ExtractError::Pdf(error.to_string()))?;

    tracing::debug!("extracted {} pages from a {} byte PDF", pages.len(), bytes.len());

    Ok(join_pages(pages))
}

fn join_pages(pages: Vec<String>) -> String {
    pages
        .into_iter()
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
