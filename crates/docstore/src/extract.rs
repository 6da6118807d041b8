//! Text extraction from cached files.
//!
//! PDFs go through `pdf-extract`, which separates pages with form feeds.
//! Everything else (`.md`, `.ttl`, `.txt`, ...) is read as UTF-8.

use parley_core::error::DocumentError;
use std::path::Path;

/// Extract text from a cached file. Page numbers are zero-based and only apply to PDFs.
pub fn extract_text(path: &Path, is_pdf: bool, pages: Option<&[usize]>) -> Result<String, DocumentError> {
    if is_pdf {
        let text = pdf_extract::extract_text(path).map_err(|e| DocumentError::Extraction {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        select_pages(&text, pages, path)
    } else {
        std::fs::read_to_string(path).map_err(|e| DocumentError::Extraction {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Pick pages out of form-feed separated text, each followed by a newline.
pub fn select_pages(text: &str, pages: Option<&[usize]>, path: &Path) -> Result<String, DocumentError> {
    let all_pages: Vec<&str> = text.split('\x0c').collect();

    let Some(pages) = pages else {
        return Ok(all_pages.iter().map(|p| format!("{p}\n")).collect());
    };

    let mut out = String::new();
    for &page in pages {
        let content = all_pages.get(page).ok_or_else(|| DocumentError::PageOutOfRange {
            path: path.display().to_string(),
            page,
            total: all_pages.len(),
        })?;
        out.push_str(content);
        out.push('\n');
    }
    Ok(out)
}
