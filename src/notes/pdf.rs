//! PDF text extraction

use std::panic;

use crate::error::NoteError;

/// Extract the text of a PDF, one `--- Page N ---` section per non-blank page
pub fn extract_text(name: &str, bytes: &[u8]) -> Result<String, NoteError> {
    // pdf-extract panics on some malformed inputs instead of returning an error.
    let pages = panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| NoteError::Pdf {
            name: name.to_string(),
            message: "malformed PDF".to_string(),
        })?
        .map_err(|e| NoteError::Pdf {
            name: name.to_string(),
            message: e.to_string(),
        })?;

    Ok(format_pages(&pages))
}

/// Join page texts, numbering pages from 1 and skipping blank ones
pub fn format_pages(pages: &[String]) -> String {
    pages
        .iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(index, text)| format!("--- Page {} ---\n{}", index + 1, text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_pages_skipped_but_numbering_kept() {
        let pages = vec![
            "first".to_string(),
            "  \n".to_string(),
            "third".to_string(),
        ];
        assert_eq!(
            format_pages(&pages),
            "--- Page 1 ---\nfirst\n\n--- Page 3 ---\nthird"
        );
    }

    #[test]
    fn test_garbage_is_an_error() {
        let err = extract_text("broken.pdf", b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, NoteError::Pdf { .. }));
        assert!(err.to_string().contains("broken.pdf"));
    }
}
