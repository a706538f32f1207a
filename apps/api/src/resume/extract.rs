//! Text extraction from uploaded resume documents.
//!
//! PDFs go through the PDF text extractor; everything else is treated as a
//! text file and decoded lossily. A document that yields no usable text at
//! all is an extraction error.

use crate::errors::AppError;

/// Extracts plain text from an uploaded document.
///
/// `media_type` decides the path: `application/pdf` (or a `.pdf`-looking
/// octet stream) is parsed as PDF, anything else as UTF-8 text with invalid
/// bytes replaced. Output containing no alphanumeric characters is rejected.
pub fn extract_text(bytes: &[u8], media_type: &str) -> Result<String, AppError> {
    let text = if is_pdf(bytes, media_type) {
        pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| AppError::Extraction(format!("Could not read PDF: {e}")))?
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    };

    let text = text.trim().to_string();
    if !text.chars().any(|c| c.is_alphanumeric()) {
        return Err(AppError::Extraction(
            "The uploaded file contains no readable text".to_string(),
        ));
    }
    Ok(text)
}

/// PDF if the declared media type says so, or the payload carries the magic.
fn is_pdf(bytes: &[u8], media_type: &str) -> bool {
    media_type.eq_ignore_ascii_case("application/pdf") || bytes.starts_with(b"%PDF-")
}
