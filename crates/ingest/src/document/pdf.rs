use super::ExtractionError;

/// Extract the full text of a PDF as one string.
///
/// pdf-extract returns all pages concatenated; page breaks arrive as form
/// feeds, which we keep — the chunker works on flat text anyway.
pub fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ExtractionError::PdfError(e.to_string()))?;
    Ok(text.trim().to_string())
}
