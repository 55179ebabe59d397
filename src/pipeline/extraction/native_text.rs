use super::types::TextLayerReader;
use super::ExtractionError;

/// Text layer reader backed by the pdf-extract crate.
/// Scanned PDFs come back empty or near-empty; the caller decides what is usable.
pub struct PdfTextLayer;

impl TextLayerReader for PdfTextLayer {
    fn read_text(&self, pdf_bytes: &[u8]) -> Result<String, ExtractionError> {
        // pdf-extract panics on some malformed inputs instead of returning an error.
        let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(pdf_bytes));
        match result {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(ExtractionError::PdfParsing(e.to_string())),
            Err(_) => Err(ExtractionError::PdfParsing("text layer parser panicked".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_parse_errors() {
        let result = PdfTextLayer.read_text(b"definitely not a pdf");
        assert!(matches!(result, Err(ExtractionError::PdfParsing(_))));
    }

    #[test]
    fn empty_input_is_parse_error() {
        assert!(PdfTextLayer.read_text(&[]).is_err());
    }
}
