//! In-process extraction for files that need no external service.

use crate::{html_body_text, ExtractError, TextExtractor};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct LocalExtractor;

impl LocalExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for LocalExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "txt" => {
                let bytes = fs::read(path)?;
                Ok(String::from_utf8_lossy(&bytes).trim().to_string())
            }
            "html" | "htm" | "xhtml" => {
                let bytes = fs::read(path)?;
                Ok(html_body_text(&String::from_utf8_lossy(&bytes)))
            }
            "pdf" => extract_pdf(path),
            _ => Err(ExtractError::Unsupported { extension }),
        }
    }
}

#[cfg(feature = "pdf")]
fn extract_pdf(path: &Path) -> Result<String, ExtractError> {
    let bytes = fs::read(path)?;
    let text = pdf_extract::extract_text_from_mem(&bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(text.trim().to_string())
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf(_path: &Path) -> Result<String, ExtractError> {
    Err(ExtractError::Unsupported {
        extension: "pdf".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reads_text_and_html() {
        let dir = tempdir().unwrap();
        let txt = dir.path().join("TestoProposta.txt");
        fs::write(&txt, "  proposta di delibera\n").unwrap();
        let html = dir.path().join("TestoDiscussione.HTML");
        fs::write(&html, "<html><body><p>discussione</p></body></html>").unwrap();

        let extractor = LocalExtractor::new();
        assert_eq!(extractor.extract(&txt).unwrap(), "proposta di delibera");
        assert_eq!(extractor.extract(&html).unwrap(), "discussione");
    }

    #[test]
    fn rejects_unknown_formats() {
        let dir = tempdir().unwrap();
        let doc = dir.path().join("TestoProposta.doc");
        fs::write(&doc, b"\xd0\xcf\x11\xe0").unwrap();
        assert!(matches!(
            LocalExtractor::new().extract(&doc),
            Err(ExtractError::Unsupported { extension }) if extension == "doc"
        ));
    }
}
