//! Attachment text extraction
//!
//! Turns stored attachment files (`.doc`, `.pdf`, `.html`, ...) into plain text:
//!
//! - [`SolrExtractor`]: posts the file to a Solr `update/extract` handler (Apache Tika)
//!   and keeps the text of the returned XHTML `<body>`
//! - [`LocalExtractor`]: reads plain text and HTML directly, PDF with the `pdf` feature
//!
//! Extraction is synchronous and blocking; callers decide what a failure means.

pub mod local;
pub mod solr;

pub use local::LocalExtractor;
pub use solr::SolrExtractor;

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("extraction service error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid extraction service url `{url}`: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("extraction service returned status {status}")]
    Status { status: u16 },

    #[error("unexpected extraction response: {0}")]
    UnexpectedResponse(String),

    #[error("no local extractor for `{extension}` files")]
    Unsupported { extension: String },

    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

// ============================================================================
// Extractor trait + configuration
// ============================================================================

/// Something that can turn a file into plain text.
pub trait TextExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractError>;
}

/// Which extraction backend to use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum ExtractorConfig {
    /// Do not extract text
    #[default]
    None,
    /// Plain text/HTML (and PDF with the `pdf` feature) read in-process
    Local,
    /// Solr extract handler, e.g. `http://127.0.0.1:8983/solr`
    Solr { url: String },
}

impl ExtractorConfig {
    pub fn build(
        &self,
        timeout: Duration,
    ) -> Result<Option<Box<dyn TextExtractor>>, ExtractError> {
        match self {
            Self::None => Ok(None),
            Self::Local => Ok(Some(Box::new(LocalExtractor::new()))),
            Self::Solr { url } => Ok(Some(Box::new(SolrExtractor::new(url, timeout)?))),
        }
    }
}

// ============================================================================
// HTML helpers
// ============================================================================

/// Text content of the `<body>` of an HTML/XHTML document.
///
/// Text nodes are trimmed and joined with newlines; empty nodes are dropped.
pub fn html_body_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let Ok(selector) = Selector::parse("body") else {
        return String::new();
    };
    let Some(body) = doc.select(&selector).next() else {
        return String::new();
    };

    let mut out = String::new();
    for t in body.text() {
        let s = t.trim();
        if s.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(s);
    }
    out
}
