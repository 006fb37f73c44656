//! Solr `update/extract` (Solr Cell / Tika) backend.
//!
//! The file is posted as multipart with `extractOnly=true&wt=json`. Solr answers
//! with a JSON object holding the XHTML rendering under the uploaded file name
//! and the Tika metadata under `<file name>_metadata`.

use crate::{html_body_text, ExtractError, TextExtractor};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub struct SolrExtractor {
    client: Client,
    endpoint: Url,
}

impl SolrExtractor {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ExtractError> {
        let endpoint = extract_endpoint(base_url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

impl TextExtractor for SolrExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let bytes = fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());

        tracing::debug!(file = %path.display(), endpoint = %self.endpoint, "posting file to extract handler");
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name.clone()));
        let resp = self
            .client
            .post(self.endpoint.clone())
            .query(&[("extractOnly", "true"), ("wt", "json")])
            .multipart(form)
            .send()?;

        if !resp.status().is_success() {
            return Err(ExtractError::Status {
                status: resp.status().as_u16(),
            });
        }
        let body: Value = resp.json()?;
        let contents = contents_from_response(&body, &file_name)?;
        Ok(html_body_text(contents))
    }
}

/// `<base>/update/extract`, tolerating a base with or without trailing slash.
fn extract_endpoint(base_url: &str) -> Result<Url, ExtractError> {
    let invalid = |message: String| ExtractError::InvalidUrl {
        url: base_url.to_string(),
        message,
    };
    let mut base = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("update/extract").map_err(|e| invalid(e.to_string()))
}

/// Pick the extracted XHTML out of an extract-handler response.
///
/// The content sits under the uploaded file name; older Solr versions key it
/// by the stream name instead, so any non-metadata string field is accepted.
pub(crate) fn contents_from_response<'a>(
    body: &'a Value,
    file_name: &str,
) -> Result<&'a str, ExtractError> {
    let obj = body
        .as_object()
        .ok_or_else(|| ExtractError::UnexpectedResponse("response is not an object".into()))?;

    if let Some(contents) = obj.get(file_name).and_then(Value::as_str) {
        return Ok(contents);
    }
    obj.iter()
        .filter(|(key, _)| !key.ends_with("_metadata") && key.as_str() != "responseHeader")
        .find_map(|(_, value)| value.as_str())
        .ok_or_else(|| {
            ExtractError::UnexpectedResponse(format!("no extracted content for `{file_name}`"))
        })
}
