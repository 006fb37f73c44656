//! Where location documents come from: a local file or the openpolis API.

use crate::openpolis::{parse_location, LocationData};
use crate::PeopleImportError;
use reqwest::blocking::Client;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Openpolis API access.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Location endpoint base, e.g. `http://api.openpolis.it/op/1.0/location`
    pub base_url: String,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub enum LocationSource {
    File(PathBuf),
    Api {
        config: ApiConfig,
        location_id: String,
    },
}

impl LocationSource {
    pub fn load(&self) -> Result<LocationData, PeopleImportError> {
        let value = match self {
            Self::File(path) => {
                let bytes = fs::read(path).map_err(|source| PeopleImportError::Io {
                    path: path.clone(),
                    source,
                })?;
                serde_json::from_slice::<Value>(&bytes)?
            }
            Self::Api {
                config,
                location_id,
            } => fetch(config, location_id)?,
        };
        parse_location(value)
    }
}

/// `{base_url}/{location_id}/`
pub fn location_url(base_url: &str, location_id: &str) -> Result<Url, PeopleImportError> {
    let raw = format!("{}/{}/", base_url.trim_end_matches('/'), location_id.trim());
    Url::parse(&raw).map_err(|e| PeopleImportError::InvalidUrl {
        url: raw,
        message: e.to_string(),
    })
}

fn fetch(config: &ApiConfig, location_id: &str) -> Result<Value, PeopleImportError> {
    let url = location_url(&config.base_url, location_id)?;
    let client = Client::builder().timeout(config.timeout).build()?;

    let mut request = client.get(url.clone());
    if let Some(user) = &config.user {
        request = request.basic_auth(user, config.pass.as_ref());
    }
    tracing::info!(url = %url, "fetching openpolis location");
    let response = request.send()?;
    if !response.status().is_success() {
        return Err(PeopleImportError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }
    Ok(response.json()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_url_has_trailing_slash() {
        assert_eq!(
            location_url("http://api.openpolis.it/op/1.0/location/", "5132")
                .unwrap()
                .as_str(),
            "http://api.openpolis.it/op/1.0/location/5132/"
        );
        assert!(location_url("api.openpolis.it", "1").is_err());
    }
}
