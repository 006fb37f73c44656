//! `om` configuration: JSON file, then `OM_*` environment overrides.

use anyhow::{anyhow, Context, Result};
use openmunicipio_extract::ExtractorConfig;
use openmunicipio_ingest_people::ApiConfig;
use openmunicipio_storage::StorageConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OmConfig {
    pub data_dir: PathBuf,
    pub media_root: PathBuf,
    /// Default people file for `import-acts`
    pub people_file: Option<PathBuf>,
    pub extractor: ExtractorConfig,
    pub op_api_base_url: String,
    pub op_api_user: Option<String>,
    pub op_api_pass: Option<String>,
    pub http_timeout_secs: u64,
}

impl Default for OmConfig {
    fn default() -> Self {
        let storage = StorageConfig::default();
        Self {
            data_dir: storage.data_dir,
            media_root: storage.media_root,
            people_file: None,
            extractor: ExtractorConfig::None,
            op_api_base_url: "http://api.openpolis.it/op/1.0/location".to_string(),
            op_api_user: None,
            op_api_pass: None,
            http_timeout_secs: 30,
        }
    }
}

impl OmConfig {
    /// Read `path` (or start from defaults) and apply the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env(std::env::vars())?;
        Ok(config)
    }

    /// `OM_SOLR_URL` takes precedence over `OM_EXTRACTOR`.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut solr_url = None;
        for (key, value) in vars {
            match key.as_str() {
                "OM_DATA_DIR" => self.data_dir = PathBuf::from(value),
                "OM_MEDIA_ROOT" => self.media_root = PathBuf::from(value),
                "OM_PEOPLE_FILE" => self.people_file = Some(PathBuf::from(value)),
                "OM_EXTRACTOR" => {
                    self.extractor = match value.as_str() {
                        "none" => ExtractorConfig::None,
                        "local" => ExtractorConfig::Local,
                        other => return Err(anyhow!("OM_EXTRACTOR: unknown backend `{other}`")),
                    }
                }
                "OM_SOLR_URL" => solr_url = Some(value),
                "OM_OP_API_BASE_URL" => self.op_api_base_url = value,
                "OM_OP_API_USER" => self.op_api_user = Some(value),
                "OM_OP_API_PASS" => self.op_api_pass = Some(value),
                "OM_HTTP_TIMEOUT_SECS" => {
                    self.http_timeout_secs = value
                        .parse()
                        .with_context(|| format!("OM_HTTP_TIMEOUT_SECS: `{value}`"))?
                }
                _ => {}
            }
        }
        if let Some(url) = solr_url {
            self.extractor = ExtractorConfig::Solr { url };
        }
        Ok(())
    }

    pub fn storage(&self) -> StorageConfig {
        StorageConfig {
            data_dir: self.data_dir.clone(),
            media_root: self.media_root.clone(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn api(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.op_api_base_url.clone(),
            user: self.op_api_user.clone(),
            pass: self.op_api_pass.clone(),
            timeout: self.timeout(),
        }
    }
}
