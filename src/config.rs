use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::PathBuf;

pub const REGION: &str = "us-central1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_API_BASE: &str = "https://us-central1-aiplatform.googleapis.com";
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub project_id: String,
    pub endpoint_id: String,
    pub api_base: String,
    pub credentials_base64: Option<String>,
    pub credentials_path: Option<PathBuf>,
    pub metadata_host: String,
    pub adc_well_known: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("PORT must be a valid port number, got {raw:?}"))?,
            None => DEFAULT_PORT,
        };

        let project_id = get("GCP_PROJECT_ID").ok_or_else(|| anyhow!("GCP_PROJECT_ID is not set"))?;
        let endpoint_id =
            get("GCP_ENDPOINT_ID").ok_or_else(|| anyhow!("GCP_ENDPOINT_ID is not set"))?;

        // GOOGLE_APPLICATION_CREDENTIALS is a path unless it names no file,
        // in which case it is treated as inline base64 material.
        let mut credentials_base64 = get("GOOGLE_APPLICATION_CREDENTIALS_BASE64");
        let mut credentials_path = None;
        if let Some(raw) = get("GOOGLE_APPLICATION_CREDENTIALS") {
            let path = PathBuf::from(raw.trim());
            // '/' is also a base64 character, so only undecodable values count.
            let looks_like_path = STANDARD.decode(raw.trim()).is_err()
                && (raw.contains('/')
                    || raw.contains('\\')
                    || raw.trim().to_ascii_lowercase().ends_with(".json"));
            if path.is_file() {
                credentials_path = Some(path);
            } else if looks_like_path {
                bail!(
                    "GOOGLE_APPLICATION_CREDENTIALS points to {}, which is not a readable file",
                    path.display()
                );
            } else if credentials_base64.is_none() {
                credentials_base64 = Some(raw);
            }
        }

        let adc_well_known = match get("APPDATA") {
            Some(appdata) if cfg!(windows) => Some(
                PathBuf::from(appdata)
                    .join("gcloud")
                    .join("application_default_credentials.json"),
            ),
            _ => get("HOME").map(|home| {
                PathBuf::from(home)
                    .join(".config")
                    .join("gcloud")
                    .join("application_default_credentials.json")
            }),
        };

        Ok(Config {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            project_id,
            endpoint_id,
            api_base: get("PREDICTION_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            credentials_base64,
            credentials_path,
            metadata_host: get("GCE_METADATA_HOST")
                .unwrap_or_else(|| DEFAULT_METADATA_HOST.to_string()),
            adc_well_known,
        })
    }

    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/endpoints/{}:predict",
            self.api_base, self.project_id, REGION, self.endpoint_id
        )
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}
