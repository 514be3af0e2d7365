use actix_web::web;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::NamedTempFile;

use crate::config::Config;

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// Hands out bearer tokens for the prediction call.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum CredentialStrategy {
    /// gcloud's well-known file when present, otherwise the metadata server.
    Ambient {
        well_known: Option<PathBuf>,
        metadata_host: String,
    },
    KeyFile(PathBuf),
}

/// Credential handle built once at startup. Owns the temporary key file when
/// the key material came in base64, so the file lives as long as the handle.
#[derive(Debug)]
pub struct CredentialSource {
    strategy: CredentialStrategy,
    _materialized: Option<NamedTempFile>,
}

impl CredentialSource {
    pub fn from_config(config: &Config) -> Result<Self> {
        if let Some(material) = &config.credentials_base64 {
            let source = Self::from_base64(material)?;
            info!("using key material decoded from the environment");
            return Ok(source);
        }
        if let Some(path) = &config.credentials_path {
            info!("using key file {}", path.display());
            return Ok(Self::key_file(path.clone()));
        }
        info!("using ambient default credentials");
        Ok(Self::ambient(
            config.adc_well_known.clone(),
            config.metadata_host.clone(),
        ))
    }

    pub fn from_base64(material: &str) -> Result<Self> {
        let decoded = STANDARD
            .decode(material.trim())
            .context("credential material is not valid base64")?;

        let mut file = tempfile::Builder::new()
            .prefix("gcp-credentials-")
            .suffix(".json")
            .tempfile()
            .context("could not create temporary credentials file")?;
        file.write_all(&decoded)
            .and_then(|_| file.flush())
            .context("could not write temporary credentials file")?;

        debug!("credential material written to {}", file.path().display());
        Ok(CredentialSource {
            strategy: CredentialStrategy::KeyFile(file.path().to_path_buf()),
            _materialized: Some(file),
        })
    }

    pub fn key_file(path: PathBuf) -> Self {
        CredentialSource {
            strategy: CredentialStrategy::KeyFile(path),
            _materialized: None,
        }
    }

    pub fn ambient(well_known: Option<PathBuf>, metadata_host: String) -> Self {
        CredentialSource {
            strategy: CredentialStrategy::Ambient {
                well_known,
                metadata_host,
            },
            _materialized: None,
        }
    }

    pub fn strategy(&self) -> &CredentialStrategy {
        &self.strategy
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum KeyFile {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUserKey),
}

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorizedUserKey {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Token provider backed by Google's OAuth endpoints. Every call fetches a
/// fresh token.
pub struct GoogleTokenProvider {
    source: CredentialSource,
    http: reqwest::Client,
}

impl GoogleTokenProvider {
    pub fn new(source: CredentialSource, http: reqwest::Client) -> Self {
        GoogleTokenProvider { source, http }
    }

    async fn token_from_key_file(&self, path: &Path) -> Result<String> {
        let owned = path.to_path_buf();
        let raw = web::block(move || std::fs::read_to_string(owned))
            .await?
            .with_context(|| format!("could not read credentials file {}", path.display()))?;
        let key: KeyFile = serde_json::from_str(&raw)
            .with_context(|| format!("invalid credentials file {}", path.display()))?;

        match key {
            KeyFile::ServiceAccount(key) => self.exchange_assertion(&key).await,
            KeyFile::AuthorizedUser(key) => self.exchange_refresh_token(&key).await,
        }
    }

    async fn exchange_assertion(&self, key: &ServiceAccountKey) -> Result<String> {
        let token_uri = key.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
        let assertion = sign_assertion(key, token_uri)?;
        let form = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];
        self.request_token(self.http.post(token_uri).form(&form))
            .await
    }

    async fn exchange_refresh_token(&self, key: &AuthorizedUserKey) -> Result<String> {
        let token_uri = key.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", key.client_id.as_str()),
            ("client_secret", key.client_secret.as_str()),
            ("refresh_token", key.refresh_token.as_str()),
        ];
        self.request_token(self.http.post(token_uri).form(&form))
            .await
    }

    async fn token_from_metadata_server(&self, host: &str) -> Result<String> {
        let url =
            format!("http://{host}/computeMetadata/v1/instance/service-accounts/default/token");
        let request = self
            .http
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .query(&[("scopes", CLOUD_PLATFORM_SCOPE)]);
        self.request_token(request)
            .await
            .context("could not load the default credentials")
    }

    async fn request_token(&self, request: reqwest::RequestBuilder) -> Result<String> {
        let response = request.send().await.context("token request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("token endpoint returned {status}: {body}");
        }
        let token: TokenResponse = response
            .json()
            .await
            .context("token endpoint returned an unreadable body")?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl TokenProvider for GoogleTokenProvider {
    async fn access_token(&self) -> Result<String> {
        match self.source.strategy() {
            CredentialStrategy::KeyFile(path) => self.token_from_key_file(path).await,
            CredentialStrategy::Ambient {
                well_known,
                metadata_host,
            } => match well_known {
                Some(path) if path.is_file() => self.token_from_key_file(path).await,
                _ => self.token_from_metadata_server(metadata_host).await,
            },
        }
    }
}

fn sign_assertion(key: &ServiceAccountKey, audience: &str) -> Result<String> {
    let iat = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| anyhow!("system clock is before the unix epoch"))?
        .as_secs();
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: CLOUD_PLATFORM_SCOPE,
        aud: audience,
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();
    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .context("service account private key is not a valid RSA PEM key")?;

    jsonwebtoken::encode(&header, &claims, &signing_key).context("could not sign token assertion")
}
