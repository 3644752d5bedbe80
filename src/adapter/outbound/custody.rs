//! Client for the external custody service.
//!
//! Endpoints (JSON, bearer-authenticated):
//! - `POST {base}/credentials` → `{ "handle", "secret" }`
//! - `POST {base}/encrypt` `{ "secret" }` → `{ "blob" }`
//! - `POST {base}/decrypt` `{ "blob" }` → `{ "secret" }`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::port::outbound::{Credential, Custody, Secret};

/// `[custody]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CustodyConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Bearer token. Populated from `PITBOSS_CUSTODY_TOKEN`.
    #[serde(skip)]
    pub token: Option<String>,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8700".into()
}

const fn default_timeout_ms() -> u64 {
    5_000
}

impl Default for CustodyConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            token: None,
        }
    }
}

#[derive(Deserialize)]
struct CredentialResponse {
    handle: String,
    secret: String,
}

#[derive(Serialize)]
struct SecretBody<'a> {
    secret: &'a str,
}

#[derive(Serialize, Deserialize)]
struct BlobBody {
    blob: String,
}

#[derive(Deserialize)]
struct SecretResponse {
    secret: String,
}

pub struct HttpCustody {
    http: HttpClient,
    config: CustodyConfig,
}

impl HttpCustody {
    #[must_use]
    pub fn new(config: CustodyConfig) -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                HttpClient::new()
            });
        Self { http, config }
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}/{path}", self.config.base_url.trim_end_matches('/'));
        let mut request = self.http.post(&url).json(body);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| Error::Custody(format!("{path}: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Custody(format!("{path}: {e}")))?;
        debug!(path, "Custody request succeeded");
        response
            .json::<T>()
            .await
            .map_err(|e| Error::Custody(format!("{path}: malformed response: {e}")))
    }
}

#[async_trait]
impl Custody for HttpCustody {
    async fn generate_credential(&self) -> Result<Credential> {
        let response: CredentialResponse = self.post("credentials", &serde_json::json!({})).await?;
        Ok(Credential {
            handle: response.handle,
            secret: Secret::new(response.secret),
        })
    }

    async fn encrypt(&self, secret: &Secret) -> Result<String> {
        let response: BlobBody = self
            .post(
                "encrypt",
                &SecretBody {
                    secret: secret.expose(),
                },
            )
            .await?;
        Ok(response.blob)
    }

    async fn decrypt(&self, blob: &str) -> Result<Secret> {
        let response: SecretResponse = self
            .post(
                "decrypt",
                &BlobBody {
                    blob: blob.to_string(),
                },
            )
            .await?;
        Ok(Secret::new(response.secret))
    }
}
