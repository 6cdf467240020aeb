//! Instance metadata service client
//!
//! Prefers the session-token flow (IMDSv2). When the token endpoint is
//! unavailable the client falls back to plain GETs (IMDSv1).

use bootdns_core::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::user_data::UserData;

/// Default link-local metadata endpoint
pub const DEFAULT_IMDS_ENDPOINT: &str = "http://169.254.169.254";

/// Lifetime requested for session tokens
const TOKEN_TTL_SECS: u32 = 21600;

/// Metadata requests are local; anything slower means the service is absent
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";

/// Client for the instance metadata service
pub struct ImdsClient {
    endpoint: String,
    client: reqwest::Client,
    /// Session token, `None` once IMDSv1 fallback is chosen
    token: OnceCell<Option<String>>,
}

impl ImdsClient {
    /// Create a client for the given endpoint (defaults to the link-local address)
    pub fn new(endpoint: Option<String>) -> Result<Self> {
        let endpoint = endpoint
            .unwrap_or_else(|| DEFAULT_IMDS_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint,
            client,
            token: OnceCell::new(),
        })
    }

    async fn session_token(&self) -> Option<&str> {
        self.token
            .get_or_init(|| async {
                let url = format!("{}/latest/api/token", self.endpoint);
                let response = self
                    .client
                    .put(&url)
                    .header(TOKEN_TTL_HEADER, TOKEN_TTL_SECS.to_string())
                    .send()
                    .await;

                match response {
                    Ok(resp) if resp.status().is_success() => match resp.text().await {
                        Ok(token) => Some(token.trim().to_string()),
                        Err(e) => {
                            tracing::debug!("Failed to read metadata token: {}", e);
                            None
                        }
                    },
                    Ok(resp) => {
                        tracing::debug!(
                            "Metadata token request returned {}, falling back to IMDSv1",
                            resp.status()
                        );
                        None
                    }
                    Err(e) => {
                        tracing::debug!("Metadata token request failed: {}, falling back to IMDSv1", e);
                        None
                    }
                }
            })
            .await
            .as_deref()
    }

    /// GET a path under `/latest/`
    ///
    /// Returns `Ok(None)` when the service answers 404 (the item does not
    /// exist for this instance).
    pub async fn get(&self, path: &str) -> Result<Option<String>> {
        let url = format!("{}/latest/{}", self.endpoint, path.trim_start_matches('/'));

        let mut request = self.client.get(&url);
        if let Some(token) = self.session_token().await {
            request = request.header(TOKEN_HEADER, token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(DEFAULT_HTTP_TIMEOUT)
            } else {
                Error::metadata(format!("Metadata request for {} failed: {}", path, e))
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::metadata(format!(
                "Metadata request for {} returned {}",
                path, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::metadata(format!("Failed to read metadata {}: {}", path, e)))?;
        Ok(Some(body))
    }

    /// The instance's public IPv4 address
    pub async fn public_ipv4(&self) -> Result<String> {
        let address = self
            .get("meta-data/public-ipv4")
            .await?
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        address.ok_or_else(|| Error::not_found("Instance has no public IPv4 address"))
    }

    /// The instance's user-data, parsed as `key=value` pairs
    ///
    /// An instance launched without user-data yields an empty set.
    pub async fn user_data(&self) -> Result<UserData> {
        Ok(self
            .get("user-data")
            .await?
            .map(|text| UserData::parse(&text))
            .unwrap_or_default())
    }

    /// Temporary credentials of the instance profile role
    pub async fn instance_credentials(&self) -> Result<InstanceCredentials> {
        let roles = self
            .get("meta-data/iam/security-credentials/")
            .await?
            .ok_or_else(|| Error::auth("Instance has no IAM instance profile"))?;

        let role = roles
            .lines()
            .map(str::trim)
            .find(|r| !r.is_empty())
            .ok_or_else(|| Error::auth("Instance profile lists no role"))?;

        let body = self
            .get(&format!("meta-data/iam/security-credentials/{}", role))
            .await?
            .ok_or_else(|| Error::auth(format!("No credentials for instance role {}", role)))?;

        let credentials: InstanceCredentials = serde_json::from_str(&body)?;
        if credentials.code != "Success" {
            return Err(Error::auth(format!(
                "Instance role {} credentials unavailable: {}",
                role, credentials.code
            )));
        }

        tracing::debug!("Loaded credentials for instance role {}", role);
        Ok(credentials)
    }
}

impl fmt::Debug for ImdsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImdsClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// Instance profile credentials document
#[derive(Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceCredentials {
    pub code: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub token: String,
    #[serde(default)]
    pub expiration: Option<String>,
}

impl fmt::Debug for InstanceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceCredentials")
            .field("code", &self.code)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("token", &"<redacted>")
            .field("expiration", &self.expiration)
            .finish()
    }
}
