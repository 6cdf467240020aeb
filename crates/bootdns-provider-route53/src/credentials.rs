//! AWS credential resolution
//!
//! Resolution order:
//! 1. Keys given explicitly in the provider configuration
//! 2. `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN`
//! 3. The instance profile, via the instance metadata service

use bootdns_core::{Error, Result};
use bootdns_imds::{ImdsClient, InstanceCredentials};
use std::fmt;

pub const ACCESS_KEY_ENV: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN_ENV: &str = "AWS_SESSION_TOKEN";

/// A signing key pair, optionally with a session token
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    /// ⚠️ NEVER log this value
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Read credentials through an environment-style lookup
    ///
    /// Returns `None` unless both keys are present and non-empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let access_key_id = non_empty(ACCESS_KEY_ENV)?;
        let secret_access_key = non_empty(SECRET_KEY_ENV)?;
        Some(Self {
            access_key_id,
            secret_access_key,
            session_token: non_empty(SESSION_TOKEN_ENV),
        })
    }
}

impl From<InstanceCredentials> for Credentials {
    fn from(creds: InstanceCredentials) -> Self {
        Self {
            access_key_id: creds.access_key_id,
            secret_access_key: creds.secret_access_key,
            session_token: Some(creds.token),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<REDACTED>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Where the provider gets its credentials
#[derive(Debug)]
pub enum CredentialSource {
    /// Keys from configuration
    Static(Credentials),
    /// Environment first, then the instance profile
    Chain(ImdsClient),
}

impl CredentialSource {
    /// Resolve credentials from this source
    pub async fn resolve(&self) -> Result<Credentials> {
        self.resolve_with_env(|name| std::env::var(name).ok()).await
    }

    pub(crate) async fn resolve_with_env(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Credentials> {
        match self {
            CredentialSource::Static(credentials) => Ok(credentials.clone()),
            CredentialSource::Chain(imds) => {
                if let Some(credentials) = Credentials::from_lookup(lookup) {
                    tracing::debug!("Using AWS credentials from the environment");
                    return Ok(credentials);
                }

                let credentials = imds.instance_credentials().await.map_err(|e| {
                    Error::auth(format!(
                        "No AWS credentials in configuration or environment, and the instance profile is unavailable: {}",
                        e
                    ))
                })?;
                tracing::debug!("Using AWS credentials from the instance profile");
                Ok(credentials.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_from_lookup() {
        let creds = Credentials::from_lookup(env(&[
            (ACCESS_KEY_ENV, "AKIDEXAMPLE"),
            (SECRET_KEY_ENV, "secret"),
        ]))
        .unwrap();
        assert_eq!(creds.access_key_id, "AKIDEXAMPLE");
        assert_eq!(creds.session_token, None);

        let creds = Credentials::from_lookup(env(&[
            (ACCESS_KEY_ENV, "AKIDEXAMPLE"),
            (SECRET_KEY_ENV, "secret"),
            (SESSION_TOKEN_ENV, "token"),
        ]))
        .unwrap();
        assert_eq!(creds.session_token.as_deref(), Some("token"));
    }

    #[test]
    fn test_from_lookup_requires_both_keys() {
        assert!(Credentials::from_lookup(env(&[(ACCESS_KEY_ENV, "AKIDEXAMPLE")])).is_none());
        assert!(
            Credentials::from_lookup(env(&[(ACCESS_KEY_ENV, "AKIDEXAMPLE"), (SECRET_KEY_ENV, " ")]))
                .is_none()
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::new("AKIDEXAMPLE", "wJalrSECRET").with_session_token("tokSECRET");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("AKIDEXAMPLE"));
        assert!(!debug.contains("wJalrSECRET"));
        assert!(!debug.contains("tokSECRET"));
    }

    #[tokio::test]
    async fn test_environment_wins_over_instance_profile() {
        let server = MockServer::start().await;
        let source = CredentialSource::Chain(ImdsClient::new(Some(server.uri())).unwrap());

        let creds = source
            .resolve_with_env(env(&[(ACCESS_KEY_ENV, "AKIDENV"), (SECRET_KEY_ENV, "secret")]))
            .await
            .unwrap();

        assert_eq!(creds.access_key_id, "AKIDENV");
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_instance_profile_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/latest/api/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("tok"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/latest/meta-data/iam/security-credentials/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("dns-role"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/latest/meta-data/iam/security-credentials/dns-role"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"Code":"Success","AccessKeyId":"ASIAROLE","SecretAccessKey":"s","Token":"t"}"#,
            ))
            .mount(&server)
            .await;
        let source = CredentialSource::Chain(ImdsClient::new(Some(server.uri())).unwrap());

        let creds = source.resolve_with_env(env(&[])).await.unwrap();

        assert_eq!(creds.access_key_id, "ASIAROLE");
        assert_eq!(creds.session_token.as_deref(), Some("t"));
    }

    #[tokio::test]
    async fn test_no_credentials_anywhere_is_auth_error() {
        let server = MockServer::start().await;
        let source = CredentialSource::Chain(ImdsClient::new(Some(server.uri())).unwrap());

        let err = source.resolve_with_env(env(&[])).await.unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
    }
}
