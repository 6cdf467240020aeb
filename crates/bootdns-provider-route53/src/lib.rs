// # Route 53 DNS Provider
//
// This crate provides the Amazon Route 53 provider for bootdns.
//
// ## Behavior
//
// - One HTTP request per API page; pagination is followed to the end
// - No retries and no backoff: a failed call fails the run, and the next
//   boot re-reads everything
// - HTTP timeout configured (30 seconds)
// - Specific error handling for Route 53 error codes and HTTP status
// - Dry-run mode: reads are performed, changes are only logged
// - Change batches are atomic, so a replace is a single request
//
// ## Security Requirements
//
// - Secret keys and session tokens NEVER appear in logs or `Debug` output
// - Keys come from configuration, the environment, or the instance profile
//
// ## API Reference
//
// - List hosted zones: GET `/2013-04-01/hostedzone`
// - List record sets: GET `/2013-04-01/hostedzone/{Id}/rrset`
// - Change record sets: POST `/2013-04-01/hostedzone/{Id}/rrset/`

mod credentials;
mod sigv4;
mod xml;

pub use credentials::{CredentialSource, Credentials};

use async_trait::async_trait;
use bootdns_core::ProviderRegistry;
use bootdns_core::config::ProviderConfig;
use bootdns_core::traits::{ChangeBatch, DnsProvider, DnsProviderFactory, RecordSet, Zone};
use bootdns_core::{Error, Result};
use bootdns_imds::ImdsClient;
use chrono::Utc;
use reqwest::{Method, StatusCode, Url};
use std::time::Duration;
use tokio::sync::OnceCell;

/// Global Route 53 API endpoint
pub const DEFAULT_ROUTE53_ENDPOINT: &str = "https://route53.amazonaws.com";

/// Route 53 is a global service signed in us-east-1
pub const DEFAULT_SIGNING_REGION: &str = "us-east-1";

const SERVICE: &str = "route53";
const API_VERSION: &str = "2013-04-01";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const ZONE_PAGE_SIZE: &str = "100";
const RECORD_PAGE_SIZE: &str = "300";

/// Upper bound on pages followed for one listing
const MAX_PAGES: usize = 1000;

/// Route 53 DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all listing requests
/// - Log every change it would submit
/// - **NOT** submit any change
pub struct Route53Provider {
    credential_source: CredentialSource,
    credentials: OnceCell<Credentials>,
    endpoint: String,
    region: String,
    client: reqwest::Client,
    dry_run: bool,
}

impl std::fmt::Debug for Route53Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route53Provider")
            .field("credential_source", &self.credential_source)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl Route53Provider {
    /// Create a new Route 53 provider
    ///
    /// # Parameters
    ///
    /// - `credential_source`: where signing keys come from
    /// - `endpoint`: API endpoint (defaults to the global endpoint)
    /// - `region`: signing region (defaults to us-east-1)
    /// - `dry_run`: if true, list but never submit changes
    pub fn new(
        credential_source: CredentialSource,
        endpoint: Option<String>,
        region: Option<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        let endpoint = endpoint
            .unwrap_or_else(|| DEFAULT_ROUTE53_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string();
        Url::parse(&endpoint)
            .map_err(|e| Error::config(format!("Invalid Route 53 endpoint {}: {}", endpoint, e)))?;

        Ok(Self {
            credential_source,
            credentials: OnceCell::new(),
            endpoint,
            region: region.unwrap_or_else(|| DEFAULT_SIGNING_REGION.to_string()),
            client,
            dry_run,
        })
    }

    /// Create a provider with fixed keys
    pub fn with_credentials(
        credentials: Credentials,
        endpoint: Option<String>,
        dry_run: bool,
    ) -> Result<Self> {
        Self::new(CredentialSource::Static(credentials), endpoint, None, dry_run)
    }

    /// Credentials are resolved on first use and kept for the provider's lifetime
    async fn credentials(&self) -> Result<&Credentials> {
        self.credentials
            .get_or_try_init(|| self.credential_source.resolve())
            .await
    }

    /// Send a signed request and return the response body
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<String>,
    ) -> Result<String> {
        let credentials = self.credentials().await?;

        let mut url = Url::parse(&format!("{}/{}{}", self.endpoint, API_VERSION, path))
            .map_err(|e| Error::config(format!("Invalid request URL: {}", e)))?;
        let query_string = sigv4::canonical_query(query);
        url.set_query((!query_string.is_empty()).then_some(query_string.as_str()));

        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(Error::config("Route 53 endpoint has no host")),
        };
        let payload = body.as_deref().unwrap_or_default();
        let signed_headers = sigv4::sign(
            &sigv4::SigningRequest {
                method: method.as_str(),
                host: &host,
                path: url.path(),
                query,
                payload: payload.as_bytes(),
            },
            credentials,
            &sigv4::SigningScope {
                region: &self.region,
                service: SERVICE,
                time: Utc::now(),
            },
        );

        let mut request = self.client.request(method, url);
        for (name, value) in signed_headers {
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/xml")
                .body(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(DEFAULT_HTTP_TIMEOUT)
            } else {
                Error::http(format!("HTTP request failed: {}", e))
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(error_for_status(status, &text));
        }
        Ok(text)
    }
}

/// Map a failed response to an error
fn error_for_status(status: StatusCode, body: &str) -> Error {
    let api = xml::parse_error(body);

    match (status.as_u16(), api.code.as_str()) {
        (_, "Throttling" | "ThrottlingException" | "PriorRequestNotComplete") | (429, _) => {
            Error::rate_limited(format!("Route 53 rate limit ({}): {}", api.code, api.message))
        }
        (401 | 403, _) => Error::auth(format!(
            "Authentication failed: invalid credentials or insufficient permissions ({}): {}",
            api.code, api.message
        )),
        (_, "NoSuchHostedZone") | (404, _) => {
            Error::not_found(format!("{}: {}", api.code, api.message))
        }
        (500..=599, _) => Error::http(format!(
            "Route 53 server error (transient): {} - {}",
            status, api.message
        )),
        _ => Error::provider(
            "route53",
            format!("{} {}: {}", status, api.code, api.message),
        ),
    }
}

/// Strip the resource prefix Route 53 puts on ids (`/hostedzone/Z1` -> `Z1`)
fn bare_id<'a>(id: &'a str, prefix: &str) -> &'a str {
    id.strip_prefix(prefix).unwrap_or(id)
}

#[async_trait]
impl DnsProvider for Route53Provider {
    async fn list_zones(&self) -> Result<Vec<Zone>> {
        let mut zones = Vec::new();
        let mut marker: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut query = vec![("maxitems".to_string(), ZONE_PAGE_SIZE.to_string())];
            if let Some(marker) = &marker {
                query.push(("marker".to_string(), marker.clone()));
            }

            let body = self.send(Method::GET, "/hostedzone", &query, None).await?;
            let page: xml::ListHostedZonesResponse = xml::parse(&body)?;

            zones.extend(page.hosted_zones.items.into_iter().map(|zone| {
                let private = zone.config.is_some_and(|c| c.private_zone);
                Zone::new(
                    bare_id(&zone.id, "/hostedzone/"),
                    xml::unescape_name(&zone.name),
                )
                .with_private(private)
            }));

            match (page.is_truncated, page.next_marker) {
                (true, Some(next)) if marker.as_deref() != Some(next.as_str()) => {
                    marker = Some(next)
                }
                (true, _) => {
                    return Err(Error::provider(
                        "route53",
                        "Hosted zone listing is truncated without a usable marker",
                    ));
                }
                (false, _) => {
                    tracing::debug!("Listed {} hosted zones", zones.len());
                    return Ok(zones);
                }
            }
        }

        Err(Error::provider(
            "route53",
            format!("Hosted zone listing exceeded {} pages", MAX_PAGES),
        ))
    }

    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<RecordSet>> {
        let path = format!("/hostedzone/{}/rrset", zone_id);
        let mut record_sets = Vec::new();
        let mut cursor: Vec<(String, String)> = Vec::new();

        for _ in 0..MAX_PAGES {
            let mut query = vec![("maxitems".to_string(), RECORD_PAGE_SIZE.to_string())];
            query.extend(cursor.iter().cloned());

            let body = self.send(Method::GET, &path, &query, None).await?;
            let page: xml::ListResourceRecordSetsResponse = xml::parse(&body)?;

            record_sets.extend(
                page.resource_record_sets
                    .items
                    .into_iter()
                    .map(xml::ResourceRecordSet::into_record_set),
            );

            if !page.is_truncated {
                tracing::debug!("Listed {} record sets in zone {}", record_sets.len(), zone_id);
                return Ok(record_sets);
            }

            let next: Vec<(String, String)> = [
                ("name", page.next_record_name),
                ("type", page.next_record_type),
                ("identifier", page.next_record_identifier),
            ]
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
            .collect();

            if next.is_empty() || next == cursor {
                return Err(Error::provider(
                    "route53",
                    format!("Record listing for zone {} is truncated without a usable cursor", zone_id),
                ));
            }
            cursor = next;
        }

        Err(Error::provider(
            "route53",
            format!("Record listing for zone {} exceeded {} pages", zone_id, MAX_PAGES),
        ))
    }

    async fn submit_change(&self, zone_id: &str, batch: &ChangeBatch) -> Result<String> {
        if self.dry_run {
            for change in &batch.changes {
                tracing::info!(
                    "[DRY-RUN] Would {} {} {} ttl={:?} values={:?} in zone {}",
                    change.action,
                    change.record_set.record_type,
                    change.record_set.name,
                    change.record_set.ttl,
                    change.record_set.values,
                    zone_id
                );
            }
            return Ok("dry-run".to_string());
        }

        let path = format!("/hostedzone/{}/rrset/", zone_id);
        let body = xml::change_batch_request(batch);
        let response = self.send(Method::POST, &path, &[], Some(body)).await?;
        let parsed: xml::ChangeResourceRecordSetsResponse = xml::parse(&response)?;

        let change_id = bare_id(&parsed.change_info.id, "/change/").to_string();
        tracing::debug!(
            "Change {} accepted ({})",
            change_id,
            parsed.change_info.status.as_deref().unwrap_or("unknown status")
        );
        Ok(change_id)
    }

    fn supports_atomic_batches(&self) -> bool {
        true
    }

    fn provider_name(&self) -> &'static str {
        "route53"
    }
}

/// Factory for creating Route 53 providers
pub struct Route53Factory;

impl DnsProviderFactory for Route53Factory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Route53 {
                access_key_id,
                secret_access_key,
                session_token,
                endpoint,
                region,
                dry_run,
            } => {
                let source = match (access_key_id, secret_access_key) {
                    (Some(access_key_id), Some(secret_access_key)) => {
                        let mut credentials =
                            Credentials::new(access_key_id.clone(), secret_access_key.clone());
                        credentials.session_token = session_token.clone();
                        CredentialSource::Static(credentials)
                    }
                    (None, None) => CredentialSource::Chain(ImdsClient::new(None)?),
                    _ => {
                        return Err(Error::config(
                            "Route 53 access_key_id and secret_access_key must be set together",
                        ));
                    }
                };

                Ok(Box::new(Route53Provider::new(
                    source,
                    endpoint.clone(),
                    region.clone(),
                    *dry_run,
                )?))
            }
            _ => Err(Error::config("Invalid config for Route 53 provider")),
        }
    }
}

/// Register the Route 53 provider with a registry
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider("route53", Box::new(Route53Factory));
}
