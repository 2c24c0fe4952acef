//! Authority lookup client
//!
//! Best-effort enrichment: given a cleaned agent name, ask a name-query service
//! for VIAF / LCNAF codes. Every failure (network, status, parse) is logged and
//! reported as "no enrichment available".

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = "folio-ingest/0.1.0";
const REQUESTS_PER_SECOND: NonZeroU32 = NonZeroU32::MIN;

/// Authority client errors
#[derive(Debug, Error)]
pub enum AuthorityError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Authority codes returned for a name
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct AuthorityRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub viaf: Option<String>,
    #[serde(default)]
    pub lcnaf: Option<String>,
}

impl AuthorityRecord {
    fn has_codes(&self) -> bool {
        self.viaf.as_deref().is_some_and(|v| !v.trim().is_empty())
            || self.lcnaf.as_deref().is_some_and(|v| !v.trim().is_empty())
    }
}

/// Name-query authority service
#[async_trait]
pub trait AuthorityLookup: Send + Sync {
    /// Look up authority codes for a cleaned name; `None` when nothing usable
    async fn lookup(&self, name: &str) -> Option<AuthorityRecord>;
}

/// Lookup used when no endpoint is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAuthorityLookup;

#[async_trait]
impl AuthorityLookup for NoAuthorityLookup {
    async fn lookup(&self, _name: &str) -> Option<AuthorityRecord> {
        None
    }
}

type DirectRateLimiter = governor::RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// HTTP authority client
///
/// Credentials are passed in at construction; nothing is cached process-wide.
pub struct HttpAuthorityClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    rate_limiter: DirectRateLimiter,
}

impl HttpAuthorityClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self, AuthorityError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AuthorityError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            api_key,
            rate_limiter: RateLimiter::direct(Quota::per_second(REQUESTS_PER_SECOND)),
        })
    }

    /// Query the service; `Ok(None)` for a clean "not found"
    pub async fn query(&self, name: &str) -> Result<Option<AuthorityRecord>, AuthorityError> {
        self.rate_limiter.until_ready().await;

        tracing::debug!(name = %name, endpoint = %self.endpoint, "Querying authority service");

        let mut request = self
            .http_client
            .get(&self.endpoint)
            .query(&[("queryName", name)]);
        if let Some(key) = &self.api_key {
            request = request.header("X-Api-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AuthorityError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AuthorityError::ApiError(status.as_u16(), error_text));
        }

        let record: AuthorityRecord = response
            .json()
            .await
            .map_err(|e| AuthorityError::ParseError(e.to_string()))?;

        Ok(record.has_codes().then_some(record))
    }
}

#[async_trait]
impl AuthorityLookup for HttpAuthorityClient {
    async fn lookup(&self, name: &str) -> Option<AuthorityRecord> {
        match self.query(name).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(name = %name, error = %e, "Authority lookup failed, continuing without enrichment");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_request_waits_for_quota() {
        let client = HttpAuthorityClient::new("http://127.0.0.1:9/query", None).unwrap();

        client.rate_limiter.until_ready().await;
        assert!(client.rate_limiter.check().is_err());
    }

    #[test]
    fn test_client_creation() {
        let client = HttpAuthorityClient::new("http://127.0.0.1:9/query", None);
        assert!(client.is_ok());
    }

    #[test]
    fn empty_record_has_no_codes() {
        let record: AuthorityRecord = serde_json::from_str("{}").unwrap();
        assert!(!record.has_codes());

        let record: AuthorityRecord =
            serde_json::from_str(r#"{"name": "Twain, Mark", "viaf": "50566653"}"#).unwrap();
        assert!(record.has_codes());
    }

    #[tokio::test]
    async fn unreachable_service_yields_no_enrichment() {
        // Port 9 (discard) is not listening in test environments
        let client = HttpAuthorityClient::new("http://127.0.0.1:9/query", None).unwrap();
        assert_eq!(client.lookup("Twain, Mark").await, None);
    }

    #[tokio::test]
    async fn disabled_lookup_returns_none() {
        assert_eq!(NoAuthorityLookup.lookup("anyone").await, None);
    }
}
