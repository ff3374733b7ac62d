//! Asynchronous client for the rack screenshot service and the lease-status
//! endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tokio::time::sleep;
use tracing::{debug, info};
use url::Url;
use vidgate_core::client::{
    ClientConfig, RetryPolicy, DEFAULT_POOL_IDLE_TIMEOUT, DEFAULT_POOL_MAX_IDLE_PER_HOST,
    LEASE_DEFAULT_TIMEOUT, SCREENSHOT_DEFAULT_TIMEOUT,
};
use vidgate_core::config::GatewayConfig;
use vidgate_core::query::QueryParams;
use vidgate_core::Error;

use crate::models::LeaseDocument;
use crate::source::{FrameSource, LeaseSource};
use crate::Result;

const USER_AGENT: &str = concat!("vidgate-health/", env!("CARGO_PKG_VERSION"));

/// Resolution token requested from the rack screenshot service.
pub const SCREENSHOT_RESOLUTION: &str = "4CIF";

/// Builder for [`RackClient`].
#[derive(Debug, Clone)]
pub struct RackClientBuilder {
    rack_url: Url,
    capability_url: Url,
    http_config: ClientConfig,
    retry_policy: RetryPolicy,
    lease_timeout: Duration,
}

impl RackClientBuilder {
    /// Create a builder for the given rack base URL and lease-status URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if either URL cannot be parsed.
    pub fn new(rack_url: impl AsRef<str>, capability_url: impl AsRef<str>) -> Result<Self> {
        let rack_url = parse_url("rack", rack_url.as_ref())?;
        let capability_url = parse_url("capability", capability_url.as_ref())?;
        Ok(Self::from_urls(rack_url, capability_url))
    }

    /// Create a builder from already parsed URLs.
    #[must_use]
    pub fn from_urls(rack_url: Url, capability_url: Url) -> Self {
        let http_config = ClientConfig::new()
            .with_timeout(Duration::from_secs(SCREENSHOT_DEFAULT_TIMEOUT))
            .with_pool_idle_timeout(Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT))
            .with_pool_max_idle(DEFAULT_POOL_MAX_IDLE_PER_HOST);

        Self {
            rack_url,
            capability_url,
            retry_policy: http_config.retry_policy,
            http_config,
            lease_timeout: Duration::from_secs(LEASE_DEFAULT_TIMEOUT),
        }
    }

    /// Override the retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Override the lease-status request timeout.
    #[must_use]
    pub const fn with_lease_timeout(mut self, timeout: Duration) -> Self {
        self.lease_timeout = timeout;
        self
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.retry_policy = config.retry_policy;
        self.http_config = config;
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the HTTP client cannot be built.
    pub fn build(self) -> Result<RackClient> {
        let http = self.http_config.build_http_client(USER_AGENT)?;
        Ok(RackClient {
            http,
            rack_url: self.rack_url,
            capability_url: self.capability_url,
            retry_policy: self.retry_policy,
            lease_timeout: self.lease_timeout,
        })
    }
}

/// Fetches screenshots and the lease-status document.
#[derive(Debug, Clone)]
pub struct RackClient {
    http: Client,
    rack_url: Url,
    capability_url: Url,
    retry_policy: RetryPolicy,
    lease_timeout: Duration,
}

impl RackClient {
    /// Create a client with default settings.
    ///
    /// # Errors
    ///
    /// See [`RackClientBuilder::new`] and [`RackClientBuilder::build`].
    pub fn new(rack_url: impl AsRef<str>, capability_url: impl AsRef<str>) -> Result<Self> {
        RackClientBuilder::new(rack_url, capability_url)?.build()
    }

    /// Create a client from gateway configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if a URL is invalid or the HTTP client
    /// cannot be built.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        RackClientBuilder::from_urls(config.parse_rack_url()?, config.parse_capability_url()?)
            .with_http_config(config.fetch_client_config())
            .with_lease_timeout(config.lease_timeout())
            .build()
    }

    /// The rack screenshot service base URL.
    #[must_use]
    pub const fn rack_url(&self) -> &Url {
        &self.rack_url
    }

    /// The lease-status document URL.
    #[must_use]
    pub const fn capability_url(&self) -> &Url {
        &self.capability_url
    }

    /// Timeout applied to each lease-status request.
    #[must_use]
    pub const fn lease_timeout(&self) -> Duration {
        self.lease_timeout
    }

    /// Screenshot URL for `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the rack URL cannot carry a path.
    pub fn screenshot_url(&self, slot: &str) -> Result<Url> {
        let mut url = self.rack_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::ConfigError(format!("Rack URL `{}` cannot be a base", self.rack_url))
            })?
            .pop_if_empty()
            .extend(["minion", "rest", "rack", slot, "screenshot"]);

        let mut query = QueryParams::new();
        query.push("resolution", SCREENSHOT_RESOLUTION);
        query.push("squarepixel", 0);
        url.query_pairs_mut().extend_pairs(query.into_pairs());
        Ok(url)
    }

    /// Raw screenshot bytes for `slot`, as served by the rack.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the rack does not know the slot.
    /// - [`Error::NetworkFailure`] or [`Error::Timeout`] once retries are exhausted.
    pub async fn screenshot(&self, slot: &str) -> Result<Vec<u8>> {
        let url = self.screenshot_url(slot)?;
        let response = self.get_with_retry(url, "screenshot", None).await?;
        let bytes = response.bytes().await?;
        debug!(slot, len = bytes.len(), "Received screenshot");
        Ok(bytes.to_vec())
    }

    /// The lease-status document.
    ///
    /// # Errors
    ///
    /// - [`Error::NetworkFailure`] or [`Error::Timeout`] once retries are exhausted.
    /// - [`Error::DecodeFailure`] if the body is not a JSON object.
    pub async fn lease_document(&self) -> Result<LeaseDocument> {
        let response = self
            .get_with_retry(
                self.capability_url.clone(),
                "lease status",
                Some(self.lease_timeout),
            )
            .await?;
        response.json::<LeaseDocument>().await.map_err(|err| {
            Error::DecodeFailure(format!("Failed to parse lease-status document: {err}"))
        })
    }

    /// GET `url`, retrying transient failures. `timeout` overrides the client
    /// timeout for this request.
    async fn get_with_retry(
        &self,
        url: Url,
        what: &'static str,
        timeout: Option<Duration>,
    ) -> Result<Response> {
        #[allow(unused_assignments)]
        let mut last_error: Option<Error> = None;
        let mut attempt = 0;

        loop {
            info!(url = %url, attempt, "Rack {what} request");

            let mut request = self.http.get(url.clone());
            if let Some(timeout) = timeout {
                request = request.timeout(timeout);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());

                    let error = match status {
                        StatusCode::NOT_FOUND => {
                            return Err(Error::NotFound(format!("{what} not found: {text}")))
                        }
                        StatusCode::TOO_MANY_REQUESTS => Error::NetworkFailure(format!(
                            "{what} endpoint temporarily unavailable: {text}"
                        )),
                        status if status.is_server_error() => Error::NetworkFailure(format!(
                            "{what} endpoint error {status}: {text}"
                        )),
                        status => {
                            return Err(Error::NetworkFailure(format!(
                                "{what} request rejected with {status}: {text}"
                            )))
                        }
                    };
                    last_error = Some(error);
                }
                Err(err) => {
                    let error = Error::from(err);
                    if error.is_transient() {
                        last_error = Some(error);
                    } else {
                        return Err(error);
                    }
                }
            }

            attempt += 1;
            if attempt > self.retry_policy.max_retries {
                break;
            }
            let delay = self.retry_policy.delay_for_attempt(attempt);
            if delay > Duration::from_millis(0) {
                debug!("Retrying rack {what} request after {:?}", delay);
                sleep(delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::NetworkFailure(format!("{what} request failed after retries"))
        }))
    }
}

#[async_trait]
impl FrameSource for RackClient {
    async fn fetch_frame(&self, slot: &str) -> Result<Vec<u8>> {
        self.screenshot(slot).await
    }
}

#[async_trait]
impl LeaseSource for RackClient {
    async fn fetch_lease_document(&self) -> Result<LeaseDocument> {
        self.lease_document().await
    }
}

fn parse_url(kind: &str, raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|err| Error::ConfigError(format!("Invalid {kind} URL `{raw}`: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> RackClient {
        RackClientBuilder::new(server.uri(), format!("{}/capabilities", server.uri()))
            .unwrap()
            .with_retry_policy(
                RetryPolicy::new()
                    .with_max_retries(2)
                    .with_initial_delay(Duration::from_millis(1))
                    .with_max_delay(Duration::from_millis(2)),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn screenshot_url_shape() {
        let client = RackClient::new("http://rack07.lab:8080/", "http://lease.lab/caps").unwrap();
        assert_eq!(
            client.screenshot_url("12").unwrap().as_str(),
            "http://rack07.lab:8080/minion/rest/rack/12/screenshot?resolution=4CIF&squarepixel=0"
        );

        let client = RackClient::new("http://rack07.lab/api", "http://lease.lab/caps").unwrap();
        assert_eq!(
            client.screenshot_url("3").unwrap().path(),
            "/api/minion/rest/rack/3/screenshot"
        );
    }

    #[test]
    fn invalid_urls_are_config_errors() {
        assert!(matches!(
            RackClient::new("not a url", "http://lease.lab"),
            Err(Error::ConfigError(_))
        ));
        assert!(matches!(
            RackClient::new("http://rack.lab", ""),
            Err(Error::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn screenshot_returns_raw_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/minion/rest/rack/7/screenshot"))
            .and(query_param("resolution", "4CIF"))
            .and(query_param("squarepixel", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
            .expect(1)
            .mount(&server)
            .await;

        let bytes = client(&server).screenshot("7").await.unwrap();
        assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF]);
    }

    #[tokio::test]
    async fn screenshot_not_found_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/minion/rest/rack/99/screenshot"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such slot"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).screenshot("99").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)), "{err:?}");
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/capabilities"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server).lease_document().await.unwrap_err();
        assert!(matches!(err, Error::NetworkFailure(_)), "{err:?}");
    }

    #[tokio::test]
    async fn client_errors_fail_fast() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/capabilities"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        assert!(matches!(
            client(&server).lease_document().await,
            Err(Error::NetworkFailure(_))
        ));
    }

    #[tokio::test]
    async fn lease_document_parses_groups() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/capabilities"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "VID": {"isHealthy": true, "comment": "ok", "metadata": []},
                "MTR": {"isHealthy": false}
            })))
            .mount(&server)
            .await;

        let doc = client(&server).lease_document().await.unwrap();
        assert_eq!(doc.group("VID").unwrap().unwrap().comment.as_deref(), Some("ok"));
        assert_eq!(doc.group("MTR").unwrap().unwrap().is_healthy, Some(false));
        assert!(doc.group("PWR").unwrap().is_none());
    }

    #[tokio::test]
    async fn lease_document_uses_its_own_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/capabilities"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_millis(500)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = RackClientBuilder::new(server.uri(), format!("{}/capabilities", server.uri()))
            .unwrap()
            .with_retry_policy(RetryPolicy::no_retry())
            .with_lease_timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        assert_eq!(client.lease_timeout(), Duration::from_millis(50));

        let err = client.lease_document().await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)), "{err:?}");
    }

    #[test]
    fn from_config_carries_lease_timeout() {
        let config = GatewayConfig::new("slots.json", "http://rack.lab:8080/", "http://lease.lab/caps")
            .unwrap()
            .with_lease_timeout(9);
        let client = RackClient::from_config(&config).unwrap();
        assert_eq!(client.lease_timeout(), Duration::from_secs(9));
        assert_eq!(client.rack_url().port(), Some(8080));
        assert_eq!(client.capability_url().path(), "/caps");

        let default = RackClient::new("http://rack.lab", "http://lease.lab").unwrap();
        assert_eq!(default.lease_timeout(), Duration::from_secs(LEASE_DEFAULT_TIMEOUT));
    }

    #[tokio::test]
    async fn lease_document_rejects_non_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/capabilities"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        assert!(matches!(
            client(&server).lease_document().await,
            Err(Error::DecodeFailure(_))
        ));
    }
}
