//! Configuration for the gateway.
//!
//! This module provides the top-level configuration consumed by the mapping,
//! video and health crates: where the mapping document lives, which
//! collaborators to reach, and the timeout and fan-out limits applied to them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;
use validator::Validate;

use crate::client::{
    ClientConfig, RetryPolicy, LEASE_DEFAULT_TIMEOUT, PROBE_DEFAULT_TIMEOUT,
    SCREENSHOT_DEFAULT_TIMEOUT,
};
use crate::Error;

/// Version reported when no build version is configured.
pub const DEFAULT_BUILD_VERSION: &str = "development";

/// Configuration for a gateway instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct GatewayConfig {
    /// Path of the persisted slot mapping document
    pub mapping_file: PathBuf,

    /// Base URL of the rack screenshot service
    #[validate(url)]
    pub rack_url: String,

    /// URL of the lease-status document
    #[validate(url)]
    pub capability_url: String,

    /// Timeout for frame fetches in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Timeout for lease-status document fetches in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_lease_timeout_secs")]
    pub lease_timeout_secs: u64,

    /// Timeout for device reachability probes in seconds
    #[validate(range(min = 1, max = 60))]
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Maximum number of retry attempts for frame and lease fetches
    #[validate(range(min = 0, max = 10))]
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Maximum number of device probes in flight
    #[validate(range(min = 1, max = 256))]
    #[serde(default = "default_probe_concurrency")]
    pub probe_concurrency: usize,

    /// Delay between the two samples of the frozen-frame check, in milliseconds
    #[validate(range(min = 0, max = 60000))]
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Lease groups read from the lease-status document, in order
    #[serde(default = "default_lease_groups")]
    pub lease_groups: Vec<String>,

    /// Build version reported in the aggregate health report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_version: Option<String>,

    /// Rebuild the device registry whenever the mapping document changes
    #[serde(default)]
    pub refresh_registry_on_mutation: bool,
}

const fn default_request_timeout_secs() -> u64 {
    SCREENSHOT_DEFAULT_TIMEOUT
}

const fn default_lease_timeout_secs() -> u64 {
    LEASE_DEFAULT_TIMEOUT
}

const fn default_probe_timeout_secs() -> u64 {
    PROBE_DEFAULT_TIMEOUT
}

const fn default_max_retries() -> u32 {
    2
}

const fn default_probe_concurrency() -> usize {
    16
}

const fn default_settle_delay_ms() -> u64 {
    5000
}

fn default_lease_groups() -> Vec<String> {
    vec!["VID".to_string(), "MTR".to_string()]
}

impl GatewayConfig {
    /// Create a new gateway configuration with required parameters.
    ///
    /// # Arguments
    ///
    /// * `mapping_file` - Path of the persisted mapping document
    /// * `rack_url` - Base URL of the rack screenshot service
    /// * `capability_url` - URL of the lease-status document
    ///
    /// # Errors
    ///
    /// Returns an error if either URL is invalid or validation fails.
    pub fn new(
        mapping_file: impl Into<PathBuf>,
        rack_url: impl Into<String>,
        capability_url: impl Into<String>,
    ) -> Result<Self, Error> {
        let config = Self {
            mapping_file: mapping_file.into(),
            rack_url: rack_url.into(),
            capability_url: capability_url.into(),
            request_timeout_secs: default_request_timeout_secs(),
            lease_timeout_secs: default_lease_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            max_retries: default_max_retries(),
            probe_concurrency: default_probe_concurrency(),
            settle_delay_ms: default_settle_delay_ms(),
            lease_groups: default_lease_groups(),
            build_version: None,
            refresh_registry_on_mutation: false,
        };

        config
            .validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))?;

        Ok(config)
    }

    /// Parse and validate a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::ConfigError(format!("Invalid configuration document: {e}")))?;

        config
            .validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))?;

        Ok(config)
    }

    /// Read, parse and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid configuration.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    /// Set the frame fetch timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set the lease-status fetch timeout in seconds.
    #[must_use]
    pub const fn with_lease_timeout(mut self, seconds: u64) -> Self {
        self.lease_timeout_secs = seconds;
        self
    }

    /// Set the device probe timeout in seconds.
    #[must_use]
    pub const fn with_probe_timeout(mut self, seconds: u64) -> Self {
        self.probe_timeout_secs = seconds;
        self
    }

    /// Set maximum retry attempts.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the device probe fan-out bound.
    #[must_use]
    pub const fn with_probe_concurrency(mut self, limit: usize) -> Self {
        self.probe_concurrency = limit;
        self
    }

    /// Set the frozen-frame settle delay in milliseconds.
    #[must_use]
    pub const fn with_settle_delay_ms(mut self, millis: u64) -> Self {
        self.settle_delay_ms = millis;
        self
    }

    /// Set the lease groups read from the lease-status document.
    #[must_use]
    pub fn with_lease_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lease_groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Set the reported build version.
    #[must_use]
    pub fn with_build_version(mut self, version: impl Into<String>) -> Self {
        self.build_version = Some(version.into());
        self
    }

    /// Enable or disable registry refresh on mapping mutation.
    #[must_use]
    pub const fn with_registry_refresh(mut self, enabled: bool) -> Self {
        self.refresh_registry_on_mutation = enabled;
        self
    }

    /// Get the frame fetch timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Get the lease-status fetch timeout as a Duration.
    #[must_use]
    pub const fn lease_timeout(&self) -> Duration {
        Duration::from_secs(self.lease_timeout_secs)
    }

    /// Get the device probe timeout as a Duration.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Get the frozen-frame settle delay as a Duration.
    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// The build version to report, falling back to [`DEFAULT_BUILD_VERSION`].
    #[must_use]
    pub fn build_version(&self) -> &str {
        match self.build_version.as_deref() {
            Some(version) if !version.trim().is_empty() => version,
            _ => DEFAULT_BUILD_VERSION,
        }
    }

    /// HTTP client settings for frame and lease fetches.
    ///
    /// The client timeout bounds frame fetches; lease fetches override it per
    /// request with [`GatewayConfig::lease_timeout`].
    #[must_use]
    pub const fn fetch_client_config(&self) -> ClientConfig {
        ClientConfig::new()
            .with_timeout(self.timeout())
            .with_retry_policy(RetryPolicy::new().with_max_retries(self.max_retries))
    }

    /// HTTP client settings for device reachability probes.
    #[must_use]
    pub const fn probe_client_config(&self) -> ClientConfig {
        ClientConfig::for_probes().with_timeout(self.probe_timeout())
    }

    /// Parse and validate the rack URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn parse_rack_url(&self) -> Result<Url, Error> {
        Url::parse(&self.rack_url)
            .map_err(|e| Error::ConfigError(format!("Invalid rack URL: {e}")))
    }

    /// Parse and validate the lease-status URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn parse_capability_url(&self) -> Result<Url, Error> {
        Url::parse(&self.capability_url)
            .map_err(|e| Error::ConfigError(format!("Invalid capability URL: {e}")))
    }
}
