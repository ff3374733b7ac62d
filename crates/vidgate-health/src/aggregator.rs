//! Consolidated video subsystem health.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use reqwest::Client;
use tracing::{info, warn};
use vidgate_core::config::{GatewayConfig, DEFAULT_BUILD_VERSION};
use vidgate_core::HealthReport;
use vidgate_mapping::Device;
use vidgate_video::{DeviceEndpoint, DeviceRegistry, VideoService};

use crate::models::{HealthStatusBean, LeaseStatus};
use crate::source::LeaseSource;
use crate::Result;

const USER_AGENT: &str = concat!("vidgate-health/", env!("CARGO_PKG_VERSION"));

/// Default lease groups, read in this order.
pub const DEFAULT_LEASE_GROUPS: [&str; 2] = ["VID", "MTR"];

/// Default number of device probes in flight.
pub const DEFAULT_PROBE_CONCURRENCY: usize = 16;

/// Merges device probes and the lease-status document into one report.
pub struct HealthAggregator {
    video: Arc<VideoService>,
    leases: Arc<dyn LeaseSource>,
    http: Client,
    lease_groups: Vec<String>,
    probe_concurrency: usize,
    build_version: String,
}

impl std::fmt::Debug for HealthAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthAggregator")
            .field("lease_groups", &self.lease_groups)
            .field("probe_concurrency", &self.probe_concurrency)
            .field("build_version", &self.build_version)
            .finish_non_exhaustive()
    }
}

impl HealthAggregator {
    /// Create an aggregator probing devices with `http`.
    #[must_use]
    pub fn new(video: Arc<VideoService>, leases: Arc<dyn LeaseSource>, http: Client) -> Self {
        Self {
            video,
            leases,
            http,
            lease_groups: DEFAULT_LEASE_GROUPS.iter().map(ToString::to_string).collect(),
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
            build_version: DEFAULT_BUILD_VERSION.to_string(),
        }
    }

    /// Create an aggregator from gateway configuration.
    ///
    /// # Errors
    ///
    /// Returns [`vidgate_core::Error::ConfigError`] if the probe HTTP client
    /// cannot be built.
    pub fn from_config(
        config: &GatewayConfig,
        video: Arc<VideoService>,
        leases: Arc<dyn LeaseSource>,
    ) -> Result<Self> {
        let http = config.probe_client_config().build_http_client(USER_AGENT)?;
        Ok(Self::new(video, leases, http)
            .with_lease_groups(config.lease_groups.iter().cloned())
            .with_probe_concurrency(config.probe_concurrency)
            .with_build_version(config.build_version()))
    }

    /// Override the lease groups to read.
    #[must_use]
    pub fn with_lease_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lease_groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Override the number of device probes in flight.
    #[must_use]
    pub fn with_probe_concurrency(mut self, limit: usize) -> Self {
        self.probe_concurrency = limit.max(1);
        self
    }

    /// Override the reported build version.
    #[must_use]
    pub fn with_build_version(mut self, version: impl Into<String>) -> Self {
        self.build_version = version.into();
        self
    }

    /// Merged status of the configured lease groups.
    ///
    /// # Errors
    ///
    /// Returns the lease source error, or a decode failure for a malformed group.
    pub async fn lease_status(&self) -> Result<LeaseStatus> {
        let document = self.leases.fetch_lease_document().await?;
        document.aggregate(self.lease_groups.as_slice())
    }

    /// One report per configured device, in document order.
    ///
    /// Probe failures are isolated: each becomes an unhealthy report.
    pub async fn device_reports(&self) -> Vec<HealthReport> {
        let doc = self.video.store().load().await;
        let registry = self.video.registry();

        let probes = doc.devices.iter().map(|device| {
            let endpoint = DeviceEndpoint::new(device, &doc);
            self.probe(device, endpoint, &registry)
        });

        stream::iter(probes)
            .buffered(self.probe_concurrency)
            .collect()
            .await
    }

    async fn probe(
        &self,
        device: &Device,
        endpoint: DeviceEndpoint,
        registry: &DeviceRegistry,
    ) -> HealthReport {
        let outcome = match registry.lookup(device.id) {
            Ok(video) => video.probe_health(&self.http).await,
            Err(err) => Err(err),
        };

        outcome.unwrap_or_else(|err| {
            warn!(device_id = device.id, error = %err, "Video device health unavailable");
            HealthReport::unhealthy(endpoint.internal_ip.clone(), endpoint.entity(), err.message())
        })
    }

    /// The consolidated health report.
    ///
    /// Never fails. A lease fetch failure marks the report unhealthy and is
    /// recorded in `remarks`; device reports are still included.
    pub async fn health_report(&self) -> HealthStatusBean {
        let (lease, devices) = tokio::join!(self.lease_status(), self.device_reports());

        let mut report = HealthStatusBean::new(self.build_version.clone());
        let devices_ok = devices.iter().all(|device| device.is_healthy);
        report.hw_devices_health_status = devices;

        match lease {
            Ok(status) => {
                report.is_healthy = status.is_ok() && devices_ok;
                report.lease_health_status = status;
            }
            Err(err) => {
                warn!(error = %err, "Failed to fetch lease status");
                report.is_healthy = false;
                report.remarks = Some(format!("Failed to fetch details of lease {}", err.message()));
            }
        }

        info!(
            healthy = report.is_healthy,
            devices = report.hw_devices_health_status.len(),
            "Health report assembled"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LeaseDocument;
    use crate::source::MockLeaseSource;
    use serde_json::json;
    use std::path::Path;
    use vidgate_core::Error;
    use vidgate_mapping::MappingStore;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn video(dir: &Path, axis_host: &str) -> Arc<VideoService> {
        let file = dir.join("slots.json");
        let doc = json!({
            "slots": {"1": "1:1", "2": "2:1", "3": "3:1"},
            "devices": [
                {"id": 1, "internalIp": axis_host, "natPort": "8011", "natSSLPort": "8411",
                 "natRTSPPort": "5511", "type": "Axis.P7216", "maxPort": 16},
                {"id": 2, "natPort": "8022", "natSSLPort": "8422", "natRTSPPort": "5522",
                 "type": "Hanwha.SPE-1620", "maxPort": 16},
                {"id": 3, "natPort": "8033", "type": "Bosch.VIP-X1600", "maxPort": 4}
            ],
            "rackHost": "rack07.lab",
            "useProxy": false
        });
        std::fs::write(&file, serde_json::to_vec(&doc).unwrap()).unwrap();
        let store = Arc::new(MappingStore::open(file).await);
        Arc::new(VideoService::new(store).await)
    }

    fn leases(document: serde_json::Value) -> Arc<dyn LeaseSource> {
        let document: LeaseDocument = serde_json::from_value(document).unwrap();
        let mut source = MockLeaseSource::new();
        source
            .expect_fetch_lease_document()
            .times(1)
            .return_once(move || Ok(document));
        Arc::new(source)
    }

    fn unused_leases() -> Arc<dyn LeaseSource> {
        Arc::new(MockLeaseSource::new())
    }

    async fn axis_camera(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/axis-cgi/jpg/image.cgi"))
            .and(query_param("camera", "1"))
            .respond_with(ResponseTemplate::new(status).set_body_bytes(vec![0xFF, 0xD8]))
            .mount(&server)
            .await;
        server
    }

    fn host_of(server: &MockServer) -> String {
        server.address().to_string()
    }

    #[tokio::test]
    async fn device_reports_isolate_failures() {
        let camera = axis_camera(200).await;
        let dir = tempfile::tempdir().unwrap();
        let video = video(dir.path(), &host_of(&camera)).await;
        let aggregator =
            HealthAggregator::new(video, unused_leases(), Client::new()).with_probe_concurrency(2);

        let reports = aggregator.device_reports().await;
        assert_eq!(reports.len(), 3);

        assert!(reports[0].is_healthy, "{:?}", reports[0]);
        assert_eq!(reports[0].host, host_of(&camera));

        assert!(!reports[1].is_healthy);
        assert_eq!(reports[1].host, "192.168.100.22");
        assert_eq!(reports[1].entity, "VID22");
        assert_eq!(
            reports[1].remarks.as_deref(),
            Some("Operation not supported for hanwha video device")
        );

        assert!(!reports[2].is_healthy);
        assert_eq!(reports[2].entity, "VID33");
        assert!(reports[2].remarks.as_deref().unwrap().contains("Bosch.VIP-X1600"));
    }

    #[tokio::test]
    async fn unhealthy_lease_group_fails_report() {
        let camera = axis_camera(200).await;
        let dir = tempfile::tempdir().unwrap();
        let video = video(dir.path(), &host_of(&camera)).await;
        let leases = leases(json!({
            "VID": {"isHealthy": false, "comment": "lease held by rack09", "metadata": [{"slot": 1}]},
            "MTR": {"isHealthy": true, "metadata": []}
        }));
        let aggregator = HealthAggregator::new(video, leases, Client::new()).with_build_version("4.1.0");

        let report = aggregator.health_report().await;
        assert!(!report.is_healthy);
        assert_eq!(report.lease_health_status.is_healthy, Some(false));
        assert_eq!(
            report.lease_health_status.comment.as_deref(),
            Some("lease held by rack09")
        );
        assert_eq!(report.lease_health_status.metadata.len(), 1);
        assert_eq!(report.version["MS_VERSION"], "4.1.0");
        assert!(report.remarks.is_none());
    }

    #[tokio::test]
    async fn all_healthy_report() {
        let camera = axis_camera(200).await;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("slots.json");
        let doc = json!({
            "slots": {"1": "1:1"},
            "devices": [
                {"id": 1, "internalIp": host_of(&camera), "natPort": "8011",
                 "type": "Axis.FA54", "maxPort": 4}
            ],
            "rackHost": "rack07.lab"
        });
        std::fs::write(&file, serde_json::to_vec(&doc).unwrap()).unwrap();
        let video = Arc::new(VideoService::new(Arc::new(MappingStore::open(file).await)).await);
        let leases = leases(json!({
            "VID": {"isHealthy": true},
            "MTR": {"isHealthy": true}
        }));

        let report = HealthAggregator::new(video, leases, Client::new())
            .health_report()
            .await;
        assert!(report.is_healthy);
        assert_eq!(report.hw_devices_health_status.len(), 1);
        assert_eq!(report.version["MS_VERSION"], "development");
    }

    #[tokio::test]
    async fn unreachable_camera_is_unhealthy() {
        let camera = axis_camera(500).await;
        let dir = tempfile::tempdir().unwrap();
        let video = video(dir.path(), &host_of(&camera)).await;
        let aggregator = HealthAggregator::new(video, unused_leases(), Client::new());

        let reports = aggregator.device_reports().await;
        assert!(!reports[0].is_healthy);
        assert!(reports[0].remarks.is_some());
    }

    #[tokio::test]
    async fn lease_failure_is_reported_not_raised() {
        let camera = axis_camera(200).await;
        let dir = tempfile::tempdir().unwrap();
        let video = video(dir.path(), &host_of(&camera)).await;
        let mut source = MockLeaseSource::new();
        source
            .expect_fetch_lease_document()
            .times(1)
            .return_once(|| Err(Error::NetworkFailure("connection refused".to_string())));

        let report = HealthAggregator::new(video, Arc::new(source), Client::new())
            .health_report()
            .await;
        assert!(!report.is_healthy);
        assert_eq!(
            report.remarks.as_deref(),
            Some("Failed to fetch details of lease connection refused")
        );
        assert_eq!(report.hw_devices_health_status.len(), 3);
    }

    #[tokio::test]
    async fn from_config_reads_lease_groups() {
        let dir = tempfile::tempdir().unwrap();
        let video = video(dir.path(), "127.0.0.1:9").await;
        let config = GatewayConfig::new(
            dir.path().join("slots.json"),
            "http://rack07.lab",
            "http://lease.lab/caps",
        )
        .unwrap()
        .with_lease_groups(["MTR"])
        .with_build_version("9.9.9");
        let leases = leases(json!({
            "VID": {"isHealthy": false},
            "MTR": {"isHealthy": true, "comment": "ok"}
        }));

        let aggregator = HealthAggregator::from_config(&config, video, leases).unwrap();
        let status = aggregator.lease_status().await.unwrap();
        assert_eq!(status.is_healthy, Some(true));
        assert_eq!(status.comment.as_deref(), Some("ok"));
    }
}
