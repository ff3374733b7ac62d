//! Axis encoder URL grammar and reachability probe.

use reqwest::Client;
use tracing::{info, warn};
use vidgate_core::query::QueryParams;
use vidgate_core::HealthReport;

use crate::device::{DeviceEndpoint, SnapshotRequest, StreamRequest};
use crate::resolution::{axis_resolution, SUPPORTED_RESOLUTIONS};

const SNAPSHOT_PATH: &str = "/axis-cgi/jpg/image.cgi";
const MJPEG_PATH: &str = "/mjpg/video.mjpg";
const RTSP_PATH: &str = "/axis-media/media.amp";

/// An Axis video encoder (P7216, FA54). Outlets map to `camera=<outlet>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisDevice {
    endpoint: DeviceEndpoint,
}

impl AxisDevice {
    /// Resolutions declared for Axis encoders.
    pub const SUPPORTED_RESOLUTIONS: [&'static str; 4] = SUPPORTED_RESOLUTIONS;

    /// Create the strategy for a device endpoint.
    #[must_use]
    pub const fn new(endpoint: DeviceEndpoint) -> Self {
        Self { endpoint }
    }

    /// Network coordinates of the device.
    #[must_use]
    pub const fn endpoint(&self) -> &DeviceEndpoint {
        &self.endpoint
    }

    /// Snapshot URL: `/axis-cgi/jpg/image.cgi?camera=<outlet>` plus optional parameters.
    #[must_use]
    pub fn snapshot_url(&self, outlet: u32, request: &SnapshotRequest) -> String {
        let mut query = QueryParams::new();
        query.push("camera", outlet);
        query.push_non_blank("squarepixel", request.square_pixel.as_deref());
        query.push_opt_with("resolution", request.resolution.as_deref(), |r| {
            axis_resolution(r).to_string()
        });
        query.push_non_blank("videocodec", request.video_codec.as_deref());

        format!(
            "{}{SNAPSHOT_PATH}?{query}",
            self.endpoint.http_base(request.use_ssl, request.is_local)
        )
    }

    /// Stream URL: MJPEG over HTTP, or the media endpoint over RTSP.
    #[must_use]
    pub fn video_url(&self, outlet: u32, request: &StreamRequest) -> String {
        let (base, path) = if request.is_rtsp {
            (self.endpoint.rtsp_base(), RTSP_PATH)
        } else {
            (
                self.endpoint.http_base(request.use_ssl, request.is_local),
                MJPEG_PATH,
            )
        };

        let mut query = QueryParams::new();
        query.push("camera", outlet);
        query.push_non_blank("fps", request.fps.as_deref());
        query.push_non_blank("squarepixel", request.square_pixel.as_deref());
        query.push_opt_with("resolution", request.resolution.as_deref(), |r| {
            axis_resolution(r).to_string()
        });
        query.push_non_blank("videocodec", request.video_codec.as_deref());

        format!("{base}{path}?{query}")
    }

    /// Fetch the camera 1 snapshot from the device's internal address.
    ///
    /// Never fails: an unreachable device yields an unhealthy report.
    pub async fn probe_health(&self, http: &Client) -> HealthReport {
        let host = self.endpoint.internal_ip.clone();
        let entity = self.endpoint.entity();
        let url = format!("http://{host}{SNAPSHOT_PATH}?camera=1");
        info!(url = %url, "Probing Axis video device");

        let outcome = async {
            let response = http.get(&url).send().await?.error_for_status()?;
            response.bytes().await
        }
        .await;

        match outcome {
            Ok(_) => HealthReport::healthy(host, entity),
            Err(err) => {
                warn!(host = %host, error = %err, "Axis video device probe failed");
                HealthReport::unhealthy(host, entity, err.to_string())
            }
        }
    }
}
