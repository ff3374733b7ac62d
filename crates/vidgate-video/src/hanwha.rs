//! Hanwha encoder URL grammar.
//!
//! Hanwha channels are zero-based: outlet `N` is `Channel=N-1`.

use vidgate_core::query::QueryParams;
use vidgate_core::{Error, HealthReport};

use crate::device::{DeviceEndpoint, SnapshotRequest, StreamRequest};
use crate::resolution::{hanwha_resolution, SUPPORTED_RESOLUTIONS};
use crate::Result;

const CGI_PATH: &str = "/stw-cgi/video.cgi";
const DEFAULT_CODEC: &str = "MJPEG";

/// A Hanwha video encoder (SPE-1620).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HanwhaDevice {
    endpoint: DeviceEndpoint,
}

impl HanwhaDevice {
    /// Resolutions declared for Hanwha encoders.
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

    /// Snapshot URL. Resolution and codec are not accepted on snapshots.
    #[must_use]
    pub fn snapshot_url(&self, outlet: u32, request: &SnapshotRequest) -> String {
        let query = Self::view_query("snapshot", outlet);
        format!(
            "{}{CGI_PATH}?{query}",
            self.endpoint.http_base(request.use_ssl, request.is_local)
        )
    }

    /// Stream URL, over HTTP or through the rack host's RTSP port.
    #[must_use]
    pub fn video_url(&self, outlet: u32, request: &StreamRequest) -> String {
        let base = if request.is_rtsp {
            self.endpoint.rtsp_base()
        } else {
            self.endpoint.http_base(request.use_ssl, request.is_local)
        };

        let mut query = Self::view_query("stream", outlet);
        query.push_non_blank("FrameRate", request.fps.as_deref());
        query.push_opt_with("Resolution", request.resolution.as_deref(), |r| {
            hanwha_resolution(r).to_string()
        });
        query.push(
            "CodecType",
            vidgate_core::query::non_blank(request.video_codec.as_deref()).unwrap_or(DEFAULT_CODEC),
        );

        format!("{base}{CGI_PATH}?{query}")
    }

    /// Hanwha encoders expose no reachability probe.
    ///
    /// # Errors
    ///
    /// Always returns [`Error::Unsupported`].
    pub fn probe_health(&self) -> Result<HealthReport> {
        Err(Error::Unsupported(
            "Operation not supported for hanwha video device".to_string(),
        ))
    }

    // Outlets are 1-based; validated mappings never carry outlet 0.
    fn view_query(submenu: &'static str, outlet: u32) -> QueryParams {
        debug_assert!(outlet >= 1, "hanwha outlet must be 1-based, got {outlet}");
        let mut query = QueryParams::new();
        query.push("msubmenu", submenu);
        query.push("action", "view");
        query.push("Profile", 1);
        query.push("Channel", outlet.saturating_sub(1));
        query
    }
}
