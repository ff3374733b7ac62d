//! Vendor strategy dispatch and the network endpoint shared by all vendors.

use reqwest::Client;
use vidgate_core::HealthReport;
use vidgate_mapping::{Device, MappingDocument};

use crate::axis::AxisDevice;
use crate::hanwha::HanwhaDevice;
use crate::Result;

/// Prefix of the derived rack-internal address.
pub const INTERNAL_NETWORK_PREFIX: &str = "192.168.100.";

/// Rack-internal port used when none is configured.
pub const DEFAULT_INTERNAL_PORT: &str = "80";

/// Network coordinates of a device, both inside the rack and through the rack host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEndpoint {
    /// Rack-internal address
    pub internal_ip: String,
    /// Rack-internal port
    pub internal_port: String,
    /// Rack-host HTTP port
    pub nat_port: String,
    /// Rack-host HTTPS port
    pub nat_ssl_port: String,
    /// Rack-host RTSP port
    pub nat_rtsp_port: String,
    /// Public rack host name
    pub rack_host: String,
    /// Public rack address
    pub rack_ip: String,
    /// Route through the reverse proxy
    pub use_proxy: bool,
    /// Reverse proxy base
    pub proxy_base_url: String,
}

impl DeviceEndpoint {
    /// Build the endpoint of `device` within `doc`, filling derived defaults.
    ///
    /// A blank internal address becomes `192.168.100.<last two digits of natPort>`
    /// and a blank internal port becomes `80`.
    #[must_use]
    pub fn new(device: &Device, doc: &MappingDocument) -> Self {
        let internal_ip = if device.internal_ip.trim().is_empty() {
            format!("{INTERNAL_NETWORK_PREFIX}{}", last_two(&device.nat_port))
        } else {
            device.internal_ip.clone()
        };
        let internal_port = if device.internal_port.trim().is_empty() {
            DEFAULT_INTERNAL_PORT.to_string()
        } else {
            device.internal_port.clone()
        };

        Self {
            internal_ip,
            internal_port,
            nat_port: device.nat_port.clone(),
            nat_ssl_port: device.nat_ssl_port.clone(),
            nat_rtsp_port: device.nat_rtsp_port.clone(),
            rack_host: doc.rack_host.clone(),
            rack_ip: doc.rack_ip.clone(),
            use_proxy: doc.use_proxy,
            proxy_base_url: doc.proxy_base_url.clone(),
        }
    }

    /// Scheme and authority (plus proxy path) for HTTP URLs.
    ///
    /// Evaluated in order: local, SSL through proxy, SSL, proxy, plain.
    #[must_use]
    pub fn http_base(&self, use_ssl: bool, is_local: bool) -> String {
        if is_local {
            format!("http://{}:{}", self.internal_ip, self.internal_port)
        } else if use_ssl && self.use_proxy {
            format!(
                "https://{}{}/video/{}",
                self.proxy_base_url, self.rack_host, self.nat_ssl_port
            )
        } else if use_ssl {
            format!("https://{}:{}", self.rack_host, self.nat_ssl_port)
        } else if self.use_proxy {
            format!(
                "http://{}{}/video/{}",
                self.proxy_base_url, self.rack_host, self.nat_port
            )
        } else {
            format!("http://{}:{}", self.rack_host, self.nat_port)
        }
    }

    /// Scheme and authority for RTSP URLs.
    #[must_use]
    pub fn rtsp_base(&self) -> String {
        format!("rtsp://{}:{}", self.rack_host, self.nat_rtsp_port)
    }

    /// Health report entity label, `VID` plus the last two characters of the internal address.
    #[must_use]
    pub fn entity(&self) -> String {
        format!("VID{}", last_two(&self.internal_ip))
    }
}

fn last_two(value: &str) -> &str {
    let start = value
        .char_indices()
        .rev()
        .nth(1)
        .map_or(0, |(index, _)| index);
    &value[start..]
}

/// Parameters of a snapshot URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRequest {
    /// Requested resolution, e.g. `704x480`
    pub resolution: Option<String>,
    /// Requested video codec
    pub video_codec: Option<String>,
    /// Square pixel flag passed through to the device
    pub square_pixel: Option<String>,
    /// Use the HTTPS port
    pub use_ssl: bool,
    /// Address the device on the rack-internal network
    pub is_local: bool,
}

impl SnapshotRequest {
    /// A request with the gateway defaults: `704x480`, SSL, not local.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resolution: Some("704x480".to_string()),
            video_codec: None,
            square_pixel: None,
            use_ssl: true,
            is_local: false,
        }
    }

    /// Set the resolution.
    #[must_use]
    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = Some(resolution.into());
        self
    }

    /// Set the video codec.
    #[must_use]
    pub fn with_video_codec(mut self, codec: impl Into<String>) -> Self {
        self.video_codec = Some(codec.into());
        self
    }

    /// Set the square pixel flag.
    #[must_use]
    pub fn with_square_pixel(mut self, square_pixel: impl Into<String>) -> Self {
        self.square_pixel = Some(square_pixel.into());
        self
    }

    /// Use or avoid the HTTPS port.
    #[must_use]
    pub const fn with_ssl(mut self, use_ssl: bool) -> Self {
        self.use_ssl = use_ssl;
        self
    }

    /// Address the device directly on the rack-internal network.
    #[must_use]
    pub const fn local(mut self, is_local: bool) -> Self {
        self.is_local = is_local;
        self
    }
}

impl Default for SnapshotRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Parameters of a stream URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    /// Requested resolution
    pub resolution: Option<String>,
    /// Requested video codec
    pub video_codec: Option<String>,
    /// Square pixel flag passed through to the device
    pub square_pixel: Option<String>,
    /// Frames per second
    pub fps: Option<String>,
    /// Use the HTTPS port
    pub use_ssl: bool,
    /// Address the device on the rack-internal network
    pub is_local: bool,
    /// Produce an RTSP URL through the rack host
    pub is_rtsp: bool,
}

impl StreamRequest {
    /// A request with the gateway defaults: 15 fps, SSL, not local, not RTSP.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resolution: None,
            video_codec: None,
            square_pixel: None,
            fps: Some("15".to_string()),
            use_ssl: true,
            is_local: false,
            is_rtsp: false,
        }
    }

    /// Set the resolution.
    #[must_use]
    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = Some(resolution.into());
        self
    }

    /// Set the video codec.
    #[must_use]
    pub fn with_video_codec(mut self, codec: impl Into<String>) -> Self {
        self.video_codec = Some(codec.into());
        self
    }

    /// Set the square pixel flag.
    #[must_use]
    pub fn with_square_pixel(mut self, square_pixel: impl Into<String>) -> Self {
        self.square_pixel = Some(square_pixel.into());
        self
    }

    /// Set the frame rate.
    #[must_use]
    pub fn with_fps(mut self, fps: impl Into<String>) -> Self {
        self.fps = Some(fps.into());
        self
    }

    /// Use or avoid the HTTPS port.
    #[must_use]
    pub const fn with_ssl(mut self, use_ssl: bool) -> Self {
        self.use_ssl = use_ssl;
        self
    }

    /// Address the device directly on the rack-internal network.
    #[must_use]
    pub const fn local(mut self, is_local: bool) -> Self {
        self.is_local = is_local;
        self
    }

    /// Produce an RTSP URL.
    #[must_use]
    pub const fn rtsp(mut self, is_rtsp: bool) -> Self {
        self.is_rtsp = is_rtsp;
        self
    }
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// A device resolved to its vendor strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoDevice {
    /// Axis encoders
    Axis(AxisDevice),
    /// Hanwha encoders
    Hanwha(HanwhaDevice),
}

impl VideoDevice {
    /// Resolve `device` to its vendor strategy, or `None` if its type is unknown.
    #[must_use]
    pub fn from_device(device: &Device, doc: &MappingDocument) -> Option<Self> {
        let endpoint = DeviceEndpoint::new(device, doc);
        if device.device_type.is_axis() {
            Some(Self::Axis(AxisDevice::new(endpoint)))
        } else if device.device_type.is_hanwha() {
            Some(Self::Hanwha(HanwhaDevice::new(endpoint)))
        } else {
            None
        }
    }

    /// Network coordinates of the device.
    #[must_use]
    pub const fn endpoint(&self) -> &DeviceEndpoint {
        match self {
            Self::Axis(device) => device.endpoint(),
            Self::Hanwha(device) => device.endpoint(),
        }
    }

    /// Snapshot URL for `outlet`.
    #[must_use]
    pub fn snapshot_url(&self, outlet: u32, request: &SnapshotRequest) -> String {
        match self {
            Self::Axis(device) => device.snapshot_url(outlet, request),
            Self::Hanwha(device) => device.snapshot_url(outlet, request),
        }
    }

    /// Stream URL for `outlet`.
    #[must_use]
    pub fn video_url(&self, outlet: u32, request: &StreamRequest) -> String {
        match self {
            Self::Axis(device) => device.video_url(outlet, request),
            Self::Hanwha(device) => device.video_url(outlet, request),
        }
    }

    /// Resolutions declared by the vendor.
    #[must_use]
    pub fn supported_resolutions(&self) -> Vec<String> {
        let declared = match self {
            Self::Axis(_) => AxisDevice::SUPPORTED_RESOLUTIONS,
            Self::Hanwha(_) => HanwhaDevice::SUPPORTED_RESOLUTIONS,
        };
        declared.iter().map(ToString::to_string).collect()
    }

    /// Probe the device for reachability.
    ///
    /// # Errors
    ///
    /// Returns [`vidgate_core::Error::Unsupported`] for vendors without a probe.
    /// Reachability failures are reported inside the [`HealthReport`].
    pub async fn probe_health(&self, http: &Client) -> Result<HealthReport> {
        match self {
            Self::Axis(device) => Ok(device.probe_health(http).await),
            Self::Hanwha(device) => device.probe_health(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidgate_mapping::DeviceType;

    fn device(device_type: DeviceType) -> Device {
        Device {
            id: 12,
            internal_ip: String::new(),
            internal_port: String::new(),
            nat_port: "8042".to_string(),
            nat_ssl_port: "8442".to_string(),
            nat_rtsp_port: "5542".to_string(),
            device_type,
            max_port: 16,
        }
    }

    fn document(use_proxy: bool) -> MappingDocument {
        MappingDocument {
            rack_host: "rack01.lab".to_string(),
            rack_ip: "10.0.0.1".to_string(),
            use_proxy,
            proxy_base_url: "proxy.lab/".to_string(),
            ..MappingDocument::default()
        }
    }

    #[test]
    fn endpoint_fills_defaults() {
        let endpoint = DeviceEndpoint::new(&device(DeviceType::AxisP7216), &document(false));
        assert_eq!(endpoint.internal_ip, "192.168.100.42");
        assert_eq!(endpoint.internal_port, "80");
        assert_eq!(endpoint.entity(), "VID42");
    }

    #[test]
    fn endpoint_keeps_configured_internal_address() {
        let mut dev = device(DeviceType::AxisP7216);
        dev.internal_ip = "10.9.9.17".to_string();
        dev.internal_port = "8080".to_string();
        let endpoint = DeviceEndpoint::new(&dev, &document(false));
        assert_eq!(endpoint.internal_ip, "10.9.9.17");
        assert_eq!(endpoint.internal_port, "8080");
        assert_eq!(endpoint.entity(), "VID17");
    }

    #[test]
    fn host_policy_order() {
        let plain = DeviceEndpoint::new(&device(DeviceType::AxisP7216), &document(false));
        let proxied = DeviceEndpoint::new(&device(DeviceType::AxisP7216), &document(true));

        assert_eq!(proxied.http_base(true, true), "http://192.168.100.42:80");
        assert_eq!(proxied.http_base(true, false), "https://proxy.lab/rack01.lab/video/8442");
        assert_eq!(plain.http_base(true, false), "https://rack01.lab:8442");
        assert_eq!(proxied.http_base(false, false), "http://proxy.lab/rack01.lab/video/8042");
        assert_eq!(plain.http_base(false, false), "http://rack01.lab:8042");
        assert_eq!(plain.rtsp_base(), "rtsp://rack01.lab:5542");
    }

    #[test]
    fn last_two_handles_short_values() {
        assert_eq!(last_two("8042"), "42");
        assert_eq!(last_two("7"), "7");
        assert_eq!(last_two(""), "");
    }

    #[test]
    fn request_defaults() {
        let snapshot = SnapshotRequest::default();
        assert_eq!(snapshot.resolution.as_deref(), Some("704x480"));
        assert!(snapshot.use_ssl);
        assert!(!snapshot.is_local);

        let stream = StreamRequest::default();
        assert_eq!(stream.fps.as_deref(), Some("15"));
        assert!(stream.resolution.is_none());
        assert!(stream.use_ssl);
        assert!(!stream.is_rtsp);
    }

    #[test]
    fn from_device_resolves_families() {
        let doc = document(false);
        assert!(matches!(
            VideoDevice::from_device(&device(DeviceType::AxisFA54), &doc),
            Some(VideoDevice::Axis(_))
        ));
        assert!(matches!(
            VideoDevice::from_device(&device(DeviceType::HanwhaSPE1620), &doc),
            Some(VideoDevice::Hanwha(_))
        ));
        assert!(VideoDevice::from_device(
            &device(DeviceType::Unknown("Bosch.X".to_string())),
            &doc
        )
        .is_none());
    }

    #[test]
    fn both_vendors_declare_same_resolutions() {
        let doc = document(false);
        for ty in [DeviceType::AxisP7216, DeviceType::HanwhaSPE1620] {
            let device = VideoDevice::from_device(&device(ty), &doc).unwrap();
            assert_eq!(
                device.supported_resolutions(),
                vec!["704x480", "720x480", "1024x768", "1920x1080"]
            );
        }
    }
}
