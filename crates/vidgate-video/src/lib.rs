//! Video URL synthesis for rack camera devices.
//!
//! Each configured device is resolved once into a vendor strategy
//! ([`VideoDevice`]) that knows the vendor's URL grammar, its declared
//! resolutions and how to probe it for reachability. [`VideoService`] ties a
//! slot to its device and outlet and produces client-facing URLs.

#![deny(missing_docs)]

pub mod axis;
pub mod device;
pub mod hanwha;
pub mod registry;
pub mod resolution;
pub mod service;

pub use axis::AxisDevice;
pub use device::{DeviceEndpoint, SnapshotRequest, StreamRequest, VideoDevice};
pub use hanwha::HanwhaDevice;
pub use registry::{DeviceRegistry, RegistryEntry};
pub use service::VideoService;

/// Convenient result alias matching the shared gateway error type.
pub type Result<T> = vidgate_core::Result<T>;
