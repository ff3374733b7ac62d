//! Slot mapping models and persistent store for the rack video gateway.
//!
//! A rack slot under test is mapped to a `deviceId:outlet` pair on one of the
//! configured video devices. This crate owns the persisted mapping document,
//! validates edits against the device list and publishes every change so
//! dependent registries can refresh.

#![deny(missing_docs)]

pub mod models;
pub mod store;

pub use models::{Device, DeviceType, MappingDocument, SlotAssignment, UNMAPPED};
pub use store::MappingStore;

/// Convenient result alias matching the shared gateway error type.
pub type Result<T> = vidgate_core::Result<T>;
