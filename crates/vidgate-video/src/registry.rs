//! Device id to vendor strategy registry.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tracing::{info, warn};
use vidgate_core::Error;
use vidgate_mapping::{DeviceType, MappingDocument};

use crate::device::VideoDevice;
use crate::Result;

/// Registry slot for one configured device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEntry {
    /// The device type resolved to a vendor strategy.
    Resolved(VideoDevice),
    /// The device type is not a supported vendor.
    Unresolved(DeviceType),
}

/// Immutable map from device id to vendor strategy, built from one document snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRegistry {
    entries: BTreeMap<u32, RegistryEntry>,
}

impl DeviceRegistry {
    /// Build a registry with one entry per device in `doc`.
    ///
    /// A repeated device id keeps its first entry, matching
    /// [`MappingDocument::device`].
    #[must_use]
    pub fn build(doc: &MappingDocument) -> Self {
        info!(devices = doc.devices.len(), "Initialising video devices");

        let mut entries = BTreeMap::new();
        for device in &doc.devices {
            let Entry::Vacant(slot) = entries.entry(device.id) else {
                warn!(device_id = device.id, "Duplicate video device id, keeping the first");
                continue;
            };
            let entry = match VideoDevice::from_device(device, doc) {
                Some(video) => RegistryEntry::Resolved(video),
                None => {
                    warn!(
                        device_id = device.id,
                        device_type = %device.device_type,
                        "No video strategy for device type"
                    );
                    RegistryEntry::Unresolved(device.device_type.clone())
                }
            };
            slot.insert(entry);
        }

        Self { entries }
    }

    /// The entry for `device_id`, if the device was present when the registry was built.
    #[must_use]
    pub fn entry(&self, device_id: u32) -> Option<&RegistryEntry> {
        self.entries.get(&device_id)
    }

    /// The resolved strategy for `device_id`, if any.
    #[must_use]
    pub fn get(&self, device_id: u32) -> Option<&VideoDevice> {
        match self.entries.get(&device_id) {
            Some(RegistryEntry::Resolved(device)) => Some(device),
            _ => None,
        }
    }

    /// The resolved strategy for `device_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the device was not present when the
    /// registry was built, or [`Error::Unsupported`] if its type did not
    /// resolve to a vendor.
    pub fn lookup(&self, device_id: u32) -> Result<&VideoDevice> {
        match self.entries.get(&device_id) {
            Some(RegistryEntry::Resolved(device)) => Ok(device),
            Some(RegistryEntry::Unresolved(device_type)) => Err(Error::Unsupported(format!(
                "Video device type `{device_type}` of device {device_id} is not supported"
            ))),
            None => Err(Error::NotFound(format!(
                "Video device {device_id} is not registered"
            ))),
        }
    }

    /// Number of registered devices, resolved or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no device is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in device id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &RegistryEntry)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }
}
