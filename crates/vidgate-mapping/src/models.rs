//! Mapping document data models.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use vidgate_core::Error;

use crate::Result;

/// Tombstone value for a slot key that exists but has no current mapping.
pub const UNMAPPED: &str = "N/A";

/// Video device model as named in the mapping document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceType {
    /// Axis P7216 video encoder (`Axis.P7216`)
    AxisP7216,
    /// Axis FA54 main unit (`Axis.FA54`)
    AxisFA54,
    /// Hanwha SPE-1620 encoder (`Hanwha.SPE-1620`)
    HanwhaSPE1620,
    /// Any other value; the raw string is kept so it round-trips unchanged.
    Unknown(String),
}

impl DeviceType {
    /// Returns the string form used in the mapping document.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AxisP7216 => "Axis.P7216",
            Self::AxisFA54 => "Axis.FA54",
            Self::HanwhaSPE1620 => "Hanwha.SPE-1620",
            Self::Unknown(raw) => raw,
        }
    }

    /// True for the Axis family.
    #[must_use]
    pub const fn is_axis(&self) -> bool {
        matches!(self, Self::AxisP7216 | Self::AxisFA54)
    }

    /// True for the Hanwha family.
    #[must_use]
    pub const fn is_hanwha(&self) -> bool {
        matches!(self, Self::HanwhaSPE1620)
    }
}

impl Default for DeviceType {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

impl From<String> for DeviceType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Axis.P7216" => Self::AxisP7216,
            "Axis.FA54" => Self::AxisFA54,
            "Hanwha.SPE-1620" => Self::HanwhaSPE1620,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<DeviceType> for String {
    fn from(value: DeviceType) -> Self {
        match value {
            DeviceType::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A physical video device attached to the rack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Device identifier referenced by slot mappings
    pub id: u32,

    /// Address on the rack-internal network; derived from `nat_port` when blank
    #[serde(default, deserialize_with = "null_as_default")]
    pub internal_ip: String,

    /// Port on the rack-internal network; `80` when blank
    #[serde(default, deserialize_with = "null_as_default")]
    pub internal_port: String,

    /// Rack-host port forwarded to the device over HTTP
    #[serde(default, deserialize_with = "null_as_default")]
    pub nat_port: String,

    /// Rack-host port forwarded to the device over HTTPS
    #[serde(rename = "natSSLPort", default, deserialize_with = "null_as_default")]
    pub nat_ssl_port: String,

    /// Rack-host port forwarded to the device over RTSP
    #[serde(rename = "natRTSPPort", default, deserialize_with = "null_as_default")]
    pub nat_rtsp_port: String,

    /// Device model
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub device_type: DeviceType,

    /// Highest valid outlet number
    #[serde(default, deserialize_with = "null_as_default")]
    pub max_port: u32,
}

impl Device {
    /// Whether `outlet` is a valid outlet on this device.
    #[must_use]
    pub const fn has_outlet(&self, outlet: u32) -> bool {
        outlet >= 1 && outlet <= self.max_port
    }
}

/// The persisted slot to device mapping document.
///
/// Unknown fields are ignored on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingDocument {
    /// Slot to `deviceId:outlet` (or [`UNMAPPED`])
    #[serde(default, deserialize_with = "null_as_default")]
    pub slots: BTreeMap<String, String>,

    /// Configured devices, in document order
    #[serde(default, deserialize_with = "null_as_default")]
    pub devices: Vec<Device>,

    /// Public host name of the rack
    #[serde(default, deserialize_with = "null_as_default")]
    pub rack_host: String,

    /// Public IP address of the rack
    #[serde(default, deserialize_with = "null_as_default")]
    pub rack_ip: String,

    /// Route client URLs through the reverse proxy
    #[serde(default, deserialize_with = "null_as_default")]
    pub use_proxy: bool,

    /// Reverse proxy base, prepended to the rack host
    #[serde(default, deserialize_with = "null_as_default")]
    pub proxy_base_url: String,
}

impl MappingDocument {
    /// Look up the mapping value for a slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the slot is absent or tombstoned.
    pub fn mapping(&self, slot: &str) -> Result<&str> {
        match self.slots.get(slot) {
            Some(value) if value != UNMAPPED => Ok(value),
            _ => Err(not_mapped(slot)),
        }
    }

    /// Resolve a slot to its device and outlet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unmapped slot and
    /// [`Error::InvalidArgument`] if the stored value is malformed.
    pub fn assignment(&self, slot: &str) -> Result<SlotAssignment> {
        self.mapping(slot)?.parse()
    }

    /// Tombstone an existing slot. Keys are never removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the slot key does not exist.
    pub fn remove_mapping(&mut self, slot: &str) -> Result<()> {
        match self.slots.get_mut(slot) {
            Some(value) => {
                *value = UNMAPPED.to_string();
                Ok(())
            }
            None => Err(not_mapped(slot)),
        }
    }

    /// Find a configured device by id.
    #[must_use]
    pub fn device(&self, id: u32) -> Option<&Device> {
        self.devices.iter().find(|device| device.id == id)
    }

    /// Normalize and validate a mapping value for `slot`.
    ///
    /// A single leading and a single trailing double quote are stripped first.
    /// Returns the normalized value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] unless the value is [`UNMAPPED`] or a
    /// `deviceId:outlet` pair naming a configured device and an outlet within
    /// `1..=maxPort`.
    pub fn validate_value(&self, slot: &str, raw: &str) -> Result<String> {
        let value = normalize_value(raw);
        if value == UNMAPPED {
            return Ok(value.to_string());
        }

        let valid = value
            .parse::<SlotAssignment>()
            .ok()
            .and_then(|assignment| {
                self.device(assignment.device_id)
                    .filter(|device| device.has_outlet(assignment.outlet))
            })
            .is_some();

        if valid {
            Ok(value.to_string())
        } else {
            Err(Error::InvalidArgument(format!(
                "Invalid mapping for slot {slot}: {value}"
            )))
        }
    }
}

/// A resolved `deviceId:outlet` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotAssignment {
    /// Device identifier
    pub device_id: u32,
    /// Outlet on the device, starting at 1
    pub outlet: u32,
}

impl FromStr for SlotAssignment {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let value = normalize_value(raw);
        let invalid = || Error::InvalidArgument(format!("Invalid device info: {value}"));
        let (device, outlet) = value.split_once(':').ok_or_else(invalid)?;

        Ok(Self {
            device_id: device.parse().map_err(|_| invalid())?,
            outlet: outlet.parse().map_err(|_| invalid())?,
        })
    }
}

impl fmt::Display for SlotAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.device_id, self.outlet)
    }
}

/// Strip one leading and one trailing double quote (legacy clients quote values).
#[must_use]
pub fn normalize_value(raw: &str) -> &str {
    let value = raw.strip_prefix('"').unwrap_or(raw);
    value.strip_suffix('"').unwrap_or(value)
}

fn not_mapped(slot: &str) -> Error {
    Error::NotFound(format!("Slot {slot} is not mapped"))
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
