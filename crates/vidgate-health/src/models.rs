//! Lease-status and aggregate health data models.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use vidgate_core::{Error, HealthReport};

use crate::Result;

/// Key of the service version in [`HealthStatusBean::version`].
pub const VERSION_KEY: &str = "MS_VERSION";

/// Externally reported health of one logical device group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseStatus {
    /// Reported health; absent means "no opinion"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_healthy: Option<bool>,

    /// Free-form comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Opaque lease metadata entries
    #[serde(default, deserialize_with = "null_as_empty")]
    pub metadata: Vec<Value>,
}

impl LeaseStatus {
    /// Merge group statuses in order.
    ///
    /// The result is healthy unless any group reports `false`; comments and
    /// metadata are concatenated.
    #[must_use]
    pub fn aggregate<I>(groups: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut healthy = true;
        let mut comment = String::new();
        let mut metadata = Vec::new();

        for group in groups {
            if group.is_healthy == Some(false) {
                healthy = false;
            }
            if let Some(text) = group.comment {
                comment.push_str(&text);
            }
            metadata.extend(group.metadata);
        }

        Self {
            is_healthy: Some(healthy),
            comment: (!comment.is_empty()).then_some(comment),
            metadata,
        }
    }

    /// True unless the status explicitly reports `false`.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.is_healthy != Some(false)
    }
}

/// The lease-status document: group name to status.
///
/// Only the requested groups are decoded, so unrelated entries of any shape
/// are tolerated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaseDocument {
    groups: Map<String, Value>,
}

impl LeaseDocument {
    /// Decode the status of `name`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DecodeFailure`] if the entry is not a lease status.
    pub fn group(&self, name: &str) -> Result<Option<LeaseStatus>> {
        match self.groups.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => LeaseStatus::deserialize(value).map(Some).map_err(|err| {
                Error::DecodeFailure(format!("Invalid lease status for group {name}: {err}"))
            }),
        }
    }

    /// Decode and merge the given groups, in order. Missing groups are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DecodeFailure`] if a present group cannot be decoded.
    pub fn aggregate<S>(&self, names: &[S]) -> Result<LeaseStatus>
    where
        S: AsRef<str>,
    {
        let groups = names
            .iter()
            .filter_map(|name| self.group(name.as_ref()).transpose())
            .collect::<Result<Vec<_>>>()?;
        Ok(LeaseStatus::aggregate(groups))
    }
}

/// Consolidated health of the video subsystem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatusBean {
    /// True only if the lease aggregate and every device are healthy
    pub is_healthy: bool,

    /// One report per configured device
    #[serde(default)]
    pub hw_devices_health_status: Vec<HealthReport>,

    /// Merged lease status
    #[serde(default)]
    pub lease_health_status: LeaseStatus,

    /// Failure description, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,

    /// Component versions
    #[serde(default)]
    pub version: BTreeMap<String, String>,
}

impl HealthStatusBean {
    /// A healthy, empty report carrying the service version.
    #[must_use]
    pub fn new(build_version: impl Into<String>) -> Self {
        let mut version = BTreeMap::new();
        version.insert(VERSION_KEY.to_string(), build_version.into());
        Self {
            is_healthy: true,
            version,
            ..Self::default()
        }
    }
}

/// Verdict of the screen classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScreenVerdict {
    /// Static dark frame, confirmed by a second sample
    Black,
    /// Signal-loss blue screen
    Blue,
    /// Green wash
    Green,
    /// Live content
    Normal,
}

impl ScreenVerdict {
    /// String form of the verdict.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Black => "Black",
            Self::Blue => "Blue",
            Self::Green => "Green",
            Self::Normal => "Normal",
        }
    }
}

impl fmt::Display for ScreenVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Vec<Value>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lease_document() -> LeaseDocument {
        serde_json::from_value(json!({
            "VID": {"isHealthy": false, "comment": "encoder lease expired", "metadata": [{"id": 1}]},
            "MTR": {"isHealthy": true, "metadata": [{"id": 2}, {"id": 3}]},
            "PWR": "not a lease status"
        }))
        .unwrap()
    }

    #[test]
    fn aggregate_any_false_is_unhealthy() {
        let status = lease_document().aggregate(&["VID", "MTR"]).unwrap();
        assert_eq!(status.is_healthy, Some(false));
        assert_eq!(status.comment.as_deref(), Some("encoder lease expired"));
        assert_eq!(status.metadata, vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 3})]);
    }

    #[test]
    fn aggregate_concatenates_comments_in_order() {
        let status = LeaseStatus::aggregate([
            LeaseStatus {
                comment: Some("vid ok. ".to_string()),
                ..LeaseStatus::default()
            },
            LeaseStatus::default(),
            LeaseStatus {
                comment: Some("mtr ok.".to_string()),
                ..LeaseStatus::default()
            },
        ]);
        assert_eq!(status.is_healthy, Some(true));
        assert_eq!(status.comment.as_deref(), Some("vid ok. mtr ok."));
    }

    #[test]
    fn aggregate_without_comments_has_none() {
        let status = LeaseStatus::aggregate(Vec::new());
        assert_eq!(status.is_healthy, Some(true));
        assert!(status.comment.is_none());
        assert!(status.metadata.is_empty());
    }

    #[test]
    fn missing_groups_are_skipped() {
        let status = lease_document().aggregate(&["MTR", "ABSENT"]).unwrap();
        assert_eq!(status.is_healthy, Some(true));
        assert_eq!(status.metadata.len(), 2);
    }

    #[test]
    fn malformed_requested_group_fails() {
        assert!(matches!(
            lease_document().aggregate(&["PWR"]),
            Err(Error::DecodeFailure(_))
        ));
    }

    #[test]
    fn null_metadata_is_empty() {
        let status: LeaseStatus =
            serde_json::from_value(json!({"isHealthy": true, "metadata": null})).unwrap();
        assert!(status.metadata.is_empty());
    }

    #[test]
    fn bean_serializes_camel_case() {
        let bean = HealthStatusBean::new("1.2.3");
        let json = serde_json::to_value(&bean).unwrap();
        assert_eq!(json["isHealthy"], true);
        assert_eq!(json["version"]["MS_VERSION"], "1.2.3");
        assert!(json["hwDevicesHealthStatus"].as_array().unwrap().is_empty());
        assert!(json.get("remarks").is_none());
    }

    #[test]
    fn verdict_display() {
        assert_eq!(ScreenVerdict::Black.to_string(), "Black");
        assert_eq!(ScreenVerdict::Normal.to_string(), "Normal");
    }
}
