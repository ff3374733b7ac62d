//! Shared domain types.

use serde::{Deserialize, Serialize};

/// Health verdict for a single device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// Host that was probed
    pub host: String,

    /// Entity label, e.g. `VID42`
    pub entity: String,

    /// Whether the device is considered healthy
    pub is_healthy: bool,

    /// Failure description, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl HealthReport {
    /// A healthy report with no remarks.
    #[must_use]
    pub fn healthy(host: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            entity: entity.into(),
            is_healthy: true,
            remarks: None,
        }
    }

    /// An unhealthy report carrying a remark.
    #[must_use]
    pub fn unhealthy(
        host: impl Into<String>,
        entity: impl Into<String>,
        remark: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            entity: entity.into(),
            is_healthy: false,
            remarks: Some(remark.into()),
        }
    }
}
