//! Outbound collaborators consumed by the health pipeline.

use async_trait::async_trait;

use crate::models::LeaseDocument;
use crate::Result;

/// Supplies raw still frames for a slot.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Fetch the current frame of `slot` as encoded image bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be retrieved.
    async fn fetch_frame(&self, slot: &str) -> Result<Vec<u8>>;
}

/// Supplies the externally reported lease-status document.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LeaseSource: Send + Sync {
    /// Fetch the lease-status document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be retrieved or decoded.
    async fn fetch_lease_document(&self) -> Result<LeaseDocument>;
}
