//! Slot-level video URL service.

use std::sync::{Arc, PoisonError, RwLock, Weak};

use tokio::task::JoinHandle;
use tracing::{debug, info};
use vidgate_core::config::GatewayConfig;
use vidgate_core::Error;
use vidgate_mapping::{MappingDocument, MappingStore, SlotAssignment};

use crate::device::{SnapshotRequest, StreamRequest, VideoDevice};
use crate::registry::DeviceRegistry;
use crate::Result;

/// Resolves slots to vendor strategies and synthesizes URLs.
///
/// The registry is built from the document seen at construction and stays
/// fixed unless [`VideoService::rebuild_registry`] is called or a refresh
/// task is running.
#[derive(Debug)]
pub struct VideoService {
    store: Arc<MappingStore>,
    registry: RwLock<Arc<DeviceRegistry>>,
}

impl VideoService {
    /// Create the service, building the registry from the current document.
    pub async fn new(store: Arc<MappingStore>) -> Self {
        let registry = DeviceRegistry::build(&store.load().await);
        Self::with_registry(store, registry)
    }

    /// Open the configured mapping file and create the service.
    ///
    /// With `refresh_registry_on_mutation` set, a refresh task is spawned that
    /// lives as long as the returned service.
    pub async fn from_config(config: &GatewayConfig) -> Arc<Self> {
        let store = Arc::new(MappingStore::open(config.mapping_file.clone()).await);
        let service = Arc::new(Self::new(store).await);
        if config.refresh_registry_on_mutation {
            drop(service.spawn_registry_refresh());
        }
        service
    }

    /// Create the service with an explicit registry.
    #[must_use]
    pub fn with_registry(store: Arc<MappingStore>, registry: DeviceRegistry) -> Self {
        Self {
            store,
            registry: RwLock::new(Arc::new(registry)),
        }
    }

    /// The backing mapping store.
    #[must_use]
    pub fn store(&self) -> &Arc<MappingStore> {
        &self.store
    }

    /// The current registry.
    #[must_use]
    pub fn registry(&self) -> Arc<DeviceRegistry> {
        Arc::clone(&self.registry.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Rebuild the registry from the current document.
    pub async fn rebuild_registry(&self) -> Arc<DeviceRegistry> {
        let doc = self.store.load().await;
        self.install_registry(&doc)
    }

    /// Replace the registry with one built from `doc`.
    pub fn install_registry(&self, doc: &MappingDocument) -> Arc<DeviceRegistry> {
        let registry = Arc::new(DeviceRegistry::build(doc));
        *self.registry.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&registry);
        registry
    }

    /// Rebuild the registry every time the store persists a mutation.
    ///
    /// The task ends when the service or the store is dropped.
    pub fn spawn_registry_refresh(self: &Arc<Self>) -> JoinHandle<()> {
        let mut changes = self.store.subscribe();
        let service: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let doc = Arc::clone(&changes.borrow_and_update());
                let Some(live) = service.upgrade() else {
                    break;
                };
                info!("Mapping changed, rebuilding video device registry");
                live.install_registry(&doc);
            }
            debug!("Video device registry refresh stopped");
        })
    }

    /// Snapshot URL for the camera mapped to `slot`.
    ///
    /// # Errors
    ///
    /// See [`VideoService::resolve`].
    pub async fn snapshot_url(&self, slot: &str, request: &SnapshotRequest) -> Result<String> {
        let (assignment, device) = self.resolve(slot).await?;
        Ok(device.snapshot_url(assignment.outlet, request))
    }

    /// Stream URL for the camera mapped to `slot`.
    ///
    /// # Errors
    ///
    /// See [`VideoService::resolve`].
    pub async fn video_url(&self, slot: &str, request: &StreamRequest) -> Result<String> {
        let (assignment, device) = self.resolve(slot).await?;
        Ok(device.video_url(assignment.outlet, request))
    }

    /// Resolutions declared by the device mapped to `slot`.
    ///
    /// # Errors
    ///
    /// See [`VideoService::resolve`].
    pub async fn supported_resolutions(&self, slot: &str) -> Result<Vec<String>> {
        let (_, device) = self.resolve(slot).await?;
        Ok(device.supported_resolutions())
    }

    /// Resolve `slot` to its assignment and vendor strategy.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the slot is unmapped.
    /// - [`Error::InvalidArgument`] if the mapped device is not configured.
    /// - [`Error::Unsupported`] if the device has no resolved strategy.
    pub async fn resolve(&self, slot: &str) -> Result<(SlotAssignment, VideoDevice)> {
        let doc = self.store.load().await;
        let assignment = doc.assignment(slot)?;
        debug!(slot, device_id = assignment.device_id, outlet = assignment.outlet, "Resolved slot");

        if doc.device(assignment.device_id).is_none() {
            info!(slot, "Video device is not configured for the slot");
            return Err(Error::InvalidArgument("Video device not configured".to_string()));
        }

        match self.registry().lookup(assignment.device_id) {
            Ok(device) => Ok((assignment, device.clone())),
            Err(Error::NotFound(_)) => Err(Error::Unsupported(
                "Video device factory could not be initialised".to_string(),
            )),
            Err(err) => Err(err),
        }
    }
}
