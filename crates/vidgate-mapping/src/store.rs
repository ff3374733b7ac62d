//! Persistent, single-writer mapping store.
//!
//! Every read loads the document from disk. Every mutation is serialized
//! behind one async lock, performs load, edit and write in a single blocking
//! task, and installs the new document with write-to-temp then rename so a
//! reader never observes a partially written file. Successful mutations are
//! published on a [`watch`] channel.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};
use vidgate_core::Error;

use crate::models::{Device, MappingDocument, SlotAssignment};
use crate::Result;

/// What to do with the document when a mutation is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnReject {
    /// Leave the file untouched.
    Discard,
    /// Rewrite the unchanged document before failing.
    Rewrite,
}

/// Store for the persisted slot mapping document.
#[derive(Debug)]
pub struct MappingStore {
    path: PathBuf,
    write_lock: Mutex<()>,
    changes: watch::Sender<Arc<MappingDocument>>,
}

impl MappingStore {
    /// Open the store backed by `path`.
    ///
    /// The file does not need to exist; a missing or unreadable document is
    /// treated as empty.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let initial = {
            let path = path.clone();
            run_blocking(move || Ok(load_document(&path)))
                .await
                .unwrap_or_default()
        };
        let (changes, _) = watch::channel(Arc::new(initial));

        Self {
            path,
            write_lock: Mutex::new(()),
            changes,
        }
    }

    /// Path of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Subscribe to documents persisted by successful mutations.
    ///
    /// The receiver starts with the document observed when the store was opened.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<MappingDocument>> {
        self.changes.subscribe()
    }

    /// Load the current document, falling back to an empty one.
    pub async fn load(&self) -> MappingDocument {
        let path = self.path.clone();
        run_blocking(move || Ok(load_document(&path)))
            .await
            .unwrap_or_default()
    }

    /// The whole current document.
    pub async fn mappings(&self) -> MappingDocument {
        self.load().await
    }

    /// The mapping value of `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the slot is absent or tombstoned.
    pub async fn get_mapping(&self, slot: &str) -> Result<String> {
        let doc = self.load().await;
        doc.mapping(slot).map(str::to_string).map_err(|err| {
            warn!(slot, "Could not locate mapping for slot");
            err
        })
    }

    /// Resolve `slot` to its device and outlet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unmapped slot and
    /// [`Error::InvalidArgument`] if the stored value is malformed.
    pub async fn assignment(&self, slot: &str) -> Result<SlotAssignment> {
        self.load().await.assignment(slot)
    }

    /// The configured devices, in document order.
    pub async fn list_devices(&self) -> Vec<Device> {
        self.load().await.devices
    }

    /// Replace the whole slot map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if any value is invalid, in which
    /// case nothing is written, or [`Error::IoFailure`] if the write fails.
    pub async fn set_mappings(&self, entries: BTreeMap<String, String>) -> Result<()> {
        info!(count = entries.len(), "Setting new slot mappings");
        self.mutate(OnReject::Discard, move |doc| {
            let mut slots = BTreeMap::new();
            for (slot, value) in entries {
                let value = doc.validate_value(&slot, &value)?;
                slots.insert(slot, value);
            }
            doc.slots = slots;
            Ok(())
        })
        .await
        .map(|_| ())
    }

    /// Tombstone a slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the slot key does not exist, or
    /// [`Error::IoFailure`] if the write fails.
    pub async fn remove_mapping(&self, slot: &str) -> Result<()> {
        info!(slot, "Removing slot mapping");
        let slot = slot.to_string();
        self.mutate(OnReject::Discard, move |doc| doc.remove_mapping(&slot))
            .await
            .map(|_| ())
    }

    /// Reset the slot map to empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IoFailure`] if the write fails.
    pub async fn remove_all_mappings(&self) -> Result<()> {
        info!("Removing all slot mappings");
        self.mutate(OnReject::Discard, |doc| {
            doc.slots.clear();
            Ok(())
        })
        .await
        .map(|_| ())
    }

    /// Set the mapping for one slot.
    ///
    /// On a rejected value the unchanged document is rewritten before the
    /// error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the value is invalid, or
    /// [`Error::IoFailure`] if the write fails.
    pub async fn update_mapping(&self, slot: &str, value: &str) -> Result<()> {
        let slot = slot.to_string();
        let value = value.to_string();
        self.mutate(OnReject::Rewrite, move |doc| {
            let value = doc.validate_value(&slot, &value)?;
            info!(slot = %slot, value = %value, "Updating slot mapping");
            doc.slots.remove(&slot);
            doc.slots.insert(slot, value);
            Ok(())
        })
        .await
        .map(|_| ())
    }

    /// Merge several slot mappings into the existing map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if any value is invalid, in which
    /// case nothing is written, or [`Error::IoFailure`] if the write fails.
    pub async fn update_mappings(
        &self,
        entries: BTreeMap<String, String>,
    ) -> Result<MappingDocument> {
        info!(count = entries.len(), "Merging slot mappings");
        self.mutate(OnReject::Discard, move |doc| {
            let validated = entries
                .into_iter()
                .map(|(slot, value)| {
                    let value = doc.validate_value(&slot, &value)?;
                    Ok((slot, value))
                })
                .collect::<Result<Vec<_>>>()?;
            doc.slots.extend(validated);
            Ok(())
        })
        .await
        .map(|(_, doc)| doc)
    }

    async fn mutate<F, T>(&self, on_reject: OnReject, edit: F) -> Result<(T, MappingDocument)>
    where
        F: FnOnce(&mut MappingDocument) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();

        let (value, doc) = run_blocking(move || {
            let mut doc = load_document(&path);
            match edit(&mut doc) {
                Ok(value) => {
                    write_document(&path, &doc)?;
                    Ok((value, doc))
                }
                Err(err) => {
                    if on_reject == OnReject::Rewrite {
                        if let Err(write_err) = write_document(&path, &doc) {
                            error!(error = %write_err, "Could not rewrite slot mappings");
                        }
                    }
                    Err(err)
                }
            }
        })
        .await
        .map_err(|err| {
            if err.should_log() {
                error!(error = %err, "Could not update slot mappings");
            }
            err
        })?;

        self.changes.send_replace(Arc::new(doc.clone()));
        Ok((value, doc))
    }
}

/// Run a blocking closure on the blocking pool if inside a Tokio runtime,
/// synchronously otherwise.
async fn run_blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle
            .spawn_blocking(f)
            .await
            .map_err(|err| Error::IoFailure(format!("Blocking task failed: {err}")))?,
        Err(_) => f(),
    }
}

fn read_document(path: &Path) -> Result<MappingDocument> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn load_document(path: &Path) -> MappingDocument {
    read_document(path).unwrap_or_else(|err| {
        warn!(path = %path.display(), error = %err, "Could not process slot mappings file, using empty document");
        MappingDocument::default()
    })
}

fn write_document(path: &Path, doc: &MappingDocument) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut staged = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(staged.as_file_mut(), doc)
        .map_err(|err| Error::IoFailure(format!("Could not serialize slot mappings: {err}")))?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|err| Error::from(err.error))?;

    sync_dir(dir)?;
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
