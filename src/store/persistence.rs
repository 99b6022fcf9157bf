//! Durable round-trip for the whole collection.
//!
//! One serialized document holds every summary; writes always overwrite the
//! full document, which is acceptable because the domain is small and writes
//! are human-triggered. The persisted shape carries an explicit schema
//! version so a future shape change can migrate in `load` instead of
//! silently dropping data.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::models::Summary;
use crate::errors::AppError;
use crate::store::Snapshot;

/// Version written into every saved document. Version 0 is the legacy
/// unversioned shape (a bare summary list without the wrapper).
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PersistedState {
    #[serde(default)]
    schema_version: u32,
    #[serde(default)]
    summaries: Vec<Summary>,
}

/// Serialize/deserialize boundary for the entity store. The selection is
/// deliberately not part of the document; it resets on every load.
pub trait StatePersistence: Send + Sync {
    /// Writes the full collection to the durable slot.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Persistence`] when serialization or the write
    /// fails.
    fn save(&self, snapshot: &Snapshot) -> Result<(), AppError>;

    /// Reads the collection back. An absent slot yields an empty collection.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Persistence`] on unreadable data or a schema
    /// version newer than this build understands.
    fn load(&self) -> Result<Snapshot, AppError>;
}

impl<P: StatePersistence> StatePersistence for Arc<P> {
    fn save(&self, snapshot: &Snapshot) -> Result<(), AppError> {
        (**self).save(snapshot)
    }

    fn load(&self) -> Result<Snapshot, AppError> {
        (**self).load()
    }
}

fn to_document(snapshot: &Snapshot) -> PersistedState {
    PersistedState {
        schema_version: SCHEMA_VERSION,
        summaries: snapshot.summaries.clone(),
    }
}

fn from_document(state: PersistedState) -> Result<Snapshot, AppError> {
    match state.schema_version {
        // Version 0 documents predate the wrapper; serde defaults already
        // fill the gaps (missing conversation lists become empty).
        0 | SCHEMA_VERSION => Ok(Snapshot {
            summaries: state.summaries,
            selected: None,
        }),
        newer => Err(AppError::Persistence(format!(
            "Persisted state has schema version {newer}, this build understands up to {SCHEMA_VERSION}"
        ))),
    }
}

/// Whole-document JSON persistence in a single file.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StatePersistence for JsonFilePersistence {
    fn save(&self, snapshot: &Snapshot) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string(&to_document(snapshot))?;
        fs::write(&self.path, serialized)?;
        Ok(())
    }

    fn load(&self) -> Result<Snapshot, AppError> {
        if !self.path.exists() {
            info!("No persisted state at {}; starting empty", self.path.display());
            return Ok(Snapshot::default());
        }

        let raw = fs::read_to_string(&self.path)?;
        let state: PersistedState = serde_json::from_str(&raw)?;
        from_document(state)
    }
}

/// In-memory persistence for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    slot: Mutex<Option<String>>,
}

impl StatePersistence for MemoryPersistence {
    fn save(&self, snapshot: &Snapshot) -> Result<(), AppError> {
        let serialized = serde_json::to_string(&to_document(snapshot))?;
        *self.slot.lock().expect("slot lock poisoned") = Some(serialized);
        Ok(())
    }

    fn load(&self) -> Result<Snapshot, AppError> {
        let slot = self.slot.lock().expect("slot lock poisoned");
        match slot.as_deref() {
            None => Ok(Snapshot::default()),
            Some(raw) => {
                let state: PersistedState = serde_json::from_str(raw)?;
                from_document(state)
            }
        }
    }
}
