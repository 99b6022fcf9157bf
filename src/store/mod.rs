//! Canonical owner of all summaries, rows, and conversations.
//!
//! The store hands out immutable snapshots and applies pure transformations
//! against the *latest* snapshot at apply time. Asynchronous workflows must
//! never mutate through state captured when they started; everything a
//! transformation needs is read from the snapshot it is given.

pub mod persistence;

use std::sync::Mutex;

use tracing::error;

use crate::core::models::{Conversation, ConversationId, Summary, SummaryId};
use crate::errors::AppError;

pub use persistence::{JsonFilePersistence, MemoryPersistence, StatePersistence};

/// Which conversation the user is currently looking at. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub summary_id: SummaryId,
    pub conversation_id: ConversationId,
}

/// An immutable view of the whole collection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub summaries: Vec<Summary>,
    pub selected: Option<Selection>,
}

impl Snapshot {
    #[must_use]
    pub fn summary(&self, id: SummaryId) -> Option<&Summary> {
        self.summaries.iter().find(|s| s.id == id)
    }

    pub fn summary_mut(&mut self, id: SummaryId) -> Option<&mut Summary> {
        self.summaries.iter_mut().find(|s| s.id == id)
    }

    #[must_use]
    pub fn conversation(
        &self,
        summary_id: SummaryId,
        conversation_id: ConversationId,
    ) -> Option<&Conversation> {
        self.summary(summary_id)
            .and_then(|s| s.conversation(conversation_id))
    }

    /// Whether `name` is already used as a display name by a summary other
    /// than `exclude`.
    #[must_use]
    pub fn display_name_taken(&self, name: &str, exclude: Option<SummaryId>) -> bool {
        self.summaries
            .iter()
            .any(|s| Some(s.id) != exclude && s.display_name == name)
    }

    #[must_use]
    pub fn summary_by_source(&self, source_file_name: &str) -> Option<&Summary> {
        self.summaries
            .iter()
            .find(|s| s.source_file_name == source_file_name)
    }
}

type Subscriber = Box<dyn Fn(&Snapshot) + Send>;

/// Owns the canonical entity collection.
///
/// Every successful `apply` persists the whole collection and notifies
/// subscribers with the committed snapshot. The internal lock is only held
/// for the synchronous transformation itself, never across an await.
pub struct EntityStore {
    snapshot: Mutex<Snapshot>,
    persistence: Box<dyn StatePersistence>,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl EntityStore {
    /// Loads the persisted collection and builds the store around it. An
    /// absent slot yields an empty collection.
    pub fn open(persistence: Box<dyn StatePersistence>) -> Result<Self, AppError> {
        let snapshot = persistence.load()?;
        Ok(Self {
            snapshot: Mutex::new(snapshot),
            persistence,
            subscribers: Mutex::new(Vec::new()),
        })
    }

    /// Builds an empty store over the given persistence, ignoring any
    /// previously persisted state.
    #[must_use]
    pub fn empty(persistence: Box<dyn StatePersistence>) -> Self {
        Self {
            snapshot: Mutex::new(Snapshot::default()),
            persistence,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn get(&self) -> Snapshot {
        self.snapshot.lock().expect("store lock poisoned").clone()
    }

    /// Applies a pure transformation to the latest snapshot.
    ///
    /// On `Ok` the result is committed, persisted, and broadcast to
    /// subscribers; on `Err` the store is left untouched. A persistence
    /// failure is logged but does not revert the commit: the in-memory
    /// collection stays the source of truth and the next write retries the
    /// full document.
    ///
    /// # Errors
    ///
    /// Propagates whatever error the transformation returns.
    pub fn apply<F>(&self, transform: F) -> Result<Snapshot, AppError>
    where
        F: FnOnce(&Snapshot) -> Result<Snapshot, AppError>,
    {
        let committed = {
            let mut guard = self.snapshot.lock().expect("store lock poisoned");
            let next = transform(&guard)?;
            *guard = next.clone();
            next
        };

        if let Err(e) = self.persistence.save(&committed) {
            error!("Failed to persist snapshot: {e}");
        }

        let subscribers = self.subscribers.lock().expect("subscriber lock poisoned");
        for subscriber in subscribers.iter() {
            subscriber(&committed);
        }

        Ok(committed)
    }

    /// Registers a callback invoked with every committed snapshot.
    pub fn subscribe(&self, subscriber: impl Fn(&Snapshot) + Send + 'static) {
        self.subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .push(Box::new(subscriber));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::core::models::Summary;

    fn memory_store() -> EntityStore {
        EntityStore::empty(Box::new(MemoryPersistence::default()))
    }

    fn sample_summary(name: &str) -> Summary {
        let mut summary = Summary::from_extracted_fields(
            name,
            vec![("budget".to_string(), "150k".to_string())],
        );
        summary.display_name = name.to_string();
        summary
    }

    #[test]
    fn test_apply_commits_and_returns_new_snapshot() {
        let store = memory_store();

        let snapshot = store
            .apply(|snap| {
                let mut next = snap.clone();
                next.summaries.push(sample_summary("tender_a"));
                Ok(next)
            })
            .unwrap();

        assert_eq!(snapshot.summaries.len(), 1);
        assert_eq!(store.get(), snapshot);
    }

    #[test]
    fn test_failed_transform_leaves_store_untouched() {
        let store = memory_store();
        store
            .apply(|snap| {
                let mut next = snap.clone();
                next.summaries.push(sample_summary("tender_a"));
                Ok(next)
            })
            .unwrap();

        let before = store.get();
        let result = store.apply(|_| Err(AppError::NoChange));
        assert!(matches!(result, Err(AppError::NoChange)));
        assert_eq!(store.get(), before);
    }

    #[test]
    fn test_apply_reads_latest_snapshot_not_a_stale_capture() {
        let store = memory_store();

        // Simulates two interleaved operations: the second apply sees the
        // first one's commit even though both "started" from the same state.
        store
            .apply(|snap| {
                let mut next = snap.clone();
                next.summaries.push(sample_summary("first"));
                Ok(next)
            })
            .unwrap();

        let snapshot = store
            .apply(|snap| {
                assert_eq!(snap.summaries.len(), 1);
                let mut next = snap.clone();
                next.summaries.push(sample_summary("second"));
                Ok(next)
            })
            .unwrap();

        assert_eq!(snapshot.summaries.len(), 2);
    }

    #[test]
    fn test_subscribers_see_every_commit() {
        let store = memory_store();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        store.subscribe(move |snapshot| {
            seen_clone.store(snapshot.summaries.len(), Ordering::SeqCst);
        });

        store
            .apply(|snap| {
                let mut next = snap.clone();
                next.summaries.push(sample_summary("tender_a"));
                Ok(next)
            })
            .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_every_commit_is_persisted() {
        let persistence = Arc::new(MemoryPersistence::default());
        let store = EntityStore::empty(Box::new(Arc::clone(&persistence)));

        store
            .apply(|snap| {
                let mut next = snap.clone();
                next.summaries.push(sample_summary("tender_a"));
                Ok(next)
            })
            .unwrap();

        let reloaded = persistence.load().unwrap();
        assert_eq!(reloaded.summaries.len(), 1);
        assert_eq!(reloaded.summaries[0].display_name, "tender_a");
    }
}
