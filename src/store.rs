//! Workout store - per-user workout collection with live subscriptions

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, info, warn};

use crate::db::{Database, Result, StoreError, validate_path};
use crate::workout::{Weekday, WorkoutRecord};

/// Update delivered to a subscriber
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotEvent {
    /// Full collection, unordered
    Snapshot(Vec<WorkoutRecord>),
    Failed(String),
}

struct Listener {
    collection: String,
    tx: UnboundedSender<SnapshotEvent>,
}

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    entries: HashMap<u64, Listener>,
}

/// Registry of live subscriptions, shareable between stores
#[derive(Clone, Default)]
pub struct Listeners {
    inner: Arc<Mutex<ListenerTable>>,
}

impl Listeners {
    fn lock(&self) -> MutexGuard<'_, ListenerTable> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, collection: &str, tx: UnboundedSender<SnapshotEvent>) -> u64 {
        let mut table = self.lock();
        let id = table.next_id;
        table.next_id += 1;
        table.entries.insert(
            id,
            Listener {
                collection: collection.to_string(),
                tx,
            },
        );
        id
    }

    fn remove(&self, id: u64) {
        self.lock().entries.remove(&id);
    }

    /// Number of live subscriptions
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn has_collection(&self, collection: &str) -> bool {
        self.lock()
            .entries
            .values()
            .any(|l| l.collection == collection)
    }

    pub(crate) fn broadcast(&self, collection: &str, event: &SnapshotEvent) {
        let mut table = self.lock();
        table.entries.retain(|id, listener| {
            if listener.collection != collection {
                return true;
            }
            let delivered = listener.tx.send(event.clone()).is_ok();
            if !delivered {
                debug!("Dropping closed subscription {}", id);
            }
            delivered
        });
    }
}

/// Live view of the collection. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    rx: UnboundedReceiver<SnapshotEvent>,
    listeners: Listeners,
}

impl Subscription {
    /// Next pending event without blocking
    pub fn try_next(&mut self) -> Option<SnapshotEvent> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next event
    pub async fn next(&mut self) -> Option<SnapshotEvent> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.listeners.remove(self.id);
        debug!("Subscription {} released", self.id);
    }
}

/// The current user's workout collection
pub struct WorkoutStore {
    db: Database,
    collection: String,
    listeners: Listeners,
    /// Last seen `data_version`; moves only on commits from other connections
    seen_version: Cell<i64>,
}

impl std::fmt::Debug for WorkoutStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkoutStore")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl WorkoutStore {
    pub fn new(db: Database, app_id: &str, user_id: &str) -> Result<Self> {
        Self::with_listeners(db, app_id, user_id, Listeners::default())
    }

    pub fn with_listeners(
        db: Database,
        app_id: &str,
        user_id: &str,
        listeners: Listeners,
    ) -> Result<Self> {
        let collection = collection_path(app_id, user_id);
        if app_id.contains('/') || user_id.contains('/') {
            return Err(StoreError::InvalidPath(collection));
        }
        validate_path(&collection)?;
        let seen_version = Cell::new(db.data_version()?);
        Ok(Self {
            db,
            collection,
            listeners,
            seen_version,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    /// Stored workout for a weekday
    pub fn get(&self, day: Weekday) -> Result<Option<WorkoutRecord>> {
        let body = self.db.get_document(&self.collection, day.name())?;
        Ok(body.and_then(|b| WorkoutRecord::from_document(day.name(), &b)))
    }

    /// Write the record with merge semantics; the exercise list is replaced whole
    pub fn save(&self, record: &WorkoutRecord) -> Result<()> {
        self.db
            .set_document(&self.collection, record.key(), &record.to_document(), true)?;
        info!(
            "Saved workout for {} ({} exercises)",
            record.day,
            record.exercises.len()
        );
        self.notify();
        Ok(())
    }

    /// Set the completion flag only, leaving the rest of the record untouched
    pub fn set_completed(&self, day: Weekday, completed: bool) -> Result<()> {
        self.db
            .update_field(&self.collection, day.name(), "completed", Value::Bool(completed))?;
        info!("Marked {} completed={}", day, completed);
        self.notify();
        Ok(())
    }

    /// Flip the stored completion flag, returning the new value
    pub fn toggle_completed(&self, day: Weekday) -> Result<bool> {
        let record = self.get(day)?.ok_or_else(|| StoreError::NotFound {
            collection: self.collection.clone(),
            key: day.name().to_string(),
        })?;
        let completed = !record.completed;
        self.set_completed(day, completed)?;
        Ok(completed)
    }

    /// One-shot read of the whole collection, unordered
    pub fn list(&self) -> Result<Vec<WorkoutRecord>> {
        let docs = self.db.list_documents(&self.collection)?;
        Ok(docs
            .iter()
            .filter_map(|doc| {
                let record = WorkoutRecord::from_document(&doc.key, &doc.body);
                if record.is_none() {
                    warn!("Ignoring document {} with unknown weekday", doc.key);
                }
                record
            })
            .collect())
    }

    /// Register a live listener; the current snapshot is delivered immediately
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = unbounded_channel();
        // Send before registering so the initial snapshot is always first
        let _ = tx.send(self.snapshot());
        let id = self.listeners.register(&self.collection, tx);
        debug!("Subscription {} opened on {}", id, self.collection);

        Subscription {
            id,
            rx,
            listeners: self.listeners.clone(),
        }
    }

    /// Pick up writes committed by other sessions on the same file and push a
    /// fresh snapshot to subscribers. Returns true when something changed.
    pub fn sync_external(&self) -> Result<bool> {
        let version = self.db.data_version()?;
        if self.seen_version.replace(version) == version {
            return Ok(false);
        }
        debug!("External write detected on {}", self.collection);
        self.notify();
        Ok(true)
    }

    fn snapshot(&self) -> SnapshotEvent {
        match self.list() {
            Ok(records) => SnapshotEvent::Snapshot(records),
            Err(e) => {
                warn!("Failed to read workouts for subscribers: {}", e);
                SnapshotEvent::Failed(e.to_string())
            }
        }
    }

    fn notify(&self) {
        if !self.listeners.has_collection(&self.collection) {
            return;
        }
        let event = self.snapshot();
        self.listeners.broadcast(&self.collection, &event);
    }
}

pub fn collection_path(app_id: &str, user_id: &str) -> String {
    format!("artifacts/{app_id}/users/{user_id}/workouts")
}
