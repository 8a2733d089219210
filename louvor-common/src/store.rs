//! Document-collection storage
//!
//! A thin CRUD layer over string-keyed storage. Records are JSON objects
//! grouped into named collections, and each collection persists as one
//! JSON array under its own storage key. Collections are created
//! implicitly on first write; there is no declared schema.
//!
//! Every mutation is a read-modify-write of the whole collection: the
//! store deserializes the array, applies the change, and writes the
//! array back. The last writer wins; there is no revision tracking and
//! no detection of concurrent external modification.
//!
//! Storage failures never surface to callers. Reads degrade to an empty
//! sequence and writes to `false`, with the underlying error logged.
//! Callers therefore cannot distinguish "not found" from "storage
//! unavailable", which keeps every call site total.

use crate::db::StorageBackend;
use crate::events::{EventBus, LouvorEvent};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

/// A single stored entity: field names mapped to JSON values
///
/// Records carry a unique `id` field (a string). All other fields are
/// open; different callers may rely on different optional fields within
/// the same collection.
pub type Record = serde_json::Map<String, Value>;

/// Field/value pairs a record must match exactly to be selected
pub type Conditions = serde_json::Map<String, Value>;

/// Build a `Conditions` map from field/value pairs
///
/// # Examples
///
/// ```
/// use louvor_common::store::conditions;
/// use serde_json::json;
///
/// let cond = conditions(&[("ministerioId", json!("m1"))]);
/// assert_eq!(cond.get("ministerioId"), Some(&json!("m1")));
/// ```
pub fn conditions(pairs: &[(&str, Value)]) -> Conditions {
    pairs
        .iter()
        .map(|(field, value)| (field.to_string(), value.clone()))
        .collect()
}

fn record_id_matches(record: &Record, id: &str) -> bool {
    matches!(record.get("id"), Some(Value::String(s)) if s == id)
}

/// Ensure the record carries a usable string id, generating one if needed
///
/// Returns the id the record ends up with. A missing, empty, or
/// non-string id is replaced with a fresh UUID rather than rejected.
fn ensure_record_id(record: &mut Record) -> String {
    match record.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        _ => {
            let id = Uuid::new_v4().to_string();
            record.insert("id".to_string(), Value::String(id.clone()));
            id
        }
    }
}

/// Keyed collection store with equality-filtered retrieval
///
/// The store is injected wherever collection access is needed, so tests
/// can substitute the in-memory backend for the SQLite one with no
/// caller-visible difference. Cloning shares the backend and event bus.
///
/// Successful writes emit a lossy [`LouvorEvent::CollectionChanged`]
/// notification on the shared bus. Delivery is fire-and-forget; a write
/// never fails because nobody is listening.
///
/// # Examples
///
/// ```
/// use louvor_common::store::DocumentStore;
///
/// let store = DocumentStore::in_memory();
/// let mut rx = store.events().subscribe();
///
/// // In async context:
/// // let mut ana = louvor_common::store::Record::new();
/// // ana.insert("nome".to_string(), serde_json::json!("Ana"));
/// // let stored = store.create_record("usuarios", ana).await;
/// // assert!(stored.contains_key("id"));
/// ```
#[derive(Clone)]
pub struct DocumentStore {
    backend: StorageBackend,
    events: EventBus,
}

impl DocumentStore {
    /// Create a store over the given backend, notifying on `events`
    pub fn new(backend: StorageBackend, events: EventBus) -> Self {
        Self { backend, events }
    }

    /// Create a store over a fresh in-memory backend and private bus
    pub fn in_memory() -> Self {
        Self::new(StorageBackend::memory(), EventBus::new(100))
    }

    /// The event bus this store publishes change notifications on
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Insert `record` into `collection`, replacing any record with the same id
    ///
    /// A record without a usable string `id` gets a generated UUID before
    /// insertion. Returns the stored record including that id. When the
    /// id matches an existing record the new payload takes its position,
    /// so iteration order is stable across upserts.
    pub async fn create_record(&self, collection: &str, mut record: Record) -> Record {
        let id = ensure_record_id(&mut record);

        let mut records = self.load_collection(collection).await;
        match records.iter().position(|r| record_id_matches(r, &id)) {
            Some(pos) => records[pos] = record.clone(),
            None => records.push(record.clone()),
        }
        self.store_collection(collection, &records).await;

        record
    }

    /// Return the records in `collection` matching every condition
    ///
    /// Matching is strict JSON equality, so `"1"` and `1` are distinct
    /// values. Empty conditions select the whole collection. Results
    /// preserve insertion order. An unknown collection yields an empty
    /// sequence rather than an error.
    pub async fn find_records(&self, collection: &str, conditions: &Conditions) -> Vec<Record> {
        let records = self.load_collection(collection).await;
        if conditions.is_empty() {
            return records;
        }

        records
            .into_iter()
            .filter(|record| {
                conditions
                    .iter()
                    .all(|(field, value)| record.get(field) == Some(value))
            })
            .collect()
    }

    /// Shallow-merge `patch` into the record with the given id
    ///
    /// Patch fields override, unspecified fields are retained. Returns
    /// `true` when the record was found and the merged collection was
    /// persisted; `false` otherwise, with no write performed.
    pub async fn update_record(&self, collection: &str, id: &str, patch: &Record) -> bool {
        let mut records = self.load_collection(collection).await;
        let pos = match records.iter().position(|r| record_id_matches(r, id)) {
            Some(pos) => pos,
            None => return false,
        };

        for (field, value) in patch {
            records[pos].insert(field.clone(), value.clone());
        }
        self.store_collection(collection, &records).await
    }

    /// Remove the record with the given id
    ///
    /// Returns `true` when a record was removed and the remaining
    /// collection was persisted, `false` otherwise.
    pub async fn delete_record(&self, collection: &str, id: &str) -> bool {
        let mut records = self.load_collection(collection).await;
        let before = records.len();
        records.retain(|r| !record_id_matches(r, id));
        if records.len() == before {
            return false;
        }

        self.store_collection(collection, &records).await
    }

    /// Return every record in `collection` in insertion order
    pub async fn get_all(&self, collection: &str) -> Vec<Record> {
        self.load_collection(collection).await
    }

    /// Replace the entire contents of `collection` with `records`
    ///
    /// Ids are auto-filled the same way `create_record` fills them, and a
    /// later duplicate id replaces the earlier record in place, so the
    /// stored collection keeps unique ids. Returns the records as stored.
    pub async fn replace_all(&self, collection: &str, records: Vec<Record>) -> Vec<Record> {
        let mut stored: Vec<Record> = Vec::with_capacity(records.len());
        for mut record in records {
            let id = ensure_record_id(&mut record);
            match stored.iter().position(|r| record_id_matches(r, &id)) {
                Some(pos) => stored[pos] = record,
                None => stored.push(record),
            }
        }

        self.store_collection(collection, &stored).await;
        stored
    }

    /// Remove `collection` from storage entirely
    ///
    /// After clearing, the collection is indistinguishable from one that
    /// never existed. Returns `true` when the removal was persisted.
    pub async fn clear_collection(&self, collection: &str) -> bool {
        if let Err(e) = self.backend.remove(collection).await {
            warn!("Failed to clear collection '{}': {}", collection, e);
            return false;
        }
        self.notify_changed(collection);
        true
    }

    async fn load_collection(&self, collection: &str) -> Vec<Record> {
        let payload = match self.backend.get(collection).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read collection '{}': {}", collection, e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&payload) {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    "Collection '{}' holds malformed JSON, treating as empty: {}",
                    collection, e
                );
                Vec::new()
            }
        }
    }

    async fn store_collection(&self, collection: &str, records: &[Record]) -> bool {
        let payload = match serde_json::to_string(records) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to serialize collection '{}': {}", collection, e);
                return false;
            }
        };

        if let Err(e) = self.backend.set(collection, &payload).await {
            warn!("Failed to persist collection '{}': {}", collection, e);
            return false;
        }

        self.notify_changed(collection);
        true
    }

    fn notify_changed(&self, collection: &str) {
        self.events.emit_lossy(LouvorEvent::CollectionChanged {
            collection: collection.to_string(),
            timestamp: chrono::Utc::now(),
        });
    }
}
